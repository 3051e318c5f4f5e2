#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `SQLite` persistence for the building optimizer.
//!
//! Two tables live in one database file (`data/building_optimizer.db` by
//! default):
//!
//! - `population_data`: last-known density and centroid per
//!   `(district_name, city)`, reconciled against freshly resolved districts
//! - `building_requests`: every placement recommendation handed out
//!
//! The schema is created idempotently when the database is opened.

pub mod history;
pub mod population;

use std::path::{Path, PathBuf};

use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;
use thiserror::Error;

/// Default path for the database file.
pub const DEFAULT_DB_PATH: &str = "data/building_optimizer.db";

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// A database query or command failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<switchy_database::DatabaseError> for DbError {
    fn from(e: switchy_database::DatabaseError) -> Self {
        Self::Database(e.to_string())
    }
}

/// Database path from `DATABASE_PATH`, or [`DEFAULT_DB_PATH`].
#[must_use]
pub fn db_path_from_env() -> PathBuf {
    std::env::var("DATABASE_PATH").map_or_else(|_| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from)
}

/// Opens (or creates) the `SQLite` database and ensures the schema exists.
///
/// # Errors
///
/// Returns [`DbError`] if the parent directory cannot be created, the
/// database cannot be opened, or schema creation fails.
pub async fn open_db(path: &Path) -> Result<Box<dyn Database>, DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Database(e.to_string()))?;

    ensure_schema(db.as_ref()).await?;
    log::debug!("Opened database at {}", path.display());

    Ok(db)
}

/// Creates all tables if they don't already exist.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS population_data (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            district_name      TEXT NOT NULL,
            city               TEXT NOT NULL,
            lat                REAL NOT NULL,
            lng                REAL NOT NULL,
            population_density INTEGER NOT NULL,
            updated_at         TEXT NOT NULL,
            UNIQUE(district_name, city)
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS building_requests (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            building_type      TEXT NOT NULL,
            city               TEXT NOT NULL,
            suggested_lat      REAL NOT NULL,
            suggested_lng      REAL NOT NULL,
            population_density REAL NOT NULL,
            confidence         REAL NOT NULL,
            reasoning          TEXT NOT NULL,
            created_at         TEXT NOT NULL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_building_requests_created
         ON building_requests (created_at)",
    )
    .await?;

    Ok(())
}
