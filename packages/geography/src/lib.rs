#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pure geographic computation for the building optimizer.
//!
//! Normalizes polygon coordinates coming from the map services into
//! [`Ring`](building_optimizer_geography_models::Ring)s, computes district
//! centroids, synthesizes weighted heatmap point clouds, and owns the
//! registry of per-city district catalogs. Nothing in this crate performs
//! I/O except loading extra catalog files at startup.

pub mod geometry;
pub mod heatmap;
pub mod registry;

use thiserror::Error;

/// Errors that can occur while loading city district catalogs.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Reading a catalog file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A catalog file is not valid TOML for the catalog schema.
    #[error("TOML error in {path}: {source}")]
    Toml {
        /// Path of the offending file.
        path: String,
        /// Underlying parse error.
        source: toml::de::Error,
    },
}
