//! District population store.
//!
//! One row per `(district_name, city)` holding the last-known density and
//! centroid. Freshly resolved districts are reconciled into the table; when
//! resolution yields nothing the stored rows stand in for them.

use building_optimizer_geography_models::{District, Ring};
use moosicbox_json_utils::database::ToValue as _;
use serde::{Deserialize, Serialize};
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// A stored population row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    /// District name, unique within the city.
    pub district_name: String,
    /// City the district belongs to.
    pub city: String,
    /// Centroid latitude.
    pub lat: f64,
    /// Centroid longitude.
    pub lng: f64,
    /// People per square kilometre.
    pub population_density: u32,
}

/// A reconciled district as served to the frontend.
///
/// `district_name` and `name` carry the same value; both keys are part of
/// the response shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationEntry {
    /// District name.
    pub district_name: String,
    /// District name (duplicate key).
    pub name: String,
    /// Centroid latitude.
    pub lat: f64,
    /// Centroid longitude.
    pub lng: f64,
    /// People per square kilometre.
    pub population_density: u32,
    /// City the district belongs to.
    pub city: String,
    /// District polygons; empty for rows served from the store.
    pub geometry: Vec<Ring>,
}

impl PopulationEntry {
    fn from_record(record: PopulationRecord, geometry: Vec<Ring>) -> Self {
        Self {
            name: record.district_name.clone(),
            district_name: record.district_name,
            lat: record.lat,
            lng: record.lng,
            population_density: record.population_density,
            city: record.city,
            geometry,
        }
    }
}

fn record_from_row(row: &switchy_database::Row) -> PopulationRecord {
    let density: i64 = row.to_value("population_density").unwrap_or(0);

    PopulationRecord {
        district_name: row.to_value("district_name").unwrap_or_default(),
        city: row.to_value("city").unwrap_or_default(),
        lat: row.to_value("lat").unwrap_or_default(),
        lng: row.to_value("lng").unwrap_or_default(),
        population_density: u32::try_from(density).unwrap_or(0),
    }
}

async fn find(
    db: &dyn Database,
    district_name: &str,
    city: &str,
) -> Result<Option<PopulationRecord>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT district_name, city, lat, lng, population_density
             FROM population_data
             WHERE district_name = ? AND city = ?",
            &[
                DatabaseValue::String(district_name.to_string()),
                DatabaseValue::String(city.to_string()),
            ],
        )
        .await?;

    Ok(rows.first().map(record_from_row))
}

async fn insert(db: &dyn Database, record: &PopulationRecord) -> Result<(), DbError> {
    db.exec_raw_params(
        "INSERT INTO population_data (district_name, city, lat, lng, population_density, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT (district_name, city) DO NOTHING",
        &[
            DatabaseValue::String(record.district_name.clone()),
            DatabaseValue::String(record.city.clone()),
            DatabaseValue::Real64(record.lat),
            DatabaseValue::Real64(record.lng),
            DatabaseValue::Int64(i64::from(record.population_density)),
            DatabaseValue::String(chrono::Utc::now().to_rfc3339()),
        ],
    )
    .await?;

    Ok(())
}

/// Gets or creates the row for `district` in `city`.
///
/// An existing row keeps its coordinates unless the density changed, in
/// which case density, latitude and longitude are all overwritten. Returns
/// the row as stored after the call.
///
/// # Errors
///
/// Returns [`DbError`] if any query fails.
pub async fn upsert_district(
    db: &dyn Database,
    city: &str,
    district: &District,
) -> Result<PopulationRecord, DbError> {
    let fresh = PopulationRecord {
        district_name: district.name.clone(),
        city: city.to_string(),
        lat: district.centroid.lat,
        lng: district.centroid.lng,
        population_density: district.population_density,
    };

    let Some(existing) = find(db, &district.name, city).await? else {
        insert(db, &fresh).await?;
        log::debug!("Stored new population row for {} ({city})", fresh.district_name);
        return Ok(find(db, &district.name, city).await?.unwrap_or(fresh));
    };

    if existing.population_density == fresh.population_density {
        return Ok(existing);
    }

    db.exec_raw_params(
        "UPDATE population_data
         SET population_density = ?, lat = ?, lng = ?, updated_at = ?
         WHERE district_name = ? AND city = ?",
        &[
            DatabaseValue::Int64(i64::from(fresh.population_density)),
            DatabaseValue::Real64(fresh.lat),
            DatabaseValue::Real64(fresh.lng),
            DatabaseValue::String(chrono::Utc::now().to_rfc3339()),
            DatabaseValue::String(fresh.district_name.clone()),
            DatabaseValue::String(fresh.city.clone()),
        ],
    )
    .await?;

    log::debug!(
        "Updated {} ({city}) density {} -> {}",
        fresh.district_name,
        existing.population_density,
        fresh.population_density
    );

    Ok(fresh)
}

/// Lists the stored rows for a city, ordered by district name.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn list_city(db: &dyn Database, city: &str) -> Result<Vec<PopulationRecord>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT district_name, city, lat, lng, population_density
             FROM population_data
             WHERE city = ?
             ORDER BY district_name",
            &[DatabaseValue::String(city.to_string())],
        )
        .await?;

    Ok(rows.iter().map(record_from_row).collect())
}

/// Reconciles freshly resolved districts with the store.
///
/// Every district is upserted and returned with its polygons. With no fresh
/// districts, the stored rows for the city are returned with empty
/// geometry.
///
/// # Errors
///
/// Returns [`DbError`] if any query fails.
pub async fn reconcile(
    db: &dyn Database,
    city: &str,
    districts: &[District],
) -> Result<Vec<PopulationEntry>, DbError> {
    if districts.is_empty() {
        let stored = list_city(db, city).await?;
        log::info!(
            "No fresh districts for {city}, serving {} stored rows",
            stored.len()
        );
        return Ok(stored
            .into_iter()
            .map(|record| PopulationEntry::from_record(record, Vec::new()))
            .collect());
    }

    let mut entries = Vec::with_capacity(districts.len());
    for district in districts {
        let record = upsert_district(db, city, district).await?;
        entries.push(PopulationEntry::from_record(record, district.polygons.clone()));
    }

    Ok(entries)
}

/// Clears the table and inserts `records`. Returns the number inserted.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub async fn replace_all(db: &dyn Database, records: &[PopulationRecord]) -> Result<usize, DbError> {
    db.exec_raw("DELETE FROM population_data").await?;

    for record in records {
        insert(db, record).await?;
    }

    log::info!("Replaced population data with {} rows", records.len());
    Ok(records.len())
}
