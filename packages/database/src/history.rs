//! Recommendation history.

use moosicbox_json_utils::database::ToValue as _;
use serde::{Deserialize, Serialize};
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// A recommendation about to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBuildingRequest {
    /// Building type slug (`school`, `shopping_center`, ...).
    pub building_type: String,
    /// City the recommendation was made for.
    pub city: String,
    /// Suggested latitude.
    pub suggested_lat: f64,
    /// Suggested longitude.
    pub suggested_lng: f64,
    /// Density at the suggested location, `0.0` when unknown.
    pub population_density: f64,
    /// Model confidence.
    pub confidence: f64,
    /// Model justification.
    pub reasoning: String,
}

/// A recorded recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingRequest {
    /// Row id.
    pub id: i64,
    /// Building type slug.
    pub building_type: String,
    /// City.
    pub city: String,
    /// Suggested latitude.
    pub suggested_lat: f64,
    /// Suggested longitude.
    pub suggested_lng: f64,
    /// Density at the suggested location.
    pub population_density: f64,
    /// Model confidence.
    pub confidence: f64,
    /// Model justification.
    pub reasoning: String,
    /// RFC 3339 creation time.
    pub created_at: String,
}

/// Records a recommendation and returns its id.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub async fn record_request(db: &dyn Database, request: &NewBuildingRequest) -> Result<i64, DbError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO building_requests (building_type, city, suggested_lat, suggested_lng,
                 population_density, confidence, reasoning, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
            &[
                DatabaseValue::String(request.building_type.clone()),
                DatabaseValue::String(request.city.clone()),
                DatabaseValue::Real64(request.suggested_lat),
                DatabaseValue::Real64(request.suggested_lng),
                DatabaseValue::Real64(request.population_density),
                DatabaseValue::Real64(request.confidence),
                DatabaseValue::String(request.reasoning.clone()),
                DatabaseValue::String(chrono::Utc::now().to_rfc3339()),
            ],
        )
        .await?;

    let id = rows
        .first()
        .and_then(|r| r.to_value("id").ok())
        .unwrap_or(0);

    log::debug!(
        "Recorded {} recommendation for {} as #{id}",
        request.building_type,
        request.city
    );

    Ok(id)
}

/// Lists the most recent recommendations, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn recent_requests(db: &dyn Database, limit: u32) -> Result<Vec<BuildingRequest>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, building_type, city, suggested_lat, suggested_lng,
                    population_density, confidence, reasoning, created_at
             FROM building_requests
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
            &[DatabaseValue::Int64(i64::from(limit))],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| BuildingRequest {
            id: row.to_value("id").unwrap_or(0),
            building_type: row.to_value("building_type").unwrap_or_default(),
            city: row.to_value("city").unwrap_or_default(),
            suggested_lat: row.to_value("suggested_lat").unwrap_or_default(),
            suggested_lng: row.to_value("suggested_lng").unwrap_or_default(),
            population_density: row.to_value("population_density").unwrap_or_default(),
            confidence: row.to_value("confidence").unwrap_or_default(),
            reasoning: row.to_value("reasoning").unwrap_or_default(),
            created_at: row.to_value("created_at").unwrap_or_default(),
        })
        .collect())
}
