#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the building optimizer server.
//!
//! Every response carries a `success` flag: `true` alongside the payload,
//! `false` alongside an `error` string. These types are separate from the
//! store and AI types to allow independent evolution of the API contract.

use building_optimizer_ai::school_info::SchoolInfo;
use building_optimizer_ai::suggestion::Coordinates;
use building_optimizer_database::history::BuildingRequest;
use building_optimizer_database::population::PopulationEntry;
use building_optimizer_geography_models::{
    BoundingBox, BuildingType, District, HeatmapPoint, PointFeature, Ring,
};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Always `true` when the server answers.
    pub healthy: bool,
    /// Crate version.
    pub version: String,
}

/// Error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Human-readable description.
    pub error: String,
}

impl ApiErrorBody {
    /// Creates an error envelope.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// `?city=` query parameter shared by the `GET` endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CityQuery {
    /// City name; the server default applies when absent or blank.
    pub city: Option<String>,
}

/// `GET /api/population-heatmap`
#[derive(Debug, Clone, Serialize)]
pub struct PopulationHeatmapResponse {
    /// Always `true`.
    pub success: bool,
    /// City the districts belong to.
    pub city: String,
    /// Reconciled districts.
    pub districts: Vec<PopulationEntry>,
}

/// Counts reported alongside the enhanced heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapStats {
    /// Number of districts.
    pub districts_count: usize,
    /// Number of residential features.
    pub residential_count: usize,
    /// Number of commercial features.
    pub commercial_count: usize,
    /// Number of schools.
    pub schools_count: usize,
    /// Number of synthesized heatmap points.
    pub heatmap_points: usize,
}

/// `GET /api/enhanced-heatmap`
#[derive(Debug, Clone, Serialize)]
pub struct EnhancedHeatmapResponse {
    /// Always `true`.
    pub success: bool,
    /// City.
    pub city: String,
    /// Resolved districts.
    pub districts: Vec<District>,
    /// Residential buildings.
    pub residential_buildings: Vec<PointFeature>,
    /// Commercial places.
    pub commercial_places: Vec<PointFeature>,
    /// Schools.
    pub schools: Vec<PointFeature>,
    /// Synthesized heatmap.
    pub heatmap_data: Vec<HeatmapPoint>,
    /// Layer sizes.
    pub stats: HeatmapStats,
}

/// `POST /api/suggest-location` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestLocationRequest {
    /// Building type slug (`school`, `shopping_center`, ...).
    pub building_type: Option<String>,
    /// City; the server default applies when absent.
    pub city: Option<String>,
}

/// A placement recommendation as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSuggestion {
    /// Recommended district.
    pub district: String,
    /// Recommended location.
    pub coordinates: Coordinates,
    /// Confidence score.
    pub confidence: f64,
    /// Justification.
    pub reasoning: String,
    /// Requested building type slug.
    pub building_type: BuildingType,
    /// City.
    pub city: String,
}

/// `POST /api/suggest-location` response.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestLocationResponse {
    /// Always `true`.
    pub success: bool,
    /// The recommendation.
    pub suggestion: ApiSuggestion,
}

/// A past recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHistoryItem {
    /// Row id.
    pub id: i64,
    /// Human-readable building type.
    pub building_type: String,
    /// City.
    pub city: String,
    /// Suggested location.
    pub coordinates: Coordinates,
    /// Confidence score.
    pub confidence: f64,
    /// Justification.
    pub reasoning: String,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl From<BuildingRequest> for ApiHistoryItem {
    fn from(row: BuildingRequest) -> Self {
        let building_type = row
            .building_type
            .parse::<BuildingType>()
            .map_or(row.building_type, |t| t.label().to_string());

        Self {
            id: row.id,
            building_type,
            city: row.city,
            coordinates: Coordinates {
                lat: row.suggested_lat,
                lng: row.suggested_lng,
            },
            confidence: row.confidence,
            reasoning: row.reasoning,
            created_at: row.created_at,
        }
    }
}

/// `GET /api/history`
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    /// Always `true`.
    pub success: bool,
    /// Most recent recommendations, newest first.
    pub history: Vec<ApiHistoryItem>,
}

/// `GET /api/schools`
#[derive(Debug, Clone, Serialize)]
pub struct SchoolsResponse {
    /// Always `true`.
    pub success: bool,
    /// City.
    pub city: String,
    /// Schools.
    pub schools: Vec<PointFeature>,
    /// Explanation when the list is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `GET /api/districts`
#[derive(Debug, Clone, Serialize)]
pub struct DistrictsResponse {
    /// Always `true`.
    pub success: bool,
    /// City.
    pub city: String,
    /// Districts with geometry.
    pub districts: Vec<District>,
    /// Explanation when the list is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `GET /api/residential-buildings`
#[derive(Debug, Clone, Serialize)]
pub struct ResidentialResponse {
    /// Always `true`.
    pub success: bool,
    /// City.
    pub city: String,
    /// Residential buildings.
    pub buildings: Vec<PointFeature>,
    /// Number of buildings.
    pub count: usize,
}

/// `GET /api/commercial-places`
#[derive(Debug, Clone, Serialize)]
pub struct CommercialResponse {
    /// Always `true`.
    pub success: bool,
    /// City.
    pub city: String,
    /// Commercial places.
    pub places: Vec<PointFeature>,
    /// Number of places.
    pub count: usize,
}

/// `POST /api/enhanced-school-info` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchoolInfoRequest {
    /// School name as shown on the map.
    pub school_name: Option<String>,
    /// School latitude.
    pub lat: Option<f64>,
    /// School longitude.
    pub lng: Option<f64>,
}

/// `POST /api/enhanced-school-info` response.
#[derive(Debug, Clone, Serialize)]
pub struct SchoolInfoResponse {
    /// Always `true`.
    pub success: bool,
    /// Enriched details.
    pub school_info: SchoolInfo,
}

/// `POST /api/analyze` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeRequest {
    /// District slugs (`leninsky`, ...) or full district names.
    #[serde(default)]
    pub districts: Vec<String>,
}

/// Headline coverage figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatistics {
    /// Schools in the city.
    pub total_facilities: usize,
    /// Average distance to a facility, km.
    pub avg_distance: f64,
    /// Covered share of the population, percent.
    pub coverage_percent: u32,
    /// Estimated population served.
    pub population_served: u64,
}

/// Chart series for the analysis panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisCharts {
    /// Per-district series (4 values).
    pub district: Vec<u32>,
    /// Accessibility buckets (5 values).
    pub accessibility: Vec<u32>,
    /// Travel time series (7 values).
    pub time: Vec<u32>,
}

/// Result of a district coverage analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    /// Headline figures.
    pub statistics: AnalysisStatistics,
    /// Chart series.
    pub charts: AnalysisCharts,
    /// Number of selected districts that were found.
    pub districts_analyzed: usize,
    /// Schools within range of a selected district.
    pub schools_in_area: usize,
}

/// `POST /api/analyze` response.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    /// Always `true`.
    pub success: bool,
    /// Analysis output.
    pub results: AnalysisResults,
}

/// A geocoded city outline.
#[derive(Debug, Clone, Serialize)]
pub struct ApiBoundary {
    /// Nominatim display name.
    pub display_name: String,
    /// City extent.
    pub bbox: BoundingBox,
    /// City outline rings.
    pub polygons: Vec<Ring>,
    /// OSM id.
    pub osm_id: String,
}

/// `GET /api/boundaries`
#[derive(Debug, Clone, Serialize)]
pub struct BoundaryResponse {
    /// Always `true`.
    pub success: bool,
    /// Requested city.
    pub city: String,
    /// The resolved boundary.
    pub boundary: ApiBoundary,
}
