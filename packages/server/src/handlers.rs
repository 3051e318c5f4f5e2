//! HTTP handler functions for the building optimizer API.

use actix_web::{HttpResponse, web};
use building_optimizer_ai::school_info::describe_school;
use building_optimizer_ai::suggestion::{DistrictSummary, suggest_location as ask_for_location};
use building_optimizer_database::history::{self, NewBuildingRequest};
use building_optimizer_database::population;
use building_optimizer_geography::heatmap;
use building_optimizer_geography_models::{BuildingType, FeatureCategory};
use building_optimizer_server_models::{
    AnalyzeRequest, AnalyzeResponse, ApiBoundary, ApiHealth, ApiHistoryItem, ApiSuggestion,
    BoundaryResponse, CityQuery, CommercialResponse, DistrictsResponse, EnhancedHeatmapResponse,
    HeatmapStats, HistoryResponse, PopulationHeatmapResponse, ResidentialResponse,
    SchoolInfoRequest, SchoolInfoResponse, SchoolsResponse, SuggestLocationRequest,
    SuggestLocationResponse,
};

use crate::error::ApiError;
use crate::{AppState, analysis};

/// Number of recommendations returned by `GET /api/history`.
pub const HISTORY_LIMIT: u32 = 20;

fn city_or_default(state: &AppState, city: Option<&str>) -> String {
    city.map(str::trim)
        .filter(|c| !c.is_empty())
        .map_or_else(|| state.default_city.clone(), ToString::to_string)
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/population-heatmap`
///
/// Resolves the city's districts and reconciles them with the population
/// store. Falls back to stored rows when resolution yields nothing.
pub async fn population_heatmap(
    state: web::Data<AppState>,
    query: web::Query<CityQuery>,
) -> Result<HttpResponse, ApiError> {
    let city = city_or_default(&state, query.city.as_deref());

    let districts = state.osm.resolve_districts(&city).await;
    let entries = population::reconcile(state.db.as_ref(), &city, &districts).await?;

    Ok(HttpResponse::Ok().json(PopulationHeatmapResponse {
        success: true,
        city,
        districts: entries,
    }))
}

/// `GET /api/enhanced-heatmap`
///
/// Every map layer for a city plus the synthesized heatmap.
pub async fn enhanced_heatmap(
    state: web::Data<AppState>,
    query: web::Query<CityQuery>,
) -> HttpResponse {
    let city = city_or_default(&state, query.city.as_deref());

    let districts = state.osm.resolve_districts(&city).await;
    let residential = state
        .osm
        .fetch_city_features(&city, FeatureCategory::Residential)
        .await;
    let commercial = state
        .osm
        .fetch_city_features(&city, FeatureCategory::Commercial)
        .await;
    let schools = state
        .osm
        .fetch_city_features(&city, FeatureCategory::School)
        .await;

    let heatmap_data = heatmap::synthesize(&districts, &residential, &commercial, &mut rand::rng());

    let stats = HeatmapStats {
        districts_count: districts.len(),
        residential_count: residential.len(),
        commercial_count: commercial.len(),
        schools_count: schools.len(),
        heatmap_points: heatmap_data.len(),
    };
    log::info!("Enhanced heatmap for {city}: {stats:?}");

    HttpResponse::Ok().json(EnhancedHeatmapResponse {
        success: true,
        city,
        districts,
        residential_buildings: residential,
        commercial_places: commercial,
        schools,
        heatmap_data,
        stats,
    })
}

/// `POST /api/suggest-location`
///
/// Asks the model for a placement and records it in the history.
pub async fn suggest_location(
    state: web::Data<AppState>,
    body: web::Json<SuggestLocationRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let raw_type = body
        .building_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("building_type is required".to_string()))?;
    let building_type: BuildingType = raw_type
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown building type '{raw_type}'")))?;

    let city = city_or_default(&state, body.city.as_deref());

    let districts = state.osm.resolve_districts(&city).await;
    let entries = population::reconcile(state.db.as_ref(), &city, &districts).await?;

    let summaries: Vec<DistrictSummary> = entries
        .iter()
        .map(|entry| DistrictSummary {
            name: entry.district_name.clone(),
            population_density: entry.population_density,
            lat: entry.lat,
            lng: entry.lng,
        })
        .collect();

    let suggestion = ask_for_location(state.ai.as_deref(), building_type, &city, &summaries).await;

    let density = summaries
        .iter()
        .find(|d| d.name == suggestion.district)
        .map_or(0.0, |d| f64::from(d.population_density));

    history::record_request(
        state.db.as_ref(),
        &NewBuildingRequest {
            building_type: building_type.to_string(),
            city: city.clone(),
            suggested_lat: suggestion.coordinates.lat,
            suggested_lng: suggestion.coordinates.lng,
            population_density: density,
            confidence: suggestion.confidence,
            reasoning: suggestion.reasoning.clone(),
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(SuggestLocationResponse {
        success: true,
        suggestion: ApiSuggestion {
            district: suggestion.district,
            coordinates: suggestion.coordinates,
            confidence: suggestion.confidence,
            reasoning: suggestion.reasoning,
            building_type,
            city,
        },
    }))
}

/// `GET /api/history`
pub async fn history(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let rows = history::recent_requests(state.db.as_ref(), HISTORY_LIMIT).await?;

    Ok(HttpResponse::Ok().json(HistoryResponse {
        success: true,
        history: rows.into_iter().map(ApiHistoryItem::from).collect(),
    }))
}

/// `GET /api/schools`
pub async fn schools(state: web::Data<AppState>, query: web::Query<CityQuery>) -> HttpResponse {
    let city = city_or_default(&state, query.city.as_deref());
    let schools = state
        .osm
        .fetch_city_features(&city, FeatureCategory::School)
        .await;

    let message = schools.is_empty().then(|| {
        format!("No schools found in '{city}', or the map service could not be reached.")
    });

    HttpResponse::Ok().json(SchoolsResponse {
        success: true,
        city,
        schools,
        message,
    })
}

/// `GET /api/districts`
pub async fn districts(state: web::Data<AppState>, query: web::Query<CityQuery>) -> HttpResponse {
    let city = city_or_default(&state, query.city.as_deref());
    let districts = state.osm.resolve_districts(&city).await;

    let message = districts.is_empty().then(|| {
        format!("No districts found in '{city}', or the map service could not be reached.")
    });

    HttpResponse::Ok().json(DistrictsResponse {
        success: true,
        city,
        districts,
        message,
    })
}

/// `GET /api/residential-buildings`
pub async fn residential_buildings(
    state: web::Data<AppState>,
    query: web::Query<CityQuery>,
) -> HttpResponse {
    let city = city_or_default(&state, query.city.as_deref());
    let buildings = state
        .osm
        .fetch_city_features(&city, FeatureCategory::Residential)
        .await;

    HttpResponse::Ok().json(ResidentialResponse {
        success: true,
        city,
        count: buildings.len(),
        buildings,
    })
}

/// `GET /api/commercial-places`
pub async fn commercial_places(
    state: web::Data<AppState>,
    query: web::Query<CityQuery>,
) -> HttpResponse {
    let city = city_or_default(&state, query.city.as_deref());
    let places = state
        .osm
        .fetch_city_features(&city, FeatureCategory::Commercial)
        .await;

    HttpResponse::Ok().json(CommercialResponse {
        success: true,
        city,
        count: places.len(),
        places,
    })
}

/// `POST /api/enhanced-school-info`
pub async fn enhanced_school_info(
    state: web::Data<AppState>,
    body: web::Json<SchoolInfoRequest>,
) -> Result<HttpResponse, ApiError> {
    let name = body
        .school_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("school_name is required".to_string()))?;

    let school_info = describe_school(
        state.ai.as_deref(),
        state.school_registry.as_ref(),
        name,
        body.lat.zip(body.lng),
    )
    .await;

    Ok(HttpResponse::Ok().json(SchoolInfoResponse {
        success: true,
        school_info,
    }))
}

/// `POST /api/analyze`
///
/// Coverage figures for a selection of the default city's districts.
pub async fn analyze(
    state: web::Data<AppState>,
    body: web::Json<AnalyzeRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.districts.is_empty() {
        return Err(ApiError::BadRequest(
            "Select at least one district to analyze".to_string(),
        ));
    }

    let city = state.default_city.clone();
    let catalog = state.osm.catalogs().catalog_for(&city);

    let districts = state.osm.resolve_districts(&city).await;
    let schools = state
        .osm
        .fetch_city_features(&city, FeatureCategory::School)
        .await;

    let results = analysis::analyze(
        &catalog,
        &body.districts,
        &districts,
        &schools,
        &mut rand::rng(),
    );

    Ok(HttpResponse::Ok().json(AnalyzeResponse {
        success: true,
        results,
    }))
}

/// `GET /api/boundaries`
///
/// Typed city lookup: unlike the list endpoints, upstream failures are
/// reported instead of being flattened into an empty result.
pub async fn boundaries(
    state: web::Data<AppState>,
    query: web::Query<CityQuery>,
) -> Result<HttpResponse, ApiError> {
    let city = city_or_default(&state, query.city.as_deref());
    let boundary = state.osm.try_resolve_city(&city).await?;

    Ok(HttpResponse::Ok().json(BoundaryResponse {
        success: true,
        city,
        boundary: ApiBoundary {
            display_name: boundary.display_name,
            bbox: boundary.bbox,
            polygons: boundary.polygons,
            osm_id: boundary.osm_id,
        },
    }))
}
