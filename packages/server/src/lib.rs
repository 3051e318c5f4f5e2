#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the building optimizer.
//!
//! Serves the JSON API under `/api` and the map frontend from `static/`.
//! District boundaries and point features come from `OpenStreetMap`,
//! district densities are reconciled into a `SQLite` store at
//! `data/building_optimizer.db`, and placement recommendations come from
//! the configured LLM provider (or a fixed fallback when none is set up).

pub mod analysis;
pub mod error;
mod handlers;

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use building_optimizer_ai::providers::{LlmProvider, create_provider_from_env};
use building_optimizer_ai::school_info::EducationRegistry;
use building_optimizer_database::{db_path_from_env, open_db};
use building_optimizer_geography::registry::CatalogRegistry;
use building_optimizer_osm::{OsmClient, OsmConfig};
use switchy_database::Database;

/// City used when a request names none.
pub const DEFAULT_CITY: &str = "Бишкек";

/// Directory the frontend is served from.
pub const STATIC_DIR: &str = "static";

/// Shared application state.
pub struct AppState {
    /// Population and history store.
    pub db: Arc<dyn Database>,
    /// Nominatim/Overpass client with its rate limiter and city catalogs.
    pub osm: OsmClient,
    /// LLM provider, `None` when no credentials are configured.
    pub ai: Option<Box<dyn LlmProvider>>,
    /// Education registry used to enrich schools.
    pub school_registry: Option<EducationRegistry>,
    /// City used when a request names none.
    pub default_city: String,
}

/// Registers the `/api` routes and the JSON body error handler.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(handlers::health))
                .route("/population-heatmap", web::get().to(handlers::population_heatmap))
                .route("/enhanced-heatmap", web::get().to(handlers::enhanced_heatmap))
                .route("/suggest-location", web::post().to(handlers::suggest_location))
                .route("/history", web::get().to(handlers::history))
                .route("/schools", web::get().to(handlers::schools))
                .route("/districts", web::get().to(handlers::districts))
                .route(
                    "/residential-buildings",
                    web::get().to(handlers::residential_buildings),
                )
                .route("/commercial-places", web::get().to(handlers::commercial_places))
                .route(
                    "/enhanced-school-info",
                    web::post().to(handlers::enhanced_school_info),
                )
                .route("/analyze", web::post().to(handlers::analyze))
                .route("/boundaries", web::get().to(handlers::boundaries)),
        );
}

/// Builds the application state from the environment.
///
/// # Errors
///
/// Returns an `std::io::Error` if the store cannot be opened, a city
/// catalog fails to load, or the HTTP client cannot be built.
pub async fn state_from_env() -> std::io::Result<AppState> {
    let db_path = db_path_from_env();
    log::info!("Opening database at {}...", db_path.display());
    let db = open_db(&db_path).await.map_err(std::io::Error::other)?;

    let catalogs = CatalogRegistry::from_env().map_err(std::io::Error::other)?;
    let osm = OsmClient::new(OsmConfig::from_env(), catalogs).map_err(std::io::Error::other)?;

    let ai = match create_provider_from_env() {
        Ok(provider) => {
            log::info!("Using AI provider: {}", provider.name());
            Some(provider)
        }
        Err(e) => {
            log::warn!("AI recommendations disabled: {e}");
            None
        }
    };

    let default_city = std::env::var("DEFAULT_CITY").unwrap_or_else(|_| DEFAULT_CITY.to_string());

    Ok(AppState {
        db: Arc::from(db),
        osm,
        ai,
        school_registry: EducationRegistry::from_env(),
        default_city,
    })
}

/// Starts the building optimizer API server.
///
/// Opens the store, builds the map and AI clients, and runs the Actix-Web
/// HTTP server until shutdown. The caller provides the async runtime
/// (e.g. via `#[actix_web::main]`) and initializes logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if startup fails, the HTTP server
/// fails to bind, or it encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let state = web::Data::new(state_from_env().await?);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    if !Path::new(STATIC_DIR).is_dir() {
        log::warn!("Static directory '{STATIC_DIR}' not found; only the API will be served");
    }

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure_api)
            .service(Files::new("/", STATIC_DIR).index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_web::http::StatusCode;
    use actix_web::test;
    use building_optimizer_ai::AiError;
    use building_optimizer_database::population::{self, PopulationRecord};
    use building_optimizer_osm::service_registry::RateLimitConfig;
    use serde_json::{Value, json};

    use super::*;

    struct CannedProvider(&'static str);

    #[async_trait::async_trait]
    impl LlmProvider for CannedProvider {
        async fn complete(&self, _prompt: &str) -> Result<String, AiError> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &'static str {
            "canned"
        }
    }

    /// An address nothing listens on, so every upstream call fails fast.
    fn unreachable_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/")
    }

    async fn state(ai: Option<Box<dyn LlmProvider>>) -> web::Data<AppState> {
        let path = std::env::temp_dir().join(format!(
            "building-optimizer-server-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        let db = open_db(&path).await.unwrap();

        let url = unreachable_url();
        let fast = RateLimitConfig {
            burst: 100,
            interval_ms: 1,
        };
        let config = OsmConfig {
            nominatim_url: url.clone(),
            overpass_url: url,
            user_agent: "building-optimizer-tests".to_string(),
            city_timeout: Duration::from_secs(2),
            district_timeout: Duration::from_secs(2),
            boundary_timeout: Duration::from_secs(2),
            nominatim_rate: fast,
            overpass_rate: fast,
        };

        web::Data::new(AppState {
            db: Arc::from(db),
            osm: OsmClient::new(config, CatalogRegistry::embedded()).unwrap(),
            ai,
            school_registry: None,
            default_city: DEFAULT_CITY.to_string(),
        })
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(App::new().app_data($state.clone()).configure(configure_api)).await
        };
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let state = state(None).await;
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn suggest_location_validates_building_type() {
        let state = state(None).await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/suggest-location")
            .set_json(json!({"city": "Бишкек"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);

        let req = test::TestRequest::post()
            .uri("/api/suggest-location")
            .set_json(json!({"building_type": "castle"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn malformed_json_is_a_bad_request() {
        let state = state(None).await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/analyze")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    }

    #[actix_web::test]
    async fn suggestion_without_provider_falls_back_and_is_recorded() {
        let state = state(None).await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/suggest-location")
            .set_json(json!({"building_type": "school"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["suggestion"]["district"], "No data");
        assert_eq!(body["suggestion"]["building_type"], "school");
        assert_eq!(body["suggestion"]["city"], DEFAULT_CITY);

        let req = test::TestRequest::get().uri("/api/history").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let history = body["history"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["building_type"], "School");
    }

    #[actix_web::test]
    async fn suggestion_uses_stored_districts_and_provider() {
        let provider = CannedProvider(
            "```json\n{\"district\": \"Центр\", \"coordinates\": {\"lat\": 42.8756, \"lng\": 74.5977}, \
             \"confidence\": 9, \"reasoning\": \"Highest density\"}\n```",
        );
        let state = state(Some(Box::new(provider))).await;
        population::replace_all(
            state.db.as_ref(),
            &[PopulationRecord {
                district_name: "Центр".to_string(),
                city: DEFAULT_CITY.to_string(),
                lat: 42.8756,
                lng: 74.5977,
                population_density: 5200,
            }],
        )
        .await
        .unwrap();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/suggest-location")
            .set_json(json!({"building_type": "park", "city": "  "}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["suggestion"]["district"], "Центр");
        assert_eq!(body["suggestion"]["confidence"], 9.0);

        let rows = building_optimizer_database::history::recent_requests(state.db.as_ref(), 5)
            .await
            .unwrap();
        assert!((rows[0].population_density - 5200.0).abs() < f64::EPSILON);
    }

    #[actix_web::test]
    async fn population_heatmap_serves_stored_rows_when_upstream_fails() {
        let state = state(None).await;
        population::replace_all(
            state.db.as_ref(),
            &[PopulationRecord {
                district_name: "Восток-5".to_string(),
                city: DEFAULT_CITY.to_string(),
                lat: 42.84,
                lng: 74.64,
                population_density: 2100,
            }],
        )
        .await
        .unwrap();
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/population-heatmap")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["city"], DEFAULT_CITY);
        assert_eq!(body["districts"][0]["district_name"], "Восток-5");
        assert_eq!(body["districts"][0]["geometry"], json!([]));
    }

    #[actix_web::test]
    async fn empty_lists_carry_messages() {
        let state = state(None).await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/schools?city=Almaty")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["city"], "Almaty");
        assert_eq!(body["schools"], json!([]));
        assert!(body["message"].is_string());

        let req = test::TestRequest::get()
            .uri("/api/residential-buildings")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 0);
    }

    #[actix_web::test]
    async fn enhanced_heatmap_reports_zero_counts_offline() {
        let state = state(None).await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/enhanced-heatmap")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["stats"]["districts_count"], 0);
        assert_eq!(body["stats"]["heatmap_points"], 0);
    }

    #[actix_web::test]
    async fn school_info_requires_a_name() {
        let state = state(None).await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/enhanced-school-info")
            .set_json(json!({"school_name": ""}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/enhanced-school-info")
            .set_json(json!({"school_name": "Lyceum 61", "lat": 42.87, "lng": 74.6}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["school_info"]["has_registry_data"], false);
    }

    #[actix_web::test]
    async fn analyze_requires_districts() {
        let state = state(None).await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/analyze")
            .set_json(json!({"districts": []}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/analyze")
            .set_json(json!({"districts": ["leninsky"]}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["results"]["districts_analyzed"], 0);
        assert_eq!(body["results"]["charts"]["time"].as_array().unwrap().len(), 7);
    }

    #[actix_web::test]
    async fn boundaries_report_upstream_failure() {
        let state = state(None).await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/boundaries")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }
}
