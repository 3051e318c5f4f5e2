#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `OpenStreetMap` access for the building optimizer.
//!
//! Two public services are used, configured via TOML files in `services/`:
//!
//! 1. **Nominatim** geocodes a city to its bounding box and polygon, and
//!    resolves named districts from each city's query variants.
//! 2. **Overpass** runs spatial queries for schools, residential buildings and
//!    commercial places inside a bounding box, plus the admin-boundary
//!    fallback when Nominatim finds no districts.
//!
//! Every outbound request waits on a per-host token bucket
//! ([`rate_limit::RateLimiter`]). List-returning operations recover from
//! upstream failures by logging and returning an empty list; the
//! `try_*` variants surface the typed [`OsmError`].

pub mod boundary;
pub mod features;
pub mod nominatim;
pub mod overpass;
pub mod rate_limit;
pub mod service_registry;

use std::time::Duration;

use building_optimizer_geography::registry::CatalogRegistry;
use thiserror::Error;

use crate::rate_limit::RateLimiter;
use crate::service_registry::{ProviderConfig, RateLimitConfig};

/// Errors from `OpenStreetMap` service calls.
#[derive(Debug, Error)]
pub enum OsmError {
    /// Building the HTTP client failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request could not be sent or timed out.
    #[error("Network error: {message}")]
    Network {
        /// Description of the transport failure.
        message: String,
    },

    /// The response body could not be interpreted.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The lookup succeeded but matched nothing.
    #[error("Not found: {query}")]
    NotFound {
        /// The query that matched nothing.
        query: String,
    },

    /// The upstream service answered with a non-success status.
    #[error("Upstream returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
}

impl OsmError {
    /// Classifies a `reqwest` error raised while sending a request or
    /// reading its body.
    #[must_use]
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Parse {
                message: e.to_string(),
            }
        } else {
            Self::Network {
                message: e.to_string(),
            }
        }
    }
}

/// Endpoints, timeouts and throttling for [`OsmClient`].
#[derive(Debug, Clone)]
pub struct OsmConfig {
    /// Nominatim search endpoint.
    pub nominatim_url: String,
    /// Overpass interpreter endpoint.
    pub overpass_url: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Timeout for city lookups.
    pub city_timeout: Duration,
    /// Timeout for district lookups.
    pub district_timeout: Duration,
    /// Query and HTTP timeout for the admin-boundary fallback.
    pub boundary_timeout: Duration,
    /// Throttling for the Nominatim host.
    pub nominatim_rate: RateLimitConfig,
    /// Throttling for the Overpass host.
    pub overpass_rate: RateLimitConfig,
}

impl Default for OsmConfig {
    fn default() -> Self {
        let nominatim = service_registry::service("nominatim");
        let overpass = service_registry::service("overpass");

        let (nominatim_url, city_timeout, district_timeout) = match &nominatim.provider {
            ProviderConfig::Nominatim {
                base_url,
                city_timeout_secs,
                district_timeout_secs,
            } => (
                base_url.clone(),
                Duration::from_secs(*city_timeout_secs),
                Duration::from_secs(*district_timeout_secs),
            ),
            ProviderConfig::Overpass { .. } => {
                panic!("Service 'nominatim' is not configured as a Nominatim provider")
            }
        };

        let (overpass_url, boundary_timeout) = match &overpass.provider {
            ProviderConfig::Overpass {
                base_url,
                boundary_timeout_secs,
            } => (base_url.clone(), Duration::from_secs(*boundary_timeout_secs)),
            ProviderConfig::Nominatim { .. } => {
                panic!("Service 'overpass' is not configured as an Overpass provider")
            }
        };

        Self {
            nominatim_url,
            overpass_url,
            user_agent: nominatim.user_agent,
            city_timeout,
            district_timeout,
            boundary_timeout,
            nominatim_rate: nominatim.rate_limit,
            overpass_rate: overpass.rate_limit,
        }
    }
}

impl OsmConfig {
    /// Embedded service defaults with `NOMINATIM_URL`, `OVERPASS_URL` and
    /// `OSM_USER_AGENT` overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("NOMINATIM_URL") {
            config.nominatim_url = url;
        }
        if let Ok(url) = std::env::var("OVERPASS_URL") {
            config.overpass_url = url;
        }
        if let Ok(agent) = std::env::var("OSM_USER_AGENT") {
            config.user_agent = agent;
        }
        config
    }
}

/// Client for the Nominatim and Overpass services.
///
/// Holds one `reqwest` connection pool, the per-host rate limiter, and the
/// city district catalogs used by [`boundary`] resolution. Intended to be
/// shared through application state.
#[derive(Debug)]
pub struct OsmClient {
    http: reqwest::Client,
    config: OsmConfig,
    limiter: RateLimiter,
    catalogs: CatalogRegistry,
}

impl OsmClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`OsmError::Http`] if the HTTP client cannot be built.
    pub fn new(config: OsmConfig, catalogs: CatalogRegistry) -> Result<Self, OsmError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        let mut limiter = RateLimiter::new();
        limiter.register(
            &config.overpass_url,
            config.overpass_rate.burst,
            config.overpass_rate.interval(),
        );
        limiter.register(
            &config.nominatim_url,
            config.nominatim_rate.burst,
            config.nominatim_rate.interval(),
        );

        log::info!(
            "OSM client: nominatim={} overpass={} ({} city catalogs)",
            config.nominatim_url,
            config.overpass_url,
            catalogs.catalogs().len()
        );

        Ok(Self {
            http,
            config,
            limiter,
            catalogs,
        })
    }

    /// The client's configuration.
    #[must_use]
    pub const fn config(&self) -> &OsmConfig {
        &self.config
    }

    /// The city district catalogs.
    #[must_use]
    pub const fn catalogs(&self) -> &CatalogRegistry {
        &self.catalogs
    }

    async fn nominatim_search(
        &self,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Vec<nominatim::NominatimPlace>, OsmError> {
        self.limiter.acquire(&self.config.nominatim_url).await;
        nominatim::search(&self.http, &self.config.nominatim_url, params, timeout).await
    }

    async fn overpass_query(
        &self,
        query: &str,
        timeout: Duration,
    ) -> Result<Vec<serde_json::Value>, OsmError> {
        self.limiter.acquire(&self.config.overpass_url).await;
        overpass::run_query(&self.http, &self.config.overpass_url, query, timeout).await
    }
}
