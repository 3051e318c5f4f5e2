//! Compile-time registry of `OpenStreetMap` service configurations.
//!
//! Each upstream service is defined in a TOML file under `services/`.
//! The registry embeds these at compile time and exposes them via
//! [`all_services`] and [`service`].

use std::time::Duration;

use serde::Deserialize;

/// An upstream map service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct OsmService {
    /// Unique identifier (e.g., `"nominatim"`, `"overpass"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Token-bucket settings for the service's host.
    pub rate_limit: RateLimitConfig,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Token-bucket settings: `burst` requests may go out back to back, after
/// which one more is allowed every `interval_ms`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket capacity.
    pub burst: u32,
    /// Refill interval for a single token, in milliseconds.
    pub interval_ms: u64,
}

impl RateLimitConfig {
    /// Refill interval as a [`Duration`].
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim free-text search.
    Nominatim {
        /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
        base_url: String,
        /// HTTP timeout for city lookups.
        city_timeout_secs: u64,
        /// HTTP timeout for district lookups.
        district_timeout_secs: u64,
    },
    /// Overpass QL interpreter.
    Overpass {
        /// Interpreter endpoint (e.g., `"https://overpass-api.de/api/interpreter"`).
        base_url: String,
        /// Query and HTTP timeout for the admin-boundary fallback.
        boundary_timeout_secs: u64,
    },
}

impl OsmService {
    /// Returns the provider's base URL regardless of variant.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim { base_url, .. }
            | ProviderConfig::Overpass { base_url, .. } => base_url,
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("nominatim", include_str!("../services/nominatim.toml")),
    ("overpass", include_str!("../services/overpass.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all upstream service configurations.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<OsmService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse OSM service '{name}': {e}"))
        })
        .collect()
}

/// Returns the service with the given id.
///
/// # Panics
///
/// Panics if no embedded service has that id.
#[must_use]
pub fn service(id: &str) -> OsmService {
    all_services()
        .into_iter()
        .find(|s| s.id == id)
        .unwrap_or_else(|| panic!("No OSM service registered with id '{id}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_services() {
        assert_eq!(all_services().len(), EXPECTED_SERVICE_COUNT);
    }

    #[test]
    fn service_ids_are_unique() {
        let mut seen = BTreeSet::new();
        for svc in &all_services() {
            assert!(seen.insert(svc.id.clone()), "Duplicate service ID: {}", svc.id);
        }
    }

    #[test]
    fn all_services_have_required_fields() {
        for svc in &all_services() {
            assert!(!svc.name.is_empty(), "Service {} has empty name", svc.id);
            assert!(!svc.user_agent.is_empty(), "Service {} has no user agent", svc.id);
            assert!(!svc.base_url().is_empty(), "Service {} has empty base_url", svc.id);
            assert!(svc.rate_limit.burst > 0, "Service {} has zero burst", svc.id);
        }
    }

    #[test]
    fn registered_ids_resolve() {
        assert!(matches!(
            service("nominatim").provider,
            ProviderConfig::Nominatim { city_timeout_secs: 10, district_timeout_secs: 15, .. }
        ));
        assert!(matches!(
            service("overpass").provider,
            ProviderConfig::Overpass { boundary_timeout_secs: 60, .. }
        ));
    }
}
