//! TOML schema for per-city district catalogs.
//!
//! A catalog lists the geocoder query variants that find a city's
//! districts, the patterns that fold bilingual spellings into one
//! canonical district name, and the name-substring → density table used
//! when authoritative population counts are unavailable.

use serde::{Deserialize, Serialize};

/// District resolution settings for a single city, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityDistrictCatalog {
    /// Unique catalog identifier (e.g., `"bishkek"`).
    pub id: String,
    /// Canonical city name as used in requests and the population store.
    pub city: String,
    /// Other spellings of the city name that select this catalog.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Stop querying once this many distinct districts are found.
    pub target_district_count: usize,
    /// Free-text geocoder queries, tried in order.
    pub query_variants: Vec<String>,
    /// Canonical districts and the spellings that map onto them.
    #[serde(default)]
    pub districts: Vec<DistrictAlias>,
    /// Name-substring → density table, checked in order.
    #[serde(default)]
    pub densities: Vec<DensityRule>,
    /// Inclusive range for the random density assigned to unmatched names.
    #[serde(default = "default_random_density_range")]
    pub random_density_range: [u32; 2],
    /// Density assigned to every district found by the admin-boundary
    /// fallback query.
    #[serde(default = "default_fallback_density")]
    pub fallback_density: u32,
}

/// A canonical district name and the spellings that resolve to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistrictAlias {
    /// Canonical name (e.g., `"Октябрьский район"`).
    pub name: String,
    /// ASCII identifier used by API clients (e.g., `"oktyabrsky"`).
    #[serde(default)]
    pub slug: Option<String>,
    /// Case-insensitive substrings that identify this district in a
    /// geocoder display name.
    pub patterns: Vec<String>,
}

/// Density assigned to any district whose name contains `key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityRule {
    /// Substring to look for in the normalized district name.
    pub key: String,
    /// People per square kilometre.
    pub density: u32,
}

const fn default_random_density_range() -> [u32; 2] {
    [3000, 5000]
}

const fn default_fallback_density() -> u32 {
    4000
}

impl CityDistrictCatalog {
    /// An empty catalog for a city with no curated data. Resolution goes
    /// straight to the admin-boundary fallback.
    #[must_use]
    pub fn empty(city: &str) -> Self {
        Self {
            id: city.to_lowercase(),
            city: city.to_string(),
            aliases: Vec::new(),
            target_district_count: 0,
            query_variants: Vec::new(),
            districts: Vec::new(),
            densities: Vec::new(),
            random_density_range: default_random_density_range(),
            fallback_density: default_fallback_density(),
        }
    }

    /// Returns `true` if `name` is this catalog's city or one of its
    /// aliases (case-insensitive).
    #[must_use]
    pub fn matches_city(&self, name: &str) -> bool {
        let needle = name.trim().to_lowercase();
        std::iter::once(&self.city)
            .chain(&self.aliases)
            .any(|candidate| candidate.to_lowercase() == needle)
    }

    /// Folds a geocoder result into a canonical district name.
    ///
    /// Searches `display_name` and `name` together for any configured
    /// pattern and returns the owning district's canonical name. Falls
    /// back to `name` unchanged.
    #[must_use]
    pub fn normalize_name(&self, display_name: &str, name: &str) -> String {
        let haystack = format!("{display_name} {name}").to_lowercase();

        self.districts
            .iter()
            .find(|district| {
                district
                    .patterns
                    .iter()
                    .any(|pattern| haystack.contains(&pattern.to_lowercase()))
            })
            .map_or_else(|| name.to_string(), |district| district.name.clone())
    }

    /// Resolves a district slug to its canonical name. Unknown slugs are
    /// returned unchanged, so callers may also pass full names.
    #[must_use]
    pub fn resolve_slug<'a>(&'a self, slug: &'a str) -> &'a str {
        self.districts
            .iter()
            .find(|district| district.slug.as_deref() == Some(slug))
            .map_or(slug, |district| district.name.as_str())
    }

    /// Looks up the configured density for a normalized district name.
    #[must_use]
    pub fn density_for(&self, name: &str) -> Option<u32> {
        self.densities
            .iter()
            .find(|rule| name.contains(&rule.key))
            .map(|rule| rule.density)
    }
}
