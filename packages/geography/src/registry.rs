//! Registry of per-city district catalogs.
//!
//! Catalogs for supported cities are embedded at compile time via
//! `include_str!`. Operators can add cities without rebuilding by pointing
//! `CITY_CATALOG_PATH` at a TOML file or a directory of TOML files; those
//! catalogs take precedence over embedded ones for the same city.

use std::path::Path;

use building_optimizer_geography_models::catalog::CityDistrictCatalog;

use crate::CatalogError;

/// Number of embedded city catalogs. Enforced by a test.
#[cfg(test)]
const EXPECTED_CATALOG_COUNT: usize = 1;

/// Embedded TOML catalog definitions.
const CATALOG_TOMLS: &[(&str, &str)] = &[("bishkek", include_str!("../cities/bishkek.toml"))];

/// Returns all embedded city catalogs.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn embedded_catalogs() -> Vec<CityDistrictCatalog> {
    CATALOG_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse city catalog '{name}': {e}"))
        })
        .collect()
}

/// Lookup table from city name (or alias) to its district catalog.
#[derive(Debug, Clone)]
pub struct CatalogRegistry {
    catalogs: Vec<CityDistrictCatalog>,
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self::embedded()
    }
}

impl CatalogRegistry {
    /// A registry holding only the embedded catalogs.
    #[must_use]
    pub fn embedded() -> Self {
        Self {
            catalogs: embedded_catalogs(),
        }
    }

    /// Builds a registry from explicit catalogs.
    #[must_use]
    pub const fn from_catalogs(catalogs: Vec<CityDistrictCatalog>) -> Self {
        Self { catalogs }
    }

    /// Embedded catalogs plus any found at `CITY_CATALOG_PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the configured path cannot be read or a
    /// file in it is not a valid catalog.
    pub fn from_env() -> Result<Self, CatalogError> {
        let mut registry = Self::embedded();
        if let Ok(path) = std::env::var("CITY_CATALOG_PATH") {
            registry.load_path(Path::new(&path))?;
        }
        Ok(registry)
    }

    /// Loads a catalog file, or every `.toml` file in a directory.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the path cannot be read or a file fails
    /// to parse.
    pub fn load_path(&mut self, path: &Path) -> Result<usize, CatalogError> {
        if !path.is_dir() {
            self.load_file(path)?;
            return Ok(1);
        }

        let mut files = std::fs::read_dir(path)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect::<Vec<_>>();
        files.sort();

        for file in &files {
            self.load_file(file)?;
        }

        Ok(files.len())
    }

    fn load_file(&mut self, path: &Path) -> Result<(), CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog: CityDistrictCatalog =
            toml::de::from_str(&content).map_err(|source| CatalogError::Toml {
                path: path.display().to_string(),
                source,
            })?;

        log::info!(
            "Loaded city catalog '{}' for {} from {}",
            catalog.id,
            catalog.city,
            path.display()
        );

        self.catalogs.retain(|existing| existing.id != catalog.id);
        self.catalogs.insert(0, catalog);
        Ok(())
    }

    /// Finds the catalog for a city name or alias.
    #[must_use]
    pub fn find(&self, city: &str) -> Option<&CityDistrictCatalog> {
        self.catalogs.iter().find(|c| c.matches_city(city))
    }

    /// The catalog for a city, or an empty one that sends resolution
    /// straight to the admin-boundary fallback.
    #[must_use]
    pub fn catalog_for(&self, city: &str) -> CityDistrictCatalog {
        self.find(city)
            .cloned()
            .unwrap_or_else(|| CityDistrictCatalog::empty(city))
    }

    /// All registered catalogs.
    #[must_use]
    pub fn catalogs(&self) -> &[CityDistrictCatalog] {
        &self.catalogs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_embedded_catalogs() {
        let catalogs = embedded_catalogs();
        assert_eq!(
            catalogs.len(),
            EXPECTED_CATALOG_COUNT,
            "Expected {EXPECTED_CATALOG_COUNT} city catalogs, found {}. \
             Update EXPECTED_CATALOG_COUNT after adding/removing catalogs.",
            catalogs.len()
        );
    }

    #[test]
    fn catalog_ids_are_unique() {
        let mut seen = BTreeSet::new();
        for catalog in &embedded_catalogs() {
            assert!(seen.insert(catalog.id.clone()), "Duplicate id {}", catalog.id);
        }
    }

    #[test]
    fn catalogs_are_internally_consistent() {
        for catalog in &embedded_catalogs() {
            assert!(!catalog.city.is_empty(), "{} has empty city", catalog.id);
            assert!(
                catalog.target_district_count <= catalog.districts.len(),
                "{} targets more districts than it names",
                catalog.id
            );
            let [lo, hi] = catalog.random_density_range;
            assert!(lo <= hi, "{} has inverted density range", catalog.id);
        }
    }

    #[test]
    fn bishkek_catalog_matches_known_tables() {
        let registry = CatalogRegistry::embedded();
        let catalog = registry.find("Bishkek").unwrap();

        assert_eq!(catalog.target_district_count, 4);
        assert_eq!(catalog.query_variants.len(), 8);
        assert_eq!(catalog.density_for("Первомайский район"), Some(5200));
        assert_eq!(catalog.density_for("Свердловский район"), Some(3000));
        assert_eq!(
            catalog.normalize_name("Биринчи май району, Бишкек", "Биринчи май району"),
            "Первомайский район"
        );
    }

    #[test]
    fn unknown_city_gets_empty_catalog() {
        let registry = CatalogRegistry::embedded();
        let catalog = registry.catalog_for("Алматы");
        assert_eq!(catalog.city, "Алматы");
        assert!(catalog.query_variants.is_empty());
        assert_eq!(catalog.fallback_density, 4000);
    }

    #[test]
    fn loaded_catalog_overrides_embedded() {
        let dir = std::env::temp_dir().join(format!(
            "building-optimizer-catalogs-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("bishkek.toml"),
            "id = \"bishkek\"\ncity = \"Бишкек\"\ntarget_district_count = 1\nquery_variants = [\"x\"]\n",
        )
        .unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let mut registry = CatalogRegistry::embedded();
        assert_eq!(registry.load_path(&dir).unwrap(), 1);
        assert_eq!(registry.catalogs().len(), 1);
        assert_eq!(registry.find("Бишкек").unwrap().target_district_count, 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn invalid_catalog_file_is_an_error() {
        let path = std::env::temp_dir().join(format!(
            "building-optimizer-bad-catalog-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "city = 5").unwrap();

        let mut registry = CatalogRegistry::embedded();
        assert!(matches!(
            registry.load_path(&path),
            Err(CatalogError::Toml { .. })
        ));

        std::fs::remove_file(&path).unwrap();
    }
}
