//! City and district boundary resolution.
//!
//! Cities resolve through a single Nominatim search. Districts resolve
//! through the city's [`CityDistrictCatalog`]: each bilingual query variant
//! is searched in turn until the catalog's target count of distinct
//! districts is reached. When that yields nothing, an Overpass query for
//! `admin_level=6` relations inside the city's bounding box is used
//! instead.

use std::collections::BTreeSet;

use building_optimizer_geography::geometry::{centroid, rings_from_geojson, rings_from_overpass_relation};
use building_optimizer_geography_models::catalog::CityDistrictCatalog;
use building_optimizer_geography_models::{BoundingBox, District, Ring};
use rand::Rng;
use serde::Serialize;

use crate::nominatim::{NominatimPlace, choose_city_candidate};
use crate::overpass::{tag, union_query};
use crate::{OsmClient, OsmError};

/// Name used for fallback districts whose relation carries no name tag.
pub const UNKNOWN_DISTRICT: &str = "Unknown district";

/// A geocoded city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityBoundary {
    /// Nominatim display name.
    pub display_name: String,
    /// City extent.
    pub bbox: BoundingBox,
    /// City outline, empty when Nominatim returned no polygon.
    pub polygons: Vec<Ring>,
    /// OSM id of the matched element.
    pub osm_id: String,
}

impl OsmClient {
    /// Geocodes a city to its bounding box and outline.
    ///
    /// # Errors
    ///
    /// * [`OsmError::Network`] / [`OsmError::Status`] if Nominatim cannot
    ///   be reached or rejects the request
    /// * [`OsmError::Parse`] if the response is malformed or the chosen
    ///   candidate has no usable bounding box
    /// * [`OsmError::NotFound`] if the search returns no candidates
    pub async fn try_resolve_city(&self, city: &str) -> Result<CityBoundary, OsmError> {
        log::debug!("Nominatim: looking up city '{city}'");

        let places = self
            .nominatim_search(
                &[
                    ("q", city),
                    ("limit", "1"),
                    ("polygon_geojson", "1"),
                    ("dedupe", "0"),
                ],
                self.config.city_timeout,
            )
            .await?;

        let place = choose_city_candidate(&places).ok_or_else(|| OsmError::NotFound {
            query: city.to_string(),
        })?;

        let bbox = place.bounding_box.ok_or_else(|| OsmError::Parse {
            message: format!("No usable bounding box for '{city}'"),
        })?;

        log::info!(
            "Nominatim: resolved '{city}' to {} ({} {})",
            place.display_name,
            place.osm_type,
            place.place_type
        );

        Ok(CityBoundary {
            display_name: place.display_name.clone(),
            bbox,
            polygons: place.geojson.as_ref().map(rings_from_geojson).unwrap_or_default(),
            osm_id: place.osm_id.clone(),
        })
    }

    /// Geocodes a city to its bounding box, or `None` on any failure.
    pub async fn resolve_city_bbox(&self, city: &str) -> Option<BoundingBox> {
        match self.try_resolve_city(city).await {
            Ok(boundary) => Some(boundary.bbox),
            Err(e) => {
                log::warn!("Could not resolve bounding box for '{city}': {e}");
                None
            }
        }
    }

    /// Resolves a city's districts.
    ///
    /// Uses the city's catalog query variants first and falls back to the
    /// Overpass admin-boundary query when they produce nothing. Returns an
    /// empty list if both paths fail.
    pub async fn resolve_districts(&self, city: &str) -> Vec<District> {
        let catalog = self.catalogs.catalog_for(city);

        let districts = self.resolve_catalog_districts(&catalog).await;
        if !districts.is_empty() {
            log::info!("Resolved {} districts for '{city}' via Nominatim", districts.len());
            return districts;
        }

        log::info!("No catalog districts for '{city}', trying Overpass admin boundaries");
        match self.resolve_admin_districts(city, catalog.fallback_density).await {
            Ok(districts) => {
                log::info!("Resolved {} districts for '{city}' via Overpass", districts.len());
                districts
            }
            Err(e) => {
                log::warn!("Overpass district fallback failed for '{city}': {e}");
                Vec::new()
            }
        }
    }

    async fn resolve_catalog_districts(&self, catalog: &CityDistrictCatalog) -> Vec<District> {
        let mut districts = Vec::new();
        let mut seen = BTreeSet::new();

        for query in &catalog.query_variants {
            if seen.len() >= catalog.target_district_count {
                break;
            }

            log::debug!("Nominatim: searching district '{query}'");
            let places = match self
                .nominatim_search(
                    &[
                        ("q", query.as_str()),
                        ("limit", "3"),
                        ("polygon_geojson", "1"),
                        ("addressdetails", "1"),
                        ("extratags", "1"),
                    ],
                    self.config.district_timeout,
                )
                .await
            {
                Ok(places) => places,
                Err(e) => {
                    log::warn!("District query '{query}' failed: {e}");
                    continue;
                }
            };

            let district = first_new_district(catalog, &places, &seen, &mut rand::rng());
            if let Some(district) = district {
                log::debug!(
                    "Added district '{}' with {} polygons",
                    district.name,
                    district.polygons.len()
                );
                seen.insert(district.name.clone());
                districts.push(district);
            }
        }

        districts
    }

    async fn resolve_admin_districts(
        &self,
        city: &str,
        density: u32,
    ) -> Result<Vec<District>, OsmError> {
        let bbox = self.try_resolve_city(city).await?.bbox;
        let query = admin_boundary_query(&bbox, self.config.boundary_timeout.as_secs());
        let elements = self.overpass_query(&query, self.config.boundary_timeout).await?;

        Ok(elements
            .iter()
            .filter_map(|element| admin_district(element, density))
            .collect())
    }
}

/// Picks the first administrative-boundary candidate whose normalized name
/// has not been seen and whose geometry yields at least one ring.
///
/// Density comes from the catalog table, else a uniform draw from the
/// catalog's random range.
pub fn first_new_district<R: Rng + ?Sized>(
    catalog: &CityDistrictCatalog,
    places: &[NominatimPlace],
    seen: &BTreeSet<String>,
    rng: &mut R,
) -> Option<District> {
    places
        .iter()
        .filter(|place| place.is_admin_boundary())
        .find_map(|place| {
            let name = catalog.normalize_name(&place.display_name, &place.name);
            if name.is_empty() || seen.contains(&name) {
                return None;
            }

            let polygons = rings_from_geojson(place.geojson.as_ref()?);
            if polygons.is_empty() {
                return None;
            }

            let [lo, hi] = catalog.random_density_range;
            let population_density = catalog
                .density_for(&name)
                .unwrap_or_else(|| rng.random_range(lo.min(hi)..=hi.max(lo)));

            Some(District {
                centroid: centroid(&polygons),
                name,
                population_density,
                polygons,
                external_id: place.osm_id.clone(),
            })
        })
}

/// Overpass query for district-level (`admin_level=6`) relations in a box.
#[must_use]
pub fn admin_boundary_query(bbox: &BoundingBox, timeout_secs: u64) -> String {
    union_query(
        timeout_secs,
        &[format!(
            "relation[\"boundary\"=\"administrative\"][\"admin_level\"=\"6\"]{}",
            bbox.overpass_filter()
        )],
        "out geom",
    )
}

/// Converts an `out geom` relation into a district with a fixed density.
///
/// Relations without tags or without any usable ring are skipped.
#[must_use]
pub fn admin_district(element: &serde_json::Value, density: u32) -> Option<District> {
    if element.get("type")?.as_str()? != "relation" {
        return None;
    }
    if element.get("tags").is_none() {
        return None;
    }

    let polygons = rings_from_overpass_relation(element);
    if polygons.is_empty() {
        return None;
    }

    let name = tag(element, "name:ru")
        .or_else(|| tag(element, "name"))
        .unwrap_or(UNKNOWN_DISTRICT)
        .to_string();

    let external_id = element
        .get("id")
        .map(|id| id.as_str().map_or_else(|| id.to_string(), ToString::to_string))
        .unwrap_or_default();

    Some(District {
        centroid: centroid(&polygons),
        name,
        population_density: density,
        polygons,
        external_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use building_optimizer_geography::registry::CatalogRegistry;
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn bishkek() -> CityDistrictCatalog {
        CatalogRegistry::embedded().catalog_for("Бишкек")
    }

    fn square() -> serde_json::Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[74.5, 42.8], [74.6, 42.8], [74.6, 42.9], [74.5, 42.9], [74.5, 42.8]]],
        })
    }

    fn boundary_place(name: &str, display_name: &str) -> NominatimPlace {
        NominatimPlace {
            osm_type: "relation".to_string(),
            osm_id: "42".to_string(),
            class: "boundary".to_string(),
            place_type: "administrative".to_string(),
            admin_level: Some("6".to_string()),
            name: name.to_string(),
            display_name: display_name.to_string(),
            bounding_box: None,
            geojson: Some(square()),
        }
    }

    #[test]
    fn accepts_boundary_and_assigns_catalog_density() {
        let places = vec![boundary_place("Октябрь району", "Октябрь району, Бишкек, Кыргызстан")];
        let district =
            first_new_district(&bishkek(), &places, &BTreeSet::new(), &mut StdRng::seed_from_u64(1))
                .unwrap();

        assert_eq!(district.name, "Октябрьский район");
        assert_eq!(district.population_density, 3800);
        assert_eq!(district.polygons.len(), 1);
        assert_eq!(district.external_id, "42");
        assert!((district.centroid.lat - 42.84).abs() < 1e-9);
    }

    #[test]
    fn skips_non_boundaries_and_seen_names() {
        let mut suburb = boundary_place("Октябрьский район", "Октябрьский район, Бишкек");
        suburb.osm_type = "node".to_string();
        let places = vec![
            suburb,
            boundary_place("Октябрьский район", "Октябрьский район, Бишкек"),
        ];

        let mut seen = BTreeSet::new();
        assert!(first_new_district(&bishkek(), &places, &seen, &mut StdRng::seed_from_u64(1)).is_some());

        seen.insert("Октябрьский район".to_string());
        assert!(first_new_district(&bishkek(), &places, &seen, &mut StdRng::seed_from_u64(1)).is_none());
    }

    #[test]
    fn unmatched_names_pass_through_with_random_density() {
        let places = vec![boundary_place("Центральный", "Центральный, Бишкек")];
        let district =
            first_new_district(&bishkek(), &places, &BTreeSet::new(), &mut StdRng::seed_from_u64(9))
                .unwrap();

        assert_eq!(district.name, "Центральный");
        assert!((3000..=5000).contains(&district.population_density));
    }

    #[test]
    fn candidate_without_geometry_is_skipped() {
        let mut place = boundary_place("Ленинский район", "Ленинский район, Бишкек");
        place.geojson = Some(json!({"type": "Point", "coordinates": [74.5, 42.8]}));
        assert!(
            first_new_district(&bishkek(), &[place], &BTreeSet::new(), &mut StdRng::seed_from_u64(1))
                .is_none()
        );
    }

    #[test]
    fn admin_boundary_query_uses_overpass_box_order() {
        let bbox = BoundingBox::new(42.75, 42.95, 74.45, 74.75).unwrap();
        let query = admin_boundary_query(&bbox, 60);
        assert!(query.starts_with("[out:json][timeout:60];"));
        assert!(query.contains(
            "relation[\"boundary\"=\"administrative\"][\"admin_level\"=\"6\"](42.75,74.45,42.95,74.75);"
        ));
        assert!(query.ends_with("out geom;"));
    }

    #[test]
    fn admin_district_names_and_density() {
        let element = json!({
            "type": "relation",
            "id": 7,
            "tags": {"name": "Alatoo", "name:ru": "Алатоо"},
            "members": [{"type": "way", "geometry": [
                {"lat": 42.0, "lon": 74.0},
                {"lat": 42.0, "lon": 74.2},
                {"lat": 42.2, "lon": 74.2},
            ]}],
        });
        let district = admin_district(&element, 4000).unwrap();
        assert_eq!(district.name, "Алатоо");
        assert_eq!(district.population_density, 4000);
        assert_eq!(district.external_id, "7");

        let unnamed = json!({
            "type": "relation",
            "id": 8,
            "tags": {},
            "members": [{"geometry": [
                {"lat": 1.0, "lon": 1.0},
                {"lat": 1.0, "lon": 2.0},
                {"lat": 2.0, "lon": 2.0},
            ]}],
        });
        assert_eq!(admin_district(&unnamed, 4000).unwrap().name, UNKNOWN_DISTRICT);

        let untagged = json!({"type": "relation", "id": 9, "geometry": []});
        assert!(admin_district(&untagged, 4000).is_none());
    }

    const OCTOBER_RESPONSE: &str = r#"[{
        "osm_type": "relation",
        "osm_id": 1001,
        "class": "boundary",
        "type": "administrative",
        "name": "Октябрьский район",
        "display_name": "Октябрьский район, Бишкек, Кыргызстан",
        "geojson": {"type": "Polygon", "coordinates": [[[74.5, 42.8], [74.6, 42.8], [74.6, 42.9], [74.5, 42.8]]]}
    }]"#;

    #[tokio::test]
    async fn variants_resolving_to_the_same_district_are_deduplicated() {
        let url = test_support::serve("200 OK", OCTOBER_RESPONSE).await;
        let catalog: CityDistrictCatalog = toml::de::from_str(
            r#"
id = "test"
city = "Бишкек"
target_district_count = 4
query_variants = ["Октябрьский район, Бишкек", "Октябрь району, Бишкек"]

[[districts]]
name = "Октябрьский район"
patterns = ["Октябрьский район", "Октябрь району"]

[[densities]]
key = "Октябрьский"
density = 3800
"#,
        )
        .unwrap();
        let client = test_support::client(&url, CatalogRegistry::from_catalogs(vec![catalog]));

        let districts = client.resolve_districts("Бишкек").await;
        assert_eq!(districts.len(), 1);
        assert_eq!(districts[0].name, "Октябрьский район");
        assert_eq!(districts[0].population_density, 3800);
    }

    #[tokio::test]
    async fn nominatim_500_resolves_nothing() {
        let url = test_support::serve("500 Internal Server Error", "").await;
        let client = test_support::client(&url, CatalogRegistry::embedded());

        assert!(client.resolve_city_bbox("Бишкек").await.is_none());
        assert!(matches!(
            client.try_resolve_city("Бишкек").await,
            Err(OsmError::Status { status: 500 })
        ));
        assert!(client.resolve_districts("Бишкек").await.is_empty());
    }

    #[tokio::test]
    async fn empty_search_is_not_found() {
        let url = test_support::serve("200 OK", "[]").await;
        let client = test_support::client(&url, CatalogRegistry::embedded());

        assert!(matches!(
            client.try_resolve_city("Atlantis").await,
            Err(OsmError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn garbage_body_is_parse_error() {
        let url = test_support::serve("200 OK", "<html>busy</html>").await;
        let client = test_support::client(&url, CatalogRegistry::embedded());

        assert!(matches!(
            client.try_resolve_city("Бишкек").await,
            Err(OsmError::Parse { .. })
        ));
    }
}
