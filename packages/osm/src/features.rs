//! Point-feature fetching from Overpass.
//!
//! One query per [`FeatureCategory`], bounded by a city's bounding box and
//! returned with `out center` so ways and relations collapse to a single
//! coordinate. Each element becomes a [`PointFeature`] with a category
//! intensity used by the heatmap synthesizer.

use std::time::Duration;

use building_optimizer_geography_models::{BoundingBox, FeatureCategory, PointFeature};

use crate::overpass::{element_position, tag, union_query};
use crate::{OsmClient, OsmError};

/// Name given to schools without a `name` tag.
pub const UNKNOWN_SCHOOL: &str = "Unknown school";

/// Intensity for commercial subtypes not listed in [`commercial_intensity`].
pub const DEFAULT_COMMERCIAL_INTENSITY: f64 = 0.5;

/// Overpass query timeout for a category, also used as the HTTP timeout.
#[must_use]
pub const fn query_timeout(category: FeatureCategory) -> Duration {
    match category {
        FeatureCategory::School => Duration::from_secs(90),
        FeatureCategory::Residential | FeatureCategory::Commercial => Duration::from_secs(120),
    }
}

/// Heatmap intensity of a commercial subtype.
#[must_use]
pub fn commercial_intensity(subtype: &str) -> f64 {
    match subtype {
        "mall" => 1.0,
        "marketplace" => 0.9,
        "supermarket" => 0.8,
        "hospital" => 0.7,
        "restaurant" => 0.6,
        "cafe" => 0.4,
        _ => DEFAULT_COMMERCIAL_INTENSITY,
    }
}

/// Heatmap intensity of a residential `building` tag value.
#[must_use]
pub fn residential_intensity(building: &str) -> f64 {
    if building == "apartments" { 0.8 } else { 0.5 }
}

/// Builds the Overpass query for one category inside `bbox`.
#[must_use]
pub fn build_query(bbox: &BoundingBox, category: FeatureCategory) -> String {
    let area = bbox.overpass_filter();
    let selectors: &[(&str, &str, &str)] = match category {
        FeatureCategory::School => &[
            ("node", "amenity", "school"),
            ("way", "amenity", "school"),
            ("relation", "amenity", "school"),
        ],
        FeatureCategory::Residential => &[
            ("node", "building", "residential"),
            ("node", "building", "apartments"),
            ("way", "building", "residential"),
            ("way", "building", "apartments"),
            ("relation", "building", "residential"),
            ("relation", "building", "apartments"),
        ],
        FeatureCategory::Commercial => &[
            ("node", "shop", "mall"),
            ("node", "shop", "supermarket"),
            ("node", "amenity", "marketplace"),
            ("node", "amenity", "restaurant"),
            ("node", "amenity", "cafe"),
            ("node", "amenity", "hospital"),
            ("node", "amenity", "bank"),
            ("way", "shop", "mall"),
            ("way", "shop", "supermarket"),
            ("way", "amenity", "marketplace"),
            ("way", "amenity", "hospital"),
            ("relation", "shop", "mall"),
        ],
    };

    let statements = selectors
        .iter()
        .map(|(kind, key, value)| format!("{kind}[\"{key}\"=\"{value}\"]{area}"))
        .collect::<Vec<_>>();

    union_query(query_timeout(category).as_secs(), &statements, "out center")
}

/// Normalizes one Overpass element into a feature of the given category.
///
/// Returns `None` for elements without coordinates.
#[must_use]
pub fn feature_from_element(element: &serde_json::Value, category: FeatureCategory) -> Option<PointFeature> {
    let (lat, lng) = element_position(element)?;

    let (subtype, intensity, name) = match category {
        FeatureCategory::School => (
            "school".to_string(),
            1.0,
            Some(tag(element, "name").unwrap_or(UNKNOWN_SCHOOL).to_string()),
        ),
        FeatureCategory::Residential => {
            let building = tag(element, "building").unwrap_or("residential");
            (
                building.to_string(),
                residential_intensity(building),
                tag(element, "name").map(ToString::to_string),
            )
        }
        FeatureCategory::Commercial => {
            let subtype = tag(element, "amenity")
                .or_else(|| tag(element, "shop"))
                .unwrap_or_default();
            let name = tag(element, "name")
                .map(ToString::to_string)
                .or_else(|| Some(title_case(subtype)).filter(|t| !t.is_empty()));
            (subtype.to_string(), commercial_intensity(subtype), name)
        }
    };

    Some(PointFeature {
        lat,
        lng,
        category,
        subtype,
        intensity,
        name,
    })
}

fn title_case(value: &str) -> String {
    value
        .split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl OsmClient {
    /// Fetches features of one category inside `bbox`.
    ///
    /// # Errors
    ///
    /// Returns [`OsmError`] if the Overpass request fails or its response
    /// cannot be parsed.
    pub async fn try_fetch_features(
        &self,
        bbox: &BoundingBox,
        category: FeatureCategory,
    ) -> Result<Vec<PointFeature>, OsmError> {
        let query = build_query(bbox, category);
        let elements = self.overpass_query(&query, query_timeout(category)).await?;

        let features = elements
            .iter()
            .filter_map(|element| feature_from_element(element, category))
            .collect::<Vec<_>>();

        log::info!(
            "Overpass: {} {category} features from {} elements",
            features.len(),
            elements.len()
        );

        Ok(features)
    }

    /// Fetches features of one category inside `bbox`, or an empty list on
    /// any failure.
    pub async fn fetch_features(&self, bbox: &BoundingBox, category: FeatureCategory) -> Vec<PointFeature> {
        match self.try_fetch_features(bbox, category).await {
            Ok(features) => features,
            Err(e) => {
                log::warn!("Overpass {category} query failed: {e}");
                Vec::new()
            }
        }
    }

    /// Resolves the city's bounding box and fetches features inside it.
    /// An unresolved city yields an empty list.
    pub async fn fetch_city_features(&self, city: &str, category: FeatureCategory) -> Vec<PointFeature> {
        let Some(bbox) = self.resolve_city_bbox(city).await else {
            return Vec::new();
        };
        self.fetch_features(&bbox, category).await
    }
}
