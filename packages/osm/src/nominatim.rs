//! Nominatim / `OpenStreetMap` search client.
//!
//! Only the free-text `q=` search is used: once for city lookups and once
//! per district query variant. Nominatim has strict rate limits: **1
//! request per second** on the public instance. Callers wait on the
//! [`RateLimiter`](crate::rate_limit::RateLimiter) before calling
//! [`search`].
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use building_optimizer_geography_models::BoundingBox;

use crate::OsmError;

/// One search result, reduced to the fields the resolver reads.
#[derive(Debug, Clone, PartialEq)]
pub struct NominatimPlace {
    /// `node`, `way` or `relation`.
    pub osm_type: String,
    /// OSM element id, kept as an opaque string.
    pub osm_id: String,
    /// Main tag key (e.g., `boundary`, `place`).
    pub class: String,
    /// Main tag value (e.g., `administrative`, `city`).
    pub place_type: String,
    /// Administrative level, when Nominatim reports one.
    pub admin_level: Option<String>,
    /// Short name.
    pub name: String,
    /// Full comma-separated display name.
    pub display_name: String,
    /// Parsed `boundingbox`, `None` if missing or degenerate.
    pub bounding_box: Option<BoundingBox>,
    /// Raw `geojson` geometry when `polygon_geojson=1` was requested.
    pub geojson: Option<serde_json::Value>,
}

impl NominatimPlace {
    /// Returns `true` for `relation` + `boundary=administrative` results.
    #[must_use]
    pub fn is_admin_boundary(&self) -> bool {
        self.osm_type == "relation" && self.class == "boundary" && self.place_type == "administrative"
    }

    /// Returns `true` for settlement-type results (`city`, `town`,
    /// `village`).
    #[must_use]
    pub fn is_settlement(&self) -> bool {
        matches!(self.place_type.as_str(), "city" | "town" | "village")
    }

    fn from_json(item: &serde_json::Value) -> Option<Self> {
        let text = |key: &str| {
            item.get(key)
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let osm_id = match item.get("osm_id")? {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.clone(),
            _ => return None,
        };

        let admin_level = item
            .get("admin_level")
            .or_else(|| item.get("extratags").and_then(|tags| tags.get("admin_level")))
            .and_then(scalar_to_string);

        let bounding_box = item
            .get("boundingbox")
            .and_then(serde_json::Value::as_array)
            .and_then(|parts| {
                let strings = parts.iter().filter_map(scalar_to_string).collect::<Vec<_>>();
                BoundingBox::from_nominatim(&strings)
            });

        Some(Self {
            osm_type: text("osm_type"),
            osm_id,
            class: text("class"),
            place_type: text("type"),
            admin_level,
            name: text("name"),
            display_name: text("display_name"),
            bounding_box,
            geojson: item.get("geojson").filter(|g| !g.is_null()).cloned(),
        })
    }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Runs a Nominatim search with the given query parameters.
///
/// `format=json` is always added.
///
/// # Errors
///
/// Returns [`OsmError::Network`] if the request fails or times out,
/// [`OsmError::Status`] for a non-2xx response, and [`OsmError::Parse`]
/// if the body is not a JSON array.
pub async fn search(
    client: &reqwest::Client,
    base_url: &str,
    params: &[(&str, &str)],
    timeout: Duration,
) -> Result<Vec<NominatimPlace>, OsmError> {
    let resp = client
        .get(base_url)
        .query(&[("format", "json")])
        .query(params)
        .timeout(timeout)
        .send()
        .await
        .map_err(OsmError::from_transport)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(OsmError::Status {
            status: status.as_u16(),
        });
    }

    let body = resp.text().await.map_err(OsmError::from_transport)?;
    let body: serde_json::Value = serde_json::from_str(&body).map_err(|e| OsmError::Parse {
        message: format!("Nominatim response is not JSON: {e}"),
    })?;

    parse_response(&body)
}

/// Parses a Nominatim JSON response. Entries without an `osm_id` are
/// dropped.
///
/// # Errors
///
/// Returns [`OsmError::Parse`] if the body is not an array.
pub fn parse_response(body: &serde_json::Value) -> Result<Vec<NominatimPlace>, OsmError> {
    let results = body.as_array().ok_or_else(|| OsmError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    Ok(results.iter().filter_map(NominatimPlace::from_json).collect())
}

/// Picks the best candidate for a city lookup.
///
/// Prefers a region-level administrative relation (`admin_level=4`), then
/// a settlement, then the first result.
#[must_use]
pub fn choose_city_candidate(places: &[NominatimPlace]) -> Option<&NominatimPlace> {
    places
        .iter()
        .find(|p| p.is_admin_boundary() && p.admin_level.as_deref() == Some("4"))
        .or_else(|| places.iter().find(|p| p.is_settlement()))
        .or_else(|| places.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn place(osm_type: &str, class: &str, place_type: &str, admin_level: Option<&str>) -> NominatimPlace {
        NominatimPlace {
            osm_type: osm_type.to_string(),
            osm_id: "1".to_string(),
            class: class.to_string(),
            place_type: place_type.to_string(),
            admin_level: admin_level.map(ToString::to_string),
            name: String::new(),
            display_name: String::new(),
            bounding_box: None,
            geojson: None,
        }
    }

    #[test]
    fn parses_nominatim_result() {
        let body = json!([{
            "osm_type": "relation",
            "osm_id": 1_885_432,
            "class": "boundary",
            "type": "administrative",
            "name": "Бишкек",
            "display_name": "Бишкек, Кыргызстан",
            "boundingbox": ["42.7500", "42.9500", "74.4500", "74.7500"],
            "extratags": {"admin_level": "4"},
            "geojson": {"type": "Polygon", "coordinates": []}
        }]);
        let places = parse_response(&body).unwrap();
        assert_eq!(places.len(), 1);

        let city = &places[0];
        assert_eq!(city.osm_id, "1885432");
        assert!(city.is_admin_boundary());
        assert_eq!(city.admin_level.as_deref(), Some("4"));
        assert!((city.bounding_box.unwrap().north - 42.95).abs() < 1e-9);
        assert!(city.geojson.is_some());
    }

    #[test]
    fn parses_nominatim_empty() {
        assert!(parse_response(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn non_array_is_parse_error() {
        assert!(matches!(
            parse_response(&json!({"error": "oops"})),
            Err(OsmError::Parse { .. })
        ));
    }

    #[test]
    fn degenerate_box_is_dropped() {
        let body = json!([{
            "osm_type": "node",
            "osm_id": "5",
            "boundingbox": ["42.9", "42.9", "74.4", "74.7"],
        }]);
        let places = parse_response(&body).unwrap();
        assert!(places[0].bounding_box.is_none());
    }

    #[test]
    fn prefers_region_boundary_then_settlement() {
        let places = vec![
            place("node", "place", "suburb", None),
            place("node", "place", "city", None),
            place("relation", "boundary", "administrative", Some("4")),
        ];
        assert_eq!(choose_city_candidate(&places).unwrap().admin_level.as_deref(), Some("4"));

        let places = vec![
            place("node", "place", "suburb", None),
            place("node", "place", "town", None),
        ];
        assert_eq!(choose_city_candidate(&places).unwrap().place_type, "town");

        let places = vec![place("way", "highway", "primary", None)];
        assert_eq!(choose_city_candidate(&places).unwrap().place_type, "primary");

        assert!(choose_city_candidate(&[]).is_none());
    }
}
