//! Polygon ring normalization and centroid computation.
//!
//! The map services hand back polygon vertices in two conventions:
//! keyed objects (`{"lat": .., "lon": ..}` from Overpass, `{"lat": ..,
//! "lng": ..}` from stored data) and `[lon, lat]` numeric pairs from
//! `GeoJSON`. Everything here folds both into [`Ring`]s of [`LatLng`].

use building_optimizer_geography_models::{LatLng, Ring};

/// Normalizes a raw JSON vertex list into a [`Ring`].
///
/// Entries may be keyed objects with `lat` and `lng` or `lon`, or numeric
/// arrays ordered `[lon, lat, ...]`. The two conventions may be mixed.
/// Malformed entries are skipped. Returns `None` if the value is not an
/// array or fewer than three usable vertices remain.
#[must_use]
pub fn normalize_ring(raw: &serde_json::Value) -> Option<Ring> {
    let entries = raw.as_array()?;
    let points = entries.iter().filter_map(parse_vertex).collect();
    Ring::new(points)
}

fn parse_vertex(entry: &serde_json::Value) -> Option<LatLng> {
    match entry {
        serde_json::Value::Object(map) => {
            let lat = map.get("lat").and_then(serde_json::Value::as_f64)?;
            let lng = map
                .get("lng")
                .or_else(|| map.get("lon"))
                .and_then(serde_json::Value::as_f64)?;
            Some(LatLng::new(lat, lng))
        }
        serde_json::Value::Array(pair) if pair.len() >= 2 => {
            let lng = pair[0].as_f64()?;
            let lat = pair[1].as_f64()?;
            Some(LatLng::new(lat, lng))
        }
        _ => None,
    }
}

/// Arithmetic mean of every vertex of every ring.
///
/// Not area-weighted. Returns `(0.0, 0.0)` when there are no vertices;
/// see [`LatLng::is_sentinel`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centroid(polygons: &[Ring]) -> LatLng {
    let (count, lat_sum, lng_sum) = polygons
        .iter()
        .flat_map(Ring::points)
        .fold((0_usize, 0.0_f64, 0.0_f64), |(n, lat, lng), p| {
            (n + 1, lat + p.lat, lng + p.lng)
        });

    if count == 0 {
        return LatLng::new(0.0, 0.0);
    }

    LatLng::new(lat_sum / count as f64, lng_sum / count as f64)
}

/// Extracts every usable ring from a `GeoJSON` `Polygon` or
/// `MultiPolygon` geometry object.
///
/// Interior rings are returned alongside exterior rings. Any other
/// geometry type, or a value that is not valid `GeoJSON`, yields an empty
/// list.
#[must_use]
pub fn rings_from_geojson(geometry: &serde_json::Value) -> Vec<Ring> {
    let parsed = match geojson::Geometry::from_json_value(geometry.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::debug!("Ignoring unparseable GeoJSON geometry: {e}");
            return Vec::new();
        }
    };

    match parsed.value {
        geojson::Value::Polygon(rings) => rings
            .iter()
            .filter_map(|r| ring_from_positions(r))
            .collect(),
        geojson::Value::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .filter_map(|r| ring_from_positions(r))
            .collect(),
        _ => {
            log::debug!("Ignoring non-polygon GeoJSON geometry");
            Vec::new()
        }
    }
}

fn ring_from_positions(positions: &[geojson::Position]) -> Option<Ring> {
    let points = positions
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| LatLng::new(p[1], p[0]))
        .collect();
    Ring::new(points)
}

/// Extracts rings from an Overpass relation returned with `out geom`.
///
/// Uses the relation's own `geometry` vertex list when present, otherwise
/// one ring per member that carries a `geometry` list.
#[must_use]
pub fn rings_from_overpass_relation(element: &serde_json::Value) -> Vec<Ring> {
    if let Some(ring) = element.get("geometry").and_then(normalize_ring) {
        return vec![ring];
    }

    element
        .get("members")
        .and_then(serde_json::Value::as_array)
        .map(|members| {
            members
                .iter()
                .filter_map(|member| member.get("geometry"))
                .filter_map(normalize_ring)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ring(points: &[(f64, f64)]) -> Ring {
        Ring::new(points.iter().map(|&(lat, lng)| LatLng::new(lat, lng)).collect()).unwrap()
    }

    #[test]
    fn normalizes_keyed_points() {
        let raw = json!([
            {"lat": 42.1, "lng": 74.1},
            {"lat": 42.2, "lon": 74.2},
            {"lat": 42.3, "lng": 74.3},
        ]);
        let ring = normalize_ring(&raw).unwrap();
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.points()[1], LatLng::new(42.2, 74.2));
    }

    #[test]
    fn normalizes_lon_lat_pairs_into_lat_lng_order() {
        let raw = json!([[74.1, 42.1], [74.2, 42.2], [74.3, 42.3], [74.1, 42.1]]);
        let ring = normalize_ring(&raw).unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.points()[0], LatLng::new(42.1, 74.1));
    }

    #[test]
    fn skips_malformed_entries() {
        let raw = json!([
            [74.1, 42.1],
            {"lat": 42.2},
            "garbage",
            [74.3],
            {"lat": 42.4, "lng": 74.4},
            [74.5, 42.5, 800.0],
        ]);
        let ring = normalize_ring(&raw).unwrap();
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn too_few_points_is_none() {
        assert!(normalize_ring(&json!([[74.1, 42.1], [74.2, 42.2]])).is_none());
        assert!(normalize_ring(&json!({"lat": 1.0, "lng": 2.0})).is_none());
        assert!(normalize_ring(&json!([])).is_none());
    }

    #[test]
    fn centroid_of_square() {
        let square = ring(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0)]);
        let c = centroid(&[square]);
        assert!((c.lat - 1.0).abs() < 1e-12);
        assert!((c.lng - 1.0).abs() < 1e-12);
    }

    #[test]
    fn centroid_averages_across_rings() {
        let a = ring(&[(0.0, 0.0), (0.0, 0.0), (0.0, 0.0)]);
        let b = ring(&[(3.0, 3.0), (3.0, 3.0), (3.0, 3.0)]);
        let c = centroid(&[a, b]);
        assert!((c.lat - 1.5).abs() < 1e-12);
        assert!((c.lng - 1.5).abs() < 1e-12);
    }

    #[test]
    fn centroid_of_nothing_is_sentinel() {
        assert!(centroid(&[]).is_sentinel());
    }

    #[test]
    fn extracts_polygon_rings() {
        let geometry = json!({
            "type": "Polygon",
            "coordinates": [[[74.0, 42.0], [74.1, 42.0], [74.1, 42.1], [74.0, 42.0]]],
        });
        let rings = rings_from_geojson(&geometry);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].points()[2], LatLng::new(42.1, 74.1));
    }

    #[test]
    fn extracts_multipolygon_rings() {
        let geometry = json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[74.0, 42.0], [74.1, 42.0], [74.1, 42.1], [74.0, 42.0]]],
                [[[75.0, 43.0], [75.1, 43.0], [75.1, 43.1], [75.0, 43.0]]],
            ],
        });
        assert_eq!(rings_from_geojson(&geometry).len(), 2);
    }

    #[test]
    fn point_geometry_has_no_rings() {
        let geometry = json!({"type": "Point", "coordinates": [74.0, 42.0]});
        assert!(rings_from_geojson(&geometry).is_empty());
        assert!(rings_from_geojson(&json!(null)).is_empty());
    }

    #[test]
    fn overpass_relation_uses_member_geometry() {
        let element = json!({
            "type": "relation",
            "id": 1,
            "members": [
                {"type": "way", "role": "outer", "geometry": [
                    {"lat": 42.0, "lon": 74.0},
                    {"lat": 42.0, "lon": 74.1},
                    {"lat": 42.1, "lon": 74.1},
                ]},
                {"type": "node", "role": "admin_centre"},
            ],
        });
        let rings = rings_from_overpass_relation(&element);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].points()[1], LatLng::new(42.0, 74.1));
    }

    #[test]
    fn overpass_relation_prefers_top_level_geometry() {
        let element = json!({
            "geometry": [
                {"lat": 1.0, "lon": 1.0},
                {"lat": 1.0, "lon": 2.0},
                {"lat": 2.0, "lon": 2.0},
            ],
            "members": [],
        });
        let rings = rings_from_overpass_relation(&element);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].points()[0], LatLng::new(1.0, 1.0));
    }
}
