//! Weighted point-cloud synthesis for the population heatmap layer.
//!
//! Each district contributes its centroid plus a ring of randomly
//! scattered satellites whose weight fades with distance. Residential and
//! commercial features contribute one jittered point each. The generator
//! is injected so callers (and tests) control the randomness.

use std::f64::consts::TAU;

use building_optimizer_geography_models::{District, HeatmapPoint, PointFeature};
use rand::Rng;

/// Satellites emitted around each district centroid.
pub const SATELLITES_PER_DISTRICT: usize = 15;

/// Minimum satellite distance from the centroid, in degrees.
pub const MIN_SATELLITE_DISTANCE: f64 = 0.005;

/// Maximum satellite distance from the centroid, in degrees.
pub const MAX_SATELLITE_DISTANCE: f64 = 0.025;

/// Lower bound applied to every emitted weight.
pub const MIN_WEIGHT: f64 = 0.1;

const MAX_CENTROID_WEIGHT: f64 = 2.0;
const MAX_RESIDENTIAL_WEIGHT: f64 = 2.0;
const MAX_COMMERCIAL_WEIGHT: f64 = 2.5;

/// Synthesizes heatmap points from districts and point features.
///
/// Output order is every district (centroid, then its satellites), then
/// residential features, then commercial features. Every weight is at
/// least [`MIN_WEIGHT`]. Two generators seeded identically produce
/// identical output.
#[must_use]
pub fn synthesize<R: Rng + ?Sized>(
    districts: &[District],
    residential: &[PointFeature],
    commercial: &[PointFeature],
    rng: &mut R,
) -> Vec<HeatmapPoint> {
    let mut points = Vec::with_capacity(
        districts.len() * (SATELLITES_PER_DISTRICT + 1) + residential.len() + commercial.len(),
    );

    for district in districts {
        push_district(&mut points, district, rng);
    }

    for feature in residential {
        let weight = (feature.intensity * rng.random_range(0.6..1.4)).min(MAX_RESIDENTIAL_WEIGHT);
        points.push(point(feature.lat, feature.lng, weight));
    }

    for feature in commercial {
        let weight = (feature.intensity * rng.random_range(0.8..1.3)).min(MAX_COMMERCIAL_WEIGHT);
        points.push(point(feature.lat, feature.lng, weight));
    }

    log::debug!(
        "Synthesized {} heatmap points from {} districts, {} residential, {} commercial",
        points.len(),
        districts.len(),
        residential.len(),
        commercial.len()
    );

    points
}

fn push_district<R: Rng + ?Sized>(points: &mut Vec<HeatmapPoint>, district: &District, rng: &mut R) {
    let center = district.centroid;
    let centroid_weight = (f64::from(district.population_density) / 1000.0).min(MAX_CENTROID_WEIGHT);

    points.push(point(center.lat, center.lng, centroid_weight));

    for _ in 0..SATELLITES_PER_DISTRICT {
        let distance = rng.random_range(MIN_SATELLITE_DISTANCE..=MAX_SATELLITE_DISTANCE);
        let bearing = rng.random_range(0.0..TAU);
        let falloff = 1.0 - distance / MAX_SATELLITE_DISTANCE;
        let weight = centroid_weight * falloff * rng.random_range(0.3..0.9);

        points.push(point(
            center.lat + distance * bearing.cos(),
            center.lng + distance * bearing.sin(),
            weight,
        ));
    }
}

fn point(lat: f64, lng: f64, weight: f64) -> HeatmapPoint {
    HeatmapPoint {
        lat,
        lng,
        weight: weight.max(MIN_WEIGHT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use building_optimizer_geography_models::{FeatureCategory, LatLng};
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    fn district(density: u32) -> District {
        District {
            name: "Ленинский район".to_string(),
            centroid: LatLng::new(42.87, 74.59),
            population_density: density,
            polygons: vec![],
            external_id: "1".to_string(),
        }
    }

    fn feature(category: FeatureCategory, intensity: f64) -> PointFeature {
        PointFeature {
            lat: 42.8,
            lng: 74.6,
            category,
            subtype: "apartments".to_string(),
            intensity,
            name: None,
        }
    }

    #[test]
    fn single_district_yields_centroid_and_satellites() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = synthesize(&[district(4000)], &[], &[], &mut rng);

        assert_eq!(points.len(), SATELLITES_PER_DISTRICT + 1);
        assert!((points[0].weight - 2.0).abs() < f64::EPSILON);
        assert!((points[0].lat - 42.87).abs() < f64::EPSILON);
    }

    #[test]
    fn satellites_stay_within_max_distance() {
        let mut rng = StdRng::seed_from_u64(11);
        let points = synthesize(&[district(3000)], &[], &[], &mut rng);
        let center = points[0];

        for satellite in &points[1..] {
            let d = (satellite.lat - center.lat).hypot(satellite.lng - center.lng);
            assert!(d <= MAX_SATELLITE_DISTANCE + 1e-9, "distance {d}");
            assert!(d >= MIN_SATELLITE_DISTANCE - 1e-9, "distance {d}");
            assert!(satellite.weight <= center.weight);
        }
    }

    #[test]
    fn every_weight_is_floored() {
        let mut rng = StdRng::seed_from_u64(3);
        let residential = vec![feature(FeatureCategory::Residential, 0.0); 5];
        let commercial = vec![feature(FeatureCategory::Commercial, 0.01); 5];
        let points = synthesize(&[district(0), district(50)], &residential, &commercial, &mut rng);

        assert_eq!(points.len(), 2 * 16 + 10);
        assert!(points.iter().all(|p| p.weight >= MIN_WEIGHT));
    }

    #[test]
    fn feature_weights_are_capped() {
        let mut rng = StdRng::seed_from_u64(5);
        let residential = vec![feature(FeatureCategory::Residential, 10.0); 20];
        let commercial = vec![feature(FeatureCategory::Commercial, 10.0); 20];
        let points = synthesize(&[], &residential, &commercial, &mut rng);

        assert!(points[..20].iter().all(|p| (p.weight - 2.0).abs() < f64::EPSILON));
        assert!(points[20..].iter().all(|p| (p.weight - 2.5).abs() < f64::EPSILON));
    }

    #[test]
    fn seeded_generators_are_reproducible() {
        let residential = vec![feature(FeatureCategory::Residential, 0.8); 3];
        let a = synthesize(&[district(3800)], &residential, &[], &mut StdRng::seed_from_u64(42));
        let b = synthesize(&[district(3800)], &residential, &[], &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
