//! Coverage analysis over a selection of districts.
//!
//! The figures are indicative: only the facility count, the number of
//! matched districts and the schools-in-area count are derived from data.
//! Distances, coverage and chart series are drawn from fixed ranges.

use building_optimizer_geography_models::catalog::CityDistrictCatalog;
use building_optimizer_geography_models::{District, PointFeature};
use building_optimizer_server_models::{AnalysisCharts, AnalysisResults, AnalysisStatistics};
use rand::Rng;

/// A school counts as in-area within this many degrees of a selected
/// district's centroid, on both axes.
pub const SCHOOL_RADIUS_DEG: f64 = 0.05;

/// Analyzes `selected` (slugs or full district names) against the city's
/// districts and schools.
pub fn analyze<R: Rng + ?Sized>(
    catalog: &CityDistrictCatalog,
    selected: &[String],
    districts: &[District],
    schools: &[PointFeature],
    rng: &mut R,
) -> AnalysisResults {
    let names: Vec<&str> = selected
        .iter()
        .map(|slug| catalog.resolve_slug(slug.trim()))
        .collect();

    let matched: Vec<&District> = districts
        .iter()
        .filter(|d| names.contains(&d.name.as_str()))
        .collect();

    let schools_in_area = schools
        .iter()
        .filter(|school| {
            matched.iter().any(|d| {
                (school.lat - d.centroid.lat).abs() < SCHOOL_RADIUS_DEG
                    && (school.lng - d.centroid.lng).abs() < SCHOOL_RADIUS_DEG
            })
        })
        .count();

    let density_sum: u64 = matched.iter().map(|d| u64::from(d.population_density)).sum();

    let avg_distance = (rng.random_range(1.2..=3.5_f64) * 10.0).round() / 10.0;
    let coverage_percent = rng.random_range(65..=95);
    let population_served = density_sum * rng.random_range(1..=3_u64);

    let charts = AnalysisCharts {
        district: (0..4).map(|_| rng.random_range(15..=35)).collect(),
        accessibility: (0..5).map(|_| rng.random_range(5..=25)).collect(),
        time: (0..7).map(|_| rng.random_range(45..=95)).collect(),
    };

    log::debug!(
        "Analyzed {} of {} selected districts, {schools_in_area} schools in area",
        matched.len(),
        selected.len()
    );

    AnalysisResults {
        statistics: AnalysisStatistics {
            total_facilities: schools.len(),
            avg_distance,
            coverage_percent,
            population_served,
        },
        charts,
        districts_analyzed: matched.len(),
        schools_in_area,
    }
}
