#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Operator CLI for the building optimizer.
//!
//! ```text
//! building_optimizer_cli seed
//! building_optimizer_cli history [--limit 20]
//! building_optimizer_cli districts [--city Бишкек]
//! building_optimizer_cli features residential [--city Бишкек]
//! building_optimizer_cli heatmap [--city Бишкек] [--seed 42]
//! building_optimizer_cli boundary [--city Бишкек]
//! building_optimizer_cli serve
//! ```
//!
//! Store commands use `DATABASE_PATH`; map commands honor the same
//! `NOMINATIM_URL`, `OVERPASS_URL` and `CITY_CATALOG_PATH` overrides as the
//! server.

use clap::{Parser, Subcommand};
use building_optimizer_database::population::{self, PopulationRecord};
use building_optimizer_database::{db_path_from_env, history, open_db};
use building_optimizer_geography::heatmap;
use building_optimizer_geography::registry::CatalogRegistry;
use building_optimizer_geography_models::FeatureCategory;
use building_optimizer_osm::{OsmClient, OsmConfig};
use building_optimizer_server::DEFAULT_CITY;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Deserialize;

/// Sample district densities for the seed command.
const SAMPLE_POPULATION_TOML: &str = include_str!("../data/sample_population.toml");

#[derive(Deserialize)]
struct SampleData {
    districts: Vec<PopulationRecord>,
}

/// Parses the embedded sample data.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed.
fn sample_records() -> Vec<PopulationRecord> {
    let data: SampleData = toml::de::from_str(SAMPLE_POPULATION_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse sample_population.toml: {e}"));
    data.districts
}

#[derive(Parser)]
#[command(
    name = "building_optimizer_cli",
    about = "Seed, inspect and exercise the building optimizer"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the population table with the bundled sample districts
    Seed,
    /// List recent placement recommendations
    History {
        /// Maximum number of recommendations to show
        #[arg(long, default_value = "20")]
        limit: u32,
    },
    /// Resolve a city's districts from OpenStreetMap
    Districts {
        /// City name
        #[arg(long, default_value = DEFAULT_CITY)]
        city: String,
    },
    /// Fetch point features of one category
    Features {
        /// Feature category (school, residential, commercial)
        category: String,
        /// City name
        #[arg(long, default_value = DEFAULT_CITY)]
        city: String,
    },
    /// Build the population heatmap and print it as JSON
    Heatmap {
        /// City name
        #[arg(long, default_value = DEFAULT_CITY)]
        city: String,
        /// Seed for reproducible jitter
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Geocode a city and print its boundary as JSON
    Boundary {
        /// City name
        #[arg(long, default_value = DEFAULT_CITY)]
        city: String,
    },
    /// Start the API server
    Serve,
}

fn osm_client() -> Result<OsmClient, Box<dyn std::error::Error>> {
    Ok(OsmClient::new(OsmConfig::from_env(), CatalogRegistry::from_env()?)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Seed => {
            let db = open_db(&db_path_from_env()).await?;
            let records = sample_records();
            let count = population::replace_all(db.as_ref(), &records).await?;
            println!("Seeded {count} districts");
        }
        Commands::History { limit } => {
            let db = open_db(&db_path_from_env()).await?;
            let rows = history::recent_requests(db.as_ref(), limit).await?;

            if rows.is_empty() {
                println!("No recommendations recorded.");
                return Ok(());
            }

            println!(
                "{:<6} {:<16} {:<14} {:<22} {:<6} CREATED",
                "ID", "TYPE", "CITY", "LOCATION", "CONF"
            );
            println!("{}", "-".repeat(90));

            for row in &rows {
                let created = row.created_at.get(..19).unwrap_or(&row.created_at);
                println!(
                    "{:<6} {:<16} {:<14} {:<22} {:<6.1} {created}",
                    row.id,
                    row.building_type,
                    row.city,
                    format!("{:.4}, {:.4}", row.suggested_lat, row.suggested_lng),
                    row.confidence,
                );
            }

            println!("\n{} recommendation(s)", rows.len());
        }
        Commands::Districts { city } => {
            let osm = osm_client()?;
            let districts = osm.resolve_districts(&city).await;

            if districts.is_empty() {
                println!("No districts found for {city}.");
                return Ok(());
            }

            println!("{:<28} {:<10} {:<22} RINGS", "NAME", "DENSITY", "CENTROID");
            println!("{}", "-".repeat(70));
            for d in &districts {
                println!(
                    "{:<28} {:<10} {:<22} {}",
                    d.name,
                    d.population_density,
                    format!("{:.4}, {:.4}", d.centroid.lat, d.centroid.lng),
                    d.polygons.len()
                );
            }
        }
        Commands::Features { category, city } => {
            let category: FeatureCategory = category
                .parse()
                .map_err(|_| format!("Unknown feature category '{category}'"))?;
            let osm = osm_client()?;
            let features = osm.fetch_city_features(&city, category).await;
            println!("{}", serde_json::to_string_pretty(&features)?);
            log::info!("{} {category} features for {city}", features.len());
        }
        Commands::Heatmap { city, seed } => {
            let osm = osm_client()?;
            let districts = osm.resolve_districts(&city).await;
            let residential = osm
                .fetch_city_features(&city, FeatureCategory::Residential)
                .await;
            let commercial = osm
                .fetch_city_features(&city, FeatureCategory::Commercial)
                .await;

            let mut rng: Box<dyn RngCore> = match seed {
                Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
                None => Box::new(rand::rng()),
            };
            let points = heatmap::synthesize(&districts, &residential, &commercial, rng.as_mut());
            println!("{}", serde_json::to_string_pretty(&points)?);
        }
        Commands::Boundary { city } => {
            let osm = osm_client()?;
            let boundary = osm.try_resolve_city(&city).await?;
            println!("{}", serde_json::to_string_pretty(&boundary)?);
        }
        Commands::Serve => {
            // actix-web needs its own system; run it off the tokio runtime.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(building_optimizer_server::run_server())
            })
            .await??;
        }
    }

    Ok(())
}
