use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use clinic_density::boundaries;
use clinic_density::config::Config;
use clinic_density::density::DensityCodec;
use clinic_density::geocode::ArcGisGeocoder;
use clinic_density::input;
use clinic_density::joiner::FacilityJoiner;
use clinic_density::logging;
use clinic_density::pipeline::CleaningPipeline;
use clinic_density::snapshot;

#[derive(Parser)]
#[command(name = "clinic_density")]
#[command(about = "Cleans and geocodes NYC pediatric clinic data against child population density")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the raw sheets, geocode every clinic, and publish a fresh snapshot
    Clean,
    /// Load the published snapshot if one exists, otherwise clean
    Run,
}

async fn clean(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔄 Cleaning raw data...");

    let kid_rows = input::read_population_rows(Path::new(&config.inputs.population))?;
    let clinic_rows = input::read_facility_rows(Path::new(&config.inputs.facilities))?;
    let reference_zips = boundaries::reference_zips(&config.boundaries).await?;

    let codec = DensityCodec::with_overrides(&config.density_scale);
    let geocoder = Arc::new(ArcGisGeocoder::new(config.geocoder.endpoint.clone()));
    let joiner = FacilityJoiner::new(
        geocoder,
        config.geocoder.max_in_flight,
        Duration::from_secs(config.geocoder.timeout_seconds),
    );

    let mut pipeline = CleaningPipeline::new(codec, joiner);
    let (table, facilities, report) = pipeline
        .run(&kid_rows, &clinic_rows, &reference_zips)
        .await?;

    let output_dir = Path::new(&config.output.dir);
    snapshot::write(output_dir, &table, &facilities)?;

    println!("\n📊 Run {} summary:", report.run_id);
    println!("   Zip records: {}", table.len());
    println!("   Facilities: {}", facilities.len());
    println!("   Back-filled zips: {}", report.backfilled_zips);
    println!("   Duplicate zips: {}", report.duplicate_zips);
    println!(
        "   Invalid zips: {} population, {} facility",
        report.invalid_population_zips, report.invalid_facility_zips
    );
    println!("   Geocode failures: {}", report.geocode_failures.len());
    if !report.geocode_failures.is_empty() {
        println!("\n⚠️  Facilities left without coordinates:");
        for failure in &report.geocode_failures {
            println!("   - {failure}");
        }
    }
    println!("💾 Snapshot written to {}", output_dir.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Clean => {
            if let Err(e) = clean(&config).await {
                error!("Cleaning run failed: {}", e);
                return Err(e);
            }
        }
        Commands::Run => {
            let output_dir = Path::new(&config.output.dir);
            if snapshot::exists(output_dir) {
                info!("snapshot present; skipping re-derivation");
                let (table, facilities) = snapshot::load(output_dir)?;
                println!(
                    "✅ Loaded snapshot: {} zip records, {} facilities ready for rendering",
                    table.len(),
                    facilities.len()
                );
            } else {
                info!("no snapshot found; running the cleaning pipeline");
                if let Err(e) = clean(&config).await {
                    error!("Cleaning run failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}
