use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use climate_trends_service::corpus::CorpusAssembler;
use climate_trends_service::export::{write_corpus_csv, write_locations_csv};
use climate_trends_service::fetcher::HttpBulletinFetcher;
use climate_trends_service::stations::{self, DEFAULT_STATION_BASE_URL};
use climate_trends_service::utils;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "export-snapshot")]
#[command(about = "Fetch UK station bulletins and write the combined climate CSV snapshot", long_about = None)]
struct Cli {
    /// Station to include (repeatable); defaults to the full catalogue
    #[arg(long = "station")]
    stations: Vec<String>,

    /// Base URL the bulletin file names are resolved against
    #[arg(long, env = "STATION_BASE_URL", default_value = DEFAULT_STATION_BASE_URL)]
    base_url: String,

    /// Combined corpus CSV
    #[arg(long, default_value = "combined_uk_station_climate_data.csv")]
    output: PathBuf,

    /// Station coordinate CSV
    #[arg(long, default_value = "station_coordinates.csv")]
    coordinates_output: PathBuf,

    /// Number of parallel downloads
    #[arg(long, default_value = "8")]
    parallel: usize,

    /// Per-station fetch timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let station_list = if cli.stations.is_empty() {
        stations::station_catalogue(&cli.base_url)
    } else {
        let ids = cli
            .stations
            .iter()
            .map(|s| utils::normalize_station_id(s))
            .collect::<Result<Vec<_>, _>>()?;
        stations::select_stations(&cli.base_url, &ids)
            .map_err(|id| format!("Unknown station: {id}"))?
    };

    let timeout = Duration::from_secs(cli.timeout_secs);
    let fetcher = HttpBulletinFetcher::new(timeout)?;
    let assembler = CorpusAssembler::new(Arc::new(fetcher))
        .with_concurrency(cli.parallel)
        .with_fetch_timeout(timeout);

    println!(
        "Fetching {} station bulletins ({} parallel)",
        station_list.len(),
        cli.parallel.max(1)
    );

    let pb = ProgressBar::new(station_list.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let started = Instant::now();
    let assembly = assembler
        .assemble_with(&station_list, |outcome| {
            pb.set_message(outcome.station.clone());
            pb.inc(1);
        })
        .await;
    pb.finish_with_message(format!(
        "✓ {} records from {} stations",
        assembly.report.records, assembly.report.stations_parsed
    ));

    for failure in &assembly.report.failures {
        warn!("Skipped {}: {}", failure.station, failure.reason);
        println!("  ✗ {}: {}", failure.station, failure.reason);
    }

    if assembly.report.stations_parsed == 0 {
        return Err("no station bulletins could be parsed".into());
    }

    let written = write_corpus_csv(assembly.corpus.records(), &cli.output)?;
    write_locations_csv(&assembly.locations, &cli.coordinates_output)?;

    let located = assembly
        .locations
        .iter()
        .filter(|l| l.has_coordinates())
        .count();

    info!("Snapshot export complete in {:?}", started.elapsed());
    println!("\nSummary:");
    println!(
        "  Stations parsed: {}/{}",
        assembly.report.stations_parsed, assembly.report.stations_requested
    );
    println!("  Records written: {written} -> {}", cli.output.display());
    println!(
        "  Stations located: {located}/{} -> {}",
        assembly.locations.len(),
        cli.coordinates_output.display()
    );
    println!("  Elapsed: {:.1}s", started.elapsed().as_secs_f64());

    Ok(())
}
