#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the travel time poller.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use traffic_map_poller::{
    CycleOutcome, TomTomRouting, TravelTimeProvider, WeatherClient, run_cycle,
};
use traffic_map_sample_models::TravelTimeSample;
use traffic_map_segment::{SegmentIndex, load_config};
use traffic_map_store::{DEFAULT_STORE_PATH, SampleStore};

#[derive(Parser)]
#[command(name = "traffic_map_poller", about = "Travel time polling tool")]
struct Cli {
    /// Path to the segment configuration file
    #[arg(long, default_value = "config/segments.toml")]
    config: PathBuf,
    /// Path to the JSON Lines sample store
    #[arg(long, default_value = DEFAULT_STORE_PATH)]
    store: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll every configured segment once and append the samples
    Once,
    /// Poll continuously at a fixed interval
    Run {
        /// Seconds between poll cycle starts
        #[arg(long, default_value = "300")]
        interval_secs: u64,
    },
    /// Recompute derived metrics for every stored sample using the current
    /// configuration
    Enrich,
    /// List the segments resolved from the configuration
    Segments,
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let store = SampleStore::new(cli.store);

    match cli.command {
        Commands::Once => {
            let provider = TomTomRouting::from_env()?;
            let weather_client = WeatherClient::new();
            let outcome = poll_once(&provider, &weather_client, &cli.config, &store).await?;
            log::info!(
                "Poll complete: {} samples appended, {} routes failed",
                outcome.appended,
                outcome.failed
            );
        }
        Commands::Run { interval_secs } => {
            let provider = TomTomRouting::from_env()?;
            let weather_client = WeatherClient::new();
            let interval = Duration::from_secs(interval_secs);
            log::info!("Polling every {interval_secs}s; Ctrl-C to stop");

            loop {
                match poll_once(&provider, &weather_client, &cli.config, &store).await {
                    Ok(outcome) => log::info!(
                        "Poll complete: {} samples appended, {} routes failed",
                        outcome.appended,
                        outcome.failed
                    ),
                    Err(e) => log::error!("Poll cycle failed: {e}"),
                }

                tokio::select! {
                    () = tokio::time::sleep(interval) => {}
                    _ = tokio::signal::ctrl_c() => {
                        log::info!("Shutting down");
                        break;
                    }
                }
            }
        }
        Commands::Enrich => {
            let config = load_config(&cli.config)?;
            let index = SegmentIndex::build(&config.segments);

            let start = Instant::now();
            let records = store.read_all()?;
            let total = records.len();
            let enriched: Vec<_> = records
                .into_iter()
                .map(|record| {
                    traffic_map_flow::enrich_sample(&index, TravelTimeSample::from(record))
                })
                .collect();
            store.rewrite_atomic(&enriched)?;

            let elapsed = start.elapsed();
            log::info!(
                "Re-enrichment complete: {total} samples rewritten in {:.1}s",
                elapsed.as_secs_f64()
            );
        }
        Commands::Segments => {
            let config = load_config(&cli.config)?;
            let index = SegmentIndex::build(&config.segments);

            let mut segments: Vec<_> = index.iter().collect();
            segments.sort_by(|a, b| a.id.cmp(&b.id));

            println!(
                "{:<20} {:<24} {:>5} {:>12} {:>10} DIRECTIONS",
                "ID", "NAME", "LANES", "CAPACITY", "LENGTH"
            );
            println!("{}", "-".repeat(88));
            for segment in segments {
                let length = segment
                    .length_meters
                    .map_or_else(|| "-".to_string(), |l| format!("{l:.0}m"));
                let directions = segment
                    .directions
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "{:<20} {:<24} {:>5} {:>12.0} {:>10} {directions}",
                    segment.id, segment.name, segment.lanes, segment.capacity_vph, length
                );
            }
        }
    }

    Ok(())
}

/// Loads the configuration fresh and runs one poll cycle.
///
/// Re-reading the config every cycle means segment edits take effect on
/// the next poll without a restart. A missing weather point or a failed
/// weather fetch degrades to samples without weather.
async fn poll_once(
    provider: &dyn TravelTimeProvider,
    weather_client: &WeatherClient,
    config_path: &Path,
    store: &SampleStore,
) -> Result<CycleOutcome, Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let index = SegmentIndex::build(&config.segments);

    let weather = match config.weather {
        Some(point) => match weather_client.current(point).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::warn!("Weather fetch failed: {e}");
                None
            }
        },
        None => None,
    };

    Ok(run_cycle(provider, &index, weather, store).await?)
}
