//! ---
//! hydro_section: "01-core-functionality"
//! hydro_subsection: "binary"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Binary entrypoint for the HydroSim daemon."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hydrosim_common::config::AppConfig;
use hydrosim_common::logging::init_tracing;
use hydrosim_core::{FleetCoordinator, MqttTransportFactory};
use tokio::signal;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "HydroSim water-level fleet simulator daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "MINUTES",
        help = "Stop the simulation after this many minutes (runs until interrupted when omitted)"
    )]
    duration_minutes: Option<u64>,

    #[arg(long, value_name = "SEED", help = "Override the simulation random seed")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the device fleet")]
    Run,
    #[command(about = "Validate the configuration and exit")]
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/example.dev.toml"));
    candidates.push(PathBuf::from("configs/example.prod.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(seed) = cli.seed {
        config.simulation.random_seed = seed;
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            init_tracing("hydrosimd", &config.logging)?;
            info!(
                config_path = %loaded.source.display(),
                devices = config.devices.len(),
                broker = %config.broker.host,
                "configuration loaded"
            );
            let duration = cli.duration_minutes.map(|minutes| {
                Duration::from_secs(minutes.saturating_mul(60))
            });
            run_daemon(config, duration).await?;
        }
        Commands::CheckConfig => {
            config.validate()?;
            println!(
                "configuration OK: {} device(s), broker {}:{}",
                config.devices.len(),
                config.broker.host,
                config.broker.port
            );
        }
    }

    Ok(())
}

async fn run_daemon(config: AppConfig, duration: Option<Duration>) -> Result<()> {
    let factory = Arc::new(MqttTransportFactory::new(config.broker.clone()));
    let handle = FleetCoordinator::new(config, factory).start(duration);
    info!(devices = handle.device_count(), "daemon running; waiting for termination signal");

    match duration {
        Some(bound) => {
            // Bounded run: every runner exits on its own deadline, but an
            // early interrupt still stops the fleet cooperatively.
            let trigger = handle.stop_sender();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    info!("ctrl-c received; stopping fleet early");
                    let _ = trigger.send(());
                }
            });
            info!(duration_secs = bound.as_secs(), "fleet will stop on deadline");
            handle.join().await?;
        }
        None => {
            signal::ctrl_c().await?;
            info!("ctrl-c received; shutting down");
            handle.shutdown().await?;
        }
    }

    Ok(())
}
