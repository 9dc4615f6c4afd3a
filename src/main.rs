// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::application::acquisition_service::AcquisitionService;
use crate::application::relay_service::RelayService;
use crate::application::sampling_loop::LoopSettings;
use crate::application::video_recorder::{DisabledRecorder, VideoRecorder};
use crate::domain::relay::RelayChannel;
use crate::infrastructure::archive::LogArchiver;
use crate::infrastructure::camera::ProcessRecorder;
use crate::infrastructure::config::{DEFAULT_CONFIG_PATH, RigConfig, load_config};
use crate::infrastructure::rig_builder::build_rig;
use crate::infrastructure::sysfs_gpio::SysfsGpio;
use crate::presentation::app_state::AppState;
use crate::presentation::{monitor, routes};

#[derive(Parser)]
#[command(name = "rigd")]
#[command(about = "Data acquisition and relay control daemon for the test rig", long_about = None)]
struct Cli {
    /// Configuration file, extension optional; RIGD__* variables override it.
    /// Defaults to config/rigd when present
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP control surface
    Serve,

    /// Print live readings of the power channels
    Monitor {
        /// Only show this channel (CH1, CH2, ...)
        #[arg(value_parser = monitor::parse_channel)]
        channel: Option<usize>,

        /// Refresh period
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let path = cli.config.as_deref();
    let config = load_config(path).with_context(|| {
        format!(
            "loading configuration from {}",
            path.unwrap_or(DEFAULT_CONFIG_PATH)
        )
    })?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Monitor {
            channel,
            interval_ms,
        } => {
            let rig = build_rig(&config)?;
            monitor::run(rig, channel, std::time::Duration::from_millis(interval_ms)).await
        }
    }
}

async fn serve(config: RigConfig) -> anyhow::Result<()> {
    let directory = config.storage.directory.clone();
    std::fs::create_dir_all(&directory)
        .with_context(|| format!("creating storage directory {}", directory.display()))?;

    // Create the rig and services (application layer)
    let rig = build_rig(&config)?;
    let video: Arc<dyn VideoRecorder> = if config.video.enabled {
        Arc::new(ProcessRecorder::new(
            config.video.program.clone(),
            config.video.args.clone(),
        ))
    } else {
        Arc::new(DisabledRecorder)
    };
    let settings = LoopSettings {
        directory: directory.clone(),
        bus_timeout: config.sampling.bus_timeout(),
        interval: config.sampling.interval(),
    };
    let acquisition = AcquisitionService::new(rig, settings, video);

    let pins: BTreeMap<RelayChannel, u32> = config
        .relays
        .pins
        .iter()
        .map(|pin| (RelayChannel::new(pin.channel), pin.gpio))
        .collect();
    let relays = RelayService::new(
        pins,
        Arc::new(SysfsGpio::new(config.relays.sysfs_root.clone())),
        config.relays.active_low,
    );

    let state = Arc::new(AppState {
        acquisition: acquisition.clone(),
        relays,
        archiver: LogArchiver::new(directory, config.storage.archive_name.clone()),
    });

    // Build router (presentation layer)
    let router = routes::router(state);

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting rigd on {} ({:?} backend)", addr, config.rig.backend);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Shutting down; draining any running session");
    acquisition.shutdown().await?;
    Ok(())
}
