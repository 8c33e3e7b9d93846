//! lofai radio (lofai-radio) - Main entry point
//!
//! Serves a continuously rotating set of AI-generated lofi tracks,
//! regenerating them in the background and broadcasting listener presence.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lofai_common::config::TomlConfig;
use lofai_common::events::EventBus;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lofai_radio::api::{self, AppState};
use lofai_radio::config::{CliOverrides, RadioConfig};
use lofai_radio::coordinator::{GenerationQueue, RegenerationCoordinator};
use lofai_radio::presence::PresenceBroadcaster;
use lofai_radio::prompt::PreferenceStore;
use lofai_radio::rotation::RotationStore;
use lofai_radio::scheduler::PlaybackScheduler;
use lofai_radio::synthesis::FalMusicGenClient;

/// Command-line arguments for lofai-radio
#[derive(Parser, Debug)]
#[command(name = "lofai-radio")]
#[command(about = "AI-generated lofi radio stream")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "LOFAI_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long = "bind", env = "LOFAI_BIND")]
    bind_address: Option<String>,

    /// Root folder for runtime data
    #[arg(short, long, env = "LOFAI_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Directory holding the rotation's audio files
    #[arg(long, env = "LOFAI_AUDIO_DIR")]
    audio_dir: Option<PathBuf>,

    /// Seconds between automatic track advances (0 disables the timer)
    #[arg(long = "advance-interval", env = "LOFAI_ADVANCE_INTERVAL_SECS")]
    advance_interval_secs: Option<u64>,

    /// TOML config file
    #[arg(short, long, env = "LOFAI_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        TomlConfig::load_or_default(args.config.as_deref()).context("Failed to load config file")?;
    let log_level = toml_config.logging.level.clone();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "lofai_radio={level},lofai_common={level},tower_http={level}",
                    level = log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RadioConfig::resolve(
        CliOverrides {
            port: args.port,
            bind_address: args.bind_address,
            root_folder: args.root_folder,
            audio_dir: args.audio_dir,
            advance_interval_secs: args.advance_interval_secs,
        },
        toml_config,
    );

    info!("Starting lofai radio on port {}", config.port);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Audio folder: {}", config.audio_dir.display());

    let event_bus = EventBus::new(256);

    let store = Arc::new(
        RotationStore::open(&config.audio_dir, config.rotation_size)
            .await
            .context("Failed to open audio folder")?,
    );
    let preferences = Arc::new(PreferenceStore::new());

    // Generation is disabled, not retried, when the provider is unavailable
    let (generation, worker) = match &config.fal_key {
        Some(key) => match FalMusicGenClient::new(key.clone(), config.synthesis.clone()) {
            Ok(client) => {
                let coordinator = Arc::new(RegenerationCoordinator::new(
                    Arc::clone(&store),
                    Arc::clone(&preferences),
                    Arc::new(client),
                    event_bus.clone(),
                ));
                let (queue, handle) = GenerationQueue::spawn(coordinator);
                (queue, Some(handle))
            }
            Err(e) => {
                warn!("Failed to create synthesis client, generation disabled: {}", e);
                (GenerationQueue::disabled(), None)
            }
        },
        None => (GenerationQueue::disabled(), None),
    };
    info!("Generator ready: {}", generation.is_enabled());

    let scheduler = Arc::new(PlaybackScheduler::new(
        Arc::clone(&store),
        generation.clone(),
        event_bus.clone(),
        config.advance_interval,
    ));
    scheduler.start().await;

    let presence = Arc::new(PresenceBroadcaster::new(event_bus.clone()));

    let state = AppState::new(
        store,
        preferences,
        Arc::clone(&scheduler),
        generation,
        presence,
        event_bus,
    );

    let app = api::build_router(state).layer(api::cors_layer(&config.cors_origins));

    let ip = config
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind_address))?;
    let addr = SocketAddr::new(ip, config.port);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    scheduler.shutdown().await;
    if let Some(worker) = worker {
        // An in-flight batch is abandoned; temp files are cleaned up on next start
        worker.abort();
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
