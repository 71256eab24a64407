//! meshcam - Live facial-landmark wireframe overlay
//!
//! Main entry point for the CLI application.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use meshcam::{
    capture::SyntheticCapture,
    config::Config,
    mesh::topology::Topology,
    session::Session,
    surface::{self, RasterSurface},
    AppState,
};

/// meshcam - live facial-landmark wireframe overlay service
#[derive(Parser, Debug)]
#[command(name = "meshcam", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate configuration and topology, then exit
    #[arg(long)]
    check: bool,

    /// Stop after this many painted overlay frames
    #[arg(long)]
    frames: Option<u64>,

    /// Inference trigger period in milliseconds (overrides config)
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Directory for PNG overlay dumps (overrides config)
    #[arg(long)]
    dump_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", meshcam::NAME, meshcam::VERSION);

    // Load configuration
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if let Some(interval_ms) = args.interval_ms {
        config.schedule.interval_ms = interval_ms;
    }
    if let Some(ref dump_dir) = args.dump_dir {
        config.overlay.dump_dir = Some(dump_dir.clone());
    }

    config.validate()?;

    let topology = load_topology(&config)?;
    info!(
        "Topology loaded: {} triangles over {} keypoints",
        topology.len(),
        topology.max_index() + 1
    );

    if args.check {
        info!("Configuration OK");
        return Ok(());
    }

    if let Some(ref dump_dir) = config.overlay.dump_dir {
        std::fs::create_dir_all(dump_dir)?;
        info!("Dumping overlay frames to {}", dump_dir.display());
    }

    let state = AppState::new(config.clone());
    let surface = surface::shared(RasterSurface::from_config(&config.overlay));
    let capture = Box::new(SyntheticCapture::new(&config.capture));

    let mut session = Session::new(Arc::clone(&state), surface);
    session.start(capture, topology).await?;

    tokio::select! {
        _ = shutdown_signal() => info!("Shutdown signal received"),
        _ = frame_budget(&state, args.frames) => info!("Frame budget reached"),
    }

    session.teardown().await;
    info!(
        frames = state.frames_painted(),
        dropped_ticks = state.ticks_dropped(),
        detect_failures = state.detect_failures(),
        "meshcam stopped"
    );
    Ok(())
}

fn load_topology(config: &Config) -> anyhow::Result<Topology> {
    match &config.overlay.topology_path {
        Some(path) => Ok(Topology::from_json_file(path)?),
        // No asset configured: pair the synthetic detector with a fan over
        // its own hub-and-ring layout.
        None => Ok(Topology::fan(config.detector.synthetic_keypoints)?),
    }
}

/// Resolves once `budget` overlay frames have been painted; pends forever
/// without a budget.
async fn frame_budget(state: &Arc<AppState>, budget: Option<u64>) {
    match budget {
        None => std::future::pending().await,
        Some(budget) => {
            let mut ticker = tokio::time::interval(Duration::from_millis(50));
            loop {
                ticker.tick().await;
                if state.frames_painted() >= budget {
                    return;
                }
            }
        }
    }
}

async fn shutdown_signal() {
    use tokio::signal;

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
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
