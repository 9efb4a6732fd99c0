//! # kwm - Minimal Stacking Wayland Compositor
//!
//! Starts the compositor core on the headless backend. Backend events arrive
//! on a channel (from `--replay` when given) and are dispatched one at a time
//! until SIGINT, SIGTERM or the exit binding stops the loop.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use tokio::signal;
use tokio::sync::mpsc;

use kwm::backend::replay::{self, ReplayEvent};
use kwm::backend::{Backend, BackendEvent, HeadlessBackend, OutputId};
use kwm::{Compositor, KwmConfig, ProcessLauncher};

#[derive(Parser, Debug)]
#[command(name = "kwm")]
#[command(about = "A minimal stacking Wayland compositor")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/kwm/kwm.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Shell command to run once the compositor is up
    #[arg(short, long)]
    startup: Option<String>,

    /// Replay backend events from a JSON-lines file, then exit
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Validate the configuration file and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.check_config {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        let config = KwmConfig::load(&cli.config)?;
        info!(
            "✅ Configuration OK: {} binding(s), {} output(s)",
            config.bindings.len(),
            config.outputs.len()
        );
        return Ok(());
    }

    let loaded = KwmConfig::load(&cli.config);
    let debug = cli.debug || loaded.as_ref().map_or(false, |c| c.general.debug);

    // Initialize logging
    if debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    info!("🚀 Starting kwm");
    info!(
        "📄 Version: {} ({} {})",
        kwm::VERSION,
        option_env!("KWM_GIT_COMMIT").unwrap_or("unknown"),
        env!("KWM_BUILD_DATE")
    );

    let config = match loaded {
        Ok(config) => {
            info!("✅ Configuration loaded from: {}", cli.config);
            config
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            info!("📝 Using default configuration");
            KwmConfig::default()
        }
    };

    let backend = HeadlessBackend::default();
    let mut launcher = ProcessLauncher::new();
    launcher.set_env("WAYLAND_DISPLAY", backend.socket_name());

    let mut compositor = Compositor::from_config(backend, launcher, &config)?;

    for (index, output) in config.outputs.iter().enumerate() {
        info!("🖥️ Creating output {} ({}x{})", output.name, output.width, output.height);
        compositor.dispatch(BackendEvent::NewOutput {
            output: OutputId(index as u64),
            width: output.width,
            height: output.height,
        });
    }

    let startup = cli.startup.or_else(|| config.general.startup_command.clone());
    compositor
        .start(startup.as_deref())
        .context("Failed to start backend")?;

    run(&mut compositor, cli.replay).await?;

    info!("👋 kwm shutting down");
    Ok(())
}

/// Main event loop. Returns once the compositor asks to stop, a signal
/// arrives, or a replay stream is exhausted.
async fn run(
    compositor: &mut Compositor<HeadlessBackend, ProcessLauncher>,
    replay_path: Option<PathBuf>,
) -> Result<()> {
    info!("🎬 Starting kwm event loop");

    // Set up signal handling
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

    let (tx, mut rx) = mpsc::channel::<(usize, ReplayEvent)>(256);
    // Without a recording nothing ever sends; holding the sender keeps the
    // loop waiting for a signal instead of seeing a closed channel.
    let mut _idle_sender = None;
    let reader = match replay_path {
        Some(path) => Some(tokio::spawn(replay::read_events(path, tx))),
        None => {
            _idle_sender = Some(tx);
            None
        }
    };

    while compositor.is_running() {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("📨 Received SIGTERM, shutting down gracefully");
                compositor.shutdown();
            }
            _ = sigint.recv() => {
                info!("📨 Received SIGINT (Ctrl+C), shutting down gracefully");
                compositor.shutdown();
            }
            next = rx.recv() => match next {
                Some((line, event)) => match event.apply(compositor.backend_mut()) {
                    Ok(event) => compositor.dispatch(event),
                    Err(e) => warn!("⚠️ Skipping replay line {}: {:#}", line, e),
                },
                None => {
                    info!("📼 Replay finished");
                    break;
                }
            },
        }
    }

    if let Some(reader) = reader {
        match reader.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("❌ Replay failed: {:#}", e),
            Err(e) => error!("❌ Replay reader panicked: {}", e),
        }
    }

    info!("🛑 kwm event loop finished");
    Ok(())
}
