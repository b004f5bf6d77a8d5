//! Application entry point: Match Commentator.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).  The file
//!    location can be overridden with `MATCH_COMMENTATOR_CONFIG`.
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the backend client from config.
//! 5. Create session channels (`command`, `update`).
//! 6. Spawn the session orchestrator on the tokio runtime.
//! 7. Start the speech player thread.
//! 8. Run [`eframe::run_native`], which blocks the main thread until the window
//!    is closed.  The configured font scale is applied as the egui zoom factor.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use eframe::egui;
use tokio::sync::mpsc;

use match_commentator::{
    app::CommentatorApp,
    channel::ChannelSettings,
    config::{AppConfig, AppPaths, CONFIG_ENV},
    session::{SessionCommand, SessionMessage, SessionOrchestrator},
    speech::{default_engine_factory, SpeechPlayer},
    upload::{BackendClient, JobBackend},
};

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let vp = egui::ViewportBuilder::default()
        .with_title("Match Commentator")
        .with_inner_size([width, height])
        .with_min_inner_size([480.0, 360.0])
        .with_drag_and_drop(true);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

fn start_speech(config: &AppConfig) -> Result<SpeechPlayer, String> {
    if !config.speech.enabled {
        log::info!("speech disabled in settings");
        return Err("Speech is disabled in settings.".into());
    }
    SpeechPlayer::start(&config.speech, default_engine_factory()).map_err(|e| {
        log::warn!("speech unavailable: {e}");
        e.to_string()
    })
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Match Commentator starting up");

    // 2. Configuration
    log::info!(
        "settings file: {} (set {CONFIG_ENV} to override)",
        AppPaths::resolve().settings_file.display()
    );
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    log::info!("backend: {}", config.backend.base_url);

    // 3. Tokio runtime (2 worker threads for the orchestrator and channel tasks)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Backend client
    let backend: Arc<dyn JobBackend> = Arc::new(BackendClient::from_config(&config.backend));

    // 5. Channel setup
    let (command_tx, command_rx) = mpsc::channel::<SessionCommand>(16);
    let (update_tx, update_rx) = mpsc::channel::<SessionMessage>(64);

    // 6. Session orchestrator
    let settings = ChannelSettings::from_config(&config.backend, &config.channel);
    rt.spawn(SessionOrchestrator::new(backend, settings, update_tx).run(command_rx));

    // 7. Speech player thread
    let speech = start_speech(&config);

    // 8. Build the egui app and run it (blocks until the window is closed)
    let mut app = CommentatorApp::new(command_tx.clone(), update_rx, speech, config.clone());

    if command_tx.try_send(SessionCommand::CheckHealth).is_err() {
        log::warn!("could not queue startup health check");
    }
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        app.select_file(path);
    }

    let options = native_options(&config);
    let zoom = config.ui.zoom_factor();
    eframe::run_native(
        "Match Commentator",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_zoom_factor(zoom);
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("window error: {e}"))?;

    log::info!("Match Commentator shut down");
    Ok(())
}
