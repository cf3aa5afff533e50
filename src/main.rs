// src/main.rs
use anyhow::{anyhow, Context, Result};
use eframe::egui;
use tokio::sync::mpsc;
use tracing::info;

use pinch_hunt::app::{self, AppEvent, GameSession, PinchHuntApp};
use pinch_hunt::channel;
use pinch_hunt::config::{ClientConfig, Preferences};
use pinch_hunt::effects::TerminalBell;
use pinch_hunt::render::FrameRenderer;
use pinch_hunt::video;

/// Header strip above the canvas.
const HEADER_HEIGHT: f32 = 48.0;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

fn main() -> Result<()> {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = ClientConfig::load().context("failed to load client configuration")?;
    let prefs = Preferences::load();

    // The websocket task runs here; everything else stays on the main thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let (events_tx, events_rx) = mpsc::unbounded_channel::<AppEvent>();
    let channel = channel::spawn(runtime.handle(), config.server_url.clone(), events_tx.clone());

    let source = video::open_source(&config).context("failed to open landmark source")?;
    video::spawn_source_thread(source, events_tx).context("failed to start landmark source thread")?;

    let renderer = FrameRenderer::from_config(&config);
    let session = GameSession::new(renderer, channel, Box::new(TerminalBell), prefs);

    if config.headless {
        app::run_headless(session, events_rx);
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.canvas_width as f32, config.canvas_height as f32 + HEADER_HEIGHT])
            .with_min_inner_size([640.0, 360.0 + HEADER_HEIGHT]),
        centered: true,
        ..Default::default()
    };

    info!("opening game window");
    eframe::run_native(
        "Pinch Hunt",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Box::new(PinchHuntApp::new(session, events_rx))
        }),
    )
    .map_err(|e| anyhow!("failed to run game window: {e}"))?;

    // Dropping the runtime aborts the connection task.
    drop(runtime);
    Ok(())
}
