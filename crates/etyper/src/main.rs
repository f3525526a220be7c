//! Device entry point.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use etyper::display::open_panel;
use etyper::session::{reconcile_stale, ServerConfig};
use etyper::{signals, DeviceConfig, DeviceContext, DocumentStore, ModeController, SystemBackend};
use platform::evdev::ReconnectingKeyboard;
use platform::{config, Clock, StopFlag, SystemClock, SystemRunner};

fn main() -> Result<()> {
    let cfg = DeviceConfig::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = config::APP_VERSION, "{}", config::banner());

    let stop = StopFlag::new();
    signals::install(&stop).context("installing signal handlers")?;

    let store = DocumentStore::new(cfg.docs_dir());
    store.ensure_dir().context("creating documents directory")?;
    tracing::info!(dir = %store.dir().display(), "documents");

    let servers = ServerConfig {
        https_port: cfg.https_port,
        http_port: cfg.http_port,
        ..ServerConfig::default()
    };
    let runner = SystemRunner::with_stop(stop.clone());
    let mut backend = SystemBackend::new(runner, store.clone(), servers);
    let report = reconcile_stale(&mut backend);
    if !report.is_clean() {
        tracing::warn!(warnings = report.warnings.len(), "stale resource cleanup incomplete");
    }

    let panel = open_panel(&cfg.panel)
        .context("opening e-paper panel")?
        .with_stop(stop.clone());
    let keyboard = ReconnectingKeyboard::new();
    let clock = SystemClock;

    let ctx = DeviceContext::new(panel, backend, store, clock.now())
        .context("opening last document")?;
    let mut controller = ModeController::new(ctx, keyboard, clock, stop);
    controller.run().context("shutting down")?;

    tracing::info!("bye");
    Ok(())
}
