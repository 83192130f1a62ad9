//! Temple Watch - crowd-safety dashboard core for temple grounds
//!
//! Polls the temple-management backend for live occupancy and SOS alerts,
//! classifies crowd levels and keeps the staff dashboard view current.
//!
//! Module structure:
//! - `domain/` - Core types (samples, classification ladder, alerts)
//! - `io/` - Backend REST client
//! - `services/` - Poller, alert feed, canvas, dashboard views
//! - `infra/` - Configuration

use clap::Parser;
use std::sync::Arc;
use temple_watch::infra::Config;
use temple_watch::io::TempleApi;
use temple_watch::services::{
    start_alert_refresh, AlertFeed, InMemorySurface, MapRegistry, StaffView, TelemetryPoller,
};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Temple Watch - headless crowd-safety dashboard service
#[derive(Parser, Debug)]
#[command(name = "temple-watch", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = env!("GIT_HASH"), "temple-watch starting");

    // Parse command line arguments using clap
    let args = Args::parse();

    // Load configuration from TOML file
    let config = Config::load_from_path(&args.config);

    // Log configuration
    info!(
        config_file = %config.config_file(),
        site_id = %config.site_id(),
        api_base_url = %config.api_base_url(),
        poll_interval_ms = %config.poll_interval_ms(),
        request_timeout_ms = %config.request_timeout().as_millis(),
        facilities = %config.facilities().len(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Shared components
    let api = TempleApi::new(&config);
    let feed = Arc::new(AlertFeed::new());

    // Start live occupancy poller
    let poller = TelemetryPoller::start(api.clone(), config.poll_interval(), shutdown_rx.clone());

    // Start SOS alert feed refresh
    let refresher = start_alert_refresh(
        api.clone(),
        feed.clone(),
        config.alert_refresh_interval(),
        shutdown_rx.clone(),
    );

    // Mount the staff view on a headless surface and keep it current
    let mut registry = MapRegistry::new(config.clone());
    let surface = InMemorySurface::new();
    let mut view = StaffView::new(config.facilities().to_vec());
    let view_surface = surface.clone();
    view.mount(&mut registry, move || Box::new(view_surface));
    info!("staff_view_mounted");

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Render loop - re-derive the view each tick until shutdown
    let mut ticker = tokio::time::interval(config.poll_interval());
    let mut shutdown = shutdown_rx;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let sample = poller.current();
                let summary = view.render(&mut registry, sample.as_ref(), &feed.active());
                info!(
                    count = %summary.count_text(),
                    comfort = %summary.comfort_text(),
                    wait = %summary.wait_text(),
                    active_alerts = %feed.active().len(),
                    markers = %surface.marker_count(),
                    "dashboard_rendered"
                );
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    // Orderly teardown: stop timers first, then release the map
    refresher.stop();
    poller.stop();
    view.unmount(&mut registry);

    info!("temple-watch shutdown complete");
    Ok(())
}
