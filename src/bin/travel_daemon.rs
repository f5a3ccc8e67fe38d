use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use travel_sentinel::alerting::AlertDispatcher;
use travel_sentinel::api::{self, AppState};
use travel_sentinel::config::Config;
use travel_sentinel::detection::ImpossibleTravelAnalyzer;

/// Impossible travel detection daemon: serves the HTTP API until Ctrl+C
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    // The log level comes from the config, so the logger is set up after
    // loading it and the missing-file case is reported afterwards
    let config_found = config_path.exists();
    let config = Config::load(&config_path)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.server.log_level.as_str()),
    )
    .init();

    log::info!("Starting impossible travel detection daemon...");
    if config_found {
        log::info!("Loaded configuration from {:?}", config_path);
    } else {
        log::warn!("Config file {:?} not found, using defaults", config_path);
    }
    log::info!(
        "Detection settings: window={} min, min_distance={} km, max_records={}",
        config.detection.time_window_minutes,
        config.detection.min_distance_km,
        config.detection.max_records_per_subject
    );

    // Alert dispatcher runs until the last queue handle is dropped
    let (alert_queue, alert_rx) = AlertDispatcher::create_channel();
    let dispatcher = AlertDispatcher::new(config.alerting.clone())?;
    let dispatcher_handle = tokio::spawn(dispatcher.run(alert_rx));
    if config.alerting.enabled {
        log::info!("Alerting enabled (min severity {})", config.alerting.min_severity);
    }

    let analyzer = ImpossibleTravelAnalyzer::from_config(&config, Some(alert_queue))?;
    log::info!("Using database at {:?}", config.storage.database_path);

    let app = api::router(AppState {
        analyzer: Arc::new(analyzer),
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    log::info!("Listening on {}", config.server.bind_address);
    log::info!("Daemon running. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and with it the analyzer's queue handle) is gone, so the
    // dispatcher drains what is left and exits
    if let Err(e) = dispatcher_handle.await {
        log::error!("Alert dispatcher task failed: {}", e);
    }

    log::info!("Daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Received shutdown signal, gracefully stopping..."),
        Err(e) => log::error!("Failed to listen for shutdown signal: {}", e),
    }
}
