use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::{oneshot, Mutex, RwLock};
use tracing::{error, info};

use ble_bridge::{
    connect_central, connect_peripheral, routes, AdvertisingController, Capability, Config,
    PrometheusReporter, RadioAdapter, ScanIngestion, SightingTable, SubscriberHub,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration
    let config = Config::parse();
    config.validate()?;

    // Initialize logging
    let filter = if config.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    // Initialize metrics
    PrometheusReporter::init_metrics()?;

    info!("Starting BLE bridge");
    info!("  Port: {}", config.port);
    info!("  Power-on timeout: {:?}", config.power_on_timeout());
    info!("  Retain sightings: {}", config.retain_sightings);

    // Scanning is the bridge's reason to exist; advertising is optional
    let central = connect_central()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let peripheral = connect_peripheral().await;

    // Create infrastructure implementations (dependency injection)
    let radio = Arc::new(RadioAdapter::new(
        Capability::Present(central),
        peripheral,
        config.power_on_timeout(),
    ));
    let metrics_reporter = Arc::new(PrometheusReporter::new());

    // Create application services
    let controller = Arc::new(AdvertisingController::new(
        radio.clone(),
        metrics_reporter.clone(),
    ));
    let hub = Arc::new(SubscriberHub::new(controller.clone(), metrics_reporter));

    let sightings = config
        .retain_sightings
        .then(|| Arc::new(RwLock::new(SightingTable::new())));

    let mut ingestion = ScanIngestion::new(radio.clone(), hub.clone());
    if let Some(table) = &sightings {
        ingestion = ingestion.with_sightings(table.clone());
    }

    // A bridge that cannot hear the radio has nothing to relay
    let events = radio
        .events()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open BLE event feed: {}", e))?;

    // Set up graceful shutdown
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let shutdown_tx = Arc::new(Mutex::new(Some(shutdown_tx)));

    // Feed end is fatal
    let feed_shutdown_tx = shutdown_tx.clone();
    let feed_ended = Arc::new(AtomicBool::new(false));
    let feed_ended_flag = feed_ended.clone();
    let ingestion_handle = tokio::spawn(async move {
        ingestion.run(events).await;
        feed_ended_flag.store(true, Ordering::SeqCst);
        if let Some(tx) = feed_shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }
    });

    // Handle Ctrl+C
    let signal_shutdown_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal");
        if let Some(tx) = signal_shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }
    });

    let (addr, server) = warp::serve(routes(hub, sightings))
        .try_bind_with_graceful_shutdown(([0, 0, 0, 0], config.port), async {
            shutdown_rx.await.ok();
        })?;

    info!("BLE bridge listening on ws://{}", addr);

    server.await;

    controller.stop().await;
    ingestion_handle.abort();

    if feed_ended.load(Ordering::SeqCst) {
        anyhow::bail!("BLE event feed ended");
    }

    info!("BLE bridge shutdown complete");
    Ok(())
}
