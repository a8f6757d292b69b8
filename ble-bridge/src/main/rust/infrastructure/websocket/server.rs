use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::RwLock;
use warp::ws::{Message, WebSocket};
use warp::Filter;

use crate::application::services::SubscriberHub;
use crate::domain::entities::SightingTable;
use crate::infrastructure::metrics::PrometheusReporter;

/// Health check response structure
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// WebSocket endpoint at `/` plus the HTTP probes, metrics and the
/// advertising report. `/devices` answers only when sightings are retained.
pub fn routes(
    hub: Arc<SubscriberHub>,
    sightings: Option<Arc<RwLock<SightingTable>>>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    // CORS configuration for browser access
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "OPTIONS"])
        .allow_headers(vec!["Content-Type"]);

    let metrics_route = warp::path("metrics").map(|| {
        let body = PrometheusReporter::gather_metrics();
        warp::reply::with_header(body, "content-type", "text/plain; version=0.0.4; charset=utf-8")
    });

    let health_route = warp::path("health").map(|| {
        let response = HealthResponse {
            status: "healthy",
            service: "ble-bridge",
            version: env!("CARGO_PKG_VERSION"),
        };
        warp::reply::json(&response)
    });

    let liveness_route =
        warp::path("livez").map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    let readiness_route = warp::path("readyz").map(|| {
        let response = HealthResponse {
            status: "ready",
            service: "ble-bridge",
            version: env!("CARGO_PKG_VERSION"),
        };
        warp::reply::json(&response)
    });

    let devices_route = warp::path("devices")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::any().map(move || sightings.clone()))
        .and_then(list_devices);

    let advertising_hub = hub.clone();
    let advertising_route = warp::path("advertising")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::any().map(move || advertising_hub.clone()))
        .and_then(advertising_report);

    let ws_route = warp::path::end()
        .and(warp::ws())
        .and(warp::any().map(move || hub.clone()))
        .map(|ws: warp::ws::Ws, hub: Arc<SubscriberHub>| {
            ws.on_upgrade(move |socket| handle_connection(socket, hub))
        });

    metrics_route
        .or(health_route)
        .or(liveness_route)
        .or(readiness_route)
        .or(devices_route)
        .or(advertising_route)
        .or(ws_route)
        .with(cors)
}

async fn list_devices(
    sightings: Option<Arc<RwLock<SightingTable>>>,
) -> Result<warp::reply::Json, warp::Rejection> {
    match sightings {
        Some(table) => Ok(warp::reply::json(&table.read().await.snapshot())),
        None => Err(warp::reject::not_found()),
    }
}

async fn advertising_report(
    hub: Arc<SubscriberHub>,
) -> Result<warp::reply::Json, warp::Rejection> {
    Ok(warp::reply::json(&hub.controller().snapshot().await))
}

/// One client for its whole lifetime: register, pump outbound events from the
/// session buffer, feed inbound frames to the hub, deregister on close.
pub async fn handle_connection(socket: WebSocket, hub: Arc<SubscriberHub>) {
    let (id, mut outbound) = hub.connect().await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let forward_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let json = match event.to_json() {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to serialize outbound event");
                    continue;
                }
            };
            if ws_tx.send(Message::text(json)).await.is_err() {
                break;
            }
        }
    });

    hub.open_session(&id).await;
    tracing::info!(session_id = %id, "Client connected");

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(msg) if msg.is_close() => break,
            Ok(msg) if msg.is_text() || msg.is_binary() => match std::str::from_utf8(msg.as_bytes()) {
                Ok(text) => hub.on_message(&id, text).await,
                Err(_) => tracing::debug!(session_id = %id, "Dropping non UTF-8 frame"),
            },
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(session_id = %id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    hub.remove_session(&id).await;
    forward_task.abort();
    tracing::info!(session_id = %id, "Client disconnected");
}
