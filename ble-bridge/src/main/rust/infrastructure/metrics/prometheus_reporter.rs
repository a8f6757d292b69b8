use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use crate::domain::ports::MetricsReporter;
use crate::domain::value_objects::AdvertisingState;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref CONNECTED_SESSIONS: IntGauge = IntGauge::new(
        "ble_bridge_connected_sessions",
        "Number of currently connected websocket sessions"
    ).expect("metric can be created");

    pub static ref ADVERTISEMENTS_RELAYED: IntCounter = IntCounter::new(
        "ble_bridge_advertisements_relayed_total",
        "Total advertisements received from the radio and broadcast"
    ).expect("metric can be created");

    // Events discarded because a session's outbound buffer was full
    pub static ref DELIVERIES_DROPPED: IntCounter = IntCounter::new(
        "ble_bridge_deliveries_dropped_total",
        "Total outbound events dropped for slow sessions"
    ).expect("metric can be created");

    // Advertising state (0=Idle, 1=Advertising)
    pub static ref ADVERTISING_STATE: IntGauge = IntGauge::new(
        "ble_bridge_advertising_state",
        "Current advertising state"
    ).expect("metric can be created");

    pub static ref ADVERTISING_FAILURES: IntCounter = IntCounter::new(
        "ble_bridge_advertising_failures_total",
        "Total failed advertising start attempts"
    ).expect("metric can be created");
}

pub struct PrometheusReporter;

impl PrometheusReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn init_metrics() -> Result<(), prometheus::Error> {
        REGISTRY.register(Box::new(CONNECTED_SESSIONS.clone()))?;
        REGISTRY.register(Box::new(ADVERTISEMENTS_RELAYED.clone()))?;
        REGISTRY.register(Box::new(DELIVERIES_DROPPED.clone()))?;
        REGISTRY.register(Box::new(ADVERTISING_STATE.clone()))?;
        REGISTRY.register(Box::new(ADVERTISING_FAILURES.clone()))?;
        Ok(())
    }

    pub fn gather_metrics() -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = REGISTRY.gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return b"# Error encoding metrics\n".to_vec();
        }
        buffer
    }
}

impl Default for PrometheusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsReporter for PrometheusReporter {
    fn report_session_opened(&self) {
        CONNECTED_SESSIONS.inc();
    }

    fn report_session_closed(&self) {
        CONNECTED_SESSIONS.dec();
    }

    fn report_advertisement_relayed(&self) {
        ADVERTISEMENTS_RELAYED.inc();
    }

    fn report_delivery_dropped(&self) {
        DELIVERIES_DROPPED.inc();
    }

    fn report_advertising_state(&self, state: &AdvertisingState) {
        ADVERTISING_STATE.set(state.as_metric());
    }

    fn report_advertising_failure(&self) {
        ADVERTISING_FAILURES.inc();
    }
}
