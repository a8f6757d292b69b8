use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::RadioAdapter;
use crate::domain::entities::{AdvertisingLifecycle, LifecycleSnapshot};
use crate::domain::errors::BridgeError;
use crate::domain::ports::{AdvertisingPayload, MetricsReporter};
use crate::domain::services::{AdvertisingDataCodec, LEGACY_ADV_MAX_LEN};
use crate::domain::value_objects::{AdvertisingConfig, AdvertisingState, AdvertisingStatus};

/// Single-writer state machine over the bridge's advertising role.
///
/// The power-on wait runs outside the lifecycle lock. Every stop bumps the
/// generation, and a start that observes a newer generation once the adapter
/// is up gives up without advertising. Registration itself happens under the
/// lock, so a start while already advertising replaces the active
/// advertisement in place.
pub struct AdvertisingController {
    radio: Arc<RadioAdapter>,
    lifecycle: Mutex<AdvertisingLifecycle>,
    generation: AtomicU64,
    metrics: Arc<dyn MetricsReporter>,
}

impl AdvertisingController {
    pub fn new(radio: Arc<RadioAdapter>, metrics: Arc<dyn MetricsReporter>) -> Self {
        Self {
            radio,
            lifecycle: Mutex::new(AdvertisingLifecycle::new()),
            generation: AtomicU64::new(0),
            metrics,
        }
    }

    /// Start advertising (use case)
    pub async fn start(&self, config: AdvertisingConfig) -> AdvertisingStatus {
        let generation = self.generation.load(Ordering::SeqCst);
        let payload = Self::payload_for(&config);

        if let Err(e) = self.radio.wait_for_power_on().await {
            let mut lifecycle = self.lifecycle.lock().await;
            return self.start_failed(&mut lifecycle, e);
        }

        let mut lifecycle = self.lifecycle.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(name = %config.local_name(), "Advertising start cancelled by stop");
            return AdvertisingStatus::Error(BridgeError::Superseded.to_string());
        }

        match self.radio.advertise(payload).await {
            Ok(()) => {
                tracing::info!(
                    name = %config.local_name(),
                    manufacturer_id = ?config.manufacturer_id(),
                    raw = config.uses_raw_advertising(),
                    "Advertising started"
                );
                lifecycle.transition_to_advertising(config);
                self.metrics.report_advertising_state(lifecycle.current_state());
                AdvertisingStatus::Advertising
            }
            Err(e) => self.start_failed(&mut lifecycle, e),
        }
    }

    fn start_failed(&self, lifecycle: &mut AdvertisingLifecycle, e: BridgeError) -> AdvertisingStatus {
        tracing::warn!(error = %e, state = %lifecycle.current_state(), "Advertising start failed");
        lifecycle.record_failure(e.to_string());
        self.metrics.report_advertising_failure();
        AdvertisingStatus::Error(e.to_string())
    }

    /// Stop advertising; idempotent, adapter errors are swallowed. Cancels any
    /// start still waiting for the adapter.
    pub async fn stop(&self) -> AdvertisingStatus {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut lifecycle = self.lifecycle.lock().await;

        if let Err(e) = self.radio.stop_advertising().await {
            tracing::debug!(error = %e, "Ignoring adapter error on stop");
        }

        if lifecycle.current_state().is_advertising() {
            tracing::info!("Advertising stopped");
        }
        lifecycle.transition_to_idle(Some("Stop requested".to_string()));
        self.metrics.report_advertising_state(lifecycle.current_state());

        AdvertisingStatus::Stopped
    }

    pub async fn snapshot(&self) -> LifecycleSnapshot {
        self.lifecycle.lock().await.snapshot()
    }

    pub async fn current_state(&self) -> AdvertisingState {
        self.lifecycle.lock().await.current_state().clone()
    }

    pub async fn failure_count(&self) -> u64 {
        self.lifecycle.lock().await.failure_count()
    }

    /// Raw AD bytes for the manufacturer path, else name + service UUIDs
    pub fn payload_for(config: &AdvertisingConfig) -> AdvertisingPayload {
        if config.uses_raw_advertising() {
            let data = AdvertisingDataCodec::encode(config);
            if data.len() > LEGACY_ADV_MAX_LEN {
                tracing::warn!(
                    len = data.len(),
                    max = LEGACY_ADV_MAX_LEN,
                    "Advertising data exceeds legacy payload size"
                );
            }
            AdvertisingPayload::Raw(data)
        } else {
            AdvertisingPayload::Named {
                local_name: config.local_name().to_string(),
                service_uuids: config.service_uuids().to_vec(),
            }
        }
    }
}
