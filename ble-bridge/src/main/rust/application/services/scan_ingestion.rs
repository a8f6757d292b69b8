use std::sync::Arc;
use std::time::SystemTime;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::RwLock;

use super::{RadioAdapter, SubscriberHub};
use crate::domain::entities::SightingTable;
use crate::domain::ports::RadioEvent;
use crate::domain::value_objects::{AdapterState, AdvertisementRecord};

/// Relays every discovery to the hub as a canonical record. No
/// deduplication, filtering or rate limiting.
pub struct ScanIngestion {
    radio: Arc<RadioAdapter>,
    hub: Arc<SubscriberHub>,
    sightings: Option<Arc<RwLock<SightingTable>>>,
}

impl ScanIngestion {
    pub fn new(radio: Arc<RadioAdapter>, hub: Arc<SubscriberHub>) -> Self {
        Self {
            radio,
            hub,
            sightings: None,
        }
    }

    /// Also keep the latest record per device
    pub fn with_sightings(mut self, sightings: Arc<RwLock<SightingTable>>) -> Self {
        self.sightings = Some(sightings);
        self
    }

    /// Consume an opened radio feed until it ends. The caller treats the
    /// return as fatal.
    pub async fn run(&self, mut events: BoxStream<'static, RadioEvent>) {
        while let Some(event) = events.next().await {
            self.handle(event).await;
        }

        tracing::error!("Radio event feed ended");
    }

    pub async fn handle(&self, event: RadioEvent) {
        match event {
            RadioEvent::StateChanged(state) => self.on_state_change(state).await,
            RadioEvent::Discovered(raw) => {
                let record = AdvertisementRecord::from_discovery(raw, SystemTime::now());
                if let Some(sightings) = &self.sightings {
                    sightings.write().await.record(record.clone());
                }
                self.hub.publish_advertisement(record).await;
            }
        }
    }

    async fn on_state_change(&self, state: AdapterState) {
        tracing::info!(%state, "BLE adapter state");

        if state.is_powered_on() {
            match self.radio.start_scanning().await {
                Ok(()) => tracing::info!("Scanning started"),
                Err(e) => tracing::error!(error = %e, "Failed to start scanning"),
            }
        } else if let Err(e) = self.radio.stop_scanning().await {
            tracing::debug!(error = %e, "Ignoring stop-scan error");
        }
    }
}
