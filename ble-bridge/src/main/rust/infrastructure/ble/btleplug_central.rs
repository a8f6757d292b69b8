use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::stream::{self, BoxStream};
use futures::StreamExt;

use crate::domain::errors::{BridgeError, Result};
use crate::domain::ports::{CentralRole, RadioEvent};
use crate::domain::value_objects::{AdapterState, RadioRole, RawDiscovery};

/// Observer role backed by the first adapter btleplug reports
pub struct BtleplugCentral {
    adapter: Adapter,
}

impl BtleplugCentral {
    pub async fn connect() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|e| BridgeError::unavailable(RadioRole::Central, e.to_string()))?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|e| BridgeError::unavailable(RadioRole::Central, e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::unavailable(RadioRole::Central, "no bluetooth adapter found"))?;

        match adapter.adapter_info().await {
            Ok(info) => tracing::info!(adapter = %info, "Using BLE adapter for scanning"),
            Err(e) => tracing::debug!(error = %e, "Adapter info unavailable"),
        }

        Ok(Self { adapter })
    }

    async fn discovery(adapter: &Adapter, id: PeripheralId) -> Option<RawDiscovery> {
        let peripheral = match adapter.peripheral(&id).await {
            Ok(p) => p,
            Err(e) => {
                tracing::trace!(error = %e, "Failed to get peripheral");
                return None;
            }
        };

        let props = peripheral.properties().await.ok().flatten()?;

        // Reported as the raw AD payload: company id little-endian, then data
        let manufacturer_data = {
            let mut entries: Vec<_> = props.manufacturer_data.iter().collect();
            entries.sort_by_key(|(company_id, _)| **company_id);
            entries.first().map(|(company_id, data)| {
                let mut payload = company_id.to_le_bytes().to_vec();
                payload.extend_from_slice(data);
                payload
            })
        };

        Some(RawDiscovery {
            platform_id: Some(id.to_string()),
            address: Some(props.address.to_string()),
            local_name: props.local_name,
            rssi: props.rssi,
            tx_power: props.tx_power_level,
            service_uuids: props.services.iter().map(|u| u.to_string()).collect(),
            manufacturer_data,
        })
    }
}

fn adapter_state(state: CentralState) -> AdapterState {
    match state {
        CentralState::PoweredOn => AdapterState::PoweredOn,
        CentralState::PoweredOff => AdapterState::PoweredOff,
        _ => AdapterState::Unknown,
    }
}

#[async_trait]
impl CentralRole for BtleplugCentral {
    async fn events(&self) -> Result<BoxStream<'static, RadioEvent>> {
        let events = self
            .adapter
            .events()
            .await
            .map_err(|e| BridgeError::AdapterStartFailure(e.to_string()))?;

        let initial = match self.adapter.adapter_state().await {
            Ok(state) => adapter_state(state),
            Err(e) => {
                tracing::debug!(error = %e, "Adapter state unavailable");
                AdapterState::Unknown
            }
        };

        let adapter = self.adapter.clone();
        let feed = events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move {
                match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                        BtleplugCentral::discovery(&adapter, id).await.map(RadioEvent::Discovered)
                    }
                    CentralEvent::StateUpdate(state) => {
                        Some(RadioEvent::StateChanged(adapter_state(state)))
                    }
                    _ => None,
                }
            }
        });

        Ok(stream::once(async move { RadioEvent::StateChanged(initial) })
            .chain(feed)
            .boxed())
    }

    async fn start_scan(&self) -> Result<()> {
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| BridgeError::AdapterStartFailure(e.to_string()))
    }

    async fn stop_scan(&self) -> Result<()> {
        self.adapter
            .stop_scan()
            .await
            .map_err(|e| BridgeError::AdapterStartFailure(e.to_string()))
    }
}
