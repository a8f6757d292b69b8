//! Broadcaster role on BlueZ.
//!
//! BlueZ composes the advertising payload itself, so raw AD bytes are decoded
//! back into typed fields before registration.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bluer::adv::{Advertisement, AdvertisementHandle, Type};
use bluer::Uuid;
use tokio::sync::Mutex;

use crate::domain::errors::{BridgeError, Result};
use crate::domain::ports::{AdvertisingPayload, PeripheralRole};
use crate::domain::services::{AdStructure, AdvertisingDataCodec, FLAG_LE_GENERAL_DISCOVERABLE};
use crate::domain::value_objects::{AdapterState, RadioRole};

/// Bluetooth base UUID; 16-bit ids occupy bits 96..112
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

pub struct BluezPeripheral {
    // Keeps the D-Bus connection alive for the adapter's lifetime
    _session: bluer::Session,
    adapter: bluer::Adapter,
    // Dropping the handle unregisters the advertisement
    active: Mutex<Option<AdvertisementHandle>>,
}

impl BluezPeripheral {
    pub async fn connect() -> Result<Self> {
        let session = bluer::Session::new()
            .await
            .map_err(|e| BridgeError::unavailable(RadioRole::Peripheral, e.to_string()))?;
        let adapter = session
            .default_adapter()
            .await
            .map_err(|e| BridgeError::unavailable(RadioRole::Peripheral, e.to_string()))?;

        tracing::info!(adapter = %adapter.name(), "Using BlueZ adapter for advertising");

        Ok(Self {
            _session: session,
            adapter,
            active: Mutex::new(None),
        })
    }

    fn advertisement(payload: AdvertisingPayload) -> Result<Advertisement> {
        match payload {
            AdvertisingPayload::Raw(bytes) => {
                Ok(advertisement_from_ad(&AdvertisingDataCodec::decode(&bytes)?))
            }
            AdvertisingPayload::Named {
                local_name,
                service_uuids,
            } => Ok(Advertisement {
                advertisement_type: Type::Peripheral,
                discoverable: Some(true),
                local_name: Some(local_name),
                service_uuids: service_uuids
                    .iter()
                    .map(|s| parse_uuid(s))
                    .collect::<Result<BTreeSet<_>>>()?,
                ..Default::default()
            }),
        }
    }
}

fn advertisement_from_ad(structures: &[AdStructure]) -> Advertisement {
    let mut discoverable = None;
    let mut local_name = None;
    let mut service_uuids = BTreeSet::new();
    let mut manufacturer_data = BTreeMap::new();

    for structure in structures {
        match structure {
            AdStructure::Flags(flags) => {
                discoverable = Some(flags & FLAG_LE_GENERAL_DISCOVERABLE != 0);
            }
            AdStructure::LocalName { name, .. } => {
                local_name = Some(String::from_utf8_lossy(name).into_owned());
            }
            AdStructure::ServiceUuids16(ids) => {
                service_uuids.extend(ids.iter().map(|id| uuid_from_u16(*id)));
            }
            AdStructure::ManufacturerData { company_id, data } => {
                manufacturer_data.insert(*company_id, data.clone());
            }
            AdStructure::Other { ad_type, .. } => {
                tracing::debug!(ad_type, "Skipping AD structure BlueZ cannot express");
            }
        }
    }

    Advertisement {
        advertisement_type: Type::Peripheral,
        discoverable,
        local_name,
        service_uuids,
        manufacturer_data,
        ..Default::default()
    }
}

fn uuid_from_u16(id: u16) -> Uuid {
    Uuid::from_u128(BASE_UUID | ((id as u128) << 96))
}

/// Full UUIDs, or 16-bit short forms like `180f`
fn parse_uuid(raw: &str) -> Result<Uuid> {
    if raw.len() == 4 {
        if let Ok(id) = u16::from_str_radix(raw, 16) {
            return Ok(uuid_from_u16(id));
        }
    }
    Uuid::parse_str(raw)
        .map_err(|e| BridgeError::InvalidAdvertisingData(format!("service uuid {raw:?}: {e}")))
}

#[async_trait]
impl PeripheralRole for BluezPeripheral {
    async fn state(&self) -> Result<AdapterState> {
        let powered = self
            .adapter
            .is_powered()
            .await
            .map_err(|e| BridgeError::AdapterStartFailure(e.to_string()))?;

        Ok(if powered {
            AdapterState::PoweredOn
        } else {
            AdapterState::PoweredOff
        })
    }

    async fn advertise(&self, payload: AdvertisingPayload) -> Result<()> {
        let advertisement = Self::advertisement(payload)?;
        let mut active = self.active.lock().await;

        let handle = self
            .adapter
            .advertise(advertisement)
            .await
            .map_err(|e| BridgeError::AdapterStartFailure(e.to_string()))?;

        // Previous advertisement is released only once the new one is registered
        *active = Some(handle);
        Ok(())
    }

    async fn stop_advertising(&self) -> Result<()> {
        self.active.lock().await.take();
        Ok(())
    }
}
