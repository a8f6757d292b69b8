use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

/// Display name for devices that advertise none
pub const UNKNOWN_NAME: &str = "Unknown";

/// Identifier for devices the platform gives us nothing for
pub const UNKNOWN_DEVICE_ID: &str = "unknown";

/// One advertisement as the platform reported it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDiscovery {
    pub platform_id: Option<String>,
    pub address: Option<String>,
    pub local_name: Option<String>,
    pub rssi: Option<i16>,
    pub tx_power: Option<i16>,
    pub service_uuids: Vec<String>,
    /// Manufacturer AD payload: little-endian company id followed by data
    pub manufacturer_data: Option<Vec<u8>>,
}

/// Canonical advertisement record relayed to every session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvertisementRecord {
    #[serde(rename = "id")]
    device_id: String,
    #[serde(rename = "name")]
    display_name: String,
    rssi: Option<i16>,
    #[serde(rename = "txPower")]
    tx_power: Option<i16>,
    #[serde(rename = "uuids")]
    service_uuids: Vec<String>,
    #[serde(rename = "manufacturer", serialize_with = "serialize_manufacturer")]
    manufacturer_data: Option<Vec<u8>>,
    #[serde(rename = "seenAt")]
    observed_at_ms: u64,
}

impl AdvertisementRecord {
    /// Normalize a raw discovery; `observed_at` is ingestion time, not device time
    pub fn from_discovery(raw: RawDiscovery, observed_at: SystemTime) -> Self {
        let local_name = non_empty(raw.local_name);
        let device_id = non_empty(raw.platform_id)
            .or_else(|| non_empty(raw.address))
            .or_else(|| local_name.clone())
            .unwrap_or_else(|| UNKNOWN_DEVICE_ID.to_string());

        Self {
            device_id,
            display_name: local_name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            rssi: raw.rssi,
            tx_power: raw.tx_power,
            service_uuids: raw.service_uuids,
            manufacturer_data: raw.manufacturer_data.filter(|data| !data.is_empty()),
            observed_at_ms: epoch_millis(observed_at),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn rssi(&self) -> Option<i16> {
        self.rssi
    }

    pub fn tx_power(&self) -> Option<i16> {
        self.tx_power
    }

    pub fn service_uuids(&self) -> &[String] {
        &self.service_uuids
    }

    pub fn manufacturer_data(&self) -> Option<&[u8]> {
        self.manufacturer_data.as_deref()
    }

    pub fn observed_at_ms(&self) -> u64 {
        self.observed_at_ms
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn epoch_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn serialize_manufacturer<S>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match data {
        Some(bytes) => serializer.serialize_str(&format!("0x{}", hex::encode(bytes))),
        None => serializer.serialize_none(),
    }
}
