use serde::{Deserialize, Serialize};

use super::{AdvertisementRecord, AdvertisingConfig};
use crate::domain::errors::{BridgeError, Result};

/// Commands a session may send to the bridge
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum InboundCommand {
    #[serde(rename = "adv.start")]
    StartAdvertising {
        #[serde(default)]
        config: Option<AdvertisingRequest>,
    },
    #[serde(rename = "adv.stop")]
    StopAdvertising,
}

impl InboundCommand {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| BridgeError::MalformedCommand(e.to_string()))
    }
}

/// Wire form of an advertising configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvertisingRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub manufacturer_id: Option<u16>,
    #[serde(default)]
    pub manufacturer_data_hex: Option<String>,
    #[serde(default)]
    pub service_uuids: Option<Vec<String>>,
}

impl From<AdvertisingRequest> for AdvertisingConfig {
    fn from(request: AdvertisingRequest) -> Self {
        let mut config = AdvertisingConfig::new(request.name.unwrap_or_default())
            .with_service_uuids(request.service_uuids.unwrap_or_default());

        if let Some(id) = request.manufacturer_id {
            config = config.with_manufacturer_id(id);
        }
        // An empty hex string counts as not supplied
        if let Some(hex) = request.manufacturer_data_hex.filter(|h| !h.is_empty()) {
            config = config.with_manufacturer_hex(&hex);
        }
        config
    }
}

/// Outcome of a start/stop request, reported to the requesting session only
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvertisingStatus {
    Advertising,
    Stopped,
    Error(String),
}

impl AdvertisingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advertising => "advertising",
            Self::Stopped => "stopped",
            Self::Error(_) => "error",
        }
    }
}

/// Events the bridge sends to sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum OutboundEvent {
    #[serde(rename = "adv")]
    Advertisement(AdvertisementRecord),
    #[serde(rename = "adv.status")]
    Status {
        status: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl OutboundEvent {
    pub fn status(status: AdvertisingStatus) -> Self {
        let label = status.as_str();
        let error = match status {
            AdvertisingStatus::Error(message) => Some(message),
            _ => None,
        };
        Self::Status {
            status: label,
            error,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
