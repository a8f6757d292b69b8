use std::time::Duration;

use thiserror::Error;

use crate::domain::value_objects::RadioRole;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{role} role unavailable: {reason}")]
    CapabilityUnavailable { role: RadioRole, reason: String },

    #[error("Adapter start failed: {0}")]
    AdapterStartFailure(String),

    #[error("Adapter did not power on within {0:?}")]
    Timeout(Duration),

    #[error("Advertising start superseded by a stop request")]
    Superseded,

    #[error("Invalid advertising data: {0}")]
    InvalidAdvertisingData(String),

    #[error("Malformed command: {0}")]
    MalformedCommand(String),
}

impl BridgeError {
    pub fn unavailable(role: RadioRole, reason: impl Into<String>) -> Self {
        Self::CapabilityUnavailable {
            role,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
