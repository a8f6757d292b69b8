#[cfg(feature = "central")]
mod btleplug_central;
#[cfg(all(feature = "peripheral", target_os = "linux"))]
mod bluez_peripheral;

use std::sync::Arc;

use crate::application::services::Capability;
use crate::domain::errors::Result;
use crate::domain::ports::{CentralRole, PeripheralRole};

#[cfg(feature = "central")]
pub use btleplug_central::BtleplugCentral;
#[cfg(all(feature = "peripheral", target_os = "linux"))]
pub use bluez_peripheral::BluezPeripheral;

/// Initialise the observer role; the bridge cannot run without it
#[cfg(feature = "central")]
pub async fn connect_central() -> Result<Arc<dyn CentralRole>> {
    Ok(Arc::new(BtleplugCentral::connect().await?))
}

#[cfg(not(feature = "central"))]
pub async fn connect_central() -> Result<Arc<dyn CentralRole>> {
    use crate::domain::errors::BridgeError;
    use crate::domain::value_objects::RadioRole;

    Err(BridgeError::unavailable(
        RadioRole::Central,
        "built without central support",
    ))
}

/// Initialise the broadcaster role; absence is reported, not fatal
#[cfg(all(feature = "peripheral", target_os = "linux"))]
pub async fn connect_peripheral() -> Capability<Arc<dyn PeripheralRole>> {
    match BluezPeripheral::connect().await {
        Ok(peripheral) => Capability::Present(Arc::new(peripheral)),
        Err(e) => {
            tracing::warn!(error = %e, "Advertising unavailable");
            Capability::Absent(e.to_string())
        }
    }
}

#[cfg(not(all(feature = "peripheral", target_os = "linux")))]
pub async fn connect_peripheral() -> Capability<Arc<dyn PeripheralRole>> {
    tracing::warn!("Advertising unavailable: built without peripheral support");
    Capability::Absent("built without peripheral support".to_string())
}
