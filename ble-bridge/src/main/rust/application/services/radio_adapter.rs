use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;

use crate::domain::errors::{BridgeError, Result};
use crate::domain::ports::{AdvertisingPayload, CentralRole, PeripheralRole, RadioEvent};
use crate::domain::value_objects::RadioRole;

/// How often the peripheral is polled while waiting for power-on
pub const POWER_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A platform role that was either initialised at startup or found missing
pub enum Capability<T> {
    Present(T),
    Absent(String),
}

impl<T> Capability<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    fn require(&self, role: RadioRole) -> Result<&T> {
        match self {
            Self::Present(inner) => Ok(inner),
            Self::Absent(reason) => Err(BridgeError::unavailable(role, reason.clone())),
        }
    }
}

/// The single radio shared by scanning and advertising. The two roles are
/// independent: one being absent never degrades the other.
pub struct RadioAdapter {
    central: Capability<Arc<dyn CentralRole>>,
    peripheral: Capability<Arc<dyn PeripheralRole>>,
    power_on_timeout: Duration,
}

impl RadioAdapter {
    pub fn new(
        central: Capability<Arc<dyn CentralRole>>,
        peripheral: Capability<Arc<dyn PeripheralRole>>,
        power_on_timeout: Duration,
    ) -> Self {
        Self {
            central,
            peripheral,
            power_on_timeout,
        }
    }

    pub fn has_role(&self, role: RadioRole) -> bool {
        match role {
            RadioRole::Central => self.central.is_present(),
            RadioRole::Peripheral => self.peripheral.is_present(),
        }
    }

    pub fn power_on_timeout(&self) -> Duration {
        self.power_on_timeout
    }

    /// Discovery and adapter-state feed
    pub async fn events(&self) -> Result<BoxStream<'static, RadioEvent>> {
        self.central.require(RadioRole::Central)?.events().await
    }

    pub async fn start_scanning(&self) -> Result<()> {
        self.central.require(RadioRole::Central)?.start_scan().await
    }

    pub async fn stop_scanning(&self) -> Result<()> {
        self.central.require(RadioRole::Central)?.stop_scan().await
    }

    /// Waits (bounded) for the peripheral to power on, then hands the payload
    /// to the platform
    pub async fn start_advertising(&self, payload: AdvertisingPayload) -> Result<()> {
        self.wait_for_power_on().await?;
        self.advertise(payload).await
    }

    /// Polls the peripheral until it reports powered-on or the timeout expires
    pub async fn wait_for_power_on(&self) -> Result<()> {
        let peripheral = self.peripheral.require(RadioRole::Peripheral)?;
        let wait = async {
            loop {
                let state = peripheral.state().await?;
                if state.is_powered_on() {
                    return Ok::<(), BridgeError>(());
                }
                tracing::debug!(%state, "Waiting for adapter to power on");
                tokio::time::sleep(POWER_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(self.power_on_timeout, wait)
            .await
            .map_err(|_| BridgeError::Timeout(self.power_on_timeout))?
    }

    /// Hands the payload to the platform without waiting for power-on
    pub async fn advertise(&self, payload: AdvertisingPayload) -> Result<()> {
        self.peripheral
            .require(RadioRole::Peripheral)?
            .advertise(payload)
            .await
    }

    /// No-op when the peripheral role is absent
    pub async fn stop_advertising(&self) -> Result<()> {
        match &self.peripheral {
            Capability::Present(peripheral) => peripheral.stop_advertising().await,
            Capability::Absent(_) => Ok(()),
        }
    }
}
