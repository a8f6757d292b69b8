use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domain::errors::Result;
use crate::domain::value_objects::{AdapterState, RawDiscovery};

/// Events emitted by the observer role
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    Discovered(RawDiscovery),
    StateChanged(AdapterState),
}

/// How an advertisement is handed to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvertisingPayload {
    /// Pre-encoded AD structures
    Raw(Vec<u8>),
    /// Platform builds the payload from a name and service UUIDs
    Named {
        local_name: String,
        service_uuids: Vec<String>,
    },
}

/// Port for the platform's observer (scanning) capability
#[async_trait]
pub trait CentralRole: Send + Sync {
    /// Open the event feed. The current adapter state is delivered first so
    /// consumers never miss an already powered-on radio.
    async fn events(&self) -> Result<BoxStream<'static, RadioEvent>>;

    /// Begin continuous discovery; duplicate advertisements are kept
    async fn start_scan(&self) -> Result<()>;

    async fn stop_scan(&self) -> Result<()>;
}

/// Port for the platform's broadcaster (advertising) capability
#[async_trait]
pub trait PeripheralRole: Send + Sync {
    async fn state(&self) -> Result<AdapterState>;

    /// Start advertising; replaces any advertisement this role already holds
    async fn advertise(&self, payload: AdvertisingPayload) -> Result<()>;

    async fn stop_advertising(&self) -> Result<()>;
}
