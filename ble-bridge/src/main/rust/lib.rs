pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-exports for convenience
pub use application::services::{
    AdvertisingController, Capability, RadioAdapter, ScanIngestion, SubscriberHub,
};
pub use config::Config;
pub use domain::entities::{
    AdvertisingLifecycle, BridgeSession, LifecycleSnapshot, SightingTable, StateTransition,
};
pub use domain::errors::{BridgeError, Result};
pub use domain::ports::{AdvertisingPayload, CentralRole, MetricsReporter, PeripheralRole, RadioEvent};
pub use domain::services::AdvertisingDataCodec;
pub use domain::value_objects::{
    AdapterState, AdvertisementRecord, AdvertisingConfig, AdvertisingState, AdvertisingStatus,
    InboundCommand, OutboundEvent, RawDiscovery,
};
pub use infrastructure::ble::{connect_central, connect_peripheral};
pub use infrastructure::metrics::PrometheusReporter;
pub use infrastructure::websocket::routes;
