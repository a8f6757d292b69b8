mod advertising_controller;
mod radio_adapter;
mod scan_ingestion;
mod subscriber_hub;

pub use advertising_controller::AdvertisingController;
pub use radio_adapter::{Capability, RadioAdapter, POWER_POLL_INTERVAL};
pub use scan_ingestion::ScanIngestion;
pub use subscriber_hub::{SubscriberHub, SESSION_BUFFER};
