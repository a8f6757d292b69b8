pub mod ble;
pub mod metrics;
pub mod websocket;
