mod metrics_reporter;
mod radio;

pub use metrics_reporter::MetricsReporter;
pub use radio::{AdvertisingPayload, CentralRole, PeripheralRole, RadioEvent};
