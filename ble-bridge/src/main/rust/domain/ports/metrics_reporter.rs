use crate::domain::value_objects::AdvertisingState;

/// Port for metrics reporting
pub trait MetricsReporter: Send + Sync {
    fn report_session_opened(&self);
    fn report_session_closed(&self);
    fn report_advertisement_relayed(&self);
    fn report_delivery_dropped(&self);
    fn report_advertising_state(&self, state: &AdvertisingState);
    fn report_advertising_failure(&self);
}
