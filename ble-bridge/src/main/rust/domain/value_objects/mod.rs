mod advertisement_record;
mod advertising_config;
mod advertising_state;
mod bridge_message;
mod radio_role;

pub use advertisement_record::{AdvertisementRecord, RawDiscovery, UNKNOWN_DEVICE_ID, UNKNOWN_NAME};
pub use advertising_config::{
    decode_manufacturer_hex, AdvertisingConfig, DEFAULT_LOCAL_NAME, MAX_LOCAL_NAME_LEN,
};
pub use advertising_state::AdvertisingState;
pub use bridge_message::{AdvertisingRequest, AdvertisingStatus, InboundCommand, OutboundEvent};
pub use radio_role::{AdapterState, RadioRole};
