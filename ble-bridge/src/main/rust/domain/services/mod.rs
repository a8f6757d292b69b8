mod advertising_data;

pub use advertising_data::{
    AdStructure, AdvertisingDataCodec, AD_TYPE_COMPLETE_LOCAL_NAME, AD_TYPE_FLAGS,
    AD_TYPE_MANUFACTURER_DATA, FLAG_BR_EDR_NOT_SUPPORTED, FLAG_LE_GENERAL_DISCOVERABLE,
    LEGACY_ADV_MAX_LEN, MAX_MANUFACTURER_DATA_LEN,
};
