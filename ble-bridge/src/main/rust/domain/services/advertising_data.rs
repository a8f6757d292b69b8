//! Raw BLE Advertising-Data (AD) structures.
//!
//! Each structure is `[len, type, data...]` where `len` counts the type byte
//! plus the data. The encoder always emits, in order: Flags, Complete Local
//! Name and, when the configuration carries a non-empty manufacturer payload,
//! Manufacturer Specific Data (company id little-endian, then the payload).

use crate::domain::errors::{BridgeError, Result};
use crate::domain::value_objects::{AdvertisingConfig, MAX_LOCAL_NAME_LEN};

pub const AD_TYPE_FLAGS: u8 = 0x01;
pub const AD_TYPE_INCOMPLETE_UUID16: u8 = 0x02;
pub const AD_TYPE_COMPLETE_UUID16: u8 = 0x03;
pub const AD_TYPE_SHORTENED_LOCAL_NAME: u8 = 0x08;
pub const AD_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;
pub const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

pub const FLAG_LE_GENERAL_DISCOVERABLE: u8 = 0x02;
pub const FLAG_BR_EDR_NOT_SUPPORTED: u8 = 0x04;

/// Legacy (non-extended) advertising payload limit
pub const LEGACY_ADV_MAX_LEN: usize = 31;

/// Largest manufacturer payload that still fits a one-byte length field
pub const MAX_MANUFACTURER_DATA_LEN: usize = u8::MAX as usize - 3;

/// A single decoded AD structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdStructure {
    Flags(u8),
    LocalName { complete: bool, name: Vec<u8> },
    ServiceUuids16(Vec<u16>),
    ManufacturerData { company_id: u16, data: Vec<u8> },
    Other { ad_type: u8, data: Vec<u8> },
}

pub struct AdvertisingDataCodec;

impl AdvertisingDataCodec {
    /// Serialize a configuration into raw AD bytes (pure, deterministic)
    pub fn encode(config: &AdvertisingConfig) -> Vec<u8> {
        let mut out = vec![
            0x02,
            AD_TYPE_FLAGS,
            FLAG_LE_GENERAL_DISCOVERABLE | FLAG_BR_EDR_NOT_SUPPORTED,
        ];

        // Cut at byte 26 even inside a multi-byte character; BlueZ decodes the
        // trailing fragment as U+FFFD
        let name = config.name().as_bytes();
        let name = &name[..name.len().min(MAX_LOCAL_NAME_LEN)];
        Self::push_structure(&mut out, AD_TYPE_COMPLETE_LOCAL_NAME, name);

        if let Some((company_id, data)) = config.manufacturer_field() {
            let data = &data[..data.len().min(MAX_MANUFACTURER_DATA_LEN)];
            let mut payload = Vec::with_capacity(2 + data.len());
            payload.extend_from_slice(&company_id.to_le_bytes());
            payload.extend_from_slice(data);
            Self::push_structure(&mut out, AD_TYPE_MANUFACTURER_DATA, &payload);
        }

        out
    }

    /// Split raw AD bytes back into structures; a zero length byte ends the
    /// significant part
    pub fn decode(bytes: &[u8]) -> Result<Vec<AdStructure>> {
        let mut structures = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            let len = bytes[pos] as usize;
            if len == 0 {
                break;
            }
            let end = pos + 1 + len;
            if end > bytes.len() {
                return Err(BridgeError::InvalidAdvertisingData(format!(
                    "structure at offset {} claims {} bytes, {} remain",
                    pos,
                    len,
                    bytes.len() - pos - 1
                )));
            }

            let ad_type = bytes[pos + 1];
            let data = &bytes[pos + 2..end];
            structures.push(Self::decode_structure(ad_type, data)?);
            pos = end;
        }

        Ok(structures)
    }

    fn decode_structure(ad_type: u8, data: &[u8]) -> Result<AdStructure> {
        let structure = match ad_type {
            AD_TYPE_FLAGS => AdStructure::Flags(data.first().copied().unwrap_or_default()),
            AD_TYPE_COMPLETE_LOCAL_NAME | AD_TYPE_SHORTENED_LOCAL_NAME => AdStructure::LocalName {
                complete: ad_type == AD_TYPE_COMPLETE_LOCAL_NAME,
                name: data.to_vec(),
            },
            AD_TYPE_INCOMPLETE_UUID16 | AD_TYPE_COMPLETE_UUID16 => {
                if data.len() % 2 != 0 {
                    return Err(BridgeError::InvalidAdvertisingData(
                        "16-bit UUID list has odd length".to_string(),
                    ));
                }
                AdStructure::ServiceUuids16(
                    data.chunks_exact(2)
                        .map(|c| u16::from_le_bytes([c[0], c[1]]))
                        .collect(),
                )
            }
            AD_TYPE_MANUFACTURER_DATA => {
                if data.len() < 2 {
                    return Err(BridgeError::InvalidAdvertisingData(
                        "manufacturer data shorter than company id".to_string(),
                    ));
                }
                AdStructure::ManufacturerData {
                    company_id: u16::from_le_bytes([data[0], data[1]]),
                    data: data[2..].to_vec(),
                }
            }
            _ => AdStructure::Other {
                ad_type,
                data: data.to_vec(),
            },
        };
        Ok(structure)
    }

    fn push_structure(out: &mut Vec<u8>, ad_type: u8, data: &[u8]) {
        out.push((data.len() + 1) as u8);
        out.push(ad_type);
        out.extend_from_slice(data);
    }
}
