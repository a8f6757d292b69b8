/// Local-name length ceiling in the encoded payload (bytes)
pub const MAX_LOCAL_NAME_LEN: usize = 26;

/// Name used when a start request carries none
pub const DEFAULT_LOCAL_NAME: &str = "Advertiser";

/// Logical advertising configuration requested by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingConfig {
    name: String,
    manufacturer_id: Option<u16>,
    manufacturer_data: Option<Vec<u8>>,
    service_uuids: Vec<String>,
}

impl AdvertisingConfig {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.is_empty() {
            DEFAULT_LOCAL_NAME.to_string()
        } else {
            name
        };

        Self {
            name,
            manufacturer_id: None,
            manufacturer_data: None,
            service_uuids: Vec::new(),
        }
    }

    pub fn with_manufacturer_id(mut self, id: u16) -> Self {
        self.manufacturer_id = Some(id);
        self
    }

    pub fn with_manufacturer_data(mut self, data: Vec<u8>) -> Self {
        self.manufacturer_data = Some(data);
        self
    }

    /// Odd digit counts and non-hex digits yield an empty payload
    pub fn with_manufacturer_hex(self, hex: &str) -> Self {
        self.with_manufacturer_data(decode_manufacturer_hex(hex))
    }

    pub fn with_service_uuids(mut self, uuids: Vec<String>) -> Self {
        self.service_uuids = uuids;
        self
    }

    /// Requested name, untruncated
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name cut to the local-name ceiling on a character boundary
    pub fn local_name(&self) -> &str {
        truncate_on_char_boundary(&self.name, MAX_LOCAL_NAME_LEN)
    }

    pub fn manufacturer_id(&self) -> Option<u16> {
        self.manufacturer_id
    }

    pub fn manufacturer_data(&self) -> Option<&[u8]> {
        self.manufacturer_data.as_deref()
    }

    pub fn service_uuids(&self) -> &[String] {
        &self.service_uuids
    }

    /// Both-or-neither: the raw AD path needs an id and a supplied payload
    pub fn uses_raw_advertising(&self) -> bool {
        self.manufacturer_id.is_some() && self.manufacturer_data.is_some()
    }

    /// Manufacturer field contents, present only with an id and non-empty data
    pub fn manufacturer_field(&self) -> Option<(u16, &[u8])> {
        match (self.manufacturer_id, self.manufacturer_data.as_deref()) {
            (Some(id), Some(data)) if !data.is_empty() => Some((id, data)),
            _ => None,
        }
    }
}

/// Decode operator-supplied hex, ignoring whitespace
pub fn decode_manufacturer_hex(hex: &str) -> Vec<u8> {
    let clean: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if clean.len() % 2 != 0 {
        return Vec::new();
    }
    hex::decode(&clean).unwrap_or_default()
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
