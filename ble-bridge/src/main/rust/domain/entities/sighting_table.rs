use std::collections::HashMap;

use crate::domain::value_objects::AdvertisementRecord;

/// Latest sighting per device; each sighting fully replaces the previous one
#[derive(Debug, Default)]
pub struct SightingTable {
    latest: HashMap<String, AdvertisementRecord>,
}

impl SightingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: AdvertisementRecord) {
        self.latest.insert(record.device_id().to_string(), record);
    }

    pub fn get(&self, device_id: &str) -> Option<&AdvertisementRecord> {
        self.latest.get(device_id)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    /// All devices, ordered by id
    pub fn snapshot(&self) -> Vec<AdvertisementRecord> {
        let mut records: Vec<_> = self.latest.values().cloned().collect();
        records.sort_by(|a, b| a.device_id().cmp(b.device_id()));
        records
    }
}
