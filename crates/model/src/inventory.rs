use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// An object currently stored in the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub key: String,
    /// Content hash as reported by the store, surrounding quotes removed.
    pub content_hash: String,
    pub last_modified: DateTime<Utc>,
}

/// Snapshot of the bucket contents, keyed by object key.
///
/// Fetched once per delta run and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    records: HashMap<String, RemoteRecord>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: RemoteRecord) {
        self.records.insert(record.key.clone(), record);
    }

    pub fn get(&self, key: &str) -> Option<&RemoteRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<RemoteRecord> for Inventory {
    fn from_iter<I: IntoIterator<Item = RemoteRecord>>(iter: I) -> Self {
        let mut inventory = Inventory::new();
        for record in iter {
            inventory.insert(record);
        }
        inventory
    }
}
