//! DashMap Signal Store
//!
//! Implements SignalStore using DashMap for lock-free concurrent access.
//! One map per signal kind stands in for the shard tables.

use crate::domain::entities::{SignalKey, SignalRecord};
use crate::domain::errors::LookupError;
use crate::domain::ports::SignalStore;
use crate::domain::value_objects::SignalKind;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// DashMap-backed signal store.
///
/// Used when no shard database is configured, and in tests.
pub struct DashMapSignalStore {
    bluetooth: Arc<DashMap<SignalKey, SignalRecord>>,
    wifi: Arc<DashMap<SignalKey, SignalRecord>>,
    cellular: Arc<DashMap<SignalKey, SignalRecord>>,
}

impl DashMapSignalStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            bluetooth: Arc::new(DashMap::new()),
            wifi: Arc::new(DashMap::new()),
            cellular: Arc::new(DashMap::new()),
        }
    }

    fn shard(&self, kind: SignalKind) -> &DashMap<SignalKey, SignalRecord> {
        match kind {
            SignalKind::Bluetooth => &self.bluetooth,
            SignalKind::Wifi => &self.wifi,
            SignalKind::Cellular => &self.cellular,
        }
    }

    /// Insert or replace a record in the shard of `kind`.
    pub fn insert(&self, kind: SignalKind, record: SignalRecord) {
        self.shard(kind).insert(record.key, record);
    }

    /// Number of records held for `kind`.
    pub fn len(&self, kind: SignalKind) -> usize {
        self.shard(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        SignalKind::ALL.iter().all(|kind| self.shard(*kind).is_empty())
    }
}

impl Default for DashMapSignalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalStore for DashMapSignalStore {
    async fn lookup(
        &self,
        kind: SignalKind,
        keys: &[SignalKey],
    ) -> Result<Vec<SignalRecord>, LookupError> {
        let shard = self.shard(kind);
        Ok(keys
            .iter()
            .filter_map(|key| shard.get(key).map(|e| e.value().clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CellId, MacAddr, Radio};
    use crate::domain::value_objects::CountryCode;

    fn mac_key(n: u8) -> SignalKey {
        SignalKey::Mac(MacAddr::new([0, 0, 0, 0, 0, n]))
    }

    fn record(key: SignalKey, region: &str, samples: u64) -> SignalRecord {
        SignalRecord::new(key, CountryCode::parse(region), samples)
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = DashMapSignalStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(SignalKind::Wifi), 0);
    }

    #[tokio::test]
    async fn test_lookup_returns_known_keys_only() {
        let store = DashMapSignalStore::new();
        store.insert(SignalKind::Wifi, record(mac_key(1), "GB", 10));

        let records = store
            .lookup(SignalKind::Wifi, &[mac_key(1), mac_key(2)])
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, mac_key(1));
    }

    #[tokio::test]
    async fn test_shards_are_separate() {
        let store = DashMapSignalStore::new();
        store.insert(SignalKind::Bluetooth, record(mac_key(1), "GB", 10));

        let wifi = store.lookup(SignalKind::Wifi, &[mac_key(1)]).await.unwrap();
        assert!(wifi.is_empty());

        let bluetooth = store
            .lookup(SignalKind::Bluetooth, &[mac_key(1)])
            .await
            .unwrap();
        assert_eq!(bluetooth.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_replaces_existing_record() {
        let store = DashMapSignalStore::new();
        let key = SignalKey::Cell(CellId::new(Radio::Lte, 262, 1, 2, 3));
        store.insert(SignalKind::Cellular, record(key, "DE", 10));
        store.insert(SignalKind::Cellular, record(key, "DE", 25));

        assert_eq!(store.len(SignalKind::Cellular), 1);
        let records = store.lookup(SignalKind::Cellular, &[key]).await.unwrap();
        assert_eq!(records[0].samples, 25);
    }

    #[tokio::test]
    async fn test_lookup_empty_keys() {
        let store = DashMapSignalStore::new();
        let records = store.lookup(SignalKind::Cellular, &[]).await.unwrap();
        assert!(records.is_empty());
    }
}
