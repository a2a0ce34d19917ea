//! Device Store - the authoritative map from spatial key to device.
//!
//! The store itself is plain in-memory state; the engine wraps it in a
//! single lock. Durable load/save goes through a [`DeviceRepository`] and
//! always moves the complete set (no incremental diffs).

use crate::config::PrinterConfig;
use crate::device::{Device, DeviceSnapshot};
use crate::persistence::{decode_entry, DeviceRecord, DeviceRepository, StoreError};
use printer_env::{ActorId, SpatialKey};
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct DeviceStore {
    devices: HashMap<SpatialKey, Device>,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a new device. Fails if `key` is already occupied.
    pub fn create(&mut self, key: SpatialKey, owner: ActorId, tier: u32) -> Result<&Device, StoreError> {
        use std::collections::hash_map::Entry;

        match self.devices.entry(key) {
            Entry::Occupied(entry) => Err(StoreError::DuplicateKey(entry.key().clone())),
            Entry::Vacant(entry) => Ok(entry.insert(Device::new(owner, tier))),
        }
    }

    /// Removes the device at `key`, if any.
    pub fn remove(&mut self, key: &SpatialKey) -> Option<Device> {
        self.devices.remove(key)
    }

    pub fn get(&self, key: &SpatialKey) -> Option<&Device> {
        self.devices.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &SpatialKey) -> Option<&mut Device> {
        self.devices.get_mut(key)
    }

    pub fn contains(&self, key: &SpatialKey) -> bool {
        self.devices.contains_key(key)
    }

    /// Point-in-time copy of every device, ordered by key.
    pub fn all(&self) -> Vec<(SpatialKey, DeviceSnapshot)> {
        let mut snapshot: Vec<_> = self
            .devices
            .iter()
            .map(|(key, device)| (key.clone(), device.clone()))
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot
    }

    pub fn keys(&self) -> Vec<SpatialKey> {
        self.devices.keys().cloned().collect()
    }

    pub fn count_by_owner(&self, owner: ActorId) -> usize {
        self.devices.values().filter(|d| d.owner() == owner).count()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Enforces the configured caps on every device. Returns how many changed.
    pub fn normalize(&mut self, config: &PrinterConfig) -> usize {
        self.devices
            .values_mut()
            .map(|device| device.normalize(config))
            .filter(|changed| *changed)
            .count()
    }

    /// Persistable form of the whole store, ordered by key.
    pub fn records(&self) -> Vec<DeviceRecord> {
        self.all()
            .iter()
            .map(|(key, device)| DeviceRecord::from_device(key, device))
            .collect()
    }

    /// Reads every device from `repository`.
    ///
    /// Malformed records are skipped with a warning; only a failure to read
    /// the backing store at all is an error.
    pub fn load(repository: &dyn DeviceRepository, config: &PrinterConfig) -> Result<Self, StoreError> {
        let entries = repository.load_entries()?;
        let total = entries.len();
        let mut store = Self::new();

        for (key, mut device) in entries.into_iter().filter_map(decode_entry) {
            if device.normalize(config) {
                warn!(key = %key, "Record outside configured bounds; clamped");
            }
            store.devices.insert(key, device);
        }

        info!(loaded = store.len(), skipped = total - store.len(), "Loaded devices");
        Ok(store)
    }

    /// Replaces the persisted set with the current contents.
    pub fn save(&self, repository: &dyn DeviceRepository) -> Result<(), StoreError> {
        repository.replace_all(&self.records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryRepository;

    fn key(x: i32) -> SpatialKey {
        SpatialKey::new("world", x, 64, 0)
    }

    #[test]
    fn test_create_and_duplicate() {
        let mut store = DeviceStore::new();
        let owner = ActorId::from_seed(1);

        let device = store.create(key(1), owner, 1).unwrap();
        assert_eq!(device.owner(), owner);
        assert_eq!(device.tier(), 1);

        assert!(matches!(
            store.create(key(1), ActorId::from_seed(2), 3),
            Err(StoreError::DuplicateKey(k)) if k == key(1)
        ));
        assert_eq!(store.get(&key(1)).unwrap().owner(), owner);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut store = DeviceStore::new();
        assert!(store.remove(&key(1)).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_count_by_owner() {
        let mut store = DeviceStore::new();
        let a = ActorId::from_seed(1);
        let b = ActorId::from_seed(2);
        store.create(key(1), a, 1).unwrap();
        store.create(key(2), a, 1).unwrap();
        store.create(key(3), b, 1).unwrap();

        assert_eq!(store.count_by_owner(a), 2);
        assert_eq!(store.count_by_owner(b), 1);
        assert_eq!(store.count_by_owner(ActorId::from_seed(3)), 0);
    }

    #[test]
    fn test_all_is_isolated_snapshot() {
        let mut store = DeviceStore::new();
        store.create(key(1), ActorId::from_seed(1), 1).unwrap();

        let snapshot = store.all();
        store.get_mut(&key(1)).unwrap().add_fuel(100, 3600);
        store.remove(&key(1));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].1.fuel_remaining_secs(), 0);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let config = PrinterConfig::default();
        let repo = MemoryRepository::new();
        let mut store = DeviceStore::new();

        let owner = ActorId::from_seed(1);
        store.create(key(1), owner, 2).unwrap();
        {
            let device = store.get_mut(&key(1)).unwrap();
            device.add_fuel(600, config.max_fuel_secs);
            device.add_friend(ActorId::from_seed(2));
        }
        store.create(key(2), ActorId::from_seed(3), 1).unwrap();

        store.save(&repo).unwrap();
        let loaded = DeviceStore::load(&repo, &config).unwrap();

        assert_eq!(loaded.all(), store.all());
    }
}
