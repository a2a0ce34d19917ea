//! Durable device records and the backends that hold them.
//!
//! One record per device, keyed by the textual spatial key
//! (`world_x_y_z`). Notification latches are not persisted.
//!
//! Every backend replaces the whole persisted set atomically:
//! - [`JsonFileRepository`] writes a temporary file and renames it over the target
//! - [`SledRepository`] applies a single `sled::Batch`

use crate::device::Device;
use printer_env::{ActorId, SpatialKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::warn;

/// Version number for the JSON document format
pub const FORMAT_VERSION: u32 = 1;

/// Store and persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Device already exists at {0}")]
    DuplicateKey(SpatialKey),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// RECORDS
// ============================================================================

/// Persisted body of one device.
///
/// Ids are kept as text so that one bad friend id costs only that friend,
/// not the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBody {
    pub owner: String,
    #[serde(default = "default_tier")]
    pub tier: u32,
    #[serde(default)]
    pub fuel_remaining_secs: u64,
    #[serde(default)]
    pub accrual_counter_secs: u64,
    #[serde(default)]
    pub stored_earnings: f64,
    #[serde(default)]
    pub friends: Vec<String>,
}

fn default_tier() -> u32 {
    1
}

/// A record ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub key: SpatialKey,
    pub body: RecordBody,
}

impl DeviceRecord {
    pub fn from_device(key: &SpatialKey, device: &Device) -> Self {
        Self {
            key: key.clone(),
            body: RecordBody {
                owner: device.owner().to_string(),
                tier: device.tier(),
                fuel_remaining_secs: device.fuel_remaining_secs(),
                accrual_counter_secs: device.accrual_counter_secs(),
                stored_earnings: device.stored_earnings(),
                friends: device.friends().iter().map(ActorId::to_string).collect(),
            },
        }
    }
}

/// An undecoded entry as read from a backend.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub key: String,
    pub body: Value,
}

/// Decodes one entry, or returns None (with a warning) if it is malformed.
pub fn decode_entry(entry: RawEntry) -> Option<(SpatialKey, Device)> {
    let key = match entry.key.parse::<SpatialKey>() {
        Ok(key) => key,
        Err(e) => {
            warn!(key = %entry.key, error = %e, "Skipping record with malformed key");
            return None;
        }
    };

    let body: RecordBody = match serde_json::from_value(entry.body) {
        Ok(body) => body,
        Err(e) => {
            warn!(key = %key, error = %e, "Skipping malformed record");
            return None;
        }
    };

    let owner = match body.owner.parse::<ActorId>() {
        Ok(owner) => owner,
        Err(e) => {
            warn!(key = %key, owner = %body.owner, error = %e, "Skipping record with invalid owner");
            return None;
        }
    };

    let mut friends = BTreeSet::new();
    for friend in &body.friends {
        match friend.parse::<ActorId>() {
            Ok(id) => {
                friends.insert(id);
            }
            Err(_) => warn!(key = %key, friend = %friend, "Invalid friend id in record; skipping friend"),
        }
    }

    let device = Device::restore(
        owner,
        body.tier,
        body.fuel_remaining_secs,
        body.accrual_counter_secs,
        body.stored_earnings,
        friends,
    );

    Some((key, device))
}

// ============================================================================
// REPOSITORY TRAIT
// ============================================================================

/// Trait for durable device storage.
///
/// Implementations must be thread-safe. `replace_all` must leave either the
/// old or the new set in place, never a mix.
pub trait DeviceRepository: Send + Sync {
    /// Reads every persisted entry. A missing backing store is empty, not an error.
    fn load_entries(&self) -> Result<Vec<RawEntry>, StoreError>;

    /// Replaces the persisted set with `records`.
    fn replace_all(&self, records: &[DeviceRecord]) -> Result<(), StoreError>;
}

// ============================================================================
// JSON FILE
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    version: u32,
    #[serde(default)]
    printers: BTreeMap<String, Value>,
}

/// Single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl DeviceRepository for JsonFileRepository {
    fn load_entries(&self) -> Result<Vec<RawEntry>, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let document: Document = serde_json::from_slice(&bytes)?;
        if document.version != FORMAT_VERSION {
            warn!(
                found = document.version,
                expected = FORMAT_VERSION,
                "Device file version mismatch; decoding anyway"
            );
        }

        Ok(document
            .printers
            .into_iter()
            .map(|(key, body)| RawEntry { key, body })
            .collect())
    }

    fn replace_all(&self, records: &[DeviceRecord]) -> Result<(), StoreError> {
        let mut printers = BTreeMap::new();
        for record in records {
            printers.insert(record.key.to_string(), serde_json::to_value(&record.body)?);
        }
        let bytes = serde_json::to_vec_pretty(&Document {
            version: FORMAT_VERSION,
            printers,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

// ============================================================================
// SLED
// ============================================================================

/// Sled-based persistent device store
///
/// Uses an embedded key-value database for durability.
pub struct SledRepository {
    db: sled::Db,
}

impl SledRepository {
    /// Open a persistent store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)
            .map_err(|e| StoreError::StorageError(format!("Failed to open sled DB: {}", e)))?;
        Ok(Self { db })
    }

    /// Create a temporary store, deleted on drop
    pub fn open_temp() -> Result<Self, StoreError> {
        let config = sled::Config::new().temporary(true);
        let db = config
            .open()
            .map_err(|e| StoreError::StorageError(format!("Failed to open temp DB: {}", e)))?;
        Ok(Self { db })
    }
}

impl DeviceRepository for SledRepository {
    fn load_entries(&self) -> Result<Vec<RawEntry>, StoreError> {
        let mut entries = Vec::new();
        for result in self.db.iter() {
            let (key, value) = result
                .map_err(|e| StoreError::StorageError(format!("Iteration failed: {}", e)))?;
            entries.push(RawEntry {
                key: String::from_utf8_lossy(&key).into_owned(),
                // Undecodable bytes become Null and are skipped by decode_entry.
                body: serde_json::from_slice(&value).unwrap_or(Value::Null),
            });
        }
        Ok(entries)
    }

    fn replace_all(&self, records: &[DeviceRecord]) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        let mut current = HashSet::new();

        for record in records {
            let key = record.key.to_string();
            batch.insert(key.as_bytes(), serde_json::to_vec(&record.body)?);
            current.insert(key.into_bytes());
        }

        for result in self.db.iter().keys() {
            let key = result
                .map_err(|e| StoreError::StorageError(format!("Iteration failed: {}", e)))?;
            if !current.contains(&key[..]) {
                batch.remove(key);
            }
        }

        self.db
            .apply_batch(batch)
            .map_err(|e| StoreError::StorageError(format!("Batch failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| StoreError::StorageError(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<DeviceRecord>,
    saves: usize,
    fail_saves: bool,
}

/// Volatile repository for tests and embedding without a disk.
///
/// Clones share the same state, so a clone kept by a test observes what
/// the engine wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of successful `replace_all` calls.
    pub fn save_count(&self) -> usize {
        self.state().saves
    }

    /// Records as last written.
    pub fn records(&self) -> Vec<DeviceRecord> {
        self.state().records.clone()
    }

    /// Makes subsequent saves fail (simulates a full disk).
    pub fn set_fail_saves(&self, fail: bool) {
        self.state().fail_saves = fail;
    }
}

impl DeviceRepository for MemoryRepository {
    fn load_entries(&self) -> Result<Vec<RawEntry>, StoreError> {
        self.state()
            .records
            .iter()
            .map(|record| -> Result<RawEntry, StoreError> {
                Ok(RawEntry {
                    key: record.key.to_string(),
                    body: serde_json::to_value(&record.body)?,
                })
            })
            .collect()
    }

    fn replace_all(&self, records: &[DeviceRecord]) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.fail_saves {
            return Err(StoreError::StorageError("simulated write failure".into()));
        }
        state.records = records.to_vec();
        state.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("printer-{prefix}-{unique}"))
    }

    fn sample_records() -> Vec<DeviceRecord> {
        let owner = ActorId::from_seed(1);
        let mut device = Device::new(owner, 2);
        device.add_fuel(300, 3600);
        device.add_friend(ActorId::from_seed(2));
        vec![
            DeviceRecord::from_device(&SpatialKey::new("world", 1, 64, 1), &device),
            DeviceRecord::from_device(&SpatialKey::new("world_nether", -4, 30, 9), &Device::new(owner, 1)),
        ]
    }

    fn decode_all(entries: Vec<RawEntry>) -> Vec<(SpatialKey, Device)> {
        let mut devices: Vec<_> = entries.into_iter().filter_map(decode_entry).collect();
        devices.sort_by(|a, b| a.0.cmp(&b.0));
        devices
    }

    #[test]
    fn test_decode_skips_malformed_key_and_body() {
        let good = json!({ "owner": ActorId::from_seed(1).to_string(), "tier": 2 });
        let entries = vec![
            RawEntry { key: "world_1_2_3".into(), body: good.clone() },
            RawEntry { key: "world_1_2".into(), body: good },
            RawEntry { key: "world_4_5_6".into(), body: json!({ "tier": "high" }) },
            RawEntry { key: "world_7_8_9".into(), body: json!({ "owner": "nobody" }) },
        ];

        let devices = decode_all(entries);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].0, SpatialKey::new("world", 1, 2, 3));
        assert_eq!(devices[0].1.tier(), 2);
    }

    #[test]
    fn test_decode_skips_bad_friend_only() {
        let friend = ActorId::from_seed(5);
        let entry = RawEntry {
            key: "world_0_0_0".into(),
            body: json!({
                "owner": ActorId::from_seed(1).to_string(),
                "friends": [friend.to_string(), "not-a-uuid"]
            }),
        };

        let (_, device) = decode_entry(entry).unwrap();
        assert_eq!(device.friends().len(), 1);
        assert!(device.is_friend(friend));
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = temp_dir("json-repo");
        let repo = JsonFileRepository::new(dir.join("printers.json"));
        let records = sample_records();

        repo.replace_all(&records).unwrap();
        let loaded = decode_all(repo.load_entries().unwrap());

        assert_eq!(loaded.len(), 2);
        let (key, device) = &loaded[0];
        assert_eq!(DeviceRecord::from_device(key, device), records[0]);
        assert!(!repo.temp_path().exists());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_json_file_missing_is_empty() {
        let repo = JsonFileRepository::new(temp_dir("json-missing").join("printers.json"));
        assert!(repo.load_entries().unwrap().is_empty());
    }

    #[test]
    fn test_json_file_replace_drops_removed_devices() {
        let dir = temp_dir("json-replace");
        let repo = JsonFileRepository::new(dir.join("printers.json"));
        let records = sample_records();

        repo.replace_all(&records).unwrap();
        repo.replace_all(&records[..1]).unwrap();

        assert_eq!(repo.load_entries().unwrap().len(), 1);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_json_file_corrupt_document_is_an_error() {
        let dir = temp_dir("json-corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("printers.json");
        std::fs::write(&path, b"{ this is not json").unwrap();

        let repo = JsonFileRepository::new(&path);
        assert!(matches!(repo.load_entries(), Err(StoreError::Serialization(_))));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_sled_round_trip_and_replace() {
        let repo = SledRepository::open_temp().unwrap();
        let records = sample_records();

        repo.replace_all(&records).unwrap();
        assert_eq!(decode_all(repo.load_entries().unwrap()).len(), 2);

        repo.replace_all(&records[1..]).unwrap();
        let loaded = decode_all(repo.load_entries().unwrap());
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, SpatialKey::new("world_nether", -4, 30, 9));
    }

    #[test]
    fn test_memory_repository_counts_and_fails() {
        let repo = MemoryRepository::new();
        repo.replace_all(&sample_records()).unwrap();
        assert_eq!(repo.save_count(), 1);

        repo.set_fail_saves(true);
        assert!(repo.replace_all(&[]).is_err());
        assert_eq!(repo.records().len(), 2);
    }
}
