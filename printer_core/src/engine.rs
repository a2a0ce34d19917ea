//! Printer Engine - owns the store and ties the components together.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        PrinterEngine                         │
//! │  ┌───────────────────┐  ┌──────────────────────────────────┐ │
//! │  │ Mutex<DeviceStore>│  │ RwLock<Arc<PrinterConfig>>       │ │
//! │  │  one critical     │  │  swapped whole on reload         │ │
//! │  │  section for all  │  └──────────────────────────────────┘ │
//! │  │  mutation         │  ┌──────────────────────────────────┐ │
//! │  └───────────────────┘  │ DeviceRepository (+ save lock)   │ │
//! │                         └──────────────────────────────────┘ │
//! │  ┌────────┐ ┌───────────┐ ┌─────────────┐ ┌───────┐ ┌──────┐ │
//! │  │ Ledger │ │ Inventory │ │ Permissions │ │ World │ │Notify│ │
//! │  └────────┘ └───────────┘ └─────────────┘ └───────┘ └──────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Intents and sweeps each run as one critical section over the store;
//! the save that follows happens after the store lock is released.
//!
//! # Usage
//!
//! ```ignore
//! use printer_core::{PrinterConfig, PrinterEngine, JsonFileRepository, Intent};
//!
//! let engine = PrinterEngine::open(config, Arc::new(JsonFileRepository::new("printers.json")), collaborators)?;
//! engine.handle(player, &key, Intent::Place { tier: 1 })?;
//! let report = engine.sweep();
//! ```

use crate::access;
use crate::clock::{apply_sweep, SweepReport};
use crate::config::{ConfigError, PrinterConfig};
use crate::device::DeviceSnapshot;
use crate::intents::{self, Collaborators, Intent, IntentError, IntentOutcome};
use crate::persistence::{DeviceRepository, StoreError};
use crate::store::DeviceStore;
use printer_env::{ActorId, SpatialKey};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{error, info, warn};

/// The device simulation engine.
///
/// Constructed once at process start and shared behind an `Arc`; all
/// methods take `&self`.
pub struct PrinterEngine {
    store: Mutex<DeviceStore>,
    config: RwLock<Arc<PrinterConfig>>,
    repository: Arc<dyn DeviceRepository>,
    /// Serializes writes so a later save never lands before an earlier one
    save_lock: Mutex<()>,
    collaborators: Collaborators,
}

impl PrinterEngine {
    /// Creates an engine with an empty store.
    pub fn new(
        config: PrinterConfig,
        repository: Arc<dyn DeviceRepository>,
        collaborators: Collaborators,
    ) -> Result<Self, ConfigError> {
        Ok(Self::with_store(config.validated()?, DeviceStore::new(), repository, collaborators))
    }

    /// Creates an engine and loads the persisted devices.
    ///
    /// A backing store that cannot be read is logged and the engine starts
    /// empty; only an invalid configuration is an error.
    pub fn open(
        config: PrinterConfig,
        repository: Arc<dyn DeviceRepository>,
        collaborators: Collaborators,
    ) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        let store = match DeviceStore::load(repository.as_ref(), &config) {
            Ok(store) => store,
            Err(e) => {
                error!("Failed to load devices, starting empty: {}", e);
                DeviceStore::new()
            }
        };
        Ok(Self::with_store(config, store, repository, collaborators))
    }

    fn with_store(
        config: PrinterConfig,
        store: DeviceStore,
        repository: Arc<dyn DeviceRepository>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            config: RwLock::new(Arc::new(config)),
            repository,
            save_lock: Mutex::new(()),
            collaborators,
        }
    }

    fn lock_store(&self) -> MutexGuard<'_, DeviceStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // CONFIGURATION
    // ========================================================================

    /// The active configuration. Holders keep a consistent snapshot across reloads.
    pub fn config(&self) -> Arc<PrinterConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Atomically replaces the active configuration.
    ///
    /// Stored devices are clamped to the new caps; the result is persisted
    /// if any device changed.
    pub fn reload(&self, config: PrinterConfig) -> Result<(), ConfigError> {
        let config = Arc::new(config.validated()?);

        let adjusted = {
            let mut store = self.lock_store();
            *self.config.write().unwrap_or_else(PoisonError::into_inner) = config.clone();
            store.normalize(&config)
        };

        info!(tiers = config.tiers.len(), adjusted, "Configuration reloaded");
        if adjusted > 0 {
            let _ = self.persist();
        }
        Ok(())
    }

    // ========================================================================
    // INTENTS
    // ========================================================================

    /// Applies one intent and persists on success.
    ///
    /// A failed save after a successful intent is logged; the in-memory
    /// change stands and is written by the next successful save.
    pub fn handle(&self, actor: ActorId, key: &SpatialKey, intent: Intent) -> Result<IntentOutcome, IntentError> {
        let outcome = {
            let mut store = self.lock_store();
            // Read under the store lock so a concurrent reload is seen whole.
            let config = self.config();
            intents::apply(&mut store, &config, &self.collaborators, actor, key, &intent)?
        };
        let _ = self.persist();
        Ok(outcome)
    }

    pub fn place(&self, actor: ActorId, key: &SpatialKey, tier: u32) -> Result<IntentOutcome, IntentError> {
        self.handle(actor, key, Intent::Place { tier })
    }

    pub fn remove(&self, actor: ActorId, key: &SpatialKey) -> Result<IntentOutcome, IntentError> {
        self.handle(actor, key, Intent::Remove)
    }

    pub fn add_fuel(&self, actor: ActorId, key: &SpatialKey) -> Result<IntentOutcome, IntentError> {
        self.handle(actor, key, Intent::AddFuel)
    }

    pub fn collect(&self, actor: ActorId, key: &SpatialKey) -> Result<IntentOutcome, IntentError> {
        self.handle(actor, key, Intent::Collect)
    }

    pub fn upgrade(&self, actor: ActorId, key: &SpatialKey, target_tier: u32) -> Result<IntentOutcome, IntentError> {
        self.handle(actor, key, Intent::Upgrade { target_tier })
    }

    pub fn add_friend(&self, actor: ActorId, key: &SpatialKey, target: ActorId) -> Result<IntentOutcome, IntentError> {
        self.handle(actor, key, Intent::AddFriend { target })
    }

    pub fn remove_friend(
        &self,
        actor: ActorId,
        key: &SpatialKey,
        target: ActorId,
    ) -> Result<IntentOutcome, IntentError> {
        self.handle(actor, key, Intent::RemoveFriend { target })
    }

    // ========================================================================
    // SWEEP
    // ========================================================================

    /// Advances every device by one tick.
    pub fn sweep(&self) -> SweepReport {
        let mut keys = self.lock_store().keys();
        keys.sort();

        let checked: Vec<(SpatialKey, bool)> = keys
            .into_iter()
            .map(|key| {
                let exists = self.collaborators.world.placement_exists(&key);
                (key, exists)
            })
            .collect();

        let report = {
            let mut store = self.lock_store();
            let config = self.config();
            apply_sweep(&mut store, &config, &checked)
        };

        for (owner, notification) in &report.notifications {
            self.collaborators.notifier.notify(*owner, notification.clone());
        }
        if report.changed {
            let _ = self.persist();
        }
        report
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Every device, ordered by key. Isolated from later mutation.
    pub fn snapshot(&self) -> Vec<(SpatialKey, DeviceSnapshot)> {
        self.lock_store().all()
    }

    pub fn device(&self, key: &SpatialKey) -> Option<DeviceSnapshot> {
        self.lock_store().get(key).cloned()
    }

    pub fn count_by_owner(&self, owner: ActorId) -> usize {
        self.lock_store().count_by_owner(owner)
    }

    /// Lists a device's friends. Viewers and administrators only.
    pub fn friends(&self, actor: ActorId, key: &SpatialKey) -> Result<Vec<ActorId>, IntentError> {
        let store = self.lock_store();
        let device = store.get(key).ok_or_else(|| IntentError::NotFound(key.clone()))?;
        if !access::can_operate(actor, device, self.collaborators.permissions.as_ref()) {
            return Err(IntentError::AccessDenied);
        }
        Ok(device.friends().iter().copied().collect())
    }

    /// True if a device occupies `key`; the world must refuse to break it
    /// directly.
    pub fn is_protected(&self, key: &SpatialKey) -> bool {
        self.lock_store().contains(key)
    }

    // ========================================================================
    // ADMINISTRATION
    // ========================================================================

    /// Hands `target` a device item of `tier`. Administrators only.
    pub fn give_device(&self, admin: ActorId, target: ActorId, tier: u32) -> Result<(), IntentError> {
        if !access::can_administer(admin, self.collaborators.permissions.as_ref()) {
            return Err(IntentError::PermissionDenied);
        }
        if !self.config().tiers.contains(tier) {
            return Err(IntentError::UnknownTier(tier));
        }
        self.collaborators.inventory.give_device(target, tier);
        info!(%admin, %target, tier, "Device item granted");
        Ok(())
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Writes the current store to the repository.
    ///
    /// The snapshot is taken under the save lock, so concurrent callers
    /// write in order and the last write always carries the newest state.
    pub fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let store = self.lock_store().clone();
        store.save(self.repository.as_ref()).map_err(|e| {
            error!("Failed to save {} devices: {}", store.len(), e);
            e
        })
    }

    /// Final save on process stop.
    pub fn shutdown(&self) -> Result<(), StoreError> {
        let count = self.lock_store().len();
        match self.persist() {
            Ok(()) => {
                info!(devices = count, "Engine shut down");
                Ok(())
            }
            Err(e) => {
                warn!("Shutdown save failed; last durable state kept");
                Err(e)
            }
        }
    }
}
