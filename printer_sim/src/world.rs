//! SimWorld - The simulation harness container.
//!
//! [`SimHost`] stands in for the game server: balances, inventories,
//! permission nodes, the blocks that back each device, and each player's
//! chat inbox. [`SimWorld`] wires a host, a virtual clock and a
//! [`PrinterEngine`] together and can restart the engine against the same
//! backing store.

use crate::context::SimContext;

use printer_core::{
    Collaborators, ConfigError, DeviceRepository, JsonFileRepository, MemoryRepository, PrinterConfig,
    PrinterEngine, SledRepository, StoreError, SweepReport,
};
use printer_env::{
    ActorId, EnvError, Inventory, Ledger, Notification, Notifier, Permissions, PrinterContext, SpatialKey,
    WorldView,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

/// Errors setting up a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Where the simulated server keeps its devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Memory,
    /// JSON document at the given path
    Json(PathBuf),
    /// sled database in the given directory
    Sled(PathBuf),
}

impl Backend {
    pub fn open(&self) -> Result<Arc<dyn DeviceRepository>, SimError> {
        Ok(match self {
            Backend::Memory => Arc::new(MemoryRepository::new()),
            Backend::Json(path) => Arc::new(JsonFileRepository::new(path)),
            Backend::Sled(path) => Arc::new(SledRepository::open(path)?),
        })
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    /// `memory`, `json:<path>` or `sled:<dir>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s.eq_ignore_ascii_case("memory") => Ok(Backend::Memory),
            Some(("json", path)) if !path.is_empty() => Ok(Backend::Json(PathBuf::from(path))),
            Some(("sled", path)) if !path.is_empty() => Ok(Backend::Sled(PathBuf::from(path))),
            _ => Err(format!("Unknown backend: {} (memory, json:<path>, sled:<dir>)", s)),
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of players to create
    pub num_players: usize,

    /// Starting balance of every player
    pub starting_balance: f64,

    /// Engine configuration
    pub printer: PrinterConfig,

    pub backend: Backend,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_players: 4,
            starting_balance: 1_000.0,
            printer: PrinterConfig::default(),
            backend: Backend::Memory,
        }
    }
}

#[derive(Debug, Default)]
struct HostState {
    balances: HashMap<ActorId, f64>,
    items: HashMap<(ActorId, String), u32>,
    device_items: HashMap<ActorId, Vec<u32>>,
    admins: HashSet<ActorId>,
    banned: HashSet<ActorId>,
    tier_grants: HashMap<ActorId, u32>,
    blocks: HashSet<SpatialKey>,
    inbox: HashMap<ActorId, Vec<Notification>>,
}

/// In-memory game server implementing every collaborator capability.
#[derive(Debug, Default)]
pub struct SimHost {
    state: Mutex<HostState>,
}

impl SimHost {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            ledger: self.clone(),
            inventory: self.clone(),
            permissions: self.clone(),
            world: self.clone(),
            notifier: self.clone(),
        }
    }

    pub fn set_balance(&self, actor: ActorId, amount: f64) {
        self.state().balances.insert(actor, amount);
    }

    pub fn total_balance(&self) -> f64 {
        self.state().balances.values().sum()
    }

    pub fn give_items(&self, actor: ActorId, resource: &str, count: u32) {
        *self.state().items.entry((actor, resource.to_string())).or_default() += count;
    }

    pub fn item_count(&self, actor: ActorId, resource: &str) -> u32 {
        self.state()
            .items
            .get(&(actor, resource.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Device items handed to `actor`, by tier.
    pub fn device_items(&self, actor: ActorId) -> Vec<u32> {
        self.state().device_items.get(&actor).cloned().unwrap_or_default()
    }

    pub fn make_admin(&self, actor: ActorId) {
        self.state().admins.insert(actor);
    }

    /// Revokes the place permission.
    pub fn ban(&self, actor: ActorId) {
        self.state().banned.insert(actor);
    }

    /// Grants tier permissions up to and including `max_tier`.
    pub fn grant_tiers(&self, actor: ActorId, max_tier: u32) {
        self.state().tier_grants.insert(actor, max_tier);
    }

    pub fn set_block(&self, key: &SpatialKey) {
        self.state().blocks.insert(key.clone());
    }

    pub fn break_block(&self, key: &SpatialKey) {
        self.state().blocks.remove(key);
    }

    /// Drains and returns the notifications delivered to `actor`.
    pub fn take_inbox(&self, actor: ActorId) -> Vec<Notification> {
        self.state().inbox.remove(&actor).unwrap_or_default()
    }
}

impl Ledger for SimHost {
    fn deposit(&self, actor: ActorId, amount: f64) -> Result<(), EnvError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(EnvError::ledger(format!("invalid deposit {}", amount)));
        }
        *self.state().balances.entry(actor).or_default() += amount;
        Ok(())
    }

    fn withdraw(&self, actor: ActorId, amount: f64) -> Result<(), EnvError> {
        let mut state = self.state();
        let balance = state.balances.get_mut(&actor).ok_or_else(|| EnvError::unknown(actor))?;
        if *balance < amount {
            return Err(EnvError::ledger(format!("balance {:.2} below {:.2}", balance, amount)));
        }
        *balance -= amount;
        Ok(())
    }

    fn balance(&self, actor: ActorId) -> f64 {
        self.state().balances.get(&actor).copied().unwrap_or(0.0)
    }
}

impl Inventory for SimHost {
    fn has_item(&self, actor: ActorId, resource: &str) -> bool {
        self.item_count(actor, resource) > 0
    }

    fn take_item(&self, actor: ActorId, resource: &str) -> Result<(), EnvError> {
        let mut state = self.state();
        match state.items.get_mut(&(actor, resource.to_string())) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(())
            }
            _ => Err(EnvError::inventory(format!("{} holds no {}", actor, resource))),
        }
    }

    fn give_device(&self, actor: ActorId, tier: u32) {
        self.state().device_items.entry(actor).or_default().push(tier);
    }
}

impl Permissions for SimHost {
    fn can_place(&self, actor: ActorId) -> bool {
        !self.state().banned.contains(&actor)
    }

    fn has_tier_permission(&self, actor: ActorId, tier: u32) -> bool {
        tier == 1 || self.state().tier_grants.get(&actor).is_some_and(|max| tier <= *max)
    }

    fn is_admin(&self, actor: ActorId) -> bool {
        self.state().admins.contains(&actor)
    }
}

impl WorldView for SimHost {
    fn placement_exists(&self, key: &SpatialKey) -> bool {
        self.state().blocks.contains(key)
    }
}

impl Notifier for SimHost {
    fn notify(&self, owner: ActorId, notification: Notification) {
        debug!(%owner, ?notification, "Notification delivered");
        self.state().inbox.entry(owner).or_default().push(notification);
    }
}

/// The SimWorld - container for the entire simulation.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: Arc<SimContext>,

    pub host: Arc<SimHost>,

    engine: Arc<PrinterEngine>,

    repository: Arc<dyn DeviceRepository>,

    players: Vec<ActorId>,

    tick_count: u64,
}

impl SimWorld {
    /// Creates a new SimWorld with the given configuration.
    ///
    /// Players get seed-derived ids and the starting balance.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let context = SimContext::shared(config.seed);
        let host = SimHost::shared();
        let repository = config.backend.open()?;
        let engine = Arc::new(PrinterEngine::open(
            config.printer.clone(),
            repository.clone(),
            host.collaborators(),
        )?);

        let players: Vec<ActorId> = (0..config.num_players)
            .map(|i| ActorId::from_seed(config.seed.wrapping_mul(1_000).wrapping_add(i as u64)))
            .collect();
        for player in &players {
            host.set_balance(*player, config.starting_balance);
        }

        Ok(Self {
            config,
            context,
            host,
            engine,
            repository,
            players,
            tick_count: 0,
        })
    }

    pub fn engine(&self) -> &Arc<PrinterEngine> {
        &self.engine
    }

    pub fn players(&self) -> &[ActorId] {
        &self.players
    }

    pub fn player(&self, index: usize) -> ActorId {
        self.players[index % self.players.len()]
    }

    /// Puts a block at `key` and places a device on it.
    ///
    /// The block is taken back if the engine refuses the placement.
    pub fn place(&self, actor: ActorId, key: &SpatialKey, tier: u32) -> Result<(), printer_core::IntentError> {
        self.host.set_block(key);
        match self.engine.place(actor, key, tier) {
            Ok(_) => Ok(()),
            Err(e) => {
                if !self.engine.is_protected(key) {
                    self.host.break_block(key);
                }
                Err(e)
            }
        }
    }

    /// Advances the virtual clock by one period and sweeps.
    pub fn tick(&mut self) -> SweepReport {
        self.context.advance_time(self.engine.config().tick_duration());
        self.tick_count += 1;
        self.engine.sweep()
    }

    /// Stops the engine (final save) and opens a fresh one on the same store.
    pub fn restart(&mut self) -> Result<(), SimError> {
        self.engine.shutdown()?;
        self.engine = Arc::new(PrinterEngine::open(
            self.config.printer.clone(),
            self.repository.clone(),
            self.host.collaborators(),
        )?);
        Ok(())
    }

    /// Returns the current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.context.now().as_secs_f64()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Checks the per-device bounds on every stored device.
    pub fn check_invariants(&self) -> Result<(), String> {
        let config = self.engine.config();
        let payout = config.effective_payout_secs();

        for (key, device) in self.engine.snapshot() {
            if device.fuel_remaining_secs() > config.max_fuel_secs {
                return Err(format!("{}: fuel {} above cap", key, device.fuel_remaining_secs()));
            }
            if !(0.0..=config.max_storage).contains(&device.stored_earnings()) {
                return Err(format!("{}: earnings {} out of bounds", key, device.stored_earnings()));
            }
            if device.accrual_counter_secs() >= payout {
                return Err(format!("{}: counter {} not below {}", key, device.accrual_counter_secs(), payout));
            }
            if device.is_friend(device.owner()) {
                return Err(format!("{}: owner listed as friend", key));
            }
            if device.tier() == 0 {
                return Err(format!("{}: tier zero", key));
            }
        }
        Ok(())
    }
}
