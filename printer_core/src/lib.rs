//! Printer Core - device simulation and state persistence for money printers
//!
//! Player-owned generator devices sit at spatial keys in a shared world.
//! Each consumes fuel over time, accrues currency at its tier's rate while
//! fueled, caps what it stores, and can be upgraded or shared with friends.
//!
//! 1. **Device**: the per-entity state machine and its transitions
//! 2. **Clock**: the fixed-period sweep that advances every device
//! 3. **Intents**: validated, all-or-nothing player operations
//! 4. **Store**: the authoritative key → device map with durable save/load

pub mod access;
pub mod clock;
pub mod config;
pub mod device;
pub mod engine;
pub mod intents;
pub mod persistence;
pub mod store;
pub mod tiers;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use clock::{SimulationClock, SweepReport};
pub use config::{ConfigError, PrinterConfig};
pub use device::{Device, DeviceSnapshot};
pub use engine::PrinterEngine;
pub use intents::{Collaborators, Intent, IntentError, IntentOutcome};
pub use persistence::{DeviceRepository, JsonFileRepository, MemoryRepository, SledRepository, StoreError};
pub use store::DeviceStore;
pub use tiers::{TierCatalog, TierDefinition};
