//! Printer Deterministic Simulation Harness
//!
//! A controlled environment where the printer engine runs against an
//! in-memory game server on virtual time.
//!
//! # Core Principle
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: the virtual clock only moves when the harness sweeps
//! - **Players**: ids derive from the seed
//! - **Randomness**: every scenario choice comes from one seeded RNG
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (virtual clock + ChaCha8 RNG)             │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │                                                     │
//! │  ┌────▼──────────┐  collaborators  ┌──────────────────────┐ │
//! │  │ PrinterEngine │◄───────────────►│ SimHost (ledger,     │ │
//! │  │               │                 │ inventory, perms,    │ │
//! │  └──────┬────────┘                 │ blocks, inboxes)     │ │
//! │         │                          └──────────────────────┘ │
//! │  ┌──────▼──────────────────────────┐                        │
//! │  │ DeviceRepository (memory/json/sled)                      │
//! │  └─────────────────────────────────┘                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use printer_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::Chaos);
//! assert!(result.passed);
//! ```

mod context;
mod runner;
mod world;
pub mod scenarios;

pub use context::SimContext;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use world::{Backend, SimConfig, SimError, SimHost, SimWorld};
