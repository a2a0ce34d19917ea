//! Printer Environment Abstraction Layer
//!
//! This crate provides the seams between the printer engine and everything
//! it does not own:
//!
//! - Time (`now()`, `sleep()`) for the periodic sweep
//! - The economy ledger (`deposit()`, `withdraw()`, `balance()`)
//! - Player inventories (fuel items, device items)
//! - Role checks (place, tier and admin permissions)
//! - The world (does a placement still exist?)
//! - Owner notifications
//!
//! Production wires these to the host server; the simulation harness backs
//! them with in-memory state so every scenario is reproducible.
//!
//! # Example
//!
//! ```ignore
//! use printer_env::{PrinterContext, TokioContext};
//!
//! async fn sweep_loop<Ctx: PrinterContext>(ctx: &Ctx) {
//!     loop {
//!         ctx.sleep(Duration::from_secs(10)).await;
//!         engine.sweep();
//!     }
//! }
//! ```

mod collaborators;
mod context;
mod error;
mod tokio_impl;
mod types;

pub use collaborators::{Inventory, Ledger, Notifier, Permissions, WorldView};
pub use context::PrinterContext;
pub use error::EnvError;
pub use tokio_impl::TokioContext;
pub use types::{ActorId, Notification, SpatialKey};
