//! Capability traits for the collaborators the engine depends on but does not own.

use crate::error::EnvError;
use crate::types::{ActorId, Notification, SpatialKey};

/// The economy ledger that credits and debits player balances.
///
/// # Implementations
///
/// - **Production**: Wraps the host server's economy provider
/// - **Simulation**: In-memory balance map
pub trait Ledger: Send + Sync {
    /// Credits `amount` to the actor's balance.
    fn deposit(&self, actor: ActorId, amount: f64) -> Result<(), EnvError>;

    /// Debits `amount` from the actor's balance.
    ///
    /// # Returns
    /// * `Err(EnvError::LedgerError)` - The balance does not cover the amount
    fn withdraw(&self, actor: ActorId, amount: f64) -> Result<(), EnvError>;

    /// Returns the actor's current balance.
    fn balance(&self, actor: ActorId) -> f64;
}

/// Player inventories: the fuel resource and device items.
pub trait Inventory: Send + Sync {
    /// Returns true if the actor holds at least one unit of `resource`.
    fn has_item(&self, actor: ActorId, resource: &str) -> bool;

    /// Removes one unit of `resource` from the actor's inventory.
    fn take_item(&self, actor: ActorId, resource: &str) -> Result<(), EnvError>;

    /// Hands the actor a placeable device item of the given tier.
    ///
    /// A full inventory is the host's concern (e.g. drop the item at the
    /// player's feet), so this never fails.
    fn give_device(&self, actor: ActorId, tier: u32);
}

/// Role and permission checks, opaque to the engine.
pub trait Permissions: Send + Sync {
    /// May the actor place devices at all?
    fn can_place(&self, actor: ActorId) -> bool;

    /// May the actor place or upgrade to the given tier?
    fn has_tier_permission(&self, actor: ActorId, tier: u32) -> bool;

    /// Is the actor an administrator (bypasses limits and ownership)?
    fn is_admin(&self, actor: ActorId) -> bool;
}

/// Read access to the world the devices are placed in.
pub trait WorldView: Send + Sync {
    /// Returns true if the block backing a device still exists at `key`.
    fn placement_exists(&self, key: &SpatialKey) -> bool;
}

/// Delivery of owner-facing notifications.
pub trait Notifier: Send + Sync {
    /// Delivers a notification to the owner. Offline owners may be skipped.
    fn notify(&self, owner: ActorId, notification: Notification);
}
