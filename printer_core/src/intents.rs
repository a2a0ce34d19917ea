//! Intent Handlers - the operations triggered by player actions.
//!
//! The presentation and dispatch layers reduce every button click or
//! command to one [`Intent`]. [`apply`] validates its preconditions against
//! the store, the active configuration and the host collaborators, then
//! applies every effect or none of them.
//!
//! # Ordering
//!
//! Each handler checks all preconditions before touching anything. The
//! single fallible external effect (ledger or inventory) runs next, and the
//! device is only mutated once that effect has succeeded. A collaborator
//! refusal therefore leaves the store exactly as it was.

use crate::access;
use crate::config::PrinterConfig;
use crate::store::DeviceStore;
use printer_env::{ActorId, EnvError, Inventory, Ledger, Notifier, Permissions, SpatialKey, WorldView};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// The host capabilities the engine acts through.
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn Ledger>,
    pub inventory: Arc<dyn Inventory>,
    pub permissions: Arc<dyn Permissions>,
    pub world: Arc<dyn WorldView>,
    pub notifier: Arc<dyn Notifier>,
}

/// A player action against the device at some key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    /// A device item of `tier` was placed at the key.
    Place { tier: u32 },
    Remove,
    AddFuel,
    Collect,
    Upgrade { target_tier: u32 },
    AddFriend { target: ActorId },
    RemoveFriend { target: ActorId },
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Place { .. } => "place",
            Intent::Remove => "remove",
            Intent::AddFuel => "add_fuel",
            Intent::Collect => "collect",
            Intent::Upgrade { .. } => "upgrade",
            Intent::AddFriend { .. } => "add_friend",
            Intent::RemoveFriend { .. } => "remove_friend",
        }
    }
}

/// Success payload of an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IntentOutcome {
    Placed { tier: u32 },
    /// The device is gone; `payout` went to its owner.
    Removed { tier: u32, payout: f64 },
    Fueled { fuel_remaining_secs: u64, added_secs: u64 },
    Collected { amount: f64 },
    Upgraded { from: u32, to: u32, cost: f64 },
    FriendAdded { target: ActorId },
    FriendRemoved { target: ActorId },
}

/// Why an intent was refused. No state changes accompany any of these.
#[derive(Debug, Error)]
pub enum IntentError {
    #[error("No device at {0}")]
    NotFound(SpatialKey),

    #[error("You do not have access to this device")]
    AccessDenied,

    #[error("Only the owner may do that")]
    NotOwner,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Devices are disabled in world {0}")]
    WorldDisabled(String),

    #[error("Device limit reached ({limit})")]
    LimitExceeded { limit: u32 },

    #[error("Fuel is already full")]
    AlreadyFull,

    #[error("Missing fuel resource {0}")]
    MissingResource(String),

    #[error("Nothing to collect")]
    NothingToCollect,

    #[error("Device is already at tier {current}")]
    AlreadyAtOrAboveTier { current: u32 },

    #[error("Insufficient funds: need {needed:.2}, have {available:.2}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("Cannot target yourself")]
    SelfReference,

    #[error("{0} is already a friend")]
    AlreadyFriend(ActorId),

    #[error("{0} is not a friend")]
    NotFriend(ActorId),

    #[error("A device already exists at {0}")]
    DuplicateKey(SpatialKey),

    #[error("Unknown tier {0}")]
    UnknownTier(u32),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] EnvError),
}

/// Dispatches `intent` to its handler.
///
/// The caller holds the store exclusively for the whole call and persists
/// afterwards if the result is `Ok`.
pub fn apply(
    store: &mut DeviceStore,
    config: &PrinterConfig,
    collaborators: &Collaborators,
    actor: ActorId,
    key: &SpatialKey,
    intent: &Intent,
) -> Result<IntentOutcome, IntentError> {
    let result = match intent {
        Intent::Place { tier } => place(store, config, collaborators, actor, key, *tier),
        Intent::Remove => remove(store, collaborators, actor, key),
        Intent::AddFuel => add_fuel(store, config, collaborators, actor, key),
        Intent::Collect => collect(store, collaborators, actor, key),
        Intent::Upgrade { target_tier } => upgrade(store, config, collaborators, actor, key, *target_tier),
        Intent::AddFriend { target } => add_friend(store, actor, key, *target),
        Intent::RemoveFriend { target } => remove_friend(store, actor, key, *target),
    };

    if let Ok(outcome) = &result {
        debug!(intent = intent.name(), %actor, key = %key, ?outcome, "Intent applied");
    }
    result
}

pub fn place(
    store: &mut DeviceStore,
    config: &PrinterConfig,
    collaborators: &Collaborators,
    actor: ActorId,
    key: &SpatialKey,
    tier: u32,
) -> Result<IntentOutcome, IntentError> {
    let permissions = collaborators.permissions.as_ref();
    let is_admin = access::can_administer(actor, permissions);

    if !permissions.can_place(actor) {
        return Err(IntentError::PermissionDenied);
    }
    if config.is_world_disabled(&key.world) {
        return Err(IntentError::WorldDisabled(key.world.clone()));
    }
    if !config.tiers.contains(tier) {
        return Err(IntentError::UnknownTier(tier));
    }
    if !is_admin && store.count_by_owner(actor) >= config.max_per_owner as usize {
        return Err(IntentError::LimitExceeded {
            limit: config.max_per_owner,
        });
    }
    if !is_admin && !permissions.has_tier_permission(actor, tier) {
        return Err(IntentError::PermissionDenied);
    }

    store
        .create(key.clone(), actor, tier)
        .map_err(|_| IntentError::DuplicateKey(key.clone()))?;
    Ok(IntentOutcome::Placed { tier })
}

pub fn remove(
    store: &mut DeviceStore,
    collaborators: &Collaborators,
    actor: ActorId,
    key: &SpatialKey,
) -> Result<IntentOutcome, IntentError> {
    let device = store.get(key).ok_or_else(|| IntentError::NotFound(key.clone()))?;
    if !access::can_mutate_ownership(actor, device)
        && !access::can_administer(actor, collaborators.permissions.as_ref())
    {
        return Err(IntentError::NotOwner);
    }

    let owner = device.owner();
    let payout = device.stored_earnings();
    if payout > 0.0 {
        collaborators.ledger.deposit(owner, payout)?;
    }

    let tier = match store.remove(key) {
        Some(device) => device.tier(),
        None => return Err(IntentError::NotFound(key.clone())),
    };
    collaborators.inventory.give_device(actor, tier);

    Ok(IntentOutcome::Removed { tier, payout })
}

pub fn add_fuel(
    store: &mut DeviceStore,
    config: &PrinterConfig,
    collaborators: &Collaborators,
    actor: ActorId,
    key: &SpatialKey,
) -> Result<IntentOutcome, IntentError> {
    let device = store
        .get_mut(key)
        .ok_or_else(|| IntentError::NotFound(key.clone()))?;
    if !access::can_operate(actor, device, collaborators.permissions.as_ref()) {
        return Err(IntentError::AccessDenied);
    }
    if device.fuel_remaining_secs() >= config.max_fuel_secs {
        return Err(IntentError::AlreadyFull);
    }

    let resource = config.fuel_resource.as_str();
    if !collaborators.inventory.has_item(actor, resource) {
        return Err(IntentError::MissingResource(resource.to_string()));
    }
    collaborators.inventory.take_item(actor, resource)?;

    let added_secs = device.add_fuel(config.fuel_per_item_secs, config.max_fuel_secs);
    Ok(IntentOutcome::Fueled {
        fuel_remaining_secs: device.fuel_remaining_secs(),
        added_secs,
    })
}

pub fn collect(
    store: &mut DeviceStore,
    collaborators: &Collaborators,
    actor: ActorId,
    key: &SpatialKey,
) -> Result<IntentOutcome, IntentError> {
    let device = store
        .get_mut(key)
        .ok_or_else(|| IntentError::NotFound(key.clone()))?;
    if !access::can_operate(actor, device, collaborators.permissions.as_ref()) {
        return Err(IntentError::AccessDenied);
    }

    let amount = device.stored_earnings();
    if amount <= 0.0 {
        return Err(IntentError::NothingToCollect);
    }
    collaborators.ledger.deposit(actor, amount)?;

    Ok(IntentOutcome::Collected {
        amount: device.collect(),
    })
}

pub fn upgrade(
    store: &mut DeviceStore,
    config: &PrinterConfig,
    collaborators: &Collaborators,
    actor: ActorId,
    key: &SpatialKey,
    target_tier: u32,
) -> Result<IntentOutcome, IntentError> {
    let permissions = collaborators.permissions.as_ref();
    let device = store
        .get_mut(key)
        .ok_or_else(|| IntentError::NotFound(key.clone()))?;
    if !access::can_operate(actor, device, permissions) {
        return Err(IntentError::AccessDenied);
    }

    let current = device.tier();
    if target_tier <= current {
        return Err(IntentError::AlreadyAtOrAboveTier { current });
    }
    let cost = config
        .tiers
        .definition(target_tier)
        .map(|def| def.upgrade_cost)
        .ok_or(IntentError::UnknownTier(target_tier))?;
    if !permissions.has_tier_permission(actor, target_tier) && !access::can_administer(actor, permissions) {
        return Err(IntentError::PermissionDenied);
    }

    let available = collaborators.ledger.balance(actor);
    if available < cost {
        return Err(IntentError::InsufficientFunds { needed: cost, available });
    }
    if cost > 0.0 {
        collaborators.ledger.withdraw(actor, cost)?;
    }

    device.upgrade_to(target_tier);
    Ok(IntentOutcome::Upgraded {
        from: current,
        to: target_tier,
        cost,
    })
}

pub fn add_friend(
    store: &mut DeviceStore,
    actor: ActorId,
    key: &SpatialKey,
    target: ActorId,
) -> Result<IntentOutcome, IntentError> {
    let device = store
        .get_mut(key)
        .ok_or_else(|| IntentError::NotFound(key.clone()))?;
    if !access::can_mutate_ownership(actor, device) {
        return Err(IntentError::NotOwner);
    }
    if target == actor {
        return Err(IntentError::SelfReference);
    }
    if !device.add_friend(target) {
        return Err(IntentError::AlreadyFriend(target));
    }
    Ok(IntentOutcome::FriendAdded { target })
}

pub fn remove_friend(
    store: &mut DeviceStore,
    actor: ActorId,
    key: &SpatialKey,
    target: ActorId,
) -> Result<IntentOutcome, IntentError> {
    let device = store
        .get_mut(key)
        .ok_or_else(|| IntentError::NotFound(key.clone()))?;
    if !access::can_mutate_ownership(actor, device) {
        return Err(IntentError::NotOwner);
    }
    if !device.remove_friend(target) {
        return Err(IntentError::NotFriend(target));
    }
    Ok(IntentOutcome::FriendRemoved { target })
}
