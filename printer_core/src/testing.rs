//! In-memory collaborators shared by the unit tests in this crate.

use crate::intents::Collaborators;
use printer_env::{
    ActorId, EnvError, Inventory, Ledger, Notification, Notifier, Permissions, SpatialKey, WorldView,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    balances: HashMap<ActorId, f64>,
    items: HashMap<(ActorId, String), u32>,
    given: Vec<(ActorId, u32)>,
    admins: HashSet<ActorId>,
    no_place: HashSet<ActorId>,
    max_tier: HashMap<ActorId, u32>,
    gone: HashSet<SpatialKey>,
    notifications: Vec<(ActorId, Notification)>,
    withdrawals: usize,
}

/// A fake host: ledger, inventory, permissions, world and mailbox.
#[derive(Default)]
pub struct FakeHost {
    state: Mutex<State>,
}

impl FakeHost {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
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
        self.state.lock().unwrap().balances.insert(actor, amount);
    }

    pub fn give_items(&self, actor: ActorId, resource: &str, count: u32) {
        *self
            .state
            .lock()
            .unwrap()
            .items
            .entry((actor, resource.to_string()))
            .or_default() += count;
    }

    pub fn item_count(&self, actor: ActorId, resource: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .items
            .get(&(actor, resource.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn make_admin(&self, actor: ActorId) {
        self.state.lock().unwrap().admins.insert(actor);
    }

    pub fn deny_place(&self, actor: ActorId) {
        self.state.lock().unwrap().no_place.insert(actor);
    }

    pub fn limit_tier(&self, actor: ActorId, max: u32) {
        self.state.lock().unwrap().max_tier.insert(actor, max);
    }

    pub fn break_block(&self, key: &SpatialKey) {
        self.state.lock().unwrap().gone.insert(key.clone());
    }

    pub fn given(&self) -> Vec<(ActorId, u32)> {
        self.state.lock().unwrap().given.clone()
    }

    pub fn notifications(&self) -> Vec<(ActorId, Notification)> {
        self.state.lock().unwrap().notifications.clone()
    }

    pub fn withdrawals(&self) -> usize {
        self.state.lock().unwrap().withdrawals
    }
}

impl Ledger for FakeHost {
    fn deposit(&self, actor: ActorId, amount: f64) -> Result<(), EnvError> {
        *self.state.lock().unwrap().balances.entry(actor).or_default() += amount;
        Ok(())
    }

    fn withdraw(&self, actor: ActorId, amount: f64) -> Result<(), EnvError> {
        let mut state = self.state.lock().unwrap();
        let balance = state.balances.entry(actor).or_default();
        if *balance < amount {
            return Err(EnvError::ledger("insufficient balance"));
        }
        *balance -= amount;
        state.withdrawals += 1;
        Ok(())
    }

    fn balance(&self, actor: ActorId) -> f64 {
        self.state.lock().unwrap().balances.get(&actor).copied().unwrap_or(0.0)
    }
}

impl Inventory for FakeHost {
    fn has_item(&self, actor: ActorId, resource: &str) -> bool {
        self.item_count(actor, resource) > 0
    }

    fn take_item(&self, actor: ActorId, resource: &str) -> Result<(), EnvError> {
        let mut state = self.state.lock().unwrap();
        match state.items.get_mut(&(actor, resource.to_string())) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(())
            }
            _ => Err(EnvError::inventory(format!("no {}", resource))),
        }
    }

    fn give_device(&self, actor: ActorId, tier: u32) {
        self.state.lock().unwrap().given.push((actor, tier));
    }
}

impl Permissions for FakeHost {
    fn can_place(&self, actor: ActorId) -> bool {
        !self.state.lock().unwrap().no_place.contains(&actor)
    }

    fn has_tier_permission(&self, actor: ActorId, tier: u32) -> bool {
        self.state
            .lock()
            .unwrap()
            .max_tier
            .get(&actor)
            .map_or(true, |max| tier <= *max)
    }

    fn is_admin(&self, actor: ActorId) -> bool {
        self.state.lock().unwrap().admins.contains(&actor)
    }
}

impl WorldView for FakeHost {
    fn placement_exists(&self, key: &SpatialKey) -> bool {
        !self.state.lock().unwrap().gone.contains(key)
    }
}

impl Notifier for FakeHost {
    fn notify(&self, owner: ActorId, notification: Notification) {
        self.state.lock().unwrap().notifications.push((owner, notification));
    }
}
