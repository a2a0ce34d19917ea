//! The per-device state machine.
//!
//! A [`Device`] is only ever mutated through the transition functions here;
//! the store and the intent handlers decide *whether* a transition applies,
//! this module decides *what* it does to the numbers.

use crate::config::PrinterConfig;
use printer_env::ActorId;
use std::collections::BTreeSet;

/// Notification latches.
///
/// These are derived state: each sweep first clears any latch whose
/// condition no longer holds (fuel present, storage under cap), so a latch
/// can never go stale. They are not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationLatches {
    pub fuel_empty: bool,
    pub storage_full: bool,
}

/// Per-sweep inputs that do not belong to any one device.
#[derive(Debug, Clone, Copy)]
pub struct TickParams {
    pub tick_secs: u64,
    /// Payout interval rounded to whole sweeps
    pub payout_secs: u64,
    pub max_storage: f64,
    pub earnings_rate: f64,
    pub notify_fuel_empty: bool,
    pub notify_storage_full: bool,
}

impl TickParams {
    /// Derives sweep parameters for a device at `tier`.
    pub fn for_tier(config: &PrinterConfig, tier: u32) -> Self {
        Self {
            tick_secs: config.tick_secs,
            payout_secs: config.effective_payout_secs(),
            max_storage: config.max_storage,
            earnings_rate: config.tiers.earnings_rate(tier),
            notify_fuel_empty: config.notify_fuel_empty,
            notify_storage_full: config.notify_storage_full,
        }
    }
}

/// An owner-facing event produced by one sweep step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceEvent {
    FuelEmpty,
    StorageFull { stored: f64 },
}

/// Result of advancing a device by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickOutcome {
    /// Persisted state (fuel, counter, earnings) changed
    pub changed: bool,
    /// Amount added to storage by a payout this sweep
    pub paid: Option<f64>,
    pub event: Option<DeviceEvent>,
}

/// A simulated generator placed in the world.
///
/// The spatial key is not stored here; it is the device's identity in
/// the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    owner: ActorId,
    tier: u32,
    fuel_remaining_secs: u64,
    accrual_counter_secs: u64,
    stored_earnings: f64,
    friends: BTreeSet<ActorId>,
    latches: NotificationLatches,
}

/// Read-only copy handed to presentation and reporting.
pub type DeviceSnapshot = Device;

impl Device {
    /// A freshly placed device: no fuel, no earnings, no friends.
    pub fn new(owner: ActorId, tier: u32) -> Self {
        Self {
            owner,
            tier: tier.max(1),
            fuel_remaining_secs: 0,
            accrual_counter_secs: 0,
            stored_earnings: 0.0,
            friends: BTreeSet::new(),
            latches: NotificationLatches::default(),
        }
    }

    /// Rebuilds a device from persisted values. Latches start cleared.
    ///
    /// Call [`Device::normalize`] afterwards to enforce caps.
    pub fn restore(
        owner: ActorId,
        tier: u32,
        fuel_remaining_secs: u64,
        accrual_counter_secs: u64,
        stored_earnings: f64,
        friends: BTreeSet<ActorId>,
    ) -> Self {
        Self {
            owner,
            tier,
            fuel_remaining_secs,
            accrual_counter_secs,
            stored_earnings,
            friends,
            latches: NotificationLatches::default(),
        }
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    pub fn tier(&self) -> u32 {
        self.tier
    }

    pub fn fuel_remaining_secs(&self) -> u64 {
        self.fuel_remaining_secs
    }

    pub fn accrual_counter_secs(&self) -> u64 {
        self.accrual_counter_secs
    }

    pub fn stored_earnings(&self) -> f64 {
        self.stored_earnings
    }

    pub fn friends(&self) -> &BTreeSet<ActorId> {
        &self.friends
    }

    pub fn latches(&self) -> NotificationLatches {
        self.latches
    }

    pub fn is_friend(&self, actor: ActorId) -> bool {
        self.friends.contains(&actor)
    }

    /// Remaining fuel as `MM:SS`.
    pub fn fuel_clock(&self) -> String {
        let minutes = self.fuel_remaining_secs / 60;
        let seconds = self.fuel_remaining_secs % 60;
        format!("{:02}:{:02}", minutes, seconds)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Adds fuel, capped at `max_fuel_secs`. Returns the seconds actually added.
    pub fn add_fuel(&mut self, secs: u64, max_fuel_secs: u64) -> u64 {
        let before = self.fuel_remaining_secs;
        self.fuel_remaining_secs = before.saturating_add(secs).min(max_fuel_secs);
        if self.fuel_remaining_secs > 0 {
            self.latches.fuel_empty = false;
        }
        self.fuel_remaining_secs.saturating_sub(before)
    }

    /// Empties storage and returns the amount removed.
    pub fn collect(&mut self) -> f64 {
        let amount = self.stored_earnings;
        self.stored_earnings = 0.0;
        self.latches.storage_full = false;
        amount
    }

    /// Raises the tier. Never lowers it.
    pub fn upgrade_to(&mut self, tier: u32) -> bool {
        if tier <= self.tier {
            return false;
        }
        self.tier = tier;
        true
    }

    /// Grants access to `actor`. The owner is never a friend.
    pub fn add_friend(&mut self, actor: ActorId) -> bool {
        actor != self.owner && self.friends.insert(actor)
    }

    pub fn remove_friend(&mut self, actor: ActorId) -> bool {
        self.friends.remove(&actor)
    }

    /// Advances the device by one sweep.
    pub fn advance(&mut self, params: &TickParams) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        if self.fuel_remaining_secs > 0 {
            self.latches.fuel_empty = false;
        }
        if self.stored_earnings < params.max_storage {
            self.latches.storage_full = false;
        }

        if self.fuel_remaining_secs == 0 {
            if params.notify_fuel_empty && !self.latches.fuel_empty {
                self.latches.fuel_empty = true;
                outcome.event = Some(DeviceEvent::FuelEmpty);
            }
            return outcome;
        }

        self.fuel_remaining_secs = self.fuel_remaining_secs.saturating_sub(params.tick_secs);
        outcome.changed = true;

        // Full storage freezes payout and the counter alike.
        if self.stored_earnings >= params.max_storage {
            outcome.event = self.latch_storage_full(params);
            return outcome;
        }

        self.accrual_counter_secs += params.tick_secs;
        if self.accrual_counter_secs >= params.payout_secs {
            self.accrual_counter_secs = 0;
            let before = self.stored_earnings;
            self.stored_earnings = (before + params.earnings_rate).min(params.max_storage);
            outcome.paid = Some(self.stored_earnings - before);

            if self.stored_earnings >= params.max_storage {
                outcome.event = self.latch_storage_full(params);
            }
        }

        outcome
    }

    fn latch_storage_full(&mut self, params: &TickParams) -> Option<DeviceEvent> {
        if params.notify_storage_full && !self.latches.storage_full {
            self.latches.storage_full = true;
            Some(DeviceEvent::StorageFull {
                stored: self.stored_earnings,
            })
        } else {
            None
        }
    }

    /// Forces the device back inside the configured bounds.
    ///
    /// Returns true if anything was adjusted. Tiers are never lowered,
    /// only lifted to 1 if zero.
    pub fn normalize(&mut self, config: &PrinterConfig) -> bool {
        let before = self.clone();

        self.tier = self.tier.max(1);
        self.fuel_remaining_secs = self.fuel_remaining_secs.min(config.max_fuel_secs);
        self.stored_earnings = if self.stored_earnings.is_finite() {
            self.stored_earnings.clamp(0.0, config.max_storage)
        } else {
            0.0
        };
        self.accrual_counter_secs %= config.effective_payout_secs().max(1);
        self.friends.remove(&self.owner);

        *self != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> TickParams {
        TickParams {
            tick_secs: 10,
            payout_secs: 50,
            max_storage: 100.0,
            earnings_rate: 20.0,
            notify_fuel_empty: true,
            notify_storage_full: true,
        }
    }

    fn fueled(secs: u64) -> Device {
        let mut device = Device::new(ActorId::from_seed(1), 1);
        device.add_fuel(secs, 3600);
        device
    }

    #[test]
    fn test_new_device_is_empty() {
        let device = Device::new(ActorId::from_seed(1), 1);
        assert_eq!(device.tier(), 1);
        assert_eq!(device.fuel_remaining_secs(), 0);
        assert_eq!(device.stored_earnings(), 0.0);
        assert!(device.friends().is_empty());
    }

    #[test]
    fn test_one_payout_after_five_ticks() {
        let mut device = fueled(300);
        let p = params();

        for _ in 0..4 {
            assert_eq!(device.advance(&p).paid, None);
        }
        let outcome = device.advance(&p);

        assert_eq!(outcome.paid, Some(20.0));
        assert_eq!(device.accrual_counter_secs(), 0);
        assert_relative_eq!(device.stored_earnings(), 20.0);
        assert_eq!(device.fuel_remaining_secs(), 250);
    }

    #[test]
    fn test_payout_is_capped_and_notifies_once() {
        let mut device = Device::restore(ActorId::from_seed(1), 1, 3600, 40, 90.0, BTreeSet::new());
        let p = params();

        let outcome = device.advance(&p);
        assert_relative_eq!(device.stored_earnings(), 100.0);
        assert_eq!(outcome.event, Some(DeviceEvent::StorageFull { stored: 100.0 }));

        for _ in 0..10 {
            assert_eq!(device.advance(&p).event, None);
        }
        assert_relative_eq!(device.stored_earnings(), 100.0);

        assert_relative_eq!(device.collect(), 100.0);
        assert!(!device.latches().storage_full);
    }

    #[test]
    fn test_counter_frozen_while_full() {
        let mut device = Device::restore(ActorId::from_seed(1), 1, 3600, 20, 100.0, BTreeSet::new());
        device.advance(&params());
        assert_eq!(device.accrual_counter_secs(), 20);
        assert_eq!(device.fuel_remaining_secs(), 3590);
    }

    #[test]
    fn test_fuel_floors_at_zero_and_empty_notifies_once() {
        let mut device = fueled(5);
        let p = params();

        assert!(device.advance(&p).changed);
        assert_eq!(device.fuel_remaining_secs(), 0);

        assert_eq!(device.advance(&p).event, Some(DeviceEvent::FuelEmpty));
        assert_eq!(device.advance(&p).event, None);

        device.add_fuel(60, 3600);
        assert!(!device.latches().fuel_empty);
        device.advance(&p);
        device.advance(&p);
        device.advance(&p);
        device.advance(&p);
        device.advance(&p);
        device.advance(&p);
        assert_eq!(device.advance(&p).event, Some(DeviceEvent::FuelEmpty));
    }

    #[test]
    fn test_disabled_notifications_never_latch() {
        let mut device = Device::new(ActorId::from_seed(1), 1);
        let p = TickParams {
            notify_fuel_empty: false,
            ..params()
        };
        assert_eq!(device.advance(&p).event, None);
        assert!(!device.latches().fuel_empty);
    }

    #[test]
    fn test_add_fuel_caps() {
        let mut device = fueled(3500);
        assert_eq!(device.add_fuel(300, 3600), 100);
        assert_eq!(device.fuel_remaining_secs(), 3600);
    }

    #[test]
    fn test_upgrade_is_monotonic() {
        let mut device = Device::new(ActorId::from_seed(1), 2);
        assert!(!device.upgrade_to(2));
        assert!(!device.upgrade_to(1));
        assert!(device.upgrade_to(4));
        assert_eq!(device.tier(), 4);
    }

    #[test]
    fn test_owner_cannot_be_friend() {
        let owner = ActorId::from_seed(1);
        let mut device = Device::new(owner, 1);
        assert!(!device.add_friend(owner));
        assert!(device.add_friend(ActorId::from_seed(2)));
        assert!(!device.add_friend(ActorId::from_seed(2)));
        assert!(device.remove_friend(ActorId::from_seed(2)));
        assert!(!device.remove_friend(ActorId::from_seed(2)));
    }

    #[test]
    fn test_normalize_clamps() {
        let owner = ActorId::from_seed(1);
        let config = PrinterConfig {
            payout_interval_secs: 50,
            max_storage: 100.0,
            max_fuel_secs: 600,
            ..PrinterConfig::default()
        };
        let mut device = Device::restore(owner, 0, 9000, 70, 250.0, [owner].into_iter().collect());

        assert!(device.normalize(&config));
        assert_eq!(device.tier(), 1);
        assert_eq!(device.fuel_remaining_secs(), 600);
        assert_eq!(device.accrual_counter_secs(), 20);
        assert_eq!(device.stored_earnings(), 100.0);
        assert!(device.friends().is_empty());
        assert!(!device.normalize(&config));
    }

    #[test]
    fn test_fuel_clock() {
        assert_eq!(fueled(0).fuel_clock(), "00:00");
        assert_eq!(fueled(605).fuel_clock(), "10:05");
    }
}
