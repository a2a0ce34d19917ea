//! Simulation Clock - the periodic sweep that advances every device.
//!
//! A sweep runs in two phases so the store lock is never held across a
//! world query or a notification:
//!
//! 1. Snapshot the keys and ask the world which placements still exist
//!    (no lock held).
//! 2. Under one store lock, remove orphans and advance every surviving
//!    device by one tick ([`apply_sweep`]).
//!
//! The engine then dispatches the collected notifications and persists
//! once if anything changed.
//!
//! Accrual is counted in ticks rather than derived from wall-clock
//! timestamps, so downtime never produces retroactive payouts.

use crate::config::PrinterConfig;
use crate::device::{DeviceEvent, TickParams};
use crate::engine::PrinterEngine;
use crate::store::DeviceStore;
use printer_env::{ActorId, Notification, PrinterContext, SpatialKey};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info};

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    /// Devices advanced
    pub processed: usize,
    /// Number of payouts made
    pub payouts: usize,
    /// Total added to storage across all payouts
    pub paid: f64,
    /// Keys swept away because their placement vanished
    pub removed: Vec<SpatialKey>,
    /// Owner-facing notifications, in key order
    pub notifications: Vec<(ActorId, Notification)>,
    /// Persisted state changed (needs a save)
    pub changed: bool,
}

/// Phase two of a sweep.
///
/// `checked` pairs each key from the phase-one snapshot with whether its
/// placement still exists. Keys removed or added since the snapshot are
/// left alone until the next sweep.
pub fn apply_sweep(store: &mut DeviceStore, config: &PrinterConfig, checked: &[(SpatialKey, bool)]) -> SweepReport {
    let mut report = SweepReport::default();

    for (key, exists) in checked {
        if !exists {
            if let Some(device) = store.remove(key) {
                info!(key = %key, owner = %device.owner(), "Placement gone; device removed");
                report.removed.push(key.clone());
                report.changed = true;
            }
            continue;
        }

        let Some(device) = store.get_mut(key) else {
            continue;
        };
        report.processed += 1;

        let outcome = device.advance(&TickParams::for_tier(config, device.tier()));
        report.changed |= outcome.changed;
        if let Some(amount) = outcome.paid {
            report.payouts += 1;
            report.paid += amount;
        }

        let notification = match outcome.event {
            Some(DeviceEvent::FuelEmpty) => Notification::FuelEmpty {
                key: key.clone(),
                fuel_resource: config.fuel_resource.clone(),
            },
            Some(DeviceEvent::StorageFull { stored }) => Notification::StorageFull {
                key: key.clone(),
                stored,
            },
            None => continue,
        };
        report.notifications.push((device.owner(), notification));
    }

    debug!(
        processed = report.processed,
        payouts = report.payouts,
        paid = report.paid,
        removed = report.removed.len(),
        notifications = report.notifications.len(),
        "Sweep complete"
    );
    report
}

/// Drives [`PrinterEngine::sweep`] on a fixed period.
///
/// The period is read from the configuration once, at construction; a
/// later reload does not reschedule the clock.
pub struct SimulationClock<Ctx: PrinterContext> {
    engine: Arc<PrinterEngine>,
    context: Arc<Ctx>,
    period: std::time::Duration,
    sweeps: u64,
}

impl<Ctx: PrinterContext> SimulationClock<Ctx> {
    pub fn new(engine: Arc<PrinterEngine>, context: Arc<Ctx>) -> Self {
        let period = engine.config().tick_duration();
        Self {
            engine,
            context,
            period,
            sweeps: 0,
        }
    }

    /// Sweeps completed so far.
    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    pub fn period(&self) -> std::time::Duration {
        self.period
    }

    /// Sleeps one period and sweeps, `count` times.
    pub async fn run_ticks(&mut self, count: u64) -> Vec<SweepReport> {
        let mut reports = Vec::new();
        for _ in 0..count {
            self.context.sleep(self.period).await;
            reports.push(self.engine.sweep());
            self.sweeps += 1;
        }
        reports
    }

    /// Runs until `shutdown` flips to true or its sender is dropped.
    ///
    /// Returns the number of sweeps performed.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!(period_secs = self.period.as_secs(), "Simulation clock started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = self.context.sleep(self.period) => {}
            }

            self.engine.sweep();
            self.sweeps += 1;
        }

        info!(sweeps = self.sweeps, "Simulation clock stopped");
        self.sweeps
    }

    /// Spawns [`SimulationClock::run`] on the context's executor.
    ///
    /// The returned receiver yields the sweep count once the clock stops.
    pub fn start(mut self, shutdown: watch::Receiver<bool>) -> oneshot::Receiver<u64> {
        let (done, finished) = oneshot::channel();
        let context = self.context.clone();
        context.spawn("printer-clock", async move {
            let sweeps = self.run(shutdown).await;
            let _ = done.send(sweeps);
        });
        finished
    }
}
