//! Scenario runner - executes simulation scenarios against a fresh world.

use crate::scenarios::ScenarioId;
use crate::world::{Backend, SimConfig, SimError, SimWorld};

use printer_core::{DeviceSnapshot, Intent, IntentError, IntentOutcome, PrinterConfig, SimulationClock, SweepReport};
use printer_env::{ActorId, Ledger, Notification, SpatialKey};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total sweeps executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Devices left in the store at the end
    pub final_device_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Sweeps executed
    pub sweeps: u64,

    /// Intents that succeeded
    pub intents_applied: u64,

    /// Intents refused with a named failure
    pub intents_rejected: u64,

    /// Payouts made by sweeps
    pub payouts: u64,

    /// Total currency added to storage by sweeps
    pub paid: f64,

    /// Notifications dispatched
    pub notifications: u64,

    /// Devices swept away as orphans
    pub orphans_removed: u64,

    /// Engine restarts performed
    pub restarts: u64,
}

impl ScenarioMetrics {
    fn record_sweep(&mut self, report: &SweepReport) {
        self.sweeps += 1;
        self.payouts += report.payouts as u64;
        self.paid += report.paid;
        self.notifications += report.notifications.len() as u64;
        self.orphans_removed += report.removed.len() as u64;
    }

    fn record_intent(&mut self, result: &Result<IntentOutcome, IntentError>) {
        match result {
            Ok(_) => self.intents_applied += 1,
            Err(_) => self.intents_rejected += 1,
        }
    }
}

fn ensure(condition: bool, reason: impl FnOnce() -> String) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(reason())
    }
}

fn key(x: i32, z: i32) -> SpatialKey {
    SpatialKey::new("world", x, 64, z)
}

/// Persisted fields only; latches are not part of durable state.
fn durable_view(snapshot: &[(SpatialKey, DeviceSnapshot)]) -> Vec<(String, ActorId, u32, u64, u64, f64, BTreeSet<ActorId>)> {
    snapshot
        .iter()
        .map(|(key, d)| {
            (
                key.to_string(),
                d.owner(),
                d.tier(),
                d.fuel_remaining_secs(),
                d.accrual_counter_secs(),
                d.stored_earnings(),
                d.friends().clone(),
            )
        })
        .collect()
}

/// Runs simulation scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Engine configuration the scenarios start from
    printer: PrinterConfig,

    /// Storage backend; file backends treat the path as a directory
    backend: Backend,

    /// Sweeps performed by the chaos scenario
    chaos_ticks: u64,

    /// Players in the chaos scenario
    num_players: usize,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            printer: PrinterConfig::default(),
            backend: Backend::Memory,
            chaos_ticks: 500,
            num_players: 6,
        }
    }

    pub fn with_config(mut self, printer: PrinterConfig) -> Self {
        self.printer = printer;
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the chaos scenario length in sweeps.
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.chaos_ticks = ticks;
        self
    }

    pub fn with_players(mut self, players: usize) -> Self {
        self.num_players = players.max(2);
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let mut metrics = ScenarioMetrics::default();
        let mut world = match self.build_world(scenario) {
            Ok(world) => world,
            Err(e) => {
                return ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: false,
                    total_ticks: 0,
                    final_time_secs: 0.0,
                    final_device_count: 0,
                    failure_reason: Some(format!("setup failed: {}", e)),
                    metrics,
                };
            }
        };

        let outcome = match scenario {
            ScenarioId::Lifecycle => self.run_lifecycle(&mut world, &mut metrics),
            ScenarioId::Accrual => self.run_accrual(&mut world, &mut metrics),
            ScenarioId::StorageCap => self.run_storage_cap(&mut world, &mut metrics),
            ScenarioId::Friends => self.run_friends(&mut world, &mut metrics),
            ScenarioId::UpgradeRace => self.run_upgrade_race(&mut world, &mut metrics),
            ScenarioId::Orphans => self.run_orphans(&mut world, &mut metrics),
            ScenarioId::Restart => self.run_restart(&mut world, &mut metrics),
            ScenarioId::Chaos => self.run_chaos(&mut world, &mut metrics),
        };
        let outcome = outcome.and_then(|()| world.check_invariants());

        if let Err(e) = world.engine().shutdown() {
            warn!("Final save failed: {}", e);
        }

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: outcome.is_ok(),
            total_ticks: metrics.sweeps,
            final_time_secs: world.time(),
            final_device_count: world.engine().snapshot().len(),
            failure_reason: outcome.err(),
            metrics,
        }
    }

    /// Fixed timing so the expected numbers are exact: 10s sweeps, 50s
    /// payouts, 300s of fuel per item, one hour of fuel at most.
    fn printer_for(&self, scenario: ScenarioId) -> PrinterConfig {
        let mut printer = PrinterConfig {
            tick_secs: 10,
            payout_interval_secs: 50,
            fuel_per_item_secs: 300,
            max_fuel_secs: 3600,
            ..self.printer.clone()
        };
        printer.disabled_worlds.remove("world");
        if matches!(scenario, ScenarioId::StorageCap | ScenarioId::Chaos) {
            printer.max_storage = 100.0;
        }
        printer
    }

    fn backend_for(&self, scenario: ScenarioId) -> Backend {
        let name = format!("{}-{}", scenario.name(), self.seed);
        match &self.backend {
            Backend::Memory => Backend::Memory,
            Backend::Json(dir) => {
                let path = dir.join(format!("{}.json", name));
                let _ = std::fs::remove_file(&path);
                Backend::Json(path)
            }
            Backend::Sled(dir) => {
                let path = dir.join(name);
                let _ = std::fs::remove_dir_all(&path);
                Backend::Sled(path)
            }
        }
    }

    fn build_world(&self, scenario: ScenarioId) -> Result<SimWorld, SimError> {
        SimWorld::new(SimConfig {
            seed: self.seed,
            num_players: if scenario == ScenarioId::Chaos { self.num_players } else { 4 },
            starting_balance: 10_000.0,
            printer: self.printer_for(scenario),
            backend: self.backend_for(scenario),
        })
    }

    /// SIM-001: Lifecycle - place, fuel, tick, collect, remove.
    fn run_lifecycle(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let owner = world.player(0);
        let k = key(0, 0);
        let config = world.engine().config();

        world.place(owner, &k, 1).map_err(|e| format!("place: {}", e))?;
        metrics.intents_applied += 1;
        let device = world.engine().device(&k).ok_or("device missing after place")?;
        ensure(device.owner() == owner && device.tier() == 1, || "wrong owner or tier".into())?;
        ensure(device.fuel_remaining_secs() == 0 && device.stored_earnings() == 0.0, || {
            "new device not empty".into()
        })?;

        world.host.give_items(owner, &config.fuel_resource, 1);
        let fueled = world.engine().add_fuel(owner, &k);
        metrics.record_intent(&fueled);
        fueled.map_err(|e| format!("add fuel: {}", e))?;
        let fuel = world.engine().device(&k).map(|d| d.fuel_remaining_secs());
        ensure(fuel == Some(300), || format!("fuel after one item: {:?}", fuel))?;

        for _ in 0..10 {
            let report = world.tick();
            metrics.record_sweep(&report);
        }
        let device = world.engine().device(&k).ok_or("device vanished")?;
        ensure(device.fuel_remaining_secs() == 200, || {
            format!("fuel after ten ticks: {}", device.fuel_remaining_secs())
        })?;

        let expected = 2.0 * config.tiers.earnings_rate(1);
        let before = world.host.balance(owner);
        let collected = world.engine().collect(owner, &k);
        metrics.record_intent(&collected);
        match collected {
            Ok(IntentOutcome::Collected { amount }) => {
                ensure((amount - expected).abs() < 1e-9, || format!("collected {} not {}", amount, expected))?
            }
            Ok(other) => return Err(format!("unexpected outcome {:?}", other)),
            Err(IntentError::NothingToCollect) if expected == 0.0 => {}
            Err(e) => return Err(format!("collect: {}", e)),
        }
        ensure((world.host.balance(owner) - before - expected).abs() < 1e-9, || {
            "ledger not credited".into()
        })?;

        let again = world.engine().collect(owner, &k);
        metrics.record_intent(&again);
        ensure(matches!(again, Err(IntentError::NothingToCollect)), || {
            format!("second collect: {:?}", again)
        })?;

        let removed = world.engine().remove(owner, &k);
        metrics.record_intent(&removed);
        removed.map_err(|e| format!("remove: {}", e))?;
        ensure(world.host.device_items(owner) == vec![1], || "device item not returned".into())?;
        ensure(!world.engine().is_protected(&k), || "key still protected".into())?;

        info!("✓ Lifecycle complete: {} payouts", metrics.payouts);
        Ok(())
    }

    /// SIM-002: Accrual - driven through the clock runner on virtual time.
    fn run_accrual(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let owner = world.player(0);
        let k = key(1, 0);
        let config = world.engine().config();
        let rate = config.tiers.earnings_rate(1);

        world.place(owner, &k, 1).map_err(|e| format!("place: {}", e))?;
        world.host.give_items(owner, &config.fuel_resource, 12);
        for _ in 0..12 {
            let result = world.engine().add_fuel(owner, &k);
            metrics.record_intent(&result);
            result.map_err(|e| format!("add fuel: {}", e))?;
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| format!("runtime: {}", e))?;
        let mut clock = SimulationClock::new(world.engine().clone(), world.context.clone());

        for round in 1..=4u32 {
            let reports = runtime.block_on(clock.run_ticks(5));
            let payouts: usize = reports.iter().map(|r| r.payouts).sum();
            reports.iter().for_each(|r| metrics.record_sweep(r));

            let device = world.engine().device(&k).ok_or("device vanished")?;
            ensure(payouts == 1, || format!("round {}: {} payouts", round, payouts))?;
            ensure(device.accrual_counter_secs() == 0, || {
                format!("round {}: counter {}", round, device.accrual_counter_secs())
            })?;
            let expected = rate * round as f64;
            ensure((device.stored_earnings() - expected).abs() < 1e-9, || {
                format!("round {}: stored {} not {}", round, device.stored_earnings(), expected)
            })?;
        }

        ensure(world.time() == 200.0, || format!("virtual time {}", world.time()))?;
        info!("✓ Accrual complete: {} sweeps, {} paid", clock.sweeps(), metrics.paid);
        Ok(())
    }

    /// SIM-003: StorageCap - clamp at the cap, one notification per full episode.
    fn run_storage_cap(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let owner = world.player(0);
        let k = key(2, 0);
        let config = world.engine().config();
        let tier = config.tiers.highest_tier();
        ensure(config.tiers.earnings_rate(tier) > 0.0, || "no earning tier in catalog".into())?;

        world.host.grant_tiers(owner, tier);
        world.place(owner, &k, tier).map_err(|e| format!("place: {}", e))?;
        world.host.give_items(owner, &config.fuel_resource, 12);
        for _ in 0..12 {
            let _ = world.engine().add_fuel(owner, &k);
        }

        let mut full_notices = 0;
        for episode in 1..=2 {
            for _ in 0..200 {
                let report = world.tick();
                metrics.record_sweep(&report);
                let stored = world.engine().device(&k).map(|d| d.stored_earnings()).unwrap_or(0.0);
                ensure(stored <= config.max_storage, || format!("stored {} above cap", stored))?;
            }
            let inbox = world.host.take_inbox(owner);
            full_notices += inbox
                .iter()
                .filter(|n| matches!(n, Notification::StorageFull { .. }))
                .count();
            ensure(full_notices == episode, || {
                format!("episode {}: {} full notifications", episode, full_notices)
            })?;

            let collected = world.engine().collect(owner, &k);
            metrics.record_intent(&collected);
            match collected {
                Ok(IntentOutcome::Collected { amount }) => ensure((amount - config.max_storage).abs() < 1e-9, || {
                    format!("collected {} from a full device", amount)
                })?,
                other => return Err(format!("collect: {:?}", other)),
            }
        }

        info!("✓ StorageCap complete: {} full notifications", full_notices);
        Ok(())
    }

    /// SIM-004: Friends - a friend may collect until removed.
    fn run_friends(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let owner = world.player(0);
        let friend = world.player(1);
        let stranger = world.player(2);
        let k = key(3, 0);
        let config = world.engine().config();

        world.place(owner, &k, 1).map_err(|e| format!("place: {}", e))?;
        world.host.give_items(owner, &config.fuel_resource, 1);
        let _ = world.engine().add_fuel(owner, &k);
        for _ in 0..10 {
            let report = world.tick();
            metrics.record_sweep(&report);
        }

        let denied = world.engine().collect(friend, &k);
        metrics.record_intent(&denied);
        ensure(matches!(denied, Err(IntentError::AccessDenied)), || {
            format!("collect before friendship: {:?}", denied)
        })?;

        let added = world.engine().add_friend(owner, &k, friend);
        metrics.record_intent(&added);
        added.map_err(|e| format!("add friend: {}", e))?;

        let by_friend = world.engine().add_friend(friend, &k, stranger);
        metrics.record_intent(&by_friend);
        ensure(matches!(by_friend, Err(IntentError::NotOwner)), || {
            format!("friend managing friends: {:?}", by_friend)
        })?;

        let listed = world.engine().friends(friend, &k).map_err(|e| format!("friends: {}", e))?;
        ensure(listed == vec![friend], || format!("friend list {:?}", listed))?;

        let collected = world.engine().collect(friend, &k);
        metrics.record_intent(&collected);
        collected.map_err(|e| format!("friend collect: {}", e))?;

        let removed = world.engine().remove_friend(owner, &k, friend);
        metrics.record_intent(&removed);
        removed.map_err(|e| format!("remove friend: {}", e))?;

        let after = world.engine().collect(friend, &k);
        metrics.record_intent(&after);
        ensure(matches!(after, Err(IntentError::AccessDenied)), || {
            format!("collect after removal: {:?}", after)
        })?;

        info!("✓ Friends complete");
        Ok(())
    }

    /// SIM-005: UpgradeRace - eight threads, one upgrade.
    fn run_upgrade_race(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let owner = world.player(0);
        let k = key(4, 0);
        let config = world.engine().config();
        let target = config.tiers.next_tier(1).ok_or("catalog has a single tier")?;
        let (target_tier, cost) = (target.tier, target.upgrade_cost);

        world.host.grant_tiers(owner, target_tier);
        world.place(owner, &k, 1).map_err(|e| format!("place: {}", e))?;
        let before = world.host.balance(owner);

        let engine = world.engine().clone();
        let results: Vec<Result<IntentOutcome, IntentError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let engine = &engine;
                    let k = &k;
                    scope.spawn(move || engine.upgrade(owner, k, target_tier))
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|handle| handle.join().ok())
                .collect()
        });
        results.iter().for_each(|r| metrics.record_intent(r));

        ensure(results.len() == 8, || "an upgrade thread panicked".into())?;
        let successes = results.iter().filter(|r| r.is_ok()).count();
        ensure(successes == 1, || format!("{} upgrades succeeded", successes))?;
        let charged = before - world.host.balance(owner);
        ensure((charged - cost).abs() < 1e-9, || format!("charged {} for cost {}", charged, cost))?;
        let tier = world.engine().device(&k).map(|d| d.tier());
        ensure(tier == Some(target_tier), || format!("final tier {:?}", tier))?;

        info!("✓ UpgradeRace complete: charged {:.2} once", charged);
        Ok(())
    }

    /// SIM-006: Orphans - devices whose block is gone are removed.
    fn run_orphans(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let admin = world.player(0);
        world.host.make_admin(admin);

        let keys: Vec<SpatialKey> = (0..5).map(|x| key(10 + x, 0)).collect();
        for k in &keys {
            world.place(admin, k, 1).map_err(|e| format!("place {}: {}", k, e))?;
        }
        world.host.break_block(&keys[1]);
        world.host.break_block(&keys[3]);

        let report = world.tick();
        metrics.record_sweep(&report);

        ensure(report.removed == vec![keys[1].clone(), keys[3].clone()], || {
            format!("removed {:?}", report.removed)
        })?;
        ensure(world.engine().snapshot().len() == 3, || "orphans remain".into())?;

        let report = world.tick();
        metrics.record_sweep(&report);
        ensure(report.removed.is_empty(), || "orphans removed twice".into())?;

        info!("✓ Orphans complete: {} removed", metrics.orphans_removed);
        Ok(())
    }

    /// SIM-007: Restart - durable state survives.
    fn run_restart(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let config = world.engine().config();
        let (a, b, c) = (world.player(0), world.player(1), world.player(2));
        let (ka, kb) = (key(20, 0), key(21, 5));

        world.place(a, &ka, 1).map_err(|e| format!("place: {}", e))?;
        world.place(b, &kb, 1).map_err(|e| format!("place: {}", e))?;
        world.host.give_items(a, &config.fuel_resource, 3);
        for _ in 0..3 {
            let _ = world.engine().add_fuel(a, &ka);
        }
        let _ = world.engine().add_friend(a, &ka, c);
        for _ in 0..7 {
            let report = world.tick();
            metrics.record_sweep(&report);
        }

        let before = durable_view(&world.engine().snapshot());
        world.restart().map_err(|e| format!("restart: {}", e))?;
        metrics.restarts += 1;
        let after = durable_view(&world.engine().snapshot());
        ensure(before == after, || format!("state changed across restart: {:?} vs {:?}", before, after))?;

        let report = world.tick();
        metrics.record_sweep(&report);
        ensure(report.processed == 2, || "restored devices not swept".into())?;

        info!("✓ Restart complete: {} devices restored", after.len());
        Ok(())
    }

    /// SIM-008: Chaos - random interleavings with invariant checks after every step.
    fn run_chaos(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let config = world.engine().config();
        let highest = config.tiers.highest_tier();
        let admin = world.player(0);
        world.host.make_admin(admin);
        for (i, player) in world.players().to_vec().into_iter().enumerate() {
            world.host.grant_tiers(player, 1 + (i as u32 % highest));
        }

        for tick in 0..self.chaos_ticks {
            let actions = world.context.gen_index(4);
            for _ in 0..actions {
                let actor = world.player(world.context.gen_index(world.players().len()));
                let k = key(world.context.gen_index(4) as i32, world.context.gen_index(4) as i32);
                let intent = match world.context.gen_index(8) {
                    0 => Intent::Place {
                        tier: 1 + world.context.gen_index(highest as usize + 1) as u32,
                    },
                    1 if world.context.gen_bool(0.3) => Intent::Remove,
                    2 | 3 => {
                        world.host.give_items(actor, &config.fuel_resource, 1);
                        Intent::AddFuel
                    }
                    4 => Intent::Collect,
                    5 => Intent::Upgrade {
                        target_tier: 1 + world.context.gen_index(highest as usize + 1) as u32,
                    },
                    6 => Intent::AddFriend {
                        target: world.player(world.context.gen_index(world.players().len())),
                    },
                    _ => Intent::RemoveFriend {
                        target: world.player(world.context.gen_index(world.players().len())),
                    },
                };

                let before = durable_view(&world.engine().snapshot());
                if matches!(intent, Intent::Place { .. }) {
                    world.host.set_block(&k);
                }
                let result = world.engine().handle(actor, &k, intent.clone());
                metrics.record_intent(&result);
                if let Err(e) = &result {
                    if matches!(intent, Intent::Place { .. }) && !world.engine().is_protected(&k) {
                        world.host.break_block(&k);
                    }
                    let after = durable_view(&world.engine().snapshot());
                    ensure(before == after, || format!("tick {}: rejected {:?} ({}) changed state", tick, intent, e))?;
                }
            }

            if world.context.gen_bool(0.05) {
                let k = key(world.context.gen_index(4) as i32, world.context.gen_index(4) as i32);
                debug!(key = %k, "Breaking block");
                world.host.break_block(&k);
            }

            let report = world.tick();
            metrics.record_sweep(&report);
            world.check_invariants().map_err(|e| format!("tick {}: {}", tick, e))?;

            if world.context.gen_bool(0.01) {
                let before = durable_view(&world.engine().snapshot());
                world.restart().map_err(|e| format!("restart: {}", e))?;
                metrics.restarts += 1;
                let after = durable_view(&world.engine().snapshot());
                ensure(before == after, || format!("tick {}: restart lost state", tick))?;
            }
        }

        info!(
            "✓ Chaos complete: {} applied, {} rejected, {} payouts, {} restarts",
            metrics.intents_applied, metrics.intents_rejected, metrics.payouts, metrics.restarts
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_scenario_passes_in_memory() {
        let runner = ScenarioRunner::new(42).with_ticks(100);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
        }
    }

    #[test]
    fn test_accrual_metrics() {
        let result = ScenarioRunner::new(7).run(ScenarioId::Accrual);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.payouts, 4);
        assert_eq!(result.final_device_count, 1);
    }

    #[test]
    fn test_orphans_counted() {
        let result = ScenarioRunner::new(7).run(ScenarioId::Orphans);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.orphans_removed, 2);
        assert_eq!(result.final_device_count, 3);
    }

    #[test]
    fn test_chaos_deterministic() {
        let a = ScenarioRunner::new(99).with_ticks(80).run(ScenarioId::Chaos);
        let b = ScenarioRunner::new(99).with_ticks(80).run(ScenarioId::Chaos);

        assert!(a.passed, "{:?}", a.failure_reason);
        assert_eq!(a.metrics.intents_applied, b.metrics.intents_applied);
        assert_eq!(a.metrics.payouts, b.metrics.payouts);
        assert_eq!(a.final_device_count, b.final_device_count);
    }

    #[test]
    fn test_restart_on_json_and_sled() {
        let dir = std::env::temp_dir().join(format!("printer-sim-runner-{}", std::process::id()));
        for backend in [Backend::Json(dir.clone()), Backend::Sled(dir.clone())] {
            let result = ScenarioRunner::new(3).with_backend(backend.clone()).run(ScenarioId::Restart);
            assert!(result.passed, "{:?}: {:?}", backend, result.failure_reason);
        }
        let _ = std::fs::remove_dir_all(&dir);
    }
}
