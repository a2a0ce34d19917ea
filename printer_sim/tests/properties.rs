use printer_core::config::DEFAULT_FUEL_RESOURCE;
use printer_core::{IntentError, PrinterConfig};
use printer_env::{ActorId, Ledger, SpatialKey, WorldView};
use printer_sim::{SimConfig, SimWorld};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

const SLOTS: i32 = 4;

#[derive(Debug, Clone)]
enum Op {
    Place { player: usize, slot: i32, tier: u32 },
    Remove { player: usize, slot: i32 },
    Fuel { player: usize, slot: i32 },
    Collect { player: usize, slot: i32 },
    Upgrade { player: usize, slot: i32, tier: u32 },
    AddFriend { player: usize, slot: i32, friend: usize },
    RemoveFriend { player: usize, slot: i32, friend: usize },
    Break { slot: i32 },
    Tick { count: u8 },
    Restart,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let player = 0usize..3;
    let slot = 0..SLOTS;
    prop_oneof![
        1 => (player.clone(), slot.clone(), 1u32..=5).prop_map(|(player, slot, tier)| Op::Place { player, slot, tier }),
        1 => (player.clone(), slot.clone()).prop_map(|(player, slot)| Op::Remove { player, slot }),
        3 => (player.clone(), slot.clone()).prop_map(|(player, slot)| Op::Fuel { player, slot }),
        2 => (player.clone(), slot.clone()).prop_map(|(player, slot)| Op::Collect { player, slot }),
        1 => (player.clone(), slot.clone(), 1u32..=5).prop_map(|(player, slot, tier)| Op::Upgrade { player, slot, tier }),
        1 => (player.clone(), slot.clone(), player.clone())
            .prop_map(|(player, slot, friend)| Op::AddFriend { player, slot, friend }),
        1 => (player.clone(), slot.clone(), player.clone())
            .prop_map(|(player, slot, friend)| Op::RemoveFriend { player, slot, friend }),
        1 => slot.prop_map(|slot| Op::Break { slot }),
        3 => (1u8..12).prop_map(|count| Op::Tick { count }),
        1 => Just(Op::Restart),
    ]
}

fn slot_key(slot: i32) -> SpatialKey {
    SpatialKey::new("world", slot, 64, 0)
}

fn world(seed: u64) -> SimWorld {
    let mut printer = PrinterConfig {
        tick_secs: 10,
        payout_interval_secs: 50,
        fuel_per_item_secs: 300,
        max_fuel_secs: 3600,
        max_storage: 100.0,
        ..PrinterConfig::default()
    };
    printer.disabled_worlds.clear();

    let world = SimWorld::new(SimConfig {
        seed,
        num_players: 3,
        starting_balance: 3_000.0,
        printer,
        ..Default::default()
    })
    .unwrap();

    world.host.grant_tiers(world.player(0), 4);
    world.host.grant_tiers(world.player(1), 2);
    for player in world.players() {
        world.host.give_items(*player, DEFAULT_FUEL_RESOURCE, 50);
    }
    world
}

/// The persisted part of a device, keyed by location.
type Durable = Vec<(SpatialKey, ActorId, u32, u64, u64, f64, BTreeSet<ActorId>)>;

fn durable(world: &SimWorld) -> Durable {
    world
        .engine()
        .snapshot()
        .into_iter()
        .map(|(key, d)| {
            (
                key,
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

fn apply(world: &mut SimWorld, op: &Op) {
    let engine = world.engine().clone();
    match *op {
        Op::Place { player, slot, tier } => {
            let _ = world.place(world.player(player), &slot_key(slot), tier);
        }
        Op::Remove { player, slot } => {
            let key = slot_key(slot);
            if engine.remove(world.player(player), &key).is_ok() {
                world.host.break_block(&key);
            }
        }
        Op::Fuel { player, slot } => {
            let _ = engine.add_fuel(world.player(player), &slot_key(slot));
        }
        Op::Collect { player, slot } => {
            let _ = engine.collect(world.player(player), &slot_key(slot));
        }
        Op::Upgrade { player, slot, tier } => {
            let _ = engine.upgrade(world.player(player), &slot_key(slot), tier);
        }
        Op::AddFriend { player, slot, friend } => {
            let _ = engine.add_friend(world.player(player), &slot_key(slot), world.player(friend));
        }
        Op::RemoveFriend { player, slot, friend } => {
            let _ = engine.remove_friend(world.player(player), &slot_key(slot), world.player(friend));
        }
        Op::Break { slot } => world.host.break_block(&slot_key(slot)),
        Op::Tick { count } => {
            for _ in 0..count {
                world.tick();
            }
        }
        Op::Restart => world.restart().unwrap(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_invariants_hold_after_every_step(
        seed in any::<u64>(),
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let mut world = world(seed);
        let limit = world.engine().config().max_per_owner as usize;

        for op in &ops {
            apply(&mut world, op);
            if let Err(reason) = world.check_invariants() {
                prop_assert!(false, "after {:?}: {}", op, reason);
            }
            for player in world.players() {
                prop_assert!(world.engine().count_by_owner(*player) <= limit);
            }
            for (key, _) in world.engine().snapshot() {
                // Anything surviving a sweep must still have its block.
                if matches!(op, Op::Tick { .. }) {
                    prop_assert!(world.host.placement_exists(&key), "{} outlived its block", key);
                }
            }
        }
    }

    #[test]
    fn prop_tiers_never_decrease(
        seed in any::<u64>(),
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let mut world = world(seed);
        let mut seen: HashMap<SpatialKey, u32> = HashMap::new();

        for op in &ops {
            apply(&mut world, op);
            let current: HashMap<SpatialKey, u32> = world
                .engine()
                .snapshot()
                .into_iter()
                .map(|(key, d)| (key, d.tier()))
                .collect();
            for (key, tier) in &current {
                if let Some(before) = seen.get(key) {
                    prop_assert!(tier >= before, "{} dropped from {} to {}", key, before, tier);
                }
            }
            seen = current;
        }
    }

    #[test]
    fn prop_second_collect_finds_nothing(
        seed in any::<u64>(),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let mut world = world(seed);
        for op in &ops {
            apply(&mut world, op);
        }

        let engine = world.engine().clone();
        for (key, device) in engine.snapshot() {
            let owner = device.owner();
            let before = world.host.balance(owner);
            match engine.collect(owner, &key) {
                Ok(_) => {
                    prop_assert!(world.host.balance(owner) > before);
                    prop_assert_eq!(engine.device(&key).map(|d| d.stored_earnings()), Some(0.0));
                }
                Err(e) => prop_assert!(matches!(e, IntentError::NothingToCollect), "{:?}", e),
            }
            let second = engine.collect(owner, &key);
            prop_assert!(matches!(second, Err(IntentError::NothingToCollect)), "{:?}", second);
        }
    }

    #[test]
    fn prop_restart_preserves_durable_state(
        seed in any::<u64>(),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let mut world = world(seed);
        for op in &ops {
            apply(&mut world, op);
        }

        let before = durable(&world);
        world.restart().unwrap();
        prop_assert_eq!(durable(&world), before);
    }
}
