//! Property-based tests for the recalculation engine.
//!
//! Each case builds a small ledger from a random sequence of movements, in
//! random date order, and checks the invariants that must hold whatever the
//! order of insertion was.

mod common;

use common::{bbl, create_tank, current_level, day, open_ledger};
use proptest::prelude::*;
use std::collections::BTreeMap;
use tank_ledger::service::NewMovement;
use tank_ledger::store::MovementQuery;
use tank_ledger::{Ledger, MovementType, Overridable, Volume};

// PROPERTY TEST STRATEGIES

/// Strategy to generate a load or discharge on some day of the month
fn movement_strategy() -> impl Strategy<Value = (MovementType, u32, i64)> {
    (
        prop_oneof![Just(MovementType::Load), Just(MovementType::Discharge)],
        1u32..=28,
        1i64..=4_000,
    )
}

/// Strategy to generate a transfer between two tanks, either direction
fn transfer_strategy() -> impl Strategy<Value = (bool, u32, i64)> {
    (prop::bool::ANY, 1u32..=28, 1i64..=3_000)
}

// Books each movement, ignoring the ones the ledger refuses.
fn book(ledger: &Ledger, tank_id: &str, movements: &[(MovementType, u32, i64)]) {
    for (movement_type, d, volume) in movements {
        let request = NewMovement::new(*movement_type, tank_id, day(*d), bbl(*volume));
        let _ = ledger.movements().create(request);
    }
}

fn recorded_levels(ledger: &Ledger, tank_id: &str) -> anyhow::Result<BTreeMap<String, Volume>> {
    Ok(ledger
        .movements()
        .list(MovementQuery::for_tank(tank_id))?
        .into_iter()
        .filter_map(|movement| {
            let level = movement.recorded_volume_for(tank_id)?;
            Some((movement.id, level))
        })
        .collect())
}

// PROPERTY TESTS
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: no accepted movement ever leaves a tank below zero
    #[test]
    fn prop_levels_never_negative(
        initial in 0i64..=5_000,
        movements in prop::collection::vec(movement_strategy(), 1..12)
    ) {
        let ledger = open_ledger(day(28)).unwrap();
        let tank = create_tank(&ledger, "A", "north", 100_000, initial).unwrap();
        book(&ledger, &tank.id, &movements);

        for (id, level) in recorded_levels(&ledger, &tank.id).unwrap() {
            prop_assert!(!level.is_negative(), "movement {} left level {}", id, level);
        }
        prop_assert!(!current_level(&ledger, &tank.id).unwrap().is_negative());
    }

    /// Property: recalculating from each insertion point gives the same
    /// levels as replaying the whole history, and rebuilding twice changes nothing
    #[test]
    fn prop_incremental_matches_rebuild(
        initial in 0i64..=5_000,
        movements in prop::collection::vec(movement_strategy(), 1..12)
    ) {
        let ledger = open_ledger(day(28)).unwrap();
        let tank = create_tank(&ledger, "A", "north", 100_000, initial).unwrap();
        book(&ledger, &tank.id, &movements);

        let incremental = recorded_levels(&ledger, &tank.id).unwrap();
        let level = current_level(&ledger, &tank.id).unwrap();

        let rebuilt = ledger.tanks().rebuild(&tank.id).unwrap();
        prop_assert_eq!(rebuilt, level);
        prop_assert_eq!(recorded_levels(&ledger, &tank.id).unwrap(), incremental.clone());

        let again = ledger.tanks().rebuild(&tank.id).unwrap();
        prop_assert_eq!(again, rebuilt);
        prop_assert_eq!(recorded_levels(&ledger, &tank.id).unwrap(), incremental);
    }

    /// Property: the last day of the daily history matches the current level
    #[test]
    fn prop_daily_history_ends_at_current_level(
        initial in 0i64..=5_000,
        movements in prop::collection::vec(movement_strategy(), 0..10)
    ) {
        let ledger = open_ledger(day(28)).unwrap();
        let tank = create_tank(&ledger, "A", "north", 100_000, initial).unwrap();
        book(&ledger, &tank.id, &movements);

        let history = ledger.tanks().volume_history(&tank.id, day(1), day(28)).unwrap();
        prop_assert_eq!(history.len(), 28);
        prop_assert_eq!(
            history.last().map(|d| d.eod_volume),
            Some(current_level(&ledger, &tank.id).unwrap())
        );
    }

    /// Property: transfers between two tanks never create or destroy feedstock
    #[test]
    fn prop_transfers_conserve_volume(
        initial_a in 0i64..=5_000,
        initial_b in 0i64..=5_000,
        mut transfers in prop::collection::vec(transfer_strategy(), 1..10)
    ) {
        // in date order, so no later movement can be overdrawn by an earlier one
        transfers.sort_by_key(|(_, d, _)| *d);

        let ledger = open_ledger(day(28)).unwrap();
        let a = create_tank(&ledger, "A", "north", 100_000, initial_a).unwrap();
        let b = create_tank(&ledger, "B", "north", 100_000, initial_b).unwrap();

        for (a_to_b, d, volume) in &transfers {
            let (source, target) = if *a_to_b { (&a.id, &b.id) } else { (&b.id, &a.id) };
            let _ = ledger
                .movements()
                .create(NewMovement::transfer(source, target, day(*d), bbl(*volume)));
        }

        let total = current_level(&ledger, &a.id).unwrap() + current_level(&ledger, &b.id).unwrap();
        prop_assert_eq!(total, bbl(initial_a + initial_b));

        let terminal = ledger.terminals().summaries().unwrap();
        prop_assert_eq!(terminal[0].current_total_level, bbl(initial_a + initial_b));
    }

    /// Property: a manual value always wins, the default is used otherwise
    #[test]
    fn prop_manual_value_wins(
        default in prop::option::of(any::<i64>()),
        manual in prop::option::of(any::<i64>())
    ) {
        let mut value = Overridable::new(default);
        value.override_with(manual);

        prop_assert_eq!(value.effective_copied(), manual.or(default));
        prop_assert_eq!(value.default, default);
        prop_assert_eq!(value.is_overridden(), manual.is_some());
    }
}
