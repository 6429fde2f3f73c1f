mod common;

use common::{bbl, create_tank, current_level, day, open_ledger};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::thread;
use tank_ledger::import::{AdjustmentReading, ImportItem};
use tank_ledger::service::{
    AdjustmentRequest, MovementUpdate, NewMovement, TransferRequest, TransferTarget,
};
use tank_ledger::signal_service::{SignalAssignment, SignalRecord};
use tank_ledger::store::MovementQuery;
use tank_ledger::tank_service::TankUpdate;
use tank_ledger::types::PriceDiff;
use tank_ledger::error::MAX_HISTORY_DAYS;
use tank_ledger::{
    ErrorKind, LedgerDate, LedgerError, MovementStatus, MovementType, ValidationError,
};

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[test]
    fn transfer_requires_distinct_existing_target() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 1_000, 500)?;
        let movements = ledger.movements();

        let missing = NewMovement::new(MovementType::Transfer, &tank.id, day(1), bbl(10));
        assert_eq!(
            movements.create(missing).unwrap_err().validation(),
            Some(&ValidationError::MissingTarget)
        );

        let same = NewMovement::transfer(&tank.id, &tank.id, day(1), bbl(10));
        assert_eq!(
            movements.create(same).unwrap_err().validation(),
            Some(&ValidationError::SameSourceAndTarget)
        );

        let unknown = NewMovement::transfer(&tank.id, "tank_nowhere", day(1), bbl(10));
        let err = movements.create(unknown).unwrap_err();
        assert!(matches!(err, LedgerError::TargetTankNotFound(_)));
        assert_eq!(err.status_code(), 404);
        Ok(())
    }

    #[test]
    fn unknown_tank_and_adjustment_type_are_rejected() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 1_000, 500)?;
        let movements = ledger.movements();

        let err = movements
            .create(NewMovement::load("tank_nowhere", day(1), bbl(10)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = movements
            .create(NewMovement::new(
                MovementType::Adjustment,
                &tank.id,
                day(1),
                bbl(10),
            ))
            .unwrap_err();
        assert_eq!(
            err.validation(),
            Some(&ValidationError::UnsupportedType(MovementType::Adjustment))
        );

        let err = movements
            .create(NewMovement::load(&tank.id, day(1), bbl(0)))
            .unwrap_err();
        assert_eq!(
            err.validation(),
            Some(&ValidationError::NonPositiveVolume(bbl(0)))
        );
        Ok(())
    }

    #[test]
    fn future_movement_leaves_current_level() -> anyhow::Result<()> {
        let ledger = open_ledger(day(5))?;
        let tank = create_tank(&ledger, "A", "north", 10_000, 1_000)?;

        let load = ledger
            .movements()
            .create(NewMovement::load(&tank.id, day(20), bbl(400)))?;

        assert_eq!(load.resulting_volume, Some(bbl(1_400)));
        assert_eq!(current_level(&ledger, &tank.id)?, bbl(1_000));
        Ok(())
    }

    #[test]
    fn update_moves_movement_between_tanks() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank_a = create_tank(&ledger, "A", "north", 10_000, 1_000)?;
        let tank_b = create_tank(&ledger, "B", "north", 10_000, 2_000)?;
        let movements = ledger.movements();

        let load = movements.create(NewMovement::load(&tank_a.id, day(3), bbl(500)))?;
        assert_eq!(current_level(&ledger, &tank_a.id)?, bbl(1_500));

        let updated = movements.update(
            &load.id,
            MovementUpdate {
                tank_id: Some(tank_b.id.clone()),
                scheduled_date: Some(day(2)),
                expected_volume: Some(bbl(600)),
                ..MovementUpdate::default()
            },
        )?;

        // defaults survive, manual values win
        assert_eq!(updated.tank_id.default.as_deref(), Some(tank_a.id.as_str()));
        assert_eq!(updated.tank_id(), Some(tank_b.id.as_str()));
        assert_eq!(updated.scheduled_date(), Some(day(2)));
        assert_eq!(updated.expected_volume(), bbl(600));
        assert_eq!(updated.resulting_volume, Some(bbl(2_600)));

        assert_eq!(current_level(&ledger, &tank_a.id)?, bbl(1_000));
        assert_eq!(current_level(&ledger, &tank_b.id)?, bbl(2_600));
        Ok(())
    }

    #[test]
    fn update_rechecks_availability_excluding_itself() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 10_000, 1_000)?;
        let movements = ledger.movements();

        let discharge = movements.create(NewMovement::discharge(&tank.id, day(2), bbl(800)))?;

        let grown = movements.update(
            &discharge.id,
            MovementUpdate {
                expected_volume: Some(bbl(1_000)),
                ..MovementUpdate::default()
            },
        )?;
        assert_eq!(grown.resulting_volume, Some(bbl(0)));

        let err = movements
            .update(
                &discharge.id,
                MovementUpdate {
                    expected_volume: Some(bbl(1_001)),
                    ..MovementUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::InsufficientVolume { .. })
        ));
        Ok(())
    }

    #[test]
    fn update_moving_a_draw_later_does_not_count_it_twice() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 10_000, 1_000)?;
        let movements = ledger.movements();

        let discharge = movements.create(NewMovement::discharge(&tank.id, day(1), bbl(500)))?;
        movements.create(NewMovement::load(&tank.id, day(2), bbl(100)))?;
        assert_eq!(current_level(&ledger, &tank.id)?, bbl(600));

        let moved = |volume| MovementUpdate {
            scheduled_date: Some(day(3)),
            expected_volume: Some(bbl(volume)),
            base_diff: Some(PriceDiff::new(dec!(-1.25))),
            ..MovementUpdate::default()
        };

        // without the discharge the tank holds 1_100 on day 3
        let err = movements.update(&discharge.id, moved(1_101)).unwrap_err();
        assert_eq!(
            err.validation(),
            Some(&ValidationError::InsufficientVolume {
                available: bbl(1_100),
                requested: bbl(1_101),
            })
        );

        let updated = movements.update(&discharge.id, moved(900))?;
        assert_eq!(updated.scheduled_date(), Some(day(3)));
        assert_eq!(updated.resulting_volume, Some(bbl(200)));
        assert_eq!(
            updated.workflow.base_diff.effective_copied(),
            Some(PriceDiff::new(dec!(-1.25)))
        );
        assert_eq!(current_level(&ledger, &tank.id)?, bbl(200));
        Ok(())
    }

    #[test]
    fn complete_sets_actual_and_locks_the_movement() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 10_000, 1_000)?;
        let movements = ledger.movements();

        let load = movements.create(NewMovement::load(&tank.id, day(2), bbl(500)))?;
        assert_eq!(load.status(), MovementStatus::Pending);

        let err = movements.complete(&load.id, bbl(-1)).unwrap_err();
        assert_eq!(
            err.validation(),
            Some(&ValidationError::NegativeVolume(MovementType::Load))
        );

        let completed = movements.complete(&load.id, bbl(450))?;
        assert_eq!(completed.status(), MovementStatus::Completed);
        assert_eq!(completed.resulting_volume, Some(bbl(1_450)));
        assert_eq!(current_level(&ledger, &tank.id)?, bbl(1_450));

        let err = movements.complete(&load.id, bbl(450)).unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::AlreadyCompleted(_))
        ));
        let err = movements
            .update(
                &load.id,
                MovementUpdate {
                    notes: Some("late edit".into()),
                    ..MovementUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::AlreadyCompleted(_))
        ));
        Ok(())
    }

    #[test]
    fn adjustment_validates_physical_level() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 1_000, 800)?;
        let movements = ledger.movements();

        let err = movements
            .create_adjustment(AdjustmentRequest::new(&tank.id, bbl(1_200)))
            .unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::ExceedsCapacity { .. })
        ));

        let loss = movements.create_adjustment(AdjustmentRequest::new(&tank.id, bbl(750)))?;
        assert_eq!(loss.scheduled_date(), Some(day(10)));
        assert_eq!(loss.actual_volume, Some(bbl(-50)));
        assert_eq!(
            loss.notes(),
            Some("(Loss) Physical reading adjustment. Previous: 800.00 bbl, Physical: 750.00 bbl")
        );
        assert_eq!(current_level(&ledger, &tank.id)?, bbl(750));
        Ok(())
    }

    #[test]
    fn fan_out_transfer() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let source = create_tank(&ledger, "S", "north", 10_000, 3_000)?;
        let first = create_tank(&ledger, "T1", "north", 10_000, 0)?;
        let second = create_tank(&ledger, "T2", "south", 10_000, 100)?;

        let created = ledger.movements().create_transfer(TransferRequest {
            source_tank_id: source.id.clone(),
            targets: vec![
                TransferTarget {
                    tank_id: first.id.clone(),
                    volume: bbl(1_000),
                },
                TransferTarget {
                    tank_id: second.id.clone(),
                    volume: bbl(500),
                },
            ],
            scheduled_date: day(4),
            notes: Some("split".into()),
            complete_immediately: true,
        })?;

        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|movement| movement.is_completed()));
        assert_eq!(created[0].resulting_volume, Some(bbl(2_000)));
        assert_eq!(created[1].resulting_volume, Some(bbl(1_500)));
        assert_eq!(current_level(&ledger, &source.id)?, bbl(1_500));
        assert_eq!(current_level(&ledger, &first.id)?, bbl(1_000));
        assert_eq!(current_level(&ledger, &second.id)?, bbl(600));
        Ok(())
    }

    #[test]
    fn fan_out_transfer_checks_total() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let source = create_tank(&ledger, "S", "north", 10_000, 1_000)?;
        let target = create_tank(&ledger, "T", "north", 10_000, 0)?;
        let transfer = |targets: Vec<TransferTarget>| TransferRequest {
            source_tank_id: source.id.clone(),
            targets,
            scheduled_date: day(4),
            notes: None,
            complete_immediately: false,
        };

        let err = ledger
            .movements()
            .create_transfer(transfer(vec![]))
            .unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::NoTransferTargets));

        let err = ledger
            .movements()
            .create_transfer(transfer(vec![
                TransferTarget {
                    tank_id: target.id.clone(),
                    volume: bbl(600),
                },
                TransferTarget {
                    tank_id: target.id.clone(),
                    volume: bbl(600),
                },
            ]))
            .unwrap_err();
        assert_eq!(
            err.validation(),
            Some(&ValidationError::InsufficientVolume {
                available: bbl(1_000),
                requested: bbl(1_200),
            })
        );

        let err = ledger
            .movements()
            .create_transfer(transfer(vec![TransferTarget {
                tank_id: "tank_nowhere".into(),
                volume: bbl(10),
            }]))
            .unwrap_err();
        assert!(matches!(err, LedgerError::TargetTankNotFound(_)));

        assert!(ledger.movements().list(MovementQuery::default())?.is_empty());
        Ok(())
    }

    #[test]
    fn list_filters_and_orders_newest_first() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 10_000, 1_000)?;
        let movements = ledger.movements();
        for d in [1, 3, 2] {
            movements.create(NewMovement::load(&tank.id, day(d), bbl(10)))?;
        }
        let discharge = movements.create(NewMovement::discharge(&tank.id, day(4), bbl(5)))?;
        movements.complete(&discharge.id, bbl(5))?;

        let loads = movements.list(MovementQuery::for_tank(&tank.id).with_type(MovementType::Load))?;
        let dates: Vec<_> = loads.iter().filter_map(|m| m.scheduled_date()).collect();
        assert_eq!(dates, vec![day(3), day(2), day(1)]);

        let completed =
            movements.list(MovementQuery::default().with_status(MovementStatus::Completed))?;
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, discharge.id);

        let err = movements
            .list(MovementQuery::default().with_date_range(Some(day(5)), Some(day(1))))
            .unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::InvalidDateRange { .. })
        ));
        Ok(())
    }

    #[test]
    fn concurrent_discharges_never_overdraw() -> anyhow::Result<()> {
        let ledger = Arc::new(open_ledger(day(10))?);
        let tank = create_tank(&ledger, "A", "north", 10_000, 1_000)?;

        let workers: Vec<_> = (0..10)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let tank_id = tank.id.clone();
                thread::spawn(move || {
                    ledger
                        .movements()
                        .create(NewMovement::discharge(&tank_id, day(5), bbl(200)))
                        .is_ok()
                })
            })
            .collect();

        let accepted = workers
            .into_iter()
            .map(|worker| worker.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(accepted, 5);
        assert_eq!(current_level(&ledger, &tank.id)?, bbl(0));
        Ok(())
    }
}

#[cfg(test)]
mod tank_tests {
    use super::*;

    #[test]
    fn create_validates_and_lists_with_percentage() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        create_tank(&ledger, "A", "north", 10_000, 2_500)?;
        create_tank(&ledger, "B", "south", 1_000, 1_500)?;

        let north = ledger.tanks().list(Some("north"), 0, 100)?;
        assert_eq!(north.len(), 1);
        assert_eq!(north[0].level_percentage, dec!(25));

        // above capacity is allowed, the percentage is clamped
        let south = ledger.tanks().list(Some("south"), 0, 100)?;
        assert_eq!(south[0].level_percentage, dec!(100));

        let err = create_tank(&ledger, "C", "north", 0, 0).unwrap_err();
        let err = err.downcast::<LedgerError>()?;
        assert!(matches!(
            err.validation(),
            Some(ValidationError::InvalidTank(_))
        ));
        Ok(())
    }

    #[test]
    fn update_bumps_version() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 10_000, 0)?;

        let updated = ledger.tanks().update(
            &tank.id,
            TankUpdate {
                name: Some("A-renamed".into()),
                capacity: Some(bbl(12_000)),
                ..TankUpdate::default()
            },
        )?;
        assert_eq!(updated.name, "A-renamed");
        assert_eq!(updated.capacity, bbl(12_000));
        assert_eq!(updated.version, tank.version + 1);
        Ok(())
    }

    #[test]
    fn delete_refuses_referenced_tank() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 10_000, 0)?;
        let spare = create_tank(&ledger, "B", "north", 10_000, 0)?;
        ledger
            .movements()
            .create(NewMovement::load(&tank.id, day(1), bbl(100)))?;

        let err = ledger.tanks().delete(&tank.id).unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::TankInUse { movements: 1, .. })
        ));

        ledger.tanks().delete(&spare.id)?;
        assert_eq!(
            ledger.tanks().get(&spare.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        Ok(())
    }

    #[test]
    fn history_and_daily_volumes() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 10_000, 1_000)?;
        let other = create_tank(&ledger, "B", "north", 10_000, 1_000)?;
        let movements = ledger.movements();
        movements.create(NewMovement::load(&tank.id, day(2), bbl(500)))?;
        movements.create(NewMovement::discharge(&tank.id, day(4), bbl(200)))?;
        movements.create(NewMovement::transfer(&other.id, &tank.id, day(4), bbl(100)))?;

        let history = ledger.tanks().history(&tank.id, 0, 10)?;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].movement_type, MovementType::Transfer);

        let daily = ledger.tanks().volume_history(&tank.id, day(1), day(5))?;
        let levels: Vec<_> = daily.iter().map(|d| d.eod_volume).collect();
        assert_eq!(
            levels,
            vec![bbl(1_000), bbl(1_500), bbl(1_500), bbl(1_400), bbl(1_400)]
        );

        assert!(ledger.tanks().volume_history(&tank.id, day(5), day(1)).is_err());

        let decade = LedgerDate::from_ymd(2035, 3, 10).expect("valid date");
        let err = ledger
            .tanks()
            .volume_history(&tank.id, day(1), decade)
            .unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::DateRangeTooLong { max_days: MAX_HISTORY_DAYS, .. })
        ));
        Ok(())
    }

    #[test]
    fn rebuild_repairs_missing_resulting_volumes() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 10_000, 1_000)?;
        let load = ledger
            .movements()
            .create(NewMovement::load(&tank.id, day(2), bbl(500)))?;

        // simulate legacy rows written before levels were recorded
        ledger.engine().store().update_movement(&load.id, &mut |m| {
            m.resulting_volume = None
        })?;

        assert_eq!(ledger.tanks().rebuild(&tank.id)?, bbl(1_500));
        assert_eq!(
            ledger.movements().get(&load.id)?.resulting_volume,
            Some(bbl(1_500))
        );
        Ok(())
    }
}

#[cfg(test)]
mod signal_tests {
    use super::*;

    fn record(signal_id: &str, d: u32, volume: i64) -> SignalRecord {
        SignalRecord {
            signal_id: signal_id.into(),
            load_date: day(d),
            volume: bbl(volume),
            refinery_tank_name: Some("R-7".into()),
        }
    }

    #[test]
    fn ingest_skips_known_signals() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let signals = ledger.signals();

        let report = signals.ingest(vec![record("SIG-1", 2, 300), record("SIG-2", 3, 200)])?;
        assert_eq!((report.created, report.skipped), (2, 0));

        let report = signals.ingest(vec![record("SIG-2", 3, 200), record("SIG-3", 4, 100)])?;
        assert_eq!((report.created, report.skipped), (1, 1));

        let pending = signals.pending(0, 10)?;
        assert_eq!(pending.len(), 3);
        assert!(pending.iter().all(|m| m.is_unassigned()));
        assert_eq!(
            pending[0].notes(),
            Some("Signal from refinery tank: R-7")
        );
        Ok(())
    }

    #[test]
    fn assign_recalculates_the_new_tank() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 10_000, 1_000)?;
        let signals = ledger.signals();
        signals.ingest(vec![record("SIG-1", 2, 300)])?;
        let signal = signals.pending(0, 1)?.remove(0);

        let mut assignment = SignalAssignment::to_tank(&tank.id);
        assignment.expected_volume = Some(bbl(350));
        let assigned = signals.assign(&signal.id, assignment)?;

        assert_eq!(assigned.tank_id(), Some(tank.id.as_str()));
        assert!(assigned.tank_id.default.is_none());
        assert_eq!(assigned.expected_volume.default, Some(bbl(300)));
        assert_eq!(assigned.expected_volume(), bbl(350));
        assert_eq!(assigned.resulting_volume, Some(bbl(1_350)));
        assert_eq!(current_level(&ledger, &tank.id)?, bbl(1_350));

        let err = signals
            .assign(&signal.id, SignalAssignment::to_tank(&tank.id))
            .unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::AlreadyAssigned(_))
        ));

        // still pending until trade details arrive
        assert_eq!(signals.pending(0, 10)?.len(), 1);
        signals.update_trade_info(&signal.id, "T-100".into(), "1".into())?;
        assert!(signals.pending(0, 10)?.is_empty());
        Ok(())
    }

    #[test]
    fn plain_movement_is_not_a_signal() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 10_000, 1_000)?;
        let load = ledger
            .movements()
            .create(NewMovement::load(&tank.id, day(2), bbl(10)))?;

        let err = ledger
            .signals()
            .update_trade_info(&load.id, "T-1".into(), "1".into())
            .unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::NotASignal(_))
        ));
        Ok(())
    }
}

#[cfg(test)]
mod import_tests {
    use super::*;

    #[test]
    fn movement_import_reports_each_row() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 10_000, 1_000)?;
        let item = |movement_type, volume| ImportItem {
            tank_id: tank.id.clone(),
            movement_type,
            date: day(3),
            volume: bbl(volume),
            notes: None,
        };

        let report = ledger.imports().import_movements(
            vec![
                item(MovementType::Load, 400),
                item(MovementType::Discharge, 5_000),
                item(MovementType::Transfer, 10),
                item(MovementType::Discharge, 100),
            ],
            Some("bol-2025-03.pdf"),
        );

        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 2);
        assert!(report.errors[0].starts_with("row 2: Insufficient feedstock"));
        assert!(report.errors[1].starts_with("row 3:"));

        let imported = ledger.movements().list(MovementQuery::for_tank(&tank.id))?;
        assert!(imported.iter().all(|m| m.is_completed()));
        assert!(imported
            .iter()
            .all(|m| m.provenance.source_document.as_deref() == Some("bol-2025-03.pdf")));
        assert_eq!(current_level(&ledger, &tank.id)?, bbl(1_300));
        Ok(())
    }

    #[test]
    fn adjustment_import_requires_first_of_month() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let tank = create_tank(&ledger, "A", "north", 10_000, 1_000)?;
        let reading = |d, level| AdjustmentReading {
            tank_id: tank.id.clone(),
            physical_level: bbl(level),
            inspection_date: day(d),
            notes: None,
        };

        let report = ledger
            .imports()
            .import_adjustments(vec![reading(1, 950), reading(2, 900)], None);

        assert_eq!((report.created, report.failed), (1, 1));
        assert!(report.errors[0].contains("not the first of the month"));
        assert_eq!(current_level(&ledger, &tank.id)?, bbl(950));
        Ok(())
    }
}

#[cfg(test)]
mod terminal_tests {
    use super::*;

    #[test]
    fn summaries_group_by_location() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        create_tank(&ledger, "A", "north", 10_000, 2_000)?;
        create_tank(&ledger, "B", "north", 10_000, 3_000)?;
        create_tank(&ledger, "C", "south", 5_000, 5_000)?;

        assert_eq!(ledger.terminals().locations()?, vec!["north", "south"]);

        let summaries = ledger.terminals().summaries()?;
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].tank_count, 2);
        assert_eq!(summaries[0].total_capacity, bbl(20_000));
        assert_eq!(summaries[0].current_total_level, bbl(5_000));
        assert_eq!(summaries[0].utilization, dec!(25));
        assert_eq!(summaries[1].utilization, dec!(100));
        Ok(())
    }

    #[test]
    fn daily_history_tracks_flows() -> anyhow::Result<()> {
        let ledger = open_ledger(day(10))?;
        let a = create_tank(&ledger, "A", "north", 10_000, 1_000)?;
        let b = create_tank(&ledger, "B", "north", 10_000, 0)?;
        let c = create_tank(&ledger, "C", "south", 10_000, 0)?;
        let movements = ledger.movements();
        movements.create(NewMovement::load(&a.id, day(1), bbl(500)))?;
        movements.create(NewMovement::load(&a.id, day(3), bbl(100)))?;
        movements.create(NewMovement::transfer(&a.id, &b.id, day(3), bbl(200)))?;
        movements.create(NewMovement::transfer(&a.id, &c.id, day(3), bbl(300)))?;

        let days = ledger.terminals().daily_history("north", day(2), day(3))?;
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].total_level, bbl(1_500));
        assert_eq!(days[0].net_movement, bbl(0));

        let third = &days[1];
        assert_eq!(third.loads, bbl(100));
        assert_eq!(third.transfers_out, bbl(500));
        assert_eq!(third.transfers_in, bbl(200));
        assert_eq!(third.net_movement, bbl(-200));
        assert_eq!(third.total_level, bbl(1_300));

        let decade = LedgerDate::from_ymd(2035, 3, 10).expect("valid date");
        let err = ledger
            .terminals()
            .daily_history("north", day(1), decade)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(
            err.validation(),
            Some(ValidationError::DateRangeTooLong { .. })
        ));
        Ok(())
    }
}
