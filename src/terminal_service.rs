//! Aggregated views over all tanks sharing a location.
use crate::arithmetic::{effective_volume, utilization};
use crate::engine::RecalculationEngine;
use crate::error::{LedgerResult, ValidationError};
use crate::store::{MovementQuery, TankQuery};
use crate::tank::Tank;
use crate::types::{LedgerDate, MovementType, Volume};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct TerminalSummary {
    pub location: String,
    pub tank_count: usize,
    pub total_capacity: Volume,
    pub current_total_level: Volume,
    pub utilization: Decimal,
}

/// One day of movement totals at a terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalDay {
    pub date: LedgerDate,
    pub loads: Volume,
    pub discharges: Volume,
    pub transfers_in: Volume,
    pub transfers_out: Volume,
    pub adjustments: Volume,
    pub net_movement: Volume,
    pub total_level: Volume,
    pub total_capacity: Volume,
    pub utilization: Decimal,
}

impl TerminalDay {
    fn empty(date: LedgerDate, total_capacity: Volume) -> Self {
        Self {
            date,
            loads: Volume::ZERO,
            discharges: Volume::ZERO,
            transfers_in: Volume::ZERO,
            transfers_out: Volume::ZERO,
            adjustments: Volume::ZERO,
            net_movement: Volume::ZERO,
            total_level: Volume::ZERO,
            total_capacity,
            utilization: Decimal::ZERO,
        }
    }
}

#[derive(Clone)]
pub struct TerminalService {
    engine: Arc<RecalculationEngine>,
}

impl TerminalService {
    pub fn new(engine: Arc<RecalculationEngine>) -> Self {
        Self { engine }
    }

    fn all_tanks(&self) -> LedgerResult<Vec<Tank>> {
        self.engine.store().query_tanks(&TankQuery::default())
    }

    /// Distinct non-empty locations, sorted.
    pub fn locations(&self) -> LedgerResult<Vec<String>> {
        let locations: BTreeSet<String> = self
            .all_tanks()?
            .into_iter()
            .map(|tank| tank.location)
            .filter(|location| !location.is_empty())
            .collect();
        Ok(locations.into_iter().collect())
    }

    pub fn summaries(&self) -> LedgerResult<Vec<TerminalSummary>> {
        let mut by_location: BTreeMap<String, Vec<Tank>> = BTreeMap::new();
        for tank in self.all_tanks()? {
            if !tank.location.is_empty() {
                by_location.entry(tank.location.clone()).or_default().push(tank);
            }
        }

        let summaries: Vec<_> = by_location
            .into_iter()
            .map(|(location, tanks)| {
                let total_capacity: Volume = tanks.iter().map(|tank| tank.capacity).sum();
                let current_total_level: Volume =
                    tanks.iter().map(|tank| tank.current_level).sum();
                TerminalSummary {
                    location,
                    tank_count: tanks.len(),
                    total_capacity: total_capacity.round(),
                    current_total_level: current_total_level.round(),
                    utilization: utilization(current_total_level, total_capacity),
                }
            })
            .collect();

        info!(terminals = summaries.len(), "terminal summaries built");
        Ok(summaries)
    }

    /// Per-day movement totals and running level for the tanks at `location`.
    pub fn daily_history(
        &self,
        location: &str,
        start: LedgerDate,
        end: LedgerDate,
    ) -> LedgerResult<Vec<TerminalDay>> {
        ValidationError::check_history_range(start, end)?;

        let tanks = self
            .engine
            .store()
            .query_tanks(&TankQuery::default().with_location(location))?;
        if tanks.is_empty() {
            warn!(location, "no tanks at location");
            return Ok(Vec::new());
        }

        let tank_ids: HashSet<&str> = tanks.iter().map(|tank| tank.id.as_str()).collect();
        let total_capacity: Volume = tanks.iter().map(|tank| tank.capacity).sum();

        let mut running = Volume::ZERO;
        for tank in &tanks {
            running += self.engine.starting_volume(tank, start, None)?;
        }

        let movements = self.engine.store().query_movements(
            &MovementQuery::default().with_date_range(Some(start), Some(end)),
        )?;
        let mut days: BTreeMap<LedgerDate, TerminalDay> = BTreeMap::new();
        for movement in &movements {
            let Some(date) = movement.scheduled_date() else {
                continue;
            };
            let from_here = movement.tank_id().is_some_and(|id| tank_ids.contains(id));
            let into_here = movement
                .target_tank_id
                .as_deref()
                .is_some_and(|id| tank_ids.contains(id));
            if !from_here && !into_here {
                continue;
            }

            let day = days
                .entry(date)
                .or_insert_with(|| TerminalDay::empty(date, total_capacity));
            let volume = effective_volume(movement);
            match movement.movement_type {
                MovementType::Load if from_here => day.loads += volume,
                MovementType::Discharge if from_here => day.discharges += volume,
                MovementType::Transfer => {
                    if from_here {
                        day.transfers_out += volume;
                    }
                    if into_here {
                        day.transfers_in += volume;
                    }
                }
                MovementType::Adjustment if from_here => day.adjustments += volume,
                _ => {}
            }
        }

        let mut history = Vec::new();
        let mut cursor = Some(start);
        while let Some(date) = cursor.filter(|date| *date <= end) {
            let mut day = days
                .remove(&date)
                .unwrap_or_else(|| TerminalDay::empty(date, total_capacity));
            day.net_movement = day.loads + day.transfers_in + day.adjustments
                - day.discharges
                - day.transfers_out;
            running = (running + day.net_movement).floor_at_zero();

            day.total_level = running.round();
            day.total_capacity = total_capacity.round();
            day.net_movement = day.net_movement.round();
            day.utilization = utilization(running, total_capacity);
            history.push(day);
            cursor = date.succ();
        }

        info!(location, days = history.len(), "terminal history built");
        Ok(history)
    }
}
