//! Tank administration and per-tank views over the ledger.
use crate::arithmetic::apply_to_level;
use crate::engine::RecalculationEngine;
use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::movement::Movement;
use crate::store::{MovementOrder, MovementQuery, TankQuery};
use crate::tank::{Tank, TankWithLevel};
use crate::types::{FeedstockType, LedgerDate, Volume};
use crate::utils::new_tank_id;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct NewTank {
    pub name: String,
    pub location: String,
    pub feedstock_type: FeedstockType,
    pub capacity: Volume,
    pub initial_level: Volume,
}

#[derive(Debug, Clone, Default)]
pub struct TankUpdate {
    pub name: Option<String>,
    pub location: Option<String>,
    pub feedstock_type: Option<FeedstockType>,
    pub capacity: Option<Volume>,
}

/// End-of-day level of one tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyVolume {
    pub date: LedgerDate,
    pub eod_volume: Volume,
}

#[derive(Clone)]
pub struct TankService {
    engine: Arc<RecalculationEngine>,
}

impl TankService {
    pub fn new(engine: Arc<RecalculationEngine>) -> Self {
        Self { engine }
    }

    pub fn create(&self, request: NewTank) -> LedgerResult<Tank> {
        info!(name = %request.name, location = %request.location, "creating tank");

        if request.name.trim().is_empty() {
            return Err(ValidationError::InvalidTank("name must not be empty".into()).into());
        }
        if !request.capacity.is_positive() {
            return Err(ValidationError::InvalidTank(format!(
                "capacity must be greater than zero, got {}",
                request.capacity
            ))
            .into());
        }
        if request.initial_level.is_negative() {
            return Err(ValidationError::InvalidTank(format!(
                "initial level cannot be negative, got {}",
                request.initial_level
            ))
            .into());
        }

        let tank = Tank::new(
            new_tank_id()?,
            request.name,
            request.location,
            request.feedstock_type,
            request.capacity.round(),
            request.initial_level.round(),
        );
        self.engine.store().insert_tank(&tank)?;

        info!(tank_id = %tank.id, "tank created");
        Ok(tank)
    }

    pub fn get(&self, tank_id: &str) -> LedgerResult<TankWithLevel> {
        self.engine.load_tank(tank_id).map(TankWithLevel::from)
    }

    pub fn list(
        &self,
        location: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> LedgerResult<Vec<TankWithLevel>> {
        let mut query = TankQuery::default().paginate(skip, limit);
        if let Some(location) = location {
            query = query.with_location(location);
        }
        let tanks = self.engine.store().query_tanks(&query)?;
        Ok(tanks.into_iter().map(TankWithLevel::from).collect())
    }

    pub fn update(&self, tank_id: &str, update: TankUpdate) -> LedgerResult<Tank> {
        info!(tank_id, "updating tank");

        if let Some(capacity) = update.capacity {
            if !capacity.is_positive() {
                return Err(ValidationError::InvalidTank(format!(
                    "capacity must be greater than zero, got {capacity}"
                ))
                .into());
            }
        }
        if update.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(ValidationError::InvalidTank("name must not be empty".into()).into());
        }

        let _guard = self.engine.lock_tanks([tank_id]);
        self.engine
            .store()
            .update_tank(tank_id, &mut |tank| {
                if let Some(name) = &update.name {
                    tank.name = name.clone();
                }
                if let Some(location) = &update.location {
                    tank.location = location.clone();
                }
                if let Some(feedstock_type) = update.feedstock_type {
                    tank.feedstock_type = feedstock_type;
                }
                if let Some(capacity) = update.capacity {
                    tank.capacity = capacity.round();
                }
            })?
            .ok_or_else(|| LedgerError::TankNotFound(tank_id.to_string()))
    }

    /// Removes a tank no movement refers to.
    pub fn delete(&self, tank_id: &str) -> LedgerResult<Tank> {
        info!(tank_id, "deleting tank");

        let _guard = self.engine.lock_tanks([tank_id]);
        self.engine.load_tank(tank_id)?;

        let movements = self
            .engine
            .store()
            .query_movements(&MovementQuery::for_tank(tank_id))?
            .len();
        if movements > 0 {
            return Err(ValidationError::TankInUse {
                tank_id: tank_id.to_string(),
                movements,
            }
            .into());
        }

        self.engine
            .store()
            .delete_tank(tank_id)?
            .ok_or_else(|| LedgerError::TankNotFound(tank_id.to_string()))
    }

    /// Movements touching the tank, newest created first.
    pub fn history(&self, tank_id: &str, skip: usize, limit: usize) -> LedgerResult<Vec<Movement>> {
        self.engine.load_tank(tank_id)?;
        self.engine.store().query_movements(
            &MovementQuery::for_tank(tank_id)
                .ordered(MovementOrder::NewestCreated)
                .paginate(skip, limit),
        )
    }

    /// One end-of-day level per day in `start..=end`. Days without movements
    /// carry the previous day's level forward.
    pub fn volume_history(
        &self,
        tank_id: &str,
        start: LedgerDate,
        end: LedgerDate,
    ) -> LedgerResult<Vec<DailyVolume>> {
        ValidationError::check_history_range(start, end)?;
        let tank = self.engine.load_tank(tank_id)?;
        let starting = self.engine.starting_volume(&tank, start, None)?;
        let mut level = starting;

        let movements = self.engine.store().query_movements(
            &MovementQuery::for_tank(tank_id).with_date_range(Some(start), Some(end)),
        )?;

        let mut eod_by_day = BTreeMap::new();
        for movement in &movements {
            let Some(date) = movement.scheduled_date() else {
                continue;
            };
            level = movement
                .recorded_volume_for(tank_id)
                .unwrap_or_else(|| apply_to_level(level, movement, tank_id).round());
            eod_by_day.insert(date, level);
        }

        let mut history = Vec::new();
        let mut carried = starting;
        let mut day = Some(start);
        while let Some(date) = day.filter(|date| *date <= end) {
            if let Some(eod) = eod_by_day.get(&date) {
                carried = *eod;
            }
            history.push(DailyVolume {
                date,
                eod_volume: carried.round(),
            });
            day = date.succ();
        }
        Ok(history)
    }

    /// Replays the tank's whole history, ignoring recorded anchors.
    pub fn rebuild(&self, tank_id: &str) -> LedgerResult<Volume> {
        info!(tank_id, "rebuilding tank ledger");
        let _guard = self.engine.lock_tanks([tank_id]);
        let level = self.engine.rebuild(tank_id)?;
        info!(tank_id, %level, "tank ledger rebuilt");
        Ok(level)
    }
}
