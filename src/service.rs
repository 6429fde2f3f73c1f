//! Movement lifecycle operations.
//!
//! Every operation validates before it writes, holds the locks of all tanks it
//! touches from the availability check through recalculation, and leaves each
//! affected tank recalculated from the earliest date it changed.
use crate::arithmetic::apply_to_level;
use crate::engine::RecalculationEngine;
use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::locks::TankGuard;
use crate::movement::{Movement, Provenance};
use crate::store::{MovementOrder, MovementQuery};
use crate::tank::Tank;
use crate::types::{LedgerDate, MovementType, PriceDiff, TankRole, Volume};
use crate::utils::new_movement_id;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// A load, discharge or single-target transfer.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub movement_type: MovementType,
    pub tank_id: String,
    pub target_tank_id: Option<String>,
    pub scheduled_date: LedgerDate,
    pub expected_volume: Volume,
    pub actual_volume: Option<Volume>, // set by imports of already executed movements
    pub notes: Option<String>,
    pub trade_number: Option<String>,
    pub trade_line_item: Option<String>,
    pub source_document: Option<String>,
}

impl NewMovement {
    pub fn new(
        movement_type: MovementType,
        tank_id: impl Into<String>,
        scheduled_date: LedgerDate,
        expected_volume: Volume,
    ) -> Self {
        Self {
            movement_type,
            tank_id: tank_id.into(),
            target_tank_id: None,
            scheduled_date,
            expected_volume,
            actual_volume: None,
            notes: None,
            trade_number: None,
            trade_line_item: None,
            source_document: None,
        }
    }

    pub fn load(tank_id: impl Into<String>, date: LedgerDate, volume: Volume) -> Self {
        Self::new(MovementType::Load, tank_id, date, volume)
    }

    pub fn discharge(tank_id: impl Into<String>, date: LedgerDate, volume: Volume) -> Self {
        Self::new(MovementType::Discharge, tank_id, date, volume)
    }

    pub fn transfer(
        source: impl Into<String>,
        target: impl Into<String>,
        date: LedgerDate,
        volume: Volume,
    ) -> Self {
        Self::new(MovementType::Transfer, source, date, volume).with_target(target)
    }

    pub fn with_target(mut self, tank_id: impl Into<String>) -> Self {
        self.target_tank_id = Some(tank_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn completed(mut self, actual_volume: Volume) -> Self {
        self.actual_volume = Some(actual_volume);
        self
    }

    pub fn with_trade(mut self, trade_number: Option<String>, line_item: Option<String>) -> Self {
        self.trade_number = trade_number;
        self.trade_line_item = line_item;
        self
    }

    pub fn with_source_document(mut self, document: impl Into<String>) -> Self {
        self.source_document = Some(document.into());
        self
    }

    // what the availability check compares against
    fn drawn_volume(&self) -> Volume {
        self.actual_volume.unwrap_or(self.expected_volume)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferTarget {
    pub tank_id: String,
    pub volume: Volume,
}

/// One source tank feeding one or more targets on the same day.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source_tank_id: String,
    pub targets: Vec<TransferTarget>,
    pub scheduled_date: LedgerDate,
    pub notes: Option<String>,
    pub complete_immediately: bool,
}

/// Manual overrides for a pending movement. `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct MovementUpdate {
    pub tank_id: Option<String>,
    pub scheduled_date: Option<LedgerDate>,
    pub expected_volume: Option<Volume>,
    pub notes: Option<String>,
    pub trade_number: Option<String>,
    pub trade_line_item: Option<String>,
    pub strategy: Option<String>,
    pub destination: Option<String>,
    pub equipment: Option<String>,
    pub discharge_date: Option<LedgerDate>,
    pub base_diff: Option<PriceDiff>,
    pub quality_adj_diff: Option<PriceDiff>,
}

impl MovementUpdate {
    pub fn apply_to(&self, movement: &mut Movement) {
        movement.tank_id.override_with(self.tank_id.clone());
        movement.scheduled_date.override_with(self.scheduled_date);
        movement
            .expected_volume
            .override_with(self.expected_volume.map(Volume::round));
        movement.notes.override_with(self.notes.clone());
        movement
            .trade
            .trade_number
            .override_with(self.trade_number.clone());
        movement
            .trade
            .trade_line_item
            .override_with(self.trade_line_item.clone());

        let workflow = &mut movement.workflow;
        workflow.strategy.override_with(self.strategy.clone());
        workflow.destination.override_with(self.destination.clone());
        workflow.equipment.override_with(self.equipment.clone());
        workflow.discharge_date.override_with(self.discharge_date);
        workflow.base_diff.override_with(self.base_diff);
        workflow
            .quality_adj_diff
            .override_with(self.quality_adj_diff);
    }
}

/// A physical reading to reconcile the ledger against.
#[derive(Debug, Clone)]
pub struct AdjustmentRequest {
    pub tank_id: String,
    pub physical_level: Volume,
    pub inspection_date: Option<LedgerDate>, // today when absent
    pub notes: Option<String>,
    pub source_document: Option<String>,
}

impl AdjustmentRequest {
    pub fn new(tank_id: impl Into<String>, physical_level: Volume) -> Self {
        Self {
            tank_id: tank_id.into(),
            physical_level,
            inspection_date: None,
            notes: None,
            source_document: None,
        }
    }

    pub fn on(mut self, date: LedgerDate) -> Self {
        self.inspection_date = Some(date);
        self
    }
}

#[derive(Clone)]
pub struct MovementService {
    engine: Arc<RecalculationEngine>,
}

impl MovementService {
    pub fn new(engine: Arc<RecalculationEngine>) -> Self {
        Self { engine }
    }

    pub fn get(&self, movement_id: &str) -> LedgerResult<Movement> {
        self.engine
            .store()
            .get_movement(movement_id)?
            .ok_or_else(|| LedgerError::MovementNotFound(movement_id.to_string()))
    }

    /// Filtered movements, newest scheduled date first.
    pub fn list(&self, query: MovementQuery) -> LedgerResult<Vec<Movement>> {
        if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
            if start > end {
                return Err(ValidationError::InvalidDateRange { start, end }.into());
            }
        }
        self.engine
            .store()
            .query_movements(&query.ordered(MovementOrder::ReverseChronological))
    }

    pub fn create(&self, request: NewMovement) -> LedgerResult<Movement> {
        info!(
            movement_type = %request.movement_type,
            tank_id = %request.tank_id,
            date = %request.scheduled_date,
            "creating movement"
        );

        let target = validate_new_movement(&request)?;
        let _guard = self
            .engine
            .lock_tanks([Some(request.tank_id.as_str()), target].into_iter().flatten());

        let tank = self.engine.load_tank(&request.tank_id)?;
        let target = target.map(|id| self.load_target(id)).transpose()?;

        let source_level =
            self.engine
                .available_volume(&tank, request.scheduled_date, None)?;
        if request.movement_type.draws_down() && request.drawn_volume() > source_level {
            return Err(ValidationError::InsufficientVolume {
                available: source_level,
                requested: request.drawn_volume(),
            }
            .into());
        }

        let mut movement = Movement::new(
            new_movement_id()?,
            self.engine.store().next_sequence()?,
            request.movement_type,
            request.scheduled_date,
            request.expected_volume.round(),
        )
        .set_tank(&tank.id)
        .set_actual_volume(request.actual_volume.map(Volume::round))
        .set_notes(request.notes)
        .set_trade(request.trade_number, request.trade_line_item)
        .set_provenance(Provenance {
            source_document: request.source_document,
            ..Provenance::default()
        });

        // provisional, the recalculation below settles them
        let resulting = apply_to_level(source_level, &movement, &tank.id).round();
        movement.record_volume(TankRole::Source, resulting);
        if let Some(target) = &target {
            movement = movement.set_target(&target.id);
            let target_level =
                self.engine
                    .available_volume(target, request.scheduled_date, None)?;
            let resulting = apply_to_level(target_level, &movement, &target.id).round();
            movement.record_volume(TankRole::Target, resulting);
        }

        self.engine.store().insert_movement(&movement)?;
        for tank_id in movement.affected_tanks() {
            self.engine
                .refresh_tank(&tank_id, request.scheduled_date, None)?;
        }

        info!(movement_id = %movement.id, "movement created");
        self.get(&movement.id)
    }

    /// Fans a transfer out into one movement per target.
    pub fn create_transfer(&self, request: TransferRequest) -> LedgerResult<Vec<Movement>> {
        info!(
            source = %request.source_tank_id,
            targets = request.targets.len(),
            date = %request.scheduled_date,
            "creating transfer"
        );

        if request.targets.is_empty() {
            return Err(ValidationError::NoTransferTargets.into());
        }
        for target in &request.targets {
            if target.tank_id == request.source_tank_id {
                return Err(ValidationError::SameSourceAndTarget.into());
            }
            if !target.volume.is_positive() {
                return Err(ValidationError::NonPositiveVolume(target.volume).into());
            }
        }

        let target_ids: BTreeSet<&str> = request
            .targets
            .iter()
            .map(|target| target.tank_id.as_str())
            .collect();
        let _guard = self.engine.lock_tanks(
            std::iter::once(request.source_tank_id.as_str()).chain(target_ids.iter().copied()),
        );

        let source = self.engine.load_tank(&request.source_tank_id)?;
        for target_id in &target_ids {
            self.load_target(target_id)?;
        }

        let available = self
            .engine
            .available_volume(&source, request.scheduled_date, None)?;
        let total: Volume = request.targets.iter().map(|target| target.volume).sum();
        if total > available {
            return Err(ValidationError::InsufficientVolume {
                available,
                requested: total,
            }
            .into());
        }

        let mut created = Vec::with_capacity(request.targets.len());
        let mut failure = None;
        for target in &request.targets {
            match self.insert_transfer_leg(&request, target) {
                Ok(movement) => created.push(movement),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        // whatever was written gets recalculated, even after a failure
        if !created.is_empty() {
            self.engine
                .refresh_tank(&source.id, request.scheduled_date, None)?;
            for target_id in &target_ids {
                self.engine
                    .refresh_tank(target_id, request.scheduled_date, None)?;
            }
        }

        if let Some(err) = failure {
            warn!(
                source = %source.id,
                written = created.len(),
                requested = request.targets.len(),
                error = %err,
                "transfer fan-out stopped part way"
            );
            return Err(err);
        }

        info!(count = created.len(), "transfer movements created");
        created
            .iter()
            .map(|movement| self.get(&movement.id))
            .collect()
    }

    fn insert_transfer_leg(
        &self,
        request: &TransferRequest,
        target: &TransferTarget,
    ) -> LedgerResult<Movement> {
        let volume = target.volume.round();
        let movement = Movement::new(
            new_movement_id()?,
            self.engine.store().next_sequence()?,
            MovementType::Transfer,
            request.scheduled_date,
            volume,
        )
        .set_tank(&request.source_tank_id)
        .set_target(&target.tank_id)
        .set_notes(request.notes.clone())
        .set_actual_volume(request.complete_immediately.then_some(volume));

        self.engine.store().insert_movement(&movement)?;
        Ok(movement)
    }

    /// Applies manual overrides to a pending movement.
    pub fn update(&self, movement_id: &str, update: MovementUpdate) -> LedgerResult<Movement> {
        info!(movement_id, "updating movement");

        if let Some(volume) = update.expected_volume {
            if !volume.is_positive() {
                return Err(ValidationError::NonPositiveVolume(volume).into());
            }
        }

        let (movement, _guard) = self.lock_movement(movement_id, update.tank_id.as_deref())?;
        if movement.is_completed() {
            return Err(ValidationError::AlreadyCompleted(movement.id).into());
        }

        let mut updated = movement.clone();
        update.apply_to(&mut updated);

        if let Some(tank_id) = &update.tank_id {
            self.engine.load_tank(tank_id)?;
            if updated.target_tank_id.as_deref() == Some(tank_id.as_str()) {
                return Err(ValidationError::SameSourceAndTarget.into());
            }
        }

        let ledger_changed = updated.scheduled_date() != movement.scheduled_date()
            || updated.tank_id() != movement.tank_id()
            || updated.expected_volume() != movement.expected_volume();

        if ledger_changed && movement.movement_type.draws_down() {
            if let (Some(tank_id), Some(date)) = (updated.tank_id(), updated.scheduled_date()) {
                let tank = self.engine.load_tank(tank_id)?;
                let available = self
                    .engine
                    .available_volume(&tank, date, Some(movement_id))?;
                if updated.expected_volume() > available {
                    return Err(ValidationError::InsufficientVolume {
                        available,
                        requested: updated.expected_volume(),
                    }
                    .into());
                }
            }
        }

        let stored = self
            .engine
            .store()
            .update_movement(movement_id, &mut |stored| update.apply_to(stored))?
            .ok_or_else(|| {
                LedgerError::Internal(format!("movement {movement_id} vanished during update"))
            })?;

        if ledger_changed {
            let from = [movement.scheduled_date(), stored.scheduled_date()]
                .into_iter()
                .flatten()
                .min();
            if let Some(from) = from {
                let tanks: BTreeSet<String> = movement
                    .affected_tanks()
                    .into_iter()
                    .chain(stored.affected_tanks())
                    .collect();
                for tank_id in &tanks {
                    self.engine.refresh_tank(tank_id, from, None)?;
                }
            }
        }

        info!(movement_id, ledger_changed, "movement updated");
        self.get(movement_id)
    }

    /// Records the executed volume of a pending movement.
    pub fn complete(&self, movement_id: &str, actual_volume: Volume) -> LedgerResult<Movement> {
        info!(movement_id, %actual_volume, "completing movement");

        let (movement, _guard) = self.lock_movement(movement_id, None)?;
        if movement.is_completed() {
            return Err(ValidationError::AlreadyCompleted(movement.id).into());
        }
        if actual_volume.is_negative() && movement.movement_type != MovementType::Adjustment {
            return Err(ValidationError::NegativeVolume(movement.movement_type).into());
        }

        let actual_volume = actual_volume.round();
        self.engine
            .store()
            .update_movement(movement_id, &mut |stored| {
                stored.actual_volume = Some(actual_volume)
            })?
            .ok_or_else(|| {
                LedgerError::Internal(format!("movement {movement_id} vanished during completion"))
            })?;

        if let Some(date) = movement.scheduled_date() {
            for tank_id in movement.affected_tanks() {
                self.engine.refresh_tank(&tank_id, date, None)?;
            }
        }

        info!(movement_id, %actual_volume, "movement completed");
        self.get(movement_id)
    }

    /// Reconciles a tank with a physical reading by booking the difference.
    pub fn create_adjustment(&self, request: AdjustmentRequest) -> LedgerResult<Movement> {
        info!(tank_id = %request.tank_id, physical = %request.physical_level, "creating adjustment");

        if request.physical_level.is_negative() {
            return Err(ValidationError::NegativePhysicalLevel(request.physical_level).into());
        }

        let _guard = self.engine.lock_tanks([request.tank_id.as_str()]);
        let tank = self.engine.load_tank(&request.tank_id)?;
        if request.physical_level > tank.capacity {
            return Err(ValidationError::ExceedsCapacity {
                physical: request.physical_level,
                capacity: tank.capacity,
            }
            .into());
        }

        let date = request.inspection_date.unwrap_or_else(|| self.engine.today());
        let physical = request.physical_level.round();
        let system_level = self.engine.available_volume(&tank, date, None)?;
        let delta = (physical - system_level).round();

        let notes = request.notes.unwrap_or_else(|| {
            format!("Physical reading adjustment. Previous: {system_level} bbl, Physical: {physical} bbl")
        });
        let notes = if delta.is_negative() {
            format!("(Loss) {notes}")
        } else {
            format!("(Gain) {notes}")
        };

        let mut movement = Movement::new(
            new_movement_id()?,
            self.engine.store().next_sequence()?,
            MovementType::Adjustment,
            date,
            delta.abs(),
        )
        .set_tank(&tank.id)
        .set_actual_volume(Some(delta))
        .set_notes(Some(notes))
        .set_provenance(Provenance {
            source_document: request.source_document,
            ..Provenance::default()
        });
        movement.record_volume(TankRole::Source, physical);

        self.engine.store().insert_movement(&movement)?;
        self.engine.refresh_tank(&tank.id, date, None)?;

        info!(movement_id = %movement.id, %delta, "adjustment created");
        self.get(&movement.id)
    }

    /// Removes a movement and recalculates the tanks it used to affect.
    pub fn delete(&self, movement_id: &str) -> LedgerResult<Movement> {
        info!(movement_id, "deleting movement");

        let (_, _guard) = self.lock_movement(movement_id, None)?;
        let removed = self
            .engine
            .store()
            .delete_movement(movement_id)?
            .ok_or_else(|| LedgerError::MovementNotFound(movement_id.to_string()))?;

        if let Some(date) = removed.scheduled_date() {
            for tank_id in removed.affected_tanks() {
                match self.engine.refresh_tank(&tank_id, date, None) {
                    Err(LedgerError::TankNotFound(_)) => {
                        warn!(movement_id, tank_id = %tank_id, "deleted movement referenced a missing tank")
                    }
                    other => {
                        other?;
                    }
                }
            }
        }

        info!(movement_id, "movement deleted");
        Ok(removed)
    }

    fn load_target(&self, tank_id: &str) -> LedgerResult<Tank> {
        self.engine
            .store()
            .get_tank(tank_id)?
            .ok_or_else(|| LedgerError::TargetTankNotFound(tank_id.to_string()))
    }

    /// Locks every tank the movement touches, plus `extra`. Retries if the
    /// movement was reassigned while waiting for the locks.
    pub(crate) fn lock_movement(
        &self,
        movement_id: &str,
        extra: Option<&str>,
    ) -> LedgerResult<(Movement, TankGuard<'_>)> {
        loop {
            let snapshot = self.get(movement_id)?;
            let tanks = snapshot
                .affected_tanks()
                .into_iter()
                .chain(extra.map(str::to_owned));
            let guard = self.engine.lock_tanks(tanks);

            let movement = self.get(movement_id)?;
            if movement.affected_tanks() == snapshot.affected_tanks() {
                return Ok((movement, guard));
            }
        }
    }
}

// shape checks that need no storage; returns the target id of a transfer
fn validate_new_movement(request: &NewMovement) -> LedgerResult<Option<&str>> {
    if request.movement_type == MovementType::Adjustment {
        return Err(ValidationError::UnsupportedType(request.movement_type).into());
    }
    if !request.expected_volume.is_positive() {
        return Err(ValidationError::NonPositiveVolume(request.expected_volume).into());
    }
    if request.actual_volume.is_some_and(|actual| actual.is_negative()) {
        return Err(ValidationError::NegativeVolume(request.movement_type).into());
    }

    if request.movement_type != MovementType::Transfer {
        return Ok(None);
    }
    let target = request
        .target_tank_id
        .as_deref()
        .ok_or(ValidationError::MissingTarget)?;
    if target == request.tank_id {
        return Err(ValidationError::SameSourceAndTarget.into());
    }
    Ok(Some(target))
}
