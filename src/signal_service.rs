//! Upstream load signals: ingestion, triage and assignment to tanks.
use crate::engine::RecalculationEngine;
use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::movement::{Movement, Provenance};
use crate::service::{MovementService, MovementUpdate};
use crate::store::{MovementOrder, MovementQuery};
use crate::types::{LedgerDate, MovementType, PriceDiff, Volume};
use crate::utils::new_movement_id;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// One parsed row of a refinery signal sheet.
#[derive(Debug, Clone)]
pub struct SignalRecord {
    pub signal_id: String,
    pub load_date: LedgerDate,
    pub volume: Volume,
    pub refinery_tank_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalIngestReport {
    pub created: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Operator input when a signal is matched to a tank. Everything lands in manual fields.
#[derive(Debug, Clone)]
pub struct SignalAssignment {
    pub tank_id: String,
    pub expected_volume: Option<Volume>,
    pub scheduled_date: Option<LedgerDate>,
    pub notes: Option<String>,
    pub strategy: Option<String>,
    pub destination: Option<String>,
    pub equipment: Option<String>,
    pub discharge_date: Option<LedgerDate>,
    pub base_diff: Option<PriceDiff>,
}

impl SignalAssignment {
    pub fn to_tank(tank_id: impl Into<String>) -> Self {
        Self {
            tank_id: tank_id.into(),
            expected_volume: None,
            scheduled_date: None,
            notes: None,
            strategy: None,
            destination: None,
            equipment: None,
            discharge_date: None,
            base_diff: None,
        }
    }

    fn as_update(&self) -> MovementUpdate {
        MovementUpdate {
            tank_id: Some(self.tank_id.clone()),
            scheduled_date: self.scheduled_date,
            expected_volume: self.expected_volume,
            notes: self.notes.clone(),
            strategy: self.strategy.clone(),
            destination: self.destination.clone(),
            equipment: self.equipment.clone(),
            discharge_date: self.discharge_date,
            base_diff: self.base_diff,
            ..MovementUpdate::default()
        }
    }
}

#[derive(Clone)]
pub struct SignalService {
    engine: Arc<RecalculationEngine>,
    movements: MovementService,
}

impl SignalService {
    pub fn new(engine: Arc<RecalculationEngine>, movements: MovementService) -> Self {
        Self { engine, movements }
    }

    /// Creates one unassigned load per new signal id. Known ids are skipped.
    pub fn ingest(&self, records: Vec<SignalRecord>) -> LedgerResult<SignalIngestReport> {
        info!(records = records.len(), "ingesting signals");

        let mut seen: HashSet<String> = self
            .engine
            .store()
            .query_movements(&MovementQuery::default().signals_only())?
            .into_iter()
            .filter_map(|movement| movement.provenance.signal_id)
            .collect();

        let mut report = SignalIngestReport::default();
        for record in records {
            if seen.contains(&record.signal_id) {
                report.skipped += 1;
                continue;
            }
            if !record.volume.is_positive() {
                report.errors.push(format!(
                    "signal {}: {}",
                    record.signal_id,
                    ValidationError::NonPositiveVolume(record.volume)
                ));
                continue;
            }

            let notes = record
                .refinery_tank_name
                .as_ref()
                .map(|name| format!("Signal from refinery tank: {name}"));
            let movement = Movement::new(
                new_movement_id()?,
                self.engine.store().next_sequence()?,
                MovementType::Load,
                record.load_date,
                record.volume.round(),
            )
            .set_notes(notes)
            .set_provenance(Provenance {
                signal_id: Some(record.signal_id.clone()),
                refinery_tank_name: record.refinery_tank_name,
                source_document: None,
            });

            self.engine.store().insert_movement(&movement)?;
            seen.insert(record.signal_id);
            report.created += 1;
        }

        if !report.errors.is_empty() {
            warn!(errors = report.errors.len(), "some signals were rejected");
        }
        info!(created = report.created, skipped = report.skipped, "signals ingested");
        Ok(report)
    }

    /// Signals still needing work: no tank yet, or trade details missing.
    pub fn pending(&self, skip: usize, limit: usize) -> LedgerResult<Vec<Movement>> {
        let signals = self.engine.store().query_movements(
            &MovementQuery::default()
                .signals_only()
                .ordered(MovementOrder::ReverseChronological),
        )?;
        Ok(signals
            .into_iter()
            .filter(|movement| movement.is_unassigned() || !movement.trade.is_complete())
            .skip(skip)
            .take(limit)
            .collect())
    }

    pub fn assign(&self, movement_id: &str, assignment: SignalAssignment) -> LedgerResult<Movement> {
        info!(movement_id, tank_id = %assignment.tank_id, "assigning signal");

        if let Some(volume) = assignment.expected_volume {
            if !volume.is_positive() {
                return Err(ValidationError::NonPositiveVolume(volume).into());
            }
        }

        let (movement, _guard) = self
            .movements
            .lock_movement(movement_id, Some(assignment.tank_id.as_str()))?;
        if !movement.is_signal() {
            return Err(ValidationError::NotASignal(movement.id).into());
        }
        if !movement.is_unassigned() {
            return Err(ValidationError::AlreadyAssigned(movement.id).into());
        }
        self.engine.load_tank(&assignment.tank_id)?;

        let update = assignment.as_update();
        let stored = self
            .engine
            .store()
            .update_movement(movement_id, &mut |stored| update.apply_to(stored))?
            .ok_or_else(|| {
                LedgerError::Internal(format!("movement {movement_id} vanished during assignment"))
            })?;

        if let Some(date) = stored.scheduled_date() {
            for tank_id in stored.affected_tanks() {
                self.engine.refresh_tank(&tank_id, date, None)?;
            }
        }

        info!(movement_id, "signal assigned");
        self.movements.get(movement_id)
    }

    /// Records trade references on a signal. Levels are unaffected.
    pub fn update_trade_info(
        &self,
        movement_id: &str,
        trade_number: String,
        trade_line_item: String,
    ) -> LedgerResult<Movement> {
        info!(movement_id, "updating signal trade info");

        let movement = self.movements.get(movement_id)?;
        if !movement.is_signal() {
            return Err(ValidationError::NotASignal(movement.id).into());
        }

        self.engine
            .store()
            .update_movement(movement_id, &mut |stored| {
                stored.trade.trade_number.set_manual(trade_number.clone());
                stored.trade.trade_line_item.set_manual(trade_line_item.clone());
            })?
            .ok_or_else(|| LedgerError::MovementNotFound(movement_id.to_string()))
    }
}
