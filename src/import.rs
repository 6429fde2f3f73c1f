//! Batch creation from rows already extracted out of documents.
use crate::error::{LedgerError, ValidationError};
use crate::service::{AdjustmentRequest, MovementService, NewMovement};
use crate::types::{LedgerDate, MovementType, Volume};
use tracing::{info, warn};

/// An executed load or discharge read from a document.
#[derive(Debug, Clone)]
pub struct ImportItem {
    pub tank_id: String,
    pub movement_type: MovementType,
    pub date: LedgerDate,
    pub volume: Volume,
    pub notes: Option<String>,
}

/// A physical tank reading from a monthly inspection report.
#[derive(Debug, Clone)]
pub struct AdjustmentReading {
    pub tank_id: String,
    pub physical_level: Volume,
    pub inspection_date: LedgerDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub created: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl ImportReport {
    fn record(&mut self, row: usize, outcome: Result<(), LedgerError>) {
        match outcome {
            Ok(()) => self.created += 1,
            Err(err) => {
                self.failed += 1;
                self.errors.push(format!("row {row}: {err}"));
            }
        }
    }
}

#[derive(Clone)]
pub struct ImportService {
    movements: MovementService,
}

impl ImportService {
    pub fn new(movements: MovementService) -> Self {
        Self { movements }
    }

    /// Creates a completed movement per row. A failing row does not stop the batch.
    pub fn import_movements(
        &self,
        items: Vec<ImportItem>,
        source_document: Option<&str>,
    ) -> ImportReport {
        info!(rows = items.len(), source_document = ?source_document, "importing movements");

        let mut report = ImportReport::default();
        for (row, item) in items.into_iter().enumerate() {
            let outcome = self.import_movement(item, source_document);
            report.record(row + 1, outcome);
        }

        if report.failed > 0 {
            warn!(failed = report.failed, "movement import finished with errors");
        }
        info!(created = report.created, failed = report.failed, "movement import done");
        report
    }

    fn import_movement(
        &self,
        item: ImportItem,
        source_document: Option<&str>,
    ) -> Result<(), LedgerError> {
        if !matches!(
            item.movement_type,
            MovementType::Load | MovementType::Discharge
        ) {
            return Err(ValidationError::UnsupportedType(item.movement_type).into());
        }

        let mut request = NewMovement::new(item.movement_type, item.tank_id, item.date, item.volume)
            .completed(item.volume);
        request.notes = item.notes;
        request.source_document = source_document.map(str::to_owned);

        self.movements.create(request).map(|_| ())
    }

    /// Books an adjustment per reading. Readings must be dated on the first of a month.
    pub fn import_adjustments(
        &self,
        readings: Vec<AdjustmentReading>,
        source_document: Option<&str>,
    ) -> ImportReport {
        info!(rows = readings.len(), source_document = ?source_document, "importing adjustments");

        let mut report = ImportReport::default();
        for (row, reading) in readings.into_iter().enumerate() {
            let outcome = self.import_adjustment(reading, source_document);
            report.record(row + 1, outcome);
        }

        if report.failed > 0 {
            warn!(failed = report.failed, "adjustment import finished with errors");
        }
        info!(created = report.created, failed = report.failed, "adjustment import done");
        report
    }

    fn import_adjustment(
        &self,
        reading: AdjustmentReading,
        source_document: Option<&str>,
    ) -> Result<(), LedgerError> {
        if !reading.inspection_date.is_first_of_month() {
            return Err(
                ValidationError::InspectionDateNotFirstOfMonth(reading.inspection_date).into(),
            );
        }

        let mut request = AdjustmentRequest::new(reading.tank_id, reading.physical_level)
            .on(reading.inspection_date);
        request.notes = reading.notes;
        request.source_document = source_document.map(str::to_owned);

        self.movements.create_adjustment(request).map(|_| ())
    }
}
