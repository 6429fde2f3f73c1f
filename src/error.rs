use crate::types::{LedgerDate, MovementType, Volume};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Longest span, in days, a daily history may cover.
pub const MAX_HISTORY_DAYS: i64 = 3_660;

/// Coarse classification used by callers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Internal,
}

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("Tank not found: {0}")]
    TankNotFound(String),
    #[error("Target tank not found: {0}")]
    TargetTankNotFound(String),
    #[error("Movement not found: {0}")]
    MovementNotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("Failed to encode document: {0}")]
    Encoding(String),
    #[error("Failed to decode document: {0}")]
    Decoding(#[from] minicbor::decode::Error),
    #[error("Failed to generate identifier: {0}")]
    Identifier(String),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Insufficient feedstock. Available: {available} bbl, requested: {requested} bbl")]
    InsufficientVolume { available: Volume, requested: Volume },
    #[error("Source and target tank cannot be the same")]
    SameSourceAndTarget,
    #[error("Target tank is required for transfers")]
    MissingTarget,
    #[error("At least one transfer target is required")]
    NoTransferTargets,
    #[error("Volume must be greater than zero, got {0}")]
    NonPositiveVolume(Volume),
    #[error("Actual volume cannot be negative for a {0}")]
    NegativeVolume(MovementType),
    #[error("Physical level cannot be negative, got {0}")]
    NegativePhysicalLevel(Volume),
    #[error("Physical level {physical} exceeds tank capacity ({capacity} bbl)")]
    ExceedsCapacity { physical: Volume, capacity: Volume },
    #[error("Movement {0} is already completed")]
    AlreadyCompleted(String),
    #[error("{0} movements cannot be created through this operation")]
    UnsupportedType(MovementType),
    #[error("Movement {0} is not a signal")]
    NotASignal(String),
    #[error("Movement {0} is already assigned to a tank")]
    AlreadyAssigned(String),
    #[error("Invalid tank definition: {0}")]
    InvalidTank(String),
    #[error("Tank {tank_id} is referenced by {movements} movement(s)")]
    TankInUse { tank_id: String, movements: usize },
    #[error("Inspection date {0} is not the first of the month")]
    InspectionDateNotFirstOfMonth(LedgerDate),
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: LedgerDate, end: LedgerDate },
    #[error("Date range {start} to {end} spans more than {max_days} days")]
    DateRangeTooLong { start: LedgerDate, end: LedgerDate, max_days: i64 },
}

impl ValidationError {
    /// Checks a day-by-day history window, `start` and `end` inclusive.
    pub fn check_history_range(start: LedgerDate, end: LedgerDate) -> Result<(), ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidDateRange { start, end });
        }
        if start.days_until(end) >= MAX_HISTORY_DAYS {
            return Err(ValidationError::DateRangeTooLong {
                start,
                end,
                max_days: MAX_HISTORY_DAYS,
            });
        }
        Ok(())
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::TankNotFound(_)
            | LedgerError::TargetTankNotFound(_)
            | LedgerError::MovementNotFound(_) => ErrorKind::NotFound,
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::Internal(_)
            | LedgerError::Storage(_)
            | LedgerError::Encoding(_)
            | LedgerError::Decoding(_)
            | LedgerError::Identifier(_)
            | LedgerError::Config(_) => ErrorKind::Internal,
        }
    }

    /// HTTP-style status code for the routing layer.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Validation => 400,
            ErrorKind::Internal => 500,
        }
    }

    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            LedgerError::Validation(reason) => Some(reason),
            _ => None,
        }
    }
}
