use crate::types::LedgerDate;
use chrono::Utc;

/// Source of "today" for everything that depends on it.
pub trait Clock: Send + Sync {
    fn today(&self) -> LedgerDate;
}

/// The current UTC calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> LedgerDate {
        LedgerDate::from(Utc::now().date_naive())
    }
}

/// A pinned date, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub LedgerDate);

impl Clock for FixedClock {
    fn today(&self) -> LedgerDate {
        self.0
    }
}
