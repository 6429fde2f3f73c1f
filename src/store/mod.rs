//! Document storage for tanks and movements.
mod sled_store;

pub use sled_store::SledLedgerStore;

use crate::error::LedgerResult;
use crate::movement::Movement;
use crate::tank::Tank;
use crate::types::{LedgerDate, MovementStatus, MovementType};
use std::cmp::Ordering;

/// Abstraction over the document collection backing the ledger.
///
/// Writes are per-document read-modify-write. Nothing here spans two documents.
pub trait LedgerStore: Send + Sync {
    fn get_tank(&self, id: &str) -> LedgerResult<Option<Tank>>;

    /// Fails if a tank with the same id already exists.
    fn insert_tank(&self, tank: &Tank) -> LedgerResult<()>;

    /// Applies `apply` to the stored tank and bumps its version. `None` if the tank is gone.
    fn update_tank(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut Tank),
    ) -> LedgerResult<Option<Tank>>;

    fn delete_tank(&self, id: &str) -> LedgerResult<Option<Tank>>;

    fn query_tanks(&self, query: &TankQuery) -> LedgerResult<Vec<Tank>>;

    fn get_movement(&self, id: &str) -> LedgerResult<Option<Movement>>;

    fn insert_movement(&self, movement: &Movement) -> LedgerResult<()>;

    fn update_movement(
        &self,
        id: &str,
        apply: &mut dyn FnMut(&mut Movement),
    ) -> LedgerResult<Option<Movement>>;

    fn delete_movement(&self, id: &str) -> LedgerResult<Option<Movement>>;

    fn query_movements(&self, query: &MovementQuery) -> LedgerResult<Vec<Movement>>;

    /// Monotonic counter used to order movements created within the same instant.
    fn next_sequence(&self) -> LedgerResult<u64>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MovementOrder {
    /// Ascending by (scheduled date, created_at, sequence). The replay order.
    #[default]
    Chronological,
    /// Newest scheduled date first.
    ReverseChronological,
    /// Newest created first, regardless of scheduled date.
    NewestCreated,
}

/// Filter describing which movements to load from storage.
#[derive(Debug, Clone, Default)]
pub struct MovementQuery {
    pub tank_id: Option<String>, // matches either side of a transfer
    pub movement_type: Option<MovementType>,
    pub status: Option<MovementStatus>,
    pub start_date: Option<LedgerDate>, // inclusive
    pub end_date: Option<LedgerDate>,   // inclusive
    pub before: Option<LedgerDate>,     // exclusive
    pub signals_only: bool,
    pub exclude_id: Option<String>,
    pub order: MovementOrder,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl MovementQuery {
    pub fn for_tank(tank_id: impl Into<String>) -> Self {
        Self::default().with_tank(tank_id)
    }

    pub fn with_tank(mut self, tank_id: impl Into<String>) -> Self {
        self.tank_id = Some(tank_id.into());
        self
    }

    pub fn with_type(mut self, movement_type: MovementType) -> Self {
        self.movement_type = Some(movement_type);
        self
    }

    pub fn with_status(mut self, status: MovementStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_date_range(mut self, start: Option<LedgerDate>, end: Option<LedgerDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn on_or_after(mut self, date: LedgerDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn on_or_before(mut self, date: LedgerDate) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn before(mut self, date: LedgerDate) -> Self {
        self.before = Some(date);
        self
    }

    pub fn on(self, date: LedgerDate) -> Self {
        self.on_or_after(date).on_or_before(date)
    }

    pub fn signals_only(mut self) -> Self {
        self.signals_only = true;
        self
    }

    pub fn excluding(mut self, movement_id: Option<&str>) -> Self {
        self.exclude_id = movement_id.map(str::to_owned);
        self
    }

    pub fn ordered(mut self, order: MovementOrder) -> Self {
        self.order = order;
        self
    }

    pub fn paginate(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }

    fn has_date_filter(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some() || self.before.is_some()
    }

    pub fn matches(&self, movement: &Movement) -> bool {
        if let Some(tank_id) = &self.tank_id {
            if !movement.touches(tank_id) {
                return false;
            }
        }
        if self
            .movement_type
            .is_some_and(|kind| kind != movement.movement_type)
        {
            return false;
        }
        if self.status.is_some_and(|status| status != movement.status()) {
            return false;
        }
        if self.exclude_id.as_deref() == Some(movement.id.as_str()) {
            return false;
        }
        if self.signals_only && !movement.is_signal() {
            return false;
        }

        if self.has_date_filter() {
            // undated movements never match a date filter
            let Some(date) = movement.scheduled_date() else {
                return false;
            };
            if self.start_date.is_some_and(|start| date < start)
                || self.end_date.is_some_and(|end| date > end)
                || self.before.is_some_and(|before| date >= before)
            {
                return false;
            }
        }
        true
    }

    /// Sorts and paginates an already filtered set.
    pub fn apply(&self, mut movements: Vec<Movement>) -> Vec<Movement> {
        movements.sort_by(|a, b| self.compare(a, b));
        let limit = self.limit.unwrap_or(usize::MAX);
        movements.into_iter().skip(self.skip).take(limit).collect()
    }

    fn compare(&self, a: &Movement, b: &Movement) -> Ordering {
        match self.order {
            MovementOrder::Chronological => chronological(a, b),
            MovementOrder::ReverseChronological => chronological(b, a),
            MovementOrder::NewestCreated => (b.created_at, b.sequence).cmp(&(a.created_at, a.sequence)),
        }
    }
}

/// Replay order: scheduled date, then creation time, then sequence.
pub fn chronological(a: &Movement, b: &Movement) -> Ordering {
    (a.scheduled_date(), a.created_at, a.sequence).cmp(&(
        b.scheduled_date(),
        b.created_at,
        b.sequence,
    ))
}

#[derive(Debug, Clone, Default)]
pub struct TankQuery {
    pub location: Option<String>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl TankQuery {
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn paginate(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, tank: &Tank) -> bool {
        self.location
            .as_ref()
            .is_none_or(|location| &tank.location == location)
    }

    /// Sorts by name then id, then paginates.
    pub fn apply(&self, mut tanks: Vec<Tank>) -> Vec<Tank> {
        tanks.sort_by(|a, b| (&a.name, &a.id).cmp(&(&b.name, &b.id)));
        let limit = self.limit.unwrap_or(usize::MAX);
        tanks.into_iter().skip(self.skip).take(limit).collect()
    }
}
