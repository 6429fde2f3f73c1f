//! Per-tank mutual exclusion.
//!
//! An operation takes every tank it reads or writes in a single `acquire`, so
//! two operations can never hold disjoint halves of each other's sets.
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeSet;
use tracing::trace;

#[derive(Default)]
pub struct TankLocks {
    held: Mutex<BTreeSet<String>>,
    released: Condvar,
}

impl TankLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until none of `tank_ids` is held, then holds all of them.
    pub fn acquire<I, S>(&self, tank_ids: I) -> TankGuard<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let wanted: BTreeSet<String> = tank_ids.into_iter().map(Into::into).collect();

        let mut held = self.held.lock();
        while wanted.iter().any(|id| held.contains(id)) {
            self.released.wait(&mut held);
        }
        held.extend(wanted.iter().cloned());
        trace!(tanks = ?wanted, "tank locks acquired");

        TankGuard {
            locks: self,
            tank_ids: wanted,
        }
    }

    pub fn is_held(&self, tank_id: &str) -> bool {
        self.held.lock().contains(tank_id)
    }
}

/// Releases its tanks on drop.
#[must_use]
pub struct TankGuard<'a> {
    locks: &'a TankLocks,
    tank_ids: BTreeSet<String>,
}

impl TankGuard<'_> {
    pub fn tank_ids(&self) -> impl Iterator<Item = &str> {
        self.tank_ids.iter().map(String::as_str)
    }
}

impl Drop for TankGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock();
        for id in &self.tank_ids {
            held.remove(id);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}
