//! Forward recalculation of per-movement resulting volumes.
//!
//! Every movement records the level of each tank it touches right after it was
//! applied. Those records act as anchors: a recalculation starting at some date
//! looks up the newest anchor before that date instead of replaying the whole
//! history, then walks forward and rewrites the records that changed.
use crate::arithmetic::apply_to_level;
use crate::clock::Clock;
use crate::error::{LedgerError, LedgerResult};
use crate::locks::{TankGuard, TankLocks};
use crate::movement::Movement;
use crate::store::{LedgerStore, MovementOrder, MovementQuery};
use crate::tank::Tank;
use crate::types::{LedgerDate, Volume};
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct RecalculationEngine {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    locks: TankLocks,
}

impl RecalculationEngine {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            locks: TankLocks::new(),
        }
    }

    pub fn store(&self) -> &dyn LedgerStore {
        self.store.as_ref()
    }

    pub fn today(&self) -> LedgerDate {
        self.clock.today()
    }

    /// Holds every tank in `tank_ids` until the guard drops.
    pub fn lock_tanks<I, S>(&self, tank_ids: I) -> TankGuard<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locks.acquire(tank_ids)
    }

    pub fn load_tank(&self, tank_id: &str) -> LedgerResult<Tank> {
        self.store
            .get_tank(tank_id)?
            .ok_or_else(|| LedgerError::TankNotFound(tank_id.to_string()))
    }

    /// Level from the newest recorded anchor among `prior`, with any newer
    /// unanchored movements replayed on top of it. Falls back to the initial level.
    fn anchored_level(&self, tank: &Tank, prior: MovementQuery) -> LedgerResult<Volume> {
        let prior = self
            .store
            .query_movements(&prior.ordered(MovementOrder::ReverseChronological))?;

        let mut level = tank.initial_level;
        let mut unanchored = Vec::new();
        for movement in prior {
            if let Some(recorded) = movement.recorded_volume_for(&tank.id) {
                level = recorded;
                break;
            }
            unanchored.push(movement);
        }

        for movement in unanchored.iter().rev() {
            level = apply_to_level(level, movement, &tank.id).round();
        }
        Ok(level)
    }

    /// The tank's level immediately before `before`.
    pub fn starting_volume(
        &self,
        tank: &Tank,
        before: LedgerDate,
        exclude: Option<&str>,
    ) -> LedgerResult<Volume> {
        self.anchored_level(
            tank,
            MovementQuery::for_tank(&tank.id)
                .before(before)
                .excluding(exclude),
        )
    }

    /// The tank's level at the end of `date`.
    pub fn level_as_of(
        &self,
        tank: &Tank,
        date: LedgerDate,
        exclude: Option<&str>,
    ) -> LedgerResult<Volume> {
        self.anchored_level(
            tank,
            MovementQuery::for_tank(&tank.id)
                .on_or_before(date)
                .excluding(exclude),
        )
    }

    /// Volume a new draw dated `date` may take: the starting volume plus every
    /// other movement already on that day, in creation order.
    ///
    /// Anchors recorded after an excluded movement already include its effect,
    /// so when it sits earlier than `date` the replay starts from its own date.
    pub fn available_volume(
        &self,
        tank: &Tank,
        date: LedgerDate,
        exclude: Option<&str>,
    ) -> LedgerResult<Volume> {
        let from = match exclude {
            Some(movement_id) => self
                .store
                .get_movement(movement_id)?
                .filter(|movement| movement.touches(&tank.id))
                .and_then(|movement| movement.scheduled_date())
                .filter(|excluded_date| *excluded_date < date)
                .unwrap_or(date),
            None => date,
        };

        let mut level = self.starting_volume(tank, from, exclude)?;
        let replay = self.store.query_movements(
            &MovementQuery::for_tank(&tank.id)
                .on_or_after(from)
                .on_or_before(date)
                .excluding(exclude),
        )?;
        for movement in &replay {
            level = apply_to_level(level, movement, &tank.id).round();
        }
        Ok(level)
    }

    /// Replays every movement of the tank dated on or after `from` and
    /// persists the resulting volumes that changed. Returns the level as of today.
    fn recalculate_tank(
        &self,
        tank: &Tank,
        from: LedgerDate,
        exclude: Option<&str>,
    ) -> LedgerResult<Volume> {
        let today = self.today();
        let mut level = self.starting_volume(tank, from, exclude)?;
        let mut level_today = level;

        let replay = self.store.query_movements(
            &MovementQuery::for_tank(&tank.id)
                .on_or_after(from)
                .excluding(exclude),
        )?;

        let mut rewritten = 0_usize;
        for movement in &replay {
            level = apply_to_level(level, movement, &tank.id).round();
            if self.record(movement, &tank.id, level)? {
                rewritten += 1;
            }
            if movement.scheduled_date().is_some_and(|date| date <= today) {
                level_today = level;
            }
        }

        if from > today {
            level_today = self.level_as_of(tank, today, exclude)?;
        }

        debug!(
            tank_id = %tank.id,
            %from,
            replayed = replay.len(),
            rewritten,
            %level_today,
            "tank recalculated"
        );
        Ok(level_today.round())
    }

    // writes `level` into the movement's field for this tank unless it already holds it
    fn record(&self, movement: &Movement, tank_id: &str, level: Volume) -> LedgerResult<bool> {
        let Some(role) = movement.role_for(tank_id) else {
            return Ok(false);
        };
        if movement.recorded_volume(role) == Some(level) {
            return Ok(false);
        }

        self.store
            .update_movement(&movement.id, &mut |stored| stored.record_volume(role, level))?
            .ok_or_else(|| {
                LedgerError::Internal(format!(
                    "movement {} disappeared during recalculation",
                    movement.id
                ))
            })?;
        Ok(true)
    }

    /// Recalculates from `from` and, unless `from` lies in the future, stores
    /// the result as the tank's current level.
    #[instrument(skip(self), level = "debug")]
    pub fn refresh_tank(
        &self,
        tank_id: &str,
        from: LedgerDate,
        exclude: Option<&str>,
    ) -> LedgerResult<Volume> {
        let tank = self.load_tank(tank_id)?;
        let level = self.recalculate_tank(&tank, from, exclude)?;

        if from > self.today() {
            debug!(tank_id, %from, "future-dated change, current level left as is");
            return Ok(level);
        }
        if tank.current_level != level {
            self.write_current_level(tank_id, level)?;
        }
        Ok(level)
    }

    /// Full replay from the tank's earliest movement, ignoring every recorded anchor.
    pub fn rebuild(&self, tank_id: &str) -> LedgerResult<Volume> {
        let tank = self.load_tank(tank_id)?;
        let earliest = self
            .store
            .query_movements(&MovementQuery::for_tank(tank_id))?
            .into_iter()
            .find_map(|movement| movement.scheduled_date());

        let level = match earliest {
            Some(from) => self.recalculate_tank(&tank, from, None)?,
            None => tank.initial_level,
        };

        if tank.current_level != level {
            self.write_current_level(tank_id, level)?;
        }
        Ok(level)
    }

    fn write_current_level(&self, tank_id: &str, level: Volume) -> LedgerResult<()> {
        self.store
            .update_tank(tank_id, &mut |tank| tank.current_level = level)?
            .ok_or_else(|| {
                LedgerError::Internal(format!("tank {tank_id} disappeared during recalculation"))
            })?;
        debug!(tank_id, %level, "current level updated");
        Ok(())
    }
}
