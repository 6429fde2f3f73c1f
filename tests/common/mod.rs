#![allow(dead_code)]

use std::sync::Arc;
use tank_ledger::clock::FixedClock;
use tank_ledger::store::SledLedgerStore;
use tank_ledger::tank_service::NewTank;
use tank_ledger::{FeedstockType, Ledger, LedgerDate, Tank, Volume};
use tempfile::{TempDir, tempdir};

/// A ledger over a file-backed sled database living in its own temp dir.
/// Sled locks its directory, so every test gets a fresh one.
pub struct TestLedger {
    pub ledger: Ledger,
    _dir: TempDir,
}

impl std::ops::Deref for TestLedger {
    type Target = Ledger;

    fn deref(&self) -> &Ledger {
        &self.ledger
    }
}

pub fn open_ledger(today: LedgerDate) -> anyhow::Result<TestLedger> {
    let dir = tempdir()?;
    let db = sled::open(dir.path().join("ledger.db"))?;
    let store = SledLedgerStore::new(Arc::new(db))?;
    let ledger = Ledger::new(Arc::new(store), Arc::new(FixedClock(today)));
    Ok(TestLedger { ledger, _dir: dir })
}

/// Day of March 2025.
pub fn day(d: u32) -> LedgerDate {
    LedgerDate::from_ymd(2025, 3, d).expect("valid day of march")
}

pub fn bbl(value: i64) -> Volume {
    Volume::from(value)
}

pub fn create_tank(
    ledger: &Ledger,
    name: &str,
    location: &str,
    capacity: i64,
    initial_level: i64,
) -> anyhow::Result<Tank> {
    Ok(ledger.tanks().create(NewTank {
        name: name.to_string(),
        location: location.to_string(),
        feedstock_type: FeedstockType::CarbonBlackOil,
        capacity: bbl(capacity),
        initial_level: bbl(initial_level),
    })?)
}

pub fn current_level(ledger: &Ledger, tank_id: &str) -> anyhow::Result<Volume> {
    Ok(ledger.tanks().get(tank_id)?.tank.current_level)
}
