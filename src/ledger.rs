use crate::clock::{Clock, FixedClock, SystemClock};
use crate::config::LedgerConfig;
use crate::engine::RecalculationEngine;
use crate::error::LedgerResult;
use crate::import::ImportService;
use crate::service::MovementService;
use crate::signal_service::SignalService;
use crate::store::{LedgerStore, SledLedgerStore};
use crate::tank_service::TankService;
use crate::terminal_service::TerminalService;
use std::sync::Arc;
use tracing::info;

/// All services wired around one store and one clock.
#[derive(Clone)]
pub struct Ledger {
    engine: Arc<RecalculationEngine>,
    movements: MovementService,
    tanks: TankService,
    signals: SignalService,
    imports: ImportService,
    terminals: TerminalService,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        let engine = Arc::new(RecalculationEngine::new(store, clock));
        let movements = MovementService::new(Arc::clone(&engine));
        Self {
            tanks: TankService::new(Arc::clone(&engine)),
            signals: SignalService::new(Arc::clone(&engine), movements.clone()),
            imports: ImportService::new(movements.clone()),
            terminals: TerminalService::new(Arc::clone(&engine)),
            movements,
            engine,
        }
    }

    /// Opens the configured sled database.
    pub fn open(config: &LedgerConfig) -> LedgerResult<Self> {
        let db = sled::Config::new()
            .path(&config.storage.path)
            .temporary(config.storage.temporary)
            .cache_capacity(config.storage.cache_capacity_bytes)
            .open()?;
        let store = SledLedgerStore::new(Arc::new(db))?;

        let clock: Arc<dyn Clock> = match config.clock.today {
            Some(today) => Arc::new(FixedClock(today.into())),
            None => Arc::new(SystemClock),
        };

        info!(
            path = %config.storage.path.display(),
            temporary = config.storage.temporary,
            today = %clock.today(),
            "ledger opened"
        );
        Ok(Self::new(Arc::new(store), clock))
    }

    pub fn engine(&self) -> &RecalculationEngine {
        &self.engine
    }

    pub fn movements(&self) -> &MovementService {
        &self.movements
    }

    pub fn tanks(&self) -> &TankService {
        &self.tanks
    }

    pub fn signals(&self) -> &SignalService {
        &self.signals
    }

    pub fn imports(&self) -> &ImportService {
        &self.imports
    }

    pub fn terminals(&self) -> &TerminalService {
        &self.terminals
    }
}
