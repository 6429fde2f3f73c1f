pub mod arithmetic;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod import;
pub mod ledger;
pub mod locks;
pub mod movement;
pub mod overridable;
pub mod service;
pub mod signal_service;
pub mod store;
pub mod tank;
pub mod tank_service;
pub mod telemetry;
pub mod terminal_service;
pub mod types;
pub mod utils;

pub use error::{ErrorKind, LedgerError, LedgerResult, ValidationError};
pub use ledger::Ledger;
pub use movement::Movement;
pub use overridable::Overridable;
pub use tank::{Tank, TankWithLevel};
pub use types::{FeedstockType, LedgerDate, MovementStatus, MovementType, Volume};
