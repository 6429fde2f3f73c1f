//! Layered runtime configuration.
//!
//! Built-in defaults, then an optional TOML file, then `TANK_LEDGER__*`
//! environment variables (`TANK_LEDGER__STORAGE__PATH=/var/lib/ledger`).
use crate::error::LedgerResult;
use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "TANK_LEDGER";

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub clock: ClockConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub path: PathBuf,
    // throwaway database, nothing survives the process
    pub temporary: bool,
    pub cache_capacity_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `tank_ledger=debug`.
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClockConfig {
    /// Pins "today" for replays. The UTC date is used when unset.
    pub today: Option<NaiveDate>,
}

impl LedgerConfig {
    pub fn load(file: Option<&Path>) -> LedgerResult<Self> {
        let mut builder = Config::builder()
            .set_default("storage.path", "tank-ledger.db")?
            .set_default("storage.temporary", false)?
            .set_default("storage.cache_capacity_bytes", 64 * 1024 * 1024)?
            .set_default("logging.filter", "info")?
            .set_default("logging.json", false)?;

        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(true));
        }

        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
