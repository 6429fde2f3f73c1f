//! Identifier generation

use crate::error::{LedgerError, LedgerResult};
use bech32::Bech32m;
use uuid7::uuid7;

pub const TANK_PREFIX: &str = "tank_";
pub const MOVEMENT_PREFIX: &str = "mvmt_";

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> LedgerResult<String> {
    let hrp = bech32::Hrp::parse(hrp).map_err(|e| LedgerError::Identifier(e.to_string()))?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())
        .map_err(|e| LedgerError::Identifier(e.to_string()))?;
    Ok(encode)
}

pub fn new_tank_id() -> LedgerResult<String> {
    new_uuid_to_bech32(TANK_PREFIX)
}

pub fn new_movement_id() -> LedgerResult<String> {
    new_uuid_to_bech32(MOVEMENT_PREFIX)
}
