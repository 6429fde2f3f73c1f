//! Pure level arithmetic over single movements.
use crate::movement::Movement;
use crate::types::{MovementType, Volume};
use rust_decimal::Decimal;
use tracing::warn;

/// The recorded actual volume, or the effective expected volume while pending.
pub fn effective_volume(movement: &Movement) -> Volume {
    movement
        .actual_volume
        .unwrap_or_else(|| movement.expected_volume())
}

/// Signed effect of `movement` on the level of `tank_id`.
pub fn volume_delta(movement: &Movement, tank_id: &str) -> Volume {
    let volume = effective_volume(movement);
    let is_source = movement.tank_id() == Some(tank_id);

    match movement.movement_type {
        MovementType::Load if is_source => volume,
        MovementType::Discharge if is_source => -volume,
        MovementType::Transfer if is_source => -volume,
        MovementType::Transfer if movement.target_tank_id.as_deref() == Some(tank_id) => volume,
        // adjustments carry their own sign
        MovementType::Adjustment if is_source => volume,
        _ => Volume::ZERO,
    }
}

/// Applies `movement` to a running level. Levels never go below zero.
pub fn apply_to_level(level: Volume, movement: &Movement, tank_id: &str) -> Volume {
    let next = level + volume_delta(movement, tank_id);
    if next.is_negative() {
        warn!(
            tank_id,
            movement_id = %movement.id,
            %level,
            unclamped = %next,
            "level would go negative, clamping to zero"
        );
    }
    next.floor_at_zero()
}

/// Fill percentage of a tank, rounded to two places and clamped to `[0, 100]`.
pub fn utilization(level: Volume, capacity: Volume) -> Decimal {
    if !capacity.is_positive() {
        return Decimal::ZERO;
    }
    let percent = level.to_decimal() / capacity.to_decimal() * Decimal::ONE_HUNDRED;
    percent
        .round_dp(2)
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}
