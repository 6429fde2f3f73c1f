use crate::arithmetic::utilization;
use crate::types::{FeedstockType, TimeStamp, Volume};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Tank {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded with a `tank_` prefix
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub location: String,
    #[n(3)]
    pub feedstock_type: FeedstockType,
    #[n(4)]
    pub capacity: Volume,
    #[n(5)]
    pub initial_level: Volume,
    // cache of the level as of today, written only by the recalculation engine
    #[n(6)]
    pub current_level: Volume,
    #[n(7)]
    pub created_at: TimeStamp,
    // bumped by the store on every write
    #[n(8)]
    pub version: u64,
}

impl Tank {
    pub fn new(
        id: String,
        name: String,
        location: String,
        feedstock_type: FeedstockType,
        capacity: Volume,
        initial_level: Volume,
    ) -> Self {
        Self {
            id,
            name,
            location,
            feedstock_type,
            capacity,
            initial_level,
            current_level: initial_level,
            created_at: TimeStamp::new(),
            version: 0,
        }
    }

    pub fn level_percentage(&self) -> Decimal {
        utilization(self.current_level, self.capacity)
    }
}

/// A tank together with its display utilization.
#[derive(Debug, Clone, PartialEq)]
pub struct TankWithLevel {
    pub tank: Tank,
    pub level_percentage: Decimal,
}

impl From<Tank> for TankWithLevel {
    fn from(tank: Tank) -> Self {
        let level_percentage = tank.level_percentage();
        Self {
            tank,
            level_percentage,
        }
    }
}
