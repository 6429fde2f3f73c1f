//! Movement documents and their effective-value accessors.
use crate::overridable::Overridable;
use crate::types::{
    LedgerDate, MovementStatus, MovementType, PriceDiff, TankRole, TimeStamp, Volume,
};

#[derive(Debug, Clone, PartialEq, Eq, Default, minicbor::Encode, minicbor::Decode)]
pub struct TradeReference {
    #[n(0)]
    pub trade_number: Overridable<String>,
    #[n(1)]
    pub trade_line_item: Overridable<String>,
}

impl TradeReference {
    pub fn is_complete(&self) -> bool {
        self.trade_number.effective().is_some() && self.trade_line_item.effective().is_some()
    }
}

/// Commercial workflow fields. Carried for the operators, never read by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default, minicbor::Encode, minicbor::Decode)]
pub struct WorkflowMetadata {
    #[n(0)]
    pub strategy: Overridable<String>,
    #[n(1)]
    pub destination: Overridable<String>,
    #[n(2)]
    pub equipment: Overridable<String>,
    #[n(3)]
    pub discharge_date: Overridable<LedgerDate>,
    #[n(4)]
    pub base_diff: Overridable<PriceDiff>,
    #[n(5)]
    pub quality_adj_diff: Overridable<PriceDiff>,
}

/// Where a movement came from. Opaque to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default, minicbor::Encode, minicbor::Decode)]
pub struct Provenance {
    #[n(0)]
    pub signal_id: Option<String>, // upstream signal identifier
    #[n(1)]
    pub refinery_tank_name: Option<String>, // tank name as the refinery knows it
    #[n(2)]
    pub source_document: Option<String>, // reference to the imported document
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Movement {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded with a `mvmt_` prefix
    #[n(1)]
    pub sequence: u64, // store-issued, breaks created_at ties
    #[n(2)]
    pub created_at: TimeStamp,
    #[n(3)]
    pub movement_type: MovementType,
    #[n(4)]
    pub tank_id: Overridable<String>, // empty on both sides = unassigned signal
    #[n(5)]
    pub target_tank_id: Option<String>, // transfers only
    #[n(6)]
    pub scheduled_date: Overridable<LedgerDate>,
    #[n(7)]
    pub expected_volume: Overridable<Volume>,
    #[n(8)]
    pub actual_volume: Option<Volume>,
    #[n(9)]
    pub notes: Overridable<String>,
    #[n(10)]
    pub trade: TradeReference,
    #[n(11)]
    pub workflow: WorkflowMetadata,
    #[n(12)]
    pub provenance: Provenance,
    #[n(13)]
    pub resulting_volume: Option<Volume>,
    #[n(14)]
    pub target_resulting_volume: Option<Volume>,
}

impl Movement {
    /// A pending movement with every optional field empty and no tank assigned.
    pub fn new(
        id: String,
        sequence: u64,
        movement_type: MovementType,
        scheduled_date: LedgerDate,
        expected_volume: Volume,
    ) -> Self {
        Self {
            id,
            sequence,
            created_at: TimeStamp::new(),
            movement_type,
            tank_id: Overridable::default(),
            target_tank_id: None,
            scheduled_date: Overridable::with_default(scheduled_date),
            expected_volume: Overridable::with_default(expected_volume),
            actual_volume: None,
            notes: Overridable::default(),
            trade: TradeReference::default(),
            workflow: WorkflowMetadata::default(),
            provenance: Provenance::default(),
            resulting_volume: None,
            target_resulting_volume: None,
        }
    }
    pub fn set_tank(mut self, tank_id: impl Into<String>) -> Self {
        self.tank_id = Overridable::with_default(tank_id.into());
        self
    }
    pub fn set_target(mut self, tank_id: impl Into<String>) -> Self {
        self.target_tank_id = Some(tank_id.into());
        self
    }
    pub fn set_notes(mut self, notes: Option<String>) -> Self {
        self.notes = Overridable::new(notes);
        self
    }
    pub fn set_actual_volume(mut self, volume: Option<Volume>) -> Self {
        self.actual_volume = volume;
        self
    }
    pub fn set_trade(mut self, trade_number: Option<String>, line_item: Option<String>) -> Self {
        self.trade = TradeReference {
            trade_number: Overridable::new(trade_number),
            trade_line_item: Overridable::new(line_item),
        };
        self
    }
    pub fn set_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn tank_id(&self) -> Option<&str> {
        self.tank_id.effective_str()
    }
    pub fn scheduled_date(&self) -> Option<LedgerDate> {
        self.scheduled_date.effective_copied()
    }
    pub fn expected_volume(&self) -> Volume {
        self.expected_volume.effective_copied().unwrap_or(Volume::ZERO)
    }
    pub fn notes(&self) -> Option<&str> {
        self.notes.effective_str()
    }

    pub fn status(&self) -> MovementStatus {
        if self.actual_volume.is_some() {
            MovementStatus::Completed
        } else {
            MovementStatus::Pending
        }
    }
    pub fn is_completed(&self) -> bool {
        self.status() == MovementStatus::Completed
    }
    pub fn is_signal(&self) -> bool {
        self.provenance.signal_id.is_some()
    }
    pub fn is_unassigned(&self) -> bool {
        self.tank_id().is_none()
    }

    /// How `tank_id` participates in this movement, if at all.
    pub fn role_for(&self, tank_id: &str) -> Option<TankRole> {
        if self.tank_id() == Some(tank_id) {
            Some(TankRole::Source)
        } else if self.target_tank_id.as_deref() == Some(tank_id) {
            Some(TankRole::Target)
        } else {
            None
        }
    }
    pub fn touches(&self, tank_id: &str) -> bool {
        self.role_for(tank_id).is_some()
    }

    /// Every tank whose level this movement contributes to.
    pub fn affected_tanks(&self) -> Vec<String> {
        self.tank_id()
            .into_iter()
            .chain(self.target_tank_id.as_deref())
            .map(str::to_owned)
            .collect()
    }

    pub fn recorded_volume(&self, role: TankRole) -> Option<Volume> {
        match role {
            TankRole::Source => self.resulting_volume,
            TankRole::Target => self.target_resulting_volume,
        }
    }
    pub fn recorded_volume_for(&self, tank_id: &str) -> Option<Volume> {
        self.role_for(tank_id)
            .and_then(|role| self.recorded_volume(role))
    }
    pub fn record_volume(&mut self, role: TankRole, level: Volume) {
        match role {
            TankRole::Source => self.resulting_volume = Some(level),
            TankRole::Target => self.target_resulting_volume = Some(level),
        }
    }
}
