//! Value types shared by tanks and movements, with their CBOR encodings.
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Number of decimal places kept at every persistence point.
pub const VOLUME_SCALE: u32 = 2;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn new() -> Self {
        Self(Utc::now())
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::new()
    }
}

/// A calendar day on the ledger. Movements carry no time component.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct LedgerDate(NaiveDate);

impl LedgerDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }
    pub fn to_naive_date(&self) -> NaiveDate {
        self.0
    }
    pub fn succ(&self) -> Option<Self> {
        self.0.checked_add_days(Days::new(1)).map(Self)
    }
    /// Whole days from `self` to `later`, negative when `later` is earlier.
    pub fn days_until(&self, later: LedgerDate) -> i64 {
        later.0.signed_duration_since(self.0).num_days()
    }
    pub fn is_first_of_month(&self) -> bool {
        self.0.day() == 1
    }
}

impl From<NaiveDate> for LedgerDate {
    fn from(value: NaiveDate) -> Self {
        LedgerDate(value)
    }
}

impl fmt::Display for LedgerDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for LedgerDate {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Self)
    }
}

/// A quantity of feedstock in barrels.
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Volume(Decimal);

impl Volume {
    pub const ZERO: Volume = Volume(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }
    pub fn to_decimal(&self) -> Decimal {
        self.0
    }
    /// Rounds to [`VOLUME_SCALE`] places using banker's rounding.
    pub fn round(self) -> Self {
        Self(self.0.round_dp(VOLUME_SCALE))
    }
    pub fn floor_at_zero(self) -> Self {
        self.max(Self::ZERO)
    }
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }
}

impl From<Decimal> for Volume {
    fn from(value: Decimal) -> Self {
        Volume(value)
    }
}

impl From<i64> for Volume {
    fn from(value: i64) -> Self {
        Volume(Decimal::from(value))
    }
}

impl From<i32> for Volume {
    fn from(value: i32) -> Self {
        Volume(Decimal::from(value))
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Volume {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s).map(Self)
    }
}

impl Add for Volume {
    type Output = Volume;
    fn add(self, rhs: Volume) -> Volume {
        Volume(self.0 + rhs.0)
    }
}

impl Sub for Volume {
    type Output = Volume;
    fn sub(self, rhs: Volume) -> Volume {
        Volume(self.0 - rhs.0)
    }
}

impl Neg for Volume {
    type Output = Volume;
    fn neg(self) -> Volume {
        Volume(-self.0)
    }
}

impl AddAssign for Volume {
    fn add_assign(&mut self, rhs: Volume) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Volume {
    fn sub_assign(&mut self, rhs: Volume) {
        self.0 -= rhs.0;
    }
}

impl Sum for Volume {
    fn sum<I: Iterator<Item = Volume>>(iter: I) -> Volume {
        iter.fold(Volume::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Volume> for Volume {
    fn sum<I: Iterator<Item = &'a Volume>>(iter: I) -> Volume {
        iter.copied().sum()
    }
}

/// Price differential carried as workflow metadata. Never used in level arithmetic.
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct PriceDiff(Decimal);

impl PriceDiff {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }
}

impl fmt::Display for PriceDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementType {
    #[n(0)]
    Load,
    #[n(1)]
    Discharge,
    #[n(2)]
    Transfer,
    #[n(3)]
    Adjustment,
}

impl MovementType {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementType::Load => "load",
            MovementType::Discharge => "discharge",
            MovementType::Transfer => "transfer",
            MovementType::Adjustment => "adjustment",
        }
    }

    /// Types that take feedstock out of their source tank and so need an availability check.
    pub fn draws_down(self) -> bool {
        matches!(self, MovementType::Discharge | MovementType::Transfer)
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "load" => Ok(MovementType::Load),
            "discharge" => Ok(MovementType::Discharge),
            "transfer" => Ok(MovementType::Transfer),
            "adjustment" => Ok(MovementType::Adjustment),
            other => Err(format!("unknown movement type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementStatus {
    Pending,
    Completed,
}

impl FromStr for MovementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MovementStatus::Pending),
            "completed" => Ok(MovementStatus::Completed),
            other => Err(format!("unknown movement status: {other}")),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedstockType {
    #[n(0)]
    CarbonBlackOil,
    #[n(1)]
    Other,
}

impl FeedstockType {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedstockType::CarbonBlackOil => "carbon_black_oil",
            FeedstockType::Other => "other",
        }
    }
}

impl fmt::Display for FeedstockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedstockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "carbon_black_oil" => Ok(FeedstockType::CarbonBlackOil),
            "other" => Ok(FeedstockType::Other),
            other => Err(format!("unknown feedstock type: {other}")),
        }
    }
}

/// Which side of a movement a tank sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankRole {
    Source,
    Target,
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

impl<C> minicbor::Encode<C> for LedgerDate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.i32(self.0.num_days_from_ce())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for LedgerDate {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let days = d.i32()?;

        NaiveDate::from_num_days_from_ce_opt(days)
            .map(LedgerDate)
            .ok_or(minicbor::decode::Error::message(
                "failed to convert day count to a calendar date",
            ))
    }
}

// rust_decimal has no minicbor support, so both decimal newtypes go through its 16 byte form.
fn encode_decimal<W: minicbor::encode::Write>(
    value: &Decimal,
    e: &mut minicbor::Encoder<W>,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    e.bytes(&value.serialize())?.ok()
}

fn decode_decimal(d: &mut minicbor::Decoder<'_>) -> Result<Decimal, minicbor::decode::Error> {
    let raw: [u8; 16] = d
        .bytes()?
        .try_into()
        .map_err(|_| minicbor::decode::Error::message("decimal payload must be 16 bytes"))?;

    Ok(Decimal::deserialize(raw))
}

impl<C> minicbor::Encode<C> for Volume {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        encode_decimal(&self.0, e)
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Volume {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        decode_decimal(d).map(Volume)
    }
}

impl<C> minicbor::Encode<C> for PriceDiff {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        encode_decimal(&self.0, e)
    }
}

impl<'b, C> minicbor::Decode<'b, C> for PriceDiff {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        decode_decimal(d).map(PriceDiff)
    }
}
