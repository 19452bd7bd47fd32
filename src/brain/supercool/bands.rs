use std::fmt::{Display, Formatter};

use itertools::Itertools;
use serde::Deserialize;
use serde_with::serde_as;
use serde_with::TryFromInto;

use crate::time_util::slots::{slot_of, SlotError};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BandError {
    MalformedRangeSpec(String),
    OverlappingBands { first: BandRange, second: BandRange },
    /// Each band needs one tier per climate prefix.
    TierCount { range: BandRange, expected: usize, found: usize },
    TierTime { range: BandRange, error: SlotError },
    /// Tier end times must not go backwards, and only the last tier may be open ended.
    TierOrder { range: BandRange },
}

impl Display for BandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BandError::MalformedRangeSpec(spec) => {
                write!(f, "Malformed range '{}', expected 'low-high' with low <= high", spec)
            }
            BandError::OverlappingBands { first, second } => write!(f, "Band {} overlaps band {}", first, second),
            BandError::TierCount { range, expected, found } => {
                write!(f, "Band {} has {} tiers, expected one per climate ({})", range, found, expected)
            }
            BandError::TierTime { range, error } => write!(f, "Band {}: {}", range, error),
            BandError::TierOrder { range } => {
                write!(f, "Band {} has tiers out of order or an open ended tier before the last", range)
            }
        }
    }
}

impl std::error::Error for BandError {}

/// Parse an inclusive "low-high" range of forecast temperatures (tenths of a degree).
pub fn parse_range(spec: &str) -> Result<(i32, i32), BandError> {
    let malformed = || BandError::MalformedRangeSpec(spec.to_owned());
    let (low, high) = spec.trim().split_once('-').ok_or_else(malformed)?;
    let low: i32 = low.trim().parse().map_err(|_| malformed())?;
    let high: i32 = high.trim().parse().map_err(|_| malformed())?;
    if low > high {
        return Err(malformed());
    }
    Ok((low, high))
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct BandRange {
    low: i32,
    high: i32,
}

impl BandRange {
    pub fn get_low(&self) -> i32 {
        self.low
    }

    pub fn contains(&self, value: i32) -> bool {
        self.low <= value && value <= self.high
    }

    pub fn overlaps(&self, other: &BandRange) -> bool {
        self.low <= other.high && other.low <= self.high
    }
}

impl TryFrom<String> for BandRange {
    type Error = BandError;

    fn try_from(spec: String) -> Result<Self, Self::Error> {
        let (low, high) = parse_range(&spec)?;
        Ok(Self { low, high })
    }
}

impl Display for BandRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// The setpoint for one climate and the time (HH:MM) until which it runs.
/// No end time means it runs to the end of the day.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Tier {
    temp: i32,
    #[serde(default)]
    until: Option<String>,
}

impl Tier {
    pub fn new(temp: i32, until: Option<&str>) -> Self {
        Self {
            temp,
            until: until.map(|s| s.to_owned()),
        }
    }

    pub fn get_temp(&self) -> i32 {
        self.temp
    }

    pub fn get_until(&self) -> Option<&str> {
        self.until.as_deref()
    }
}

#[serde_as]
#[derive(Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Band {
    #[serde_as(as = "TryFromInto<String>")]
    range: BandRange,
    /// One tier per climate prefix, in prefix order.
    tiers: Vec<Tier>,
}

impl Band {
    pub fn new(range: BandRange, tiers: Vec<Tier>) -> Self {
        Self { range, tiers }
    }

    pub fn get_range(&self) -> &BandRange {
        &self.range
    }

    pub fn get_tiers(&self) -> &[Tier] {
        &self.tiers
    }

    fn validate(&self, climate_count: usize) -> Result<(), BandError> {
        if self.tiers.len() != climate_count {
            return Err(BandError::TierCount {
                range: self.range,
                expected: climate_count,
                found: self.tiers.len(),
            });
        }
        let mut last_slot = 0;
        for (idx, tier) in self.tiers.iter().enumerate() {
            match tier.get_until() {
                Some(until) => {
                    let slot = slot_of(until).map_err(|error| BandError::TierTime { range: self.range, error })?;
                    if slot < last_slot {
                        return Err(BandError::TierOrder { range: self.range });
                    }
                    last_slot = slot;
                }
                None if idx + 1 == self.tiers.len() => {}
                None => return Err(BandError::TierOrder { range: self.range }),
            }
        }
        Ok(())
    }
}

/// Bands in declaration order. Lookup is a linear scan where the first band containing
/// the value wins, though [BandTable::validate] refuses overlapping bands.
#[derive(Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(transparent)]
pub struct BandTable {
    bands: Vec<Band>,
}

impl BandTable {
    pub fn new(bands: Vec<Band>) -> Self {
        Self { bands }
    }

    pub fn lookup(&self, value: i32) -> Option<&Band> {
        self.bands.iter().find(|band| band.range.contains(value))
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Band> {
        self.bands.iter()
    }

    pub fn validate(&self, climate_count: usize) -> Result<(), BandError> {
        for band in &self.bands {
            band.validate(climate_count)?;
        }
        let overlap = self.bands.iter()
            .tuple_combinations()
            .find(|(a, b)| a.range.overlaps(&b.range));
        if let Some((first, second)) = overlap {
            return Err(BandError::OverlappingBands {
                first: first.range,
                second: second.range,
            });
        }
        Ok(())
    }
}
