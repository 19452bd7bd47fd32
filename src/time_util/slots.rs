use std::fmt::{Display, Formatter};

use chrono::{NaiveTime, Timelike};

/// Number of half-hour slots in a day.
pub const SLOTS_PER_DAY: usize = 48;

const SLOT_MINUTES: u32 = 30;

const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SlotError {
    /// The end time was before the start time.
    InvalidTimeRange { start: String, end: String },
    /// The time did not land on a half hour boundary.
    UnalignedTime(String),
    /// The time could not be parsed as HH:MM.
    InvalidTime(String),
}

impl Display for SlotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotError::InvalidTimeRange { start, end } => {
                write!(f, "End time {} can not be before start time {}", end, start)
            }
            SlotError::UnalignedTime(time) => {
                write!(f, "Time {} is not on a {} minute boundary", time, SLOT_MINUTES)
            }
            SlotError::InvalidTime(time) => write!(f, "Time '{}' is not a valid HH:MM time", time),
        }
    }
}

impl std::error::Error for SlotError {}

/// Parse a HH:MM time, rejecting anything not on a slot boundary.
pub fn parse_slot_time(time: &str) -> Result<NaiveTime, SlotError> {
    let parsed = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT)
        .map_err(|_| SlotError::InvalidTime(time.to_owned()))?;
    if parsed.minute() % SLOT_MINUTES != 0 {
        return Err(SlotError::UnalignedTime(time.to_owned()));
    }
    Ok(parsed)
}

/// The slot index (0-47) that starts at the given time.
pub fn slot_of(time: &str) -> Result<usize, SlotError> {
    parse_slot_time(time).map(slot_index)
}

fn slot_index(time: NaiveTime) -> usize {
    ((time.hour() * 60 + time.minute()) / SLOT_MINUTES) as usize
}

/// Converts a start and optional end time into a start slot and an end-exclusive end slot.
/// Without an end time the range covers the single slot beginning at the start time.
pub fn slot_range(start_time: &str, end_time: Option<&str>) -> Result<(usize, usize), SlotError> {
    let start = slot_of(start_time)?;
    let end = match end_time {
        None => start + 1,
        Some(end_time) => {
            let end = slot_of(end_time)?;
            if end < start {
                return Err(SlotError::InvalidTimeRange {
                    start: start_time.to_owned(),
                    end: end_time.to_owned(),
                });
            }
            end
        }
    };
    Ok((start, end))
}
