use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use chrono::Weekday;
use itertools::Itertools;

pub const DAYS_PER_WEEK: usize = 7;

const DAY_NAMES: [&str; DAYS_PER_WEEK] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum DayError {
    UnknownDayToken(String),
    InvalidDayRange(String),
}

impl Display for DayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DayError::UnknownDayToken(token) => write!(f, "Unknown day '{}'", token),
            DayError::InvalidDayRange(range) => write!(f, "Invalid day range '{}'", range),
        }
    }
}

impl std::error::Error for DayError {}

pub fn day_name(day: usize) -> &'static str {
    DAY_NAMES[day % DAYS_PER_WEEK]
}

/// The day before, wrapping Monday back to Sunday.
pub fn previous_day(day: usize) -> usize {
    (day + DAYS_PER_WEEK - 1) % DAYS_PER_WEEK
}

/// A single day token or one end of a range: a number 0-6 or a (short) weekday name.
fn parse_day(token: &str) -> Result<usize, DayError> {
    let token = token.trim();
    if let Ok(num) = token.parse::<usize>() {
        return if num < DAYS_PER_WEEK {
            Ok(num)
        } else {
            Err(DayError::UnknownDayToken(token.to_owned()))
        };
    }
    token.parse::<Weekday>()
        .map(|day| day.num_days_from_monday() as usize)
        .map_err(|_| DayError::UnknownDayToken(token.to_owned()))
}

/// Resolves a single day, for when exactly one day is wanted such as the forecast lookup.
pub fn resolve_single_day(token: &str, tomorrow: usize) -> Result<usize, DayError> {
    match token.trim().to_ascii_lowercase().as_str() {
        "tomorrow" => Ok(tomorrow),
        other => parse_day(other),
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum DayToken {
    Tomorrow,
    Day(usize),
    /// Inclusive, wrapping past Sunday if the first day comes after the last.
    Range(usize, usize),
}

impl DayToken {
    fn parse(token: &str) -> Result<Self, DayError> {
        let lower = token.trim().to_ascii_lowercase();
        match lower.as_str() {
            "" => Err(DayError::UnknownDayToken(token.to_owned())),
            "tomorrow" => Ok(DayToken::Tomorrow),
            "weekdays" => Ok(DayToken::Range(0, 4)),
            "weekend" => Ok(DayToken::Range(5, 6)),
            _ => match lower.split_once('-') {
                Some((first, last)) => Ok(DayToken::Range(parse_day(first)?, parse_day(last)?)),
                None => parse_day(&lower).map(DayToken::Day),
            },
        }
    }

    fn add_to(&self, set: &mut BTreeSet<usize>, tomorrow: usize) {
        match *self {
            DayToken::Tomorrow => {
                set.insert(tomorrow);
            }
            DayToken::Day(day) => {
                set.insert(day);
            }
            DayToken::Range(first, last) => {
                let mut day = first;
                loop {
                    set.insert(day);
                    if day == last {
                        break;
                    }
                    day = (day + 1) % DAYS_PER_WEEK;
                }
            }
        }
    }
}

/// A validated, comma separated list of day tokens such as "tomorrow" or "Mon,Wed,Fri".
/// Resolution is deferred because "tomorrow" depends on when the run happens.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DaySpec {
    raw: String,
    tokens: Vec<DayToken>,
}

impl DaySpec {
    pub fn resolve(&self, tomorrow: usize) -> DaySet {
        let mut days = BTreeSet::new();
        for token in &self.tokens {
            token.add_to(&mut days, tomorrow);
        }
        DaySet { days }
    }
}

impl TryFrom<String> for DaySpec {
    type Error = DayError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let tokens = raw.split(',')
            .map(DayToken::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { raw, tokens })
    }
}

impl Display for DaySpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

pub fn resolve_days(spec: &str, tomorrow: usize) -> Result<DaySet, DayError> {
    DaySpec::try_from(spec.to_owned()).map(|spec| spec.resolve(tomorrow))
}

/// A deduplicated set of weekday numbers, iterated Monday first.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct DaySet {
    days: BTreeSet<usize>,
}

impl DaySet {
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.days.iter().copied()
    }
}

impl FromIterator<usize> for DaySet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self {
            days: iter.into_iter().filter(|day| *day < DAYS_PER_WEEK).collect(),
        }
    }
}

impl Display for DaySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.days.iter().map(|day| day_name(*day)).join(", "))
    }
}

/// An inclusive, non-wrapping run of weekdays such as the time of use days "0-4".
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct WeekdayRange {
    first: usize,
    last: usize,
}

impl WeekdayRange {
    pub fn new(first: usize, last: usize) -> Result<Self, DayError> {
        if first > last || last >= DAYS_PER_WEEK {
            return Err(DayError::InvalidDayRange(format!("{}-{}", first, last)));
        }
        Ok(Self { first, last })
    }

    pub fn contains(&self, day: usize) -> bool {
        self.first <= day && day <= self.last
    }

    pub fn last(&self) -> usize {
        self.last
    }

    /// Whether every one of the days falls within this range.
    pub fn covers(&self, days: &DaySet) -> bool {
        days.iter().all(|day| self.contains(day))
    }

    pub fn overlaps(&self, days: &DaySet) -> bool {
        days.iter().any(|day| self.contains(day))
    }
}

impl TryFrom<String> for WeekdayRange {
    type Error = DayError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let (first, last) = raw.split_once('-')
            .ok_or_else(|| DayError::InvalidDayRange(raw.clone()))?;
        let first = parse_day(first).map_err(|_| DayError::InvalidDayRange(raw.clone()))?;
        let last = parse_day(last).map_err(|_| DayError::InvalidDayRange(raw.clone()))?;
        WeekdayRange::new(first, last).map_err(|_| DayError::InvalidDayRange(raw))
    }
}

impl Display for WeekdayRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", day_name(self.first), day_name(self.last))
    }
}
