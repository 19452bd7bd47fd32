use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::time_util::mytime::DummyTimeProvider;

pub fn time(hour: u32, minute: u32, second: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, second).expect(&format!("Expected {:0>2}:{:0>2}:{:0>2} to be a valid time", hour, minute, second))
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect(&format!("Expected {:0>4}-{:0>2}-{:0>2} to be a valid date", year, month, day))
}

pub fn local(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    date(year, month, day).and_time(time(hour, minute, 0))
}

/// A clock sitting on a Wednesday in July, so "tomorrow" is Thursday (3).
pub fn wednesday_in_july() -> DummyTimeProvider {
    DummyTimeProvider::new(local(2021, 7, 7, 18, 0))
}
