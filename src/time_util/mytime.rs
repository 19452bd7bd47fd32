use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime};

pub trait TimeProvider {
    /// The wall clock time where the thermostat lives.
    fn get_local_time(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.get_local_time().date()
    }

    /// Weekday number (0=Monday) of tomorrow.
    fn tomorrow_weekday(&self) -> usize {
        (self.today() + Duration::days(1)).weekday().num_days_from_monday() as usize
    }
}

#[derive(Default)]
pub struct RealTimeProvider {}

impl TimeProvider for RealTimeProvider {
    fn get_local_time(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug)]
pub struct DummyTimeProvider {
    local_time: NaiveDateTime,
}

impl DummyTimeProvider {
    pub fn new(local_time: NaiveDateTime) -> Self {
        Self { local_time }
    }

    /// Move the time returned by this dummy time provider forward by the given duration
    pub fn advance(&mut self, duration: Duration) {
        self.local_time += duration;
    }
}

impl TimeProvider for DummyTimeProvider {
    fn get_local_time(&self) -> NaiveDateTime {
        self.local_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_util::test_utils::{date, time};

    #[test]
    fn test_tomorrow_wraps_week() {
        // 2021-07-04 was a Sunday.
        let mut provider = DummyTimeProvider::new(date(2021, 7, 4).and_time(time(23, 0, 0)));
        assert_eq!(provider.tomorrow_weekday(), 0);

        provider.advance(Duration::hours(2));
        assert_eq!(provider.today(), date(2021, 7, 5));
        assert_eq!(provider.tomorrow_weekday(), 1);
    }
}
