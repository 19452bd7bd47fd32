use log::debug;

use crate::io::ecobee::model::Weather;
use crate::time_util::days::DAYS_PER_WEEK;
use crate::time_util::mytime::TimeProvider;

/// Stands in for the high of any day beyond the forecast. Matches no realistic band.
pub const UNKNOWN_FORECAST: i32 = 9999;

/// The thermostat only forecasts this many days past today.
const FORECAST_DAYS: usize = 4;

/// Forecast highs by weekday, worked out once per fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastView {
    day_highs: [Option<i32>; DAYS_PER_WEEK],
    tomorrow: usize,
    forecast_high: i32,
}

impl ForecastView {
    pub fn new(day_highs: [Option<i32>; DAYS_PER_WEEK], tomorrow: usize, forecast_high: i32) -> Self {
        Self {
            day_highs,
            tomorrow,
            forecast_high,
        }
    }

    pub fn from_weather(weather: &Weather, time_provider: &impl TimeProvider) -> Self {
        let forecasts = weather.get_forecasts();

        let mut day_highs = [None; DAYS_PER_WEEK];
        for forecast in forecasts.iter().skip(1).take(FORECAST_DAYS) {
            if let Some(day) = forecast.weekday() {
                day_highs[day] = Some(forecast.get_temp_high());
            }
        }

        let tomorrow = forecasts.get(1)
            .and_then(|forecast| forecast.weekday())
            .unwrap_or_else(|| time_provider.tomorrow_weekday());

        let forecast_high = forecasts.iter()
            .find(|forecast| forecast.weekday() == Some(tomorrow))
            .map(|forecast| forecast.get_temp_high())
            .unwrap_or(UNKNOWN_FORECAST);

        debug!("Forecast highs by weekday: {:?}, tomorrow is {}", day_highs, tomorrow);
        Self::new(day_highs, tomorrow, forecast_high)
    }

    pub fn high_for(&self, day: usize) -> Option<i32> {
        self.day_highs.get(day).copied().flatten()
    }

    /// Weekday the thermostat considers to be tomorrow.
    pub fn get_tomorrow(&self) -> usize {
        self.tomorrow
    }

    /// Tomorrow's forecast high, in tenths of a degree.
    pub fn get_forecast_high(&self) -> i32 {
        self.forecast_high
    }
}
