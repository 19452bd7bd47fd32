use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const FORECAST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything the run needs to know about one thermostat, as of a single fetch.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThermostatSnapshot {
    identifier: String,
    name: String,
    #[serde(default)]
    program: Program,
    #[serde(default)]
    events: Vec<Event>,
    #[serde(default)]
    location: Location,
    #[serde(default)]
    weather: Weather,
}

impl ThermostatSnapshot {
    pub fn new(identifier: String, name: String, program: Program, weather: Weather) -> Self {
        Self {
            identifier,
            name,
            program,
            events: Vec::new(),
            location: Location::default(),
            weather,
        }
    }

    pub fn get_identifier(&self) -> &str {
        &self.identifier
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_program(&self) -> &Program {
        &self.program
    }

    pub fn get_events(&self) -> &[Event] {
        &self.events
    }

    pub fn get_location(&self) -> &Location {
        &self.location
    }

    pub fn get_weather(&self) -> &Weather {
        &self.weather
    }

    pub fn event_exists(&self, name: &str) -> bool {
        self.events.iter().any(|event| event.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    pub(crate) fn events_mut(&mut self) -> &mut Vec<Event> {
        &mut self.events
    }

    pub(crate) fn weather_mut(&mut self) -> &mut Weather {
        &mut self.weather
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    /// 7 days (Monday first) of 48 climate references.
    #[serde(default)]
    schedule: Vec<Vec<String>>,
    #[serde(default)]
    climates: Vec<Climate>,
}

impl Program {
    pub fn new(schedule: Vec<Vec<String>>, climates: Vec<Climate>) -> Self {
        Self { schedule, climates }
    }

    pub fn get_schedule(&self) -> &Vec<Vec<String>> {
        &self.schedule
    }

    pub fn get_climates(&self) -> &[Climate] {
        &self.climates
    }

    /// Case-insensitive lookup by human readable name.
    pub fn find_climate(&self, name: &str) -> Option<&Climate> {
        self.climates.iter().find(|climate| climate.name.eq_ignore_ascii_case(name))
    }

    pub fn climate_ref(&self, name: &str) -> Option<&str> {
        self.find_climate(name).and_then(|climate| climate.get_climate_ref())
    }

    pub(crate) fn climates_mut(&mut self) -> &mut Vec<Climate> {
        &mut self.climates
    }

    pub(crate) fn set_schedule(&mut self, schedule: Vec<Vec<String>>) {
        self.schedule = schedule;
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Climate {
    name: String,
    /// Assigned by the thermostat when the climate is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    climate_ref: Option<String>,
    /// Tenths of a degree Fahrenheit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cool_temp: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sensors: Vec<Value>,
    /// Everything else the thermostat sends, kept so writes don't drop settings.
    #[serde(flatten)]
    other: Map<String, Value>,
}

impl Climate {
    pub fn new(name: String, climate_ref: Option<String>, cool_temp: Option<i32>) -> Self {
        Self {
            name,
            climate_ref,
            cool_temp,
            sensors: Vec::new(),
            other: Map::new(),
        }
    }

    /// A new user climate sharing the sensors of an existing one.
    pub fn new_user_climate(name: &str, sensors: Vec<Value>) -> Self {
        let other = match json!({
            "isOccupied": true,
            "isOptimized": true,
            "coolFan": "auto",
            "heatFan": "auto",
            "owner": "user",
            "ventilatorMinOnTime": 20,
        }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.to_owned(),
            climate_ref: None,
            cool_temp: None,
            sensors,
            other,
        }
    }

    pub fn with_sensors(mut self, sensors: Vec<Value>) -> Self {
        self.sensors = sensors;
        self
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_climate_ref(&self) -> Option<&str> {
        self.climate_ref.as_deref()
    }

    pub fn get_cool_temp(&self) -> Option<i32> {
        self.cool_temp
    }

    pub fn get_sensors(&self) -> &[Value] {
        &self.sensors
    }

    pub fn set_cool_temp(&mut self, cool_temp: i32) {
        self.cool_temp = Some(cool_temp);
    }

    pub(crate) fn set_climate_ref(&mut self, climate_ref: String) {
        self.climate_ref = Some(climate_ref);
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type", default)]
    event_type: String,
    #[serde(default)]
    name: String,
    #[serde(flatten)]
    other: Map<String, Value>,
}

impl Event {
    pub fn vacation(name: &str) -> Self {
        Self {
            event_type: "vacation".to_owned(),
            name: name.to_owned(),
            other: Map::new(),
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_type(&self) -> &str {
        &self.event_type
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    time_zone: String,
    #[serde(default)]
    is_daylight_saving: bool,
}

impl Location {
    pub fn get_time_zone(&self) -> &str {
        &self.time_zone
    }

    pub fn is_daylight_saving(&self) -> bool {
        self.is_daylight_saving
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    #[serde(default)]
    forecasts: Vec<Forecast>,
}

impl Weather {
    pub fn new(forecasts: Vec<Forecast>) -> Self {
        Self { forecasts }
    }

    /// Index 0 is today, then one entry per following day.
    pub fn get_forecasts(&self) -> &[Forecast] {
        &self.forecasts
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    date_time: String,
    /// Tenths of a degree Fahrenheit.
    temp_high: i32,
}

impl Forecast {
    pub fn new(date_time: NaiveDateTime, temp_high: i32) -> Self {
        Self {
            date_time: date_time.format(FORECAST_TIME_FORMAT).to_string(),
            temp_high,
        }
    }

    pub fn get_temp_high(&self) -> i32 {
        self.temp_high
    }

    /// Weekday number (0=Monday) this forecast is for, if the timestamp is readable.
    pub fn weekday(&self) -> Option<usize> {
        NaiveDateTime::parse_from_str(&self.date_time, FORECAST_TIME_FORMAT)
            .ok()
            .map(|dt| dt.weekday().num_days_from_monday() as usize)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct HubStatus {
    code: i32,
    #[serde(default)]
    message: String,
}

impl HubStatus {
    pub fn get_code(&self) -> i32 {
        self.code
    }

    pub fn get_message(&self) -> &str {
        &self.message
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(super) struct ThermostatResponse {
    #[serde(default)]
    pub thermostat_list: Vec<ThermostatSnapshot>,
    pub status: HubStatus,
}

#[derive(Deserialize, Debug)]
pub(super) struct StatusResponse {
    pub status: HubStatus,
}

/// A date bounded hold, in the thermostat's local time.
#[derive(Debug, Clone, PartialEq)]
pub struct VacationRequest {
    name: String,
    /// Tenths of a degree Fahrenheit.
    cool_hold_temp: i32,
    heat_hold_temp: i32,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl VacationRequest {
    pub fn new(name: String, cool_hold_temp: i32, heat_hold_temp: i32, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            name,
            cool_hold_temp,
            heat_hold_temp,
            start,
            end,
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn get_end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn get_cool_hold_temp(&self) -> i32 {
        self.cool_hold_temp
    }

    pub fn to_params(&self) -> Value {
        json!({
            "name": self.name,
            "coolHoldTemp": self.cool_hold_temp,
            "heatHoldTemp": self.heat_hold_temp,
            "startDate": self.start.format("%Y-%m-%d").to_string(),
            "startTime": self.start.format("%H:%M:%S").to_string(),
            "endDate": self.end.format("%Y-%m-%d").to_string(),
            "endTime": self.end.format("%H:%M:%S").to_string(),
            "fan": "auto",
            "fanMinOnTime": "0",
        })
    }
}
