use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_with::serde_as;
use serde_with::{DurationSeconds, TryFromInto};

use crate::brain::supercool::bands::{BandError, BandTable};
use crate::brain::supercool::program::SynthesisRules;
use crate::io::ecobee::hub::ECOBEE_API;
use crate::io::notify::email::parse_mailbox;
use crate::time_util::days::{DaySpec, WeekdayRange};

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    thermostat: ThermostatConfig,
    #[serde(default)]
    logging: LoggingConfig,
    supercool: SupercoolConfig,
    #[serde(default)]
    holidays: HolidayConfig,
    #[serde(default)]
    notifications: NotificationsConfig,
}

impl Config {
    pub fn get_thermostat(&self) -> &ThermostatConfig {
        &self.thermostat
    }

    pub fn get_logging(&self) -> &LoggingConfig {
        &self.logging
    }

    pub fn get_supercool(&self) -> &SupercoolConfig {
        &self.supercool
    }

    pub fn get_holidays(&self) -> &HolidayConfig {
        &self.holidays
    }

    pub fn get_notifications(&self) -> &NotificationsConfig {
        &self.notifications
    }

    /// Everything that can be checked without talking to the thermostat.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thermostat.climate_create_attempts == 0 {
            return Err(ConfigError::Invalid("thermostat.climate_create_attempts must be at least 1".to_owned()));
        }
        self.supercool.validate()?;
        self.notifications.validate()
    }
}

pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(path.to_owned(), e))?;
    let config: Config = toml::from_str(&config_str)?;
    config.validate()?;
    Ok(config)
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Toml(toml::de::Error),
    Bands(BandError),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Unable to read config file {:?}: {}", path, e),
            ConfigError::Toml(e) => write!(f, "Error reading config file: {}", e),
            ConfigError::Bands(e) => write!(f, "Invalid supercool bands: {}", e),
            ConfigError::Invalid(e) => write!(f, "Invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Toml(e)
    }
}

impl From<BandError> for ConfigError {
    fn from(e: BandError) -> Self {
        ConfigError::Bands(e)
    }
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct ThermostatConfig {
    #[serde(default = "default_thermostat_name")]
    name: String,
    /// JSON file holding the access token.
    token_file: PathBuf,
    #[serde(default = "default_api_url")]
    api_url: String,
    /// How long to give the service after a write before reading back.
    #[serde_as(as = "DurationSeconds")]
    #[serde(default = "default_settle_secs")]
    settle_secs: Duration,
    #[serde(default = "default_climate_create_attempts")]
    climate_create_attempts: usize,
}

fn default_thermostat_name() -> String {
    "Home".to_owned()
}

fn default_api_url() -> String {
    ECOBEE_API.to_owned()
}

fn default_settle_secs() -> Duration {
    Duration::from_secs(10)
}

fn default_climate_create_attempts() -> usize {
    3
}

impl ThermostatConfig {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_token_file(&self) -> &Path {
        &self.token_file
    }

    pub fn get_api_url(&self) -> &str {
        &self.api_url
    }

    pub fn get_settle_time(&self) -> Duration {
        self.settle_secs
    }

    pub fn get_climate_create_attempts(&self) -> usize {
        self.climate_create_attempts
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoggingConfig {
    /// Log to this file instead of stdout.
    #[serde(default)]
    file: Option<PathBuf>,
    /// Default filter directive, overridden by RUST_LOG.
    #[serde(default = "default_log_level")]
    level: String,
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn get_file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn get_level(&self) -> &str {
        &self.level
    }
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct SupercoolConfig {
    /// Climate name prefixes, one per band tier and in the same order.
    /// The day number is appended to get the climate name.
    climates: Vec<String>,
    #[serde_as(as = "TryFromInto<String>")]
    days: DaySpec,
    #[serde_as(as = "TryFromInto<String>")]
    time_of_use_days: WeekdayRange,
    #[serde(default = "default_restricted")]
    time_of_use_restricted: bool,
    /// Tenths of a degree F. Below this forecast high the schedule is left alone.
    low_temp_cutoff: i32,
    #[serde_as(as = "TryFromInto<String>")]
    #[serde(default)]
    months: MonthRange,
    bands: BandTable,
}

fn default_restricted() -> bool {
    true
}

impl SupercoolConfig {
    pub fn get_climate_prefixes(&self) -> &[String] {
        &self.climates
    }

    pub fn get_days(&self) -> &DaySpec {
        &self.days
    }

    pub fn get_time_of_use_days(&self) -> &WeekdayRange {
        &self.time_of_use_days
    }

    pub fn is_time_of_use_restricted(&self) -> bool {
        self.time_of_use_restricted
    }

    pub fn get_months(&self) -> &MonthRange {
        &self.months
    }

    pub fn get_bands(&self) -> &BandTable {
        &self.bands
    }

    pub fn rules(&self) -> SynthesisRules<'_> {
        SynthesisRules {
            bands: &self.bands,
            prefixes: &self.climates,
            time_of_use: &self.time_of_use_days,
            cutoff: self.low_temp_cutoff,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.climates.len() < 2 {
            return Err(ConfigError::Invalid("supercool.climates needs at least two prefixes".to_owned()));
        }
        if let Some(prefix) = self.climates.iter().find(|prefix| prefix.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("Empty climate prefix '{}'", prefix)));
        }
        self.bands.validate(self.climates.len())?;
        Ok(())
    }
}

/// Inclusive range of months (1-12). Wraps over the year end when the first month is after the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    first: u32,
    last: u32,
}

impl MonthRange {
    pub fn contains(&self, month: u32) -> bool {
        if self.first <= self.last {
            (self.first..=self.last).contains(&month)
        } else {
            month >= self.first || month <= self.last
        }
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(date.month())
    }
}

impl Default for MonthRange {
    fn default() -> Self {
        Self { first: 1, last: 12 }
    }
}

impl TryFrom<String> for MonthRange {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let parse = |s: &str| s.trim().parse::<u32>().ok().filter(|m| (1..=12).contains(m));
        match value.split_once('-') {
            Some((first, last)) => match (parse(first), parse(last)) {
                (Some(first), Some(last)) => Ok(Self { first, last }),
                _ => Err(format!("Invalid month range '{}', expected e.g. 5-10", value)),
            },
            None => Err(format!("Invalid month range '{}', expected e.g. 5-10", value)),
        }
    }
}

/// A time of day written as HH:MM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    pub fn get(&self) -> NaiveTime {
        self.0
    }
}

impl TryFrom<String> for ClockTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .map(ClockTime)
            .map_err(|e| format!("Invalid time '{}': {}", value, e))
    }
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct HolidayConfig {
    /// Days the time of use rates don't apply.
    #[serde(default)]
    dates: Vec<NaiveDate>,
    /// Whole degrees F.
    #[serde(default = "default_holiday_cool_temp")]
    cool_temp: i32,
    /// Time on the evening before the holiday that the vacation starts.
    #[serde_as(as = "TryFromInto<String>")]
    #[serde(default = "default_holiday_time")]
    start_time: ClockTime,
    #[serde_as(as = "TryFromInto<String>")]
    #[serde(default = "default_holiday_time")]
    end_time: ClockTime,
    /// Delete and recreate vacations that already exist.
    #[serde(default)]
    replace_existing: bool,
}

fn default_holiday_cool_temp() -> i32 {
    77
}

fn default_holiday_time() -> ClockTime {
    ClockTime(NaiveTime::MIN + ChronoDuration::hours(20))
}

impl Default for HolidayConfig {
    fn default() -> Self {
        Self {
            dates: Vec::new(),
            cool_temp: default_holiday_cool_temp(),
            start_time: default_holiday_time(),
            end_time: default_holiday_time(),
            replace_existing: false,
        }
    }
}

impl HolidayConfig {
    #[cfg(test)]
    pub fn new(dates: Vec<NaiveDate>, cool_temp: i32, start_time: NaiveTime, end_time: NaiveTime, replace_existing: bool) -> Self {
        Self {
            dates,
            cool_temp,
            start_time: ClockTime(start_time),
            end_time: ClockTime(end_time),
            replace_existing,
        }
    }

    pub fn get_dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn get_cool_temp(&self) -> i32 {
        self.cool_temp
    }

    pub fn get_start_time(&self) -> NaiveTime {
        self.start_time.get()
    }

    pub fn get_end_time(&self) -> NaiveTime {
        self.end_time.get()
    }

    pub fn should_replace_existing(&self) -> bool {
        self.replace_existing
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct NotificationsConfig {
    #[serde(default)]
    email: Option<EmailConfig>,
    #[serde(default)]
    pushover: Option<PushoverConfig>,
    #[serde(default)]
    pushbullet: Option<PushbulletConfig>,
    #[serde(default)]
    join: Option<JoinConfig>,
}

impl NotificationsConfig {
    pub fn get_email(&self) -> Option<&EmailConfig> {
        self.email.as_ref()
    }

    pub fn get_pushover(&self) -> Option<&PushoverConfig> {
        self.pushover.as_ref()
    }

    pub fn get_pushbullet(&self) -> Option<&PushbulletConfig> {
        self.pushbullet.as_ref()
    }

    pub fn get_join(&self) -> Option<&JoinConfig> {
        self.join.as_ref()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(email) = &self.email {
            if email.to.is_empty() {
                return Err(ConfigError::Invalid("notifications.email.to needs at least one address".to_owned()));
            }
            for address in std::iter::once(&email.from).chain(&email.to) {
                parse_mailbox(address).map_err(|e| ConfigError::Invalid(e.to_string()))?;
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct EmailConfig {
    from: String,
    to: Vec<String>,
    server: String,
    #[serde(default = "default_smtp_port")]
    port: u16,
    /// Connect with TLS from the start, usually port 465.
    #[serde(default)]
    ssl: bool,
    /// Upgrade a plain connection with STARTTLS. Ignored if ssl is set.
    #[serde(default = "default_true")]
    tls: bool,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

impl EmailConfig {
    pub fn get_from(&self) -> &str {
        &self.from
    }

    pub fn get_to(&self) -> &[String] {
        &self.to
    }

    pub fn get_server(&self) -> &str {
        &self.server
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn is_ssl(&self) -> bool {
        self.ssl
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    pub fn get_user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn get_password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct PushoverConfig {
    api_token: String,
    user_keys: Vec<String>,
    #[serde(default)]
    priority: i32,
}

impl PushoverConfig {
    pub fn get_api_token(&self) -> &str {
        &self.api_token
    }

    pub fn get_user_keys(&self) -> &[String] {
        &self.user_keys
    }

    pub fn get_priority(&self) -> i32 {
        self.priority
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct PushbulletConfig {
    api_key: String,
    /// Push to every device if unset.
    #[serde(default)]
    device_id: Option<String>,
}

impl PushbulletConfig {
    pub fn get_api_key(&self) -> &str {
        &self.api_key
    }

    pub fn get_device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct JoinConfig {
    api_key: String,
    device_id: String,
}

impl JoinConfig {
    pub fn get_api_key(&self) -> &str {
        &self.api_key
    }

    pub fn get_device_id(&self) -> &str {
        &self.device_id
    }
}
