use std::fmt::{Display, Formatter};

use async_trait::async_trait;

use model::{Climate, Program, ThermostatSnapshot, VacationRequest};

pub mod dummy;
pub mod hub;
pub mod model;
pub mod session;

/// The thermostat's cloud service. Every mutating call succeeds only if the service
/// reported status code 0.
#[async_trait]
pub trait EcobeeHub: Send + Sync {
    /// Fetch the registered thermostat with the given name, or the first one if none match.
    async fn get_thermostat(&self, name: &str) -> Result<ThermostatSnapshot, HubError>;

    /// Replace the schedule and climates of the thermostat.
    async fn update_program(&self, identifier: &str, program: &Program) -> Result<(), HubError>;

    /// The service only accepts one new climate per write, so this adds exactly one.
    async fn create_climate(&self, identifier: &str, program: &Program, climate: Climate) -> Result<(), HubError> {
        let mut program = program.clone();
        program.climates_mut().push(climate);
        self.update_program(identifier, &program).await
    }

    async fn create_vacation(&self, identifier: &str, vacation: &VacationRequest) -> Result<(), HubError>;

    async fn delete_vacation(&self, identifier: &str, name: &str) -> Result<(), HubError>;
}

#[derive(Debug)]
pub enum HubError {
    Network(reqwest::Error),
    Json(serde_json::Error),
    /// The service answered but refused the request.
    Status { code: i32, message: String },
    ThermostatNotFound(String),
    Token(String),
}

impl Display for HubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self {
            HubError::Network(e) => write!(f, "Network Error: {}", e),
            HubError::Json(e) => write!(f, "Deserialization Error: {}", e),
            HubError::Status { code, message } => write!(f, "Ecobee returned status {}: {}", code, message),
            HubError::ThermostatNotFound(name) => write!(f, "No thermostat found (wanted '{}')", name),
            HubError::Token(e) => write!(f, "Token Error: {}", e),
        }
    }
}

impl std::error::Error for HubError {}

impl From<reqwest::Error> for HubError {
    fn from(e: reqwest::Error) -> Self {
        HubError::Network(e)
    }
}

impl From<serde_json::Error> for HubError {
    fn from(e: serde_json::Error) -> Self {
        HubError::Json(e)
    }
}
