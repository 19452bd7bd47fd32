use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use super::model::{Program, StatusResponse, ThermostatResponse, ThermostatSnapshot, VacationRequest};
use super::{EcobeeHub, HubError};

pub const ECOBEE_API: &str = "https://api.ecobee.com";

/// Tokens written by whatever authorised this application with ecobee.
#[derive(Deserialize, Debug)]
pub struct StoredTokens {
    access_token: String,
    #[serde(default)]
    access_token_expires_on: Option<DateTime<Utc>>,
}

impl StoredTokens {
    pub fn load(path: &Path) -> Result<Self, HubError> {
        let data = fs::read_to_string(path)
            .map_err(|e| HubError::Token(format!("Error reading {:?}: {}", path, e)))?;
        let tokens: StoredTokens = serde_json::from_str(&data)
            .map_err(|e| HubError::Token(format!("Error deserializing {:?}: {}", path, e)))?;
        if let Some(expires) = tokens.access_token_expires_on {
            if expires < Utc::now() {
                warn!("Access token in {:?} expired at {}, requests will probably be refused", path, expires);
            }
        }
        Ok(tokens)
    }
}

pub struct ApiEcobeeHub {
    base_url: String,
    access_token: String,
    client: Client,
}

impl ApiEcobeeHub {
    pub fn new(base_url: String, tokens: StoredTokens) -> Self {
        Self {
            base_url,
            access_token: tokens.access_token,
            client: Client::new(),
        }
    }

    fn new_request(&self, method: Method, location: &str) -> RequestBuilder {
        self.client.request(method, format!("{}/1/{}", self.base_url, location))
            .bearer_auth(&self.access_token)
            .header("Content-Type", "application/json;charset=UTF-8")
            .timeout(Duration::from_secs(30))
    }

    async fn post(&self, body: Value) -> Result<(), HubError> {
        trace!("POST thermostat {}", body);
        let text = self.new_request(Method::POST, "thermostat")
            .query(&[("format", "json")])
            .json(&body)
            .send().await?
            .text().await?;
        let response: StatusResponse = serde_json::from_str(&text)?;
        check_status(response.status.get_code(), response.status.get_message())
    }
}

fn check_status(code: i32, message: &str) -> Result<(), HubError> {
    if code == 0 {
        Ok(())
    } else {
        Err(HubError::Status { code, message: message.to_owned() })
    }
}

fn thermostat_selection(identifier: &str) -> Value {
    json!({
        "selectionType": "thermostats",
        "selectionMatch": identifier,
    })
}

#[async_trait]
impl EcobeeHub for ApiEcobeeHub {
    async fn get_thermostat(&self, name: &str) -> Result<ThermostatSnapshot, HubError> {
        let body = json!({
            "selection": {
                "selectionType": "registered",
                "selectionMatch": "",
                "includeProgram": true,
                "includeWeather": true,
                "includeLocation": true,
                "includeEvents": true,
            }
        });
        let text = self.new_request(Method::GET, "thermostat")
            .query(&[("format", "json".to_owned()), ("body", body.to_string())])
            .send().await?
            .text().await?;
        let response: ThermostatResponse = serde_json::from_str(&text)?;
        check_status(response.status.get_code(), response.status.get_message())?;
        pick_thermostat(response.thermostat_list, name)
    }

    async fn update_program(&self, identifier: &str, program: &Program) -> Result<(), HubError> {
        debug!("Updating program of thermostat {}", identifier);
        self.post(json!({
            "selection": thermostat_selection(identifier),
            "thermostat": { "program": program },
        })).await
    }

    async fn create_vacation(&self, identifier: &str, vacation: &VacationRequest) -> Result<(), HubError> {
        self.post(json!({
            "selection": thermostat_selection(identifier),
            "functions": [{ "type": "createVacation", "params": vacation.to_params() }],
        })).await
    }

    async fn delete_vacation(&self, identifier: &str, name: &str) -> Result<(), HubError> {
        self.post(json!({
            "selection": thermostat_selection(identifier),
            "functions": [{ "type": "deleteVacation", "params": { "name": name } }],
        })).await
    }
}

fn pick_thermostat(thermostats: Vec<ThermostatSnapshot>, name: &str) -> Result<ThermostatSnapshot, HubError> {
    let index = thermostats.iter()
        .position(|thermostat| thermostat.get_name() == name)
        .unwrap_or_else(|| {
            if !thermostats.is_empty() {
                warn!("No thermostat named '{}', using the first one", name);
            }
            0
        });
    thermostats.into_iter()
        .nth(index)
        .ok_or_else(|| HubError::ThermostatNotFound(name.to_owned()))
}
