use std::time::Duration;

use log::{debug, info};

use super::model::{Climate, Program, ThermostatSnapshot, VacationRequest};
use super::{EcobeeHub, HubError};

/// One thermostat's view for the duration of a run. Every successful write waits for the
/// service to settle and then replaces the snapshot with a fresh fetch, since the service
/// does not reflect changes immediately.
pub struct ThermostatSession<'a> {
    hub: &'a dyn EcobeeHub,
    name: String,
    settle: Duration,
    snapshot: ThermostatSnapshot,
}

impl<'a> ThermostatSession<'a> {
    pub async fn open(hub: &'a dyn EcobeeHub, name: &str, settle: Duration) -> Result<Self, HubError> {
        let snapshot = hub.get_thermostat(name).await?;
        let location = snapshot.get_location();
        info!("Using thermostat '{}' ({}) in {}{}", snapshot.get_name(), snapshot.get_identifier(),
              location.get_time_zone(), if location.is_daylight_saving() { " (DST)" } else { "" });
        Ok(Self {
            hub,
            name: name.to_owned(),
            settle,
            snapshot,
        })
    }

    pub fn snapshot(&self) -> &ThermostatSnapshot {
        &self.snapshot
    }

    pub async fn refresh(&mut self) -> Result<(), HubError> {
        self.snapshot = self.hub.get_thermostat(&self.name).await?;
        Ok(())
    }

    async fn settle_and_refresh(&mut self) -> Result<(), HubError> {
        if !self.settle.is_zero() {
            debug!("Waiting {}s for the thermostat to settle", self.settle.as_secs());
            tokio::time::sleep(self.settle).await;
        }
        self.refresh().await
    }

    pub async fn write_program(&mut self, program: &Program) -> Result<(), HubError> {
        self.hub.update_program(self.snapshot.get_identifier(), program).await?;
        self.settle_and_refresh().await
    }

    pub async fn create_climate(&mut self, climate: Climate) -> Result<(), HubError> {
        self.hub.create_climate(self.snapshot.get_identifier(), self.snapshot.get_program(), climate).await?;
        self.settle_and_refresh().await
    }

    pub async fn create_vacation(&mut self, vacation: &VacationRequest) -> Result<(), HubError> {
        self.hub.create_vacation(self.snapshot.get_identifier(), vacation).await?;
        self.settle_and_refresh().await
    }

    pub async fn delete_vacation(&mut self, name: &str) -> Result<(), HubError> {
        self.hub.delete_vacation(self.snapshot.get_identifier(), name).await?;
        self.settle_and_refresh().await
    }
}
