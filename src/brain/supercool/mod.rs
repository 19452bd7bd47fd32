use log::{debug, error, info, warn};
use tokio::runtime::Runtime;

use crate::brain::{Brain, BrainFailure, Stage};
use crate::brain_fail;
use crate::config::Config;
use crate::io::ecobee::session::ThermostatSession;
use crate::io::notify::Notifications;
use crate::io::IOBundle;
use crate::time_util::days::DaySet;
use crate::time_util::mytime::TimeProvider;

use forecast::ForecastView;
use program::{required_climate_names, synthesize, Synthesis, WeekProgram};
use provision::ensure_climates;
use reconcile::{decide, UpdateDecision};
use vacation::create_holiday_vacations;

pub mod bands;
pub mod forecast;
pub mod program;
pub mod provision;
pub mod reconcile;
pub mod vacation;


/// Makes sure the per-day climates exist, programs the requested days from tomorrow's
/// forecast and sets up holiday vacations. Runs once per invocation.
pub struct SupercoolBrain {
    config: Config,
}

impl SupercoolBrain {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    async fn run_async(&self, io_bundle: &IOBundle, time_provider: &impl TimeProvider) -> Result<(), BrainFailure> {
        let thermostat = self.config.get_thermostat();
        let supercool = self.config.get_supercool();
        let notifications = io_bundle.notifications();

        let mut session = ThermostatSession::open(io_bundle.ecobee(), thermostat.get_name(), thermostat.get_settle_time())
            .await
            .map_err(|e| brain_fail!(format!("Failed to fetch thermostat: {}", e), Stage::Fetch))?;

        let forecast = ForecastView::from_weather(session.snapshot().get_weather(), time_provider);
        let day_set = supercool.get_days().resolve(forecast.get_tomorrow());
        info!("Days to set: {} (tomorrow's forecast high: {})", day_set, forecast.get_forecast_high());

        let required = required_climate_names(supercool.get_climate_prefixes(), &day_set);
        match ensure_climates(&mut session, &required, thermostat.get_climate_create_attempts()).await {
            Ok(0) => info!("All climates already exist, nothing to create."),
            Ok(created) => {
                notifications.send("Ecobee Climate Creation (Success)",
                                   &format!("Successfully created {} new thermostat climates.", created)).await;
            }
            Err(e) => {
                notifications.send("Ecobee Climate Creation (Failure)",
                                   &format!("Failure creating thermostat climates: {}", e)).await;
                return Err(brain_fail!(e, Stage::Provisioning));
            }
        }

        let in_season = supercool.get_months().contains_date(time_provider.today());
        let synthesis = synthesize(supercool.rules(), &day_set, &forecast, in_season, session.snapshot().get_program())
            .map_err(|e| brain_fail!(e, Stage::Synthesis))?;

        match synthesis {
            Synthesis::Program(week) => self.update_schedule(&mut session, notifications, &week, &day_set).await?,
            Synthesis::BelowCutoff { manual_intervention: true } => {
                notifications.send("Ecobee manual intervention needed",
                                   &format!("Tomorrow's forecast high of {} is below the supercool cutoff, \
                                             the schedule for {} was not changed.",
                                            forecast.get_forecast_high() as f32 / 10.0, day_set)).await;
            }
            other => debug!("No program values, nothing to do ({:?})", other),
        }

        let summary = create_holiday_vacations(&mut session, self.config.get_holidays(), time_provider.get_local_time()).await;
        debug!("Holiday vacations: {:?}", summary);
        if summary.failed > 0 {
            return Err(brain_fail!(format!("{} holiday vacation(s) failed", summary.failed), Stage::VacationWrite));
        }
        Ok(())
    }

    async fn update_schedule(
        &self,
        session: &mut ThermostatSession<'_>,
        notifications: &Notifications,
        week: &WeekProgram,
        day_set: &DaySet,
    ) -> Result<(), BrainFailure> {
        let supercool = self.config.get_supercool();
        let live = session.snapshot().get_program();
        let candidate = week.apply_to(live)
            .map_err(|e| brain_fail!(e, Stage::Synthesis))?;

        let decision = decide(
            candidate.get_schedule(),
            &week.climate_temps(),
            live,
            day_set,
            supercool.get_time_of_use_days(),
            supercool.is_time_of_use_restricted(),
        );
        match decision {
            UpdateDecision::Refused => warn!("Not updating the thermostat schedule."),
            UpdateDecision::UpToDate => info!("The schedule is already up to date, nothing to do."),
            UpdateDecision::Required => {
                info!("Updating thermostat schedule...");
                match session.write_program(&candidate).await {
                    Ok(()) => {
                        notifications.send("Ecobee schedule (Success)", "Successfully updated thermostat schedule.").await;
                    }
                    Err(e) => {
                        error!("Failure updating thermostat schedule: {}", e);
                        notifications.send("Ecobee schedule (Failure)",
                                           &format!("Failure updating thermostat schedule: {}", e)).await;
                        return Err(brain_fail!(e, Stage::ScheduleWrite));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Brain for SupercoolBrain {
    fn run(&mut self, runtime: &Runtime, io_bundle: &mut IOBundle, time_provider: &impl TimeProvider) -> Result<(), BrainFailure> {
        runtime.block_on(self.run_async(io_bundle, time_provider))
    }
}
