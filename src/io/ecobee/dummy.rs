use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime};
use log::debug;
use serde_json::json;

use crate::io::dummy::{read_all, DummyIO};
use crate::time_util::slots::SLOTS_PER_DAY;

use super::model::{Climate, Event, Forecast, Program, ThermostatSnapshot, VacationRequest, Weather};
use super::{EcobeeHub, HubError};

const VALIDATION_ERROR: i32 = 3;

pub enum ModifyState {
    SetForecasts(Vec<Forecast>),
    /// The next climate to be created is given the same reference as the climate before it,
    /// like the real service occasionally does.
    DuplicateNextClimateRef,
    /// Refuse the next write with the given status code.
    RejectNextWrite(i32),
}

/// Counts of what the dummy has been asked to do.
#[derive(Default, Debug)]
pub struct DummyStats {
    program_writes: AtomicUsize,
    climates_created: AtomicUsize,
    vacations_created: AtomicUsize,
    vacations_deleted: AtomicUsize,
}

impl DummyStats {
    pub fn program_writes(&self) -> usize {
        self.program_writes.load(Ordering::SeqCst)
    }

    pub fn climates_created(&self) -> usize {
        self.climates_created.load(Ordering::SeqCst)
    }

    pub fn vacations_created(&self) -> usize {
        self.vacations_created.load(Ordering::SeqCst)
    }

    pub fn vacations_deleted(&self) -> usize {
        self.vacations_deleted.load(Ordering::SeqCst)
    }
}

struct DummyState {
    snapshot: ThermostatSnapshot,
    duplicate_next_ref: bool,
    reject_next_write: Option<i32>,
    next_ref: usize,
}

pub struct Dummy {
    receiver: Mutex<Receiver<ModifyState>>,
    state: Mutex<DummyState>,
    stats: Arc<DummyStats>,
}

impl DummyIO for Dummy {
    type MessageType = ModifyState;
    type Config = ThermostatSnapshot;

    fn new(receiver: Receiver<Self::MessageType>, config: &Self::Config) -> Self {
        Dummy {
            receiver: Mutex::new(receiver),
            state: Mutex::new(DummyState {
                snapshot: config.clone(),
                duplicate_next_ref: false,
                reject_next_write: None,
                next_ref: 1,
            }),
            stats: Arc::new(DummyStats::default()),
        }
    }
}

impl Dummy {
    pub fn stats(&self) -> Arc<DummyStats> {
        self.stats.clone()
    }

    fn update_state(&self) -> MutexGuard<'_, DummyState> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Ok(receiver) = self.receiver.lock() {
            read_all(&receiver, |message| match message {
                ModifyState::SetForecasts(forecasts) => *state.snapshot.weather_mut() = Weather::new(forecasts),
                ModifyState::DuplicateNextClimateRef => state.duplicate_next_ref = true,
                ModifyState::RejectNextWrite(code) => state.reject_next_write = Some(code),
            });
        }
        state
    }
}

impl DummyState {
    fn check_write(&mut self) -> Result<(), HubError> {
        match self.reject_next_write.take() {
            Some(code) => Err(HubError::Status { code, message: "Dummy: rejected write".to_owned() }),
            None => Ok(()),
        }
    }

    fn assign_refs(&mut self, climates: &mut [Climate]) -> usize {
        let mut created = 0;
        for idx in 0..climates.len() {
            if climates[idx].get_climate_ref().is_some() {
                continue;
            }
            let previous_ref = idx.checked_sub(1)
                .and_then(|prev| climates[prev].get_climate_ref())
                .map(|s| s.to_owned());
            let climate_ref = match previous_ref {
                Some(previous) if self.duplicate_next_ref => {
                    self.duplicate_next_ref = false;
                    previous
                }
                _ => {
                    self.next_ref += 1;
                    format!("smart{}", self.next_ref)
                }
            };
            debug!("Dummy: assigned {} to new climate {}", climate_ref, climates[idx].get_name());
            climates[idx].set_climate_ref(climate_ref);
            created += 1;
        }
        created
    }
}

fn validate_schedule(program: &Program) -> Result<(), HubError> {
    let known: HashSet<&str> = program.get_climates().iter()
        .filter_map(|climate| climate.get_climate_ref())
        .collect();
    let schedule = program.get_schedule();
    if !schedule.is_empty() && (schedule.len() != 7 || schedule.iter().any(|day| day.len() != SLOTS_PER_DAY)) {
        return Err(HubError::Status { code: VALIDATION_ERROR, message: "Schedule must be 7x48".to_owned() });
    }
    if let Some(unknown) = schedule.iter().flatten().find(|slot| !known.contains(slot.as_str())) {
        return Err(HubError::Status {
            code: VALIDATION_ERROR,
            message: format!("Schedule references unknown climate {}", unknown),
        });
    }
    Ok(())
}

#[async_trait]
impl EcobeeHub for Dummy {
    async fn get_thermostat(&self, _name: &str) -> Result<ThermostatSnapshot, HubError> {
        Ok(self.update_state().snapshot.clone())
    }

    async fn update_program(&self, identifier: &str, program: &Program) -> Result<(), HubError> {
        let mut state = self.update_state();
        state.check_write()?;
        let mut program = program.clone();
        let created = state.assign_refs(program.climates_mut());
        validate_schedule(&program)?;
        debug!("Dummy: updating program of {}", identifier);
        *state.snapshot.program_mut() = program;
        self.stats.program_writes.fetch_add(1, Ordering::SeqCst);
        self.stats.climates_created.fetch_add(created, Ordering::SeqCst);
        Ok(())
    }

    async fn create_vacation(&self, _identifier: &str, vacation: &VacationRequest) -> Result<(), HubError> {
        let mut state = self.update_state();
        state.check_write()?;
        state.snapshot.events_mut().push(Event::vacation(vacation.get_name()));
        self.stats.vacations_created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_vacation(&self, _identifier: &str, name: &str) -> Result<(), HubError> {
        let mut state = self.update_state();
        state.check_write()?;
        state.snapshot.events_mut().retain(|event| event.get_name() != name);
        self.stats.vacations_deleted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Five days of forecasts starting today, all with the same high.
pub fn forecasts_from(today: NaiveDate, temp_high: i32) -> Vec<Forecast> {
    (0..5)
        .map(|offset| Forecast::new((today + Duration::days(offset)).and_time(NaiveTime::MIN), temp_high))
        .collect()
}

/// A thermostat with only the stock sleep/away/home climates and a plain schedule.
pub fn sample_snapshot(today: NaiveDate, temp_high: i32) -> ThermostatSnapshot {
    let sensors = vec![json!({"id": "ei:0:1", "name": "Home"})];
    let climates = vec![
        Climate::new("Sleep".to_owned(), Some("sleep".to_owned()), Some(760)).with_sensors(sensors),
        Climate::new("Away".to_owned(), Some("away".to_owned()), Some(820)),
        Climate::new("Home".to_owned(), Some("home".to_owned()), Some(780)),
    ];
    let day: Vec<String> = (0..SLOTS_PER_DAY)
        .map(|slot| if (12..44).contains(&slot) { "home" } else { "sleep" }.to_owned())
        .collect();
    ThermostatSnapshot::new(
        "318324702718".to_owned(),
        "Home".to_owned(),
        Program::new(vec![day; 7], climates),
        Weather::new(forecasts_from(today, temp_high)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_util::test_utils::date;

    fn new_dummy() -> (Dummy, std::sync::mpsc::Sender<ModifyState>) {
        Dummy::create(&sample_snapshot(date(2021, 7, 7), 950))
    }

    #[tokio::test]
    async fn test_new_climates_get_refs() {
        let (dummy, _sender) = new_dummy();
        let snapshot = dummy.get_thermostat("Home").await.unwrap();
        dummy.create_climate(snapshot.get_identifier(), snapshot.get_program(), Climate::new_user_climate("sleep0", vec![]))
            .await
            .unwrap();

        let snapshot = dummy.get_thermostat("Home").await.unwrap();
        assert_eq!(snapshot.get_program().climate_ref("sleep0"), Some("smart2"));
        assert_eq!(dummy.stats().climates_created(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_ref() {
        let (dummy, sender) = new_dummy();
        sender.send(ModifyState::DuplicateNextClimateRef).unwrap();
        let snapshot = dummy.get_thermostat("Home").await.unwrap();
        dummy.create_climate(snapshot.get_identifier(), snapshot.get_program(), Climate::new_user_climate("sleep0", vec![]))
            .await
            .unwrap();

        let snapshot = dummy.get_thermostat("Home").await.unwrap();
        assert_eq!(snapshot.get_program().climate_ref("sleep0"), Some("home"), "Should copy the previous climate's ref");
    }

    #[tokio::test]
    async fn test_rejects_unknown_schedule_refs() {
        let (dummy, _sender) = new_dummy();
        let snapshot = dummy.get_thermostat("Home").await.unwrap();
        let mut program = snapshot.get_program().clone();
        let mut schedule = program.get_schedule().clone();
        schedule[2][5] = "nope".to_owned();
        program.set_schedule(schedule);

        let result = dummy.update_program(snapshot.get_identifier(), &program).await;
        assert!(matches!(result, Err(HubError::Status { code: VALIDATION_ERROR, .. })));
        assert_eq!(dummy.stats().program_writes(), 0);
    }

    #[tokio::test]
    async fn test_rejected_write() {
        let (dummy, sender) = new_dummy();
        sender.send(ModifyState::RejectNextWrite(14)).unwrap();
        let request = VacationRequest::new("x".to_owned(), 770, 450, date(2021, 7, 4).and_time(NaiveTime::MIN), date(2021, 7, 5).and_time(NaiveTime::MIN));
        assert!(matches!(dummy.create_vacation("id", &request).await, Err(HubError::Status { code: 14, .. })));
        dummy.create_vacation("id", &request).await.expect("Only the first write should be rejected");
        assert!(dummy.get_thermostat("Home").await.unwrap().event_exists("x"));
    }
}
