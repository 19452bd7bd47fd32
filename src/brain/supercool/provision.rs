use std::fmt::{Display, Formatter};

use log::{debug, info, warn};

use crate::io::ecobee::model::{Climate, Program};
use crate::io::ecobee::session::ThermostatSession;
use crate::io::ecobee::HubError;

#[derive(Debug)]
pub enum ProvisionError {
    ClimateCreationFailed { name: String, attempts: usize },
    /// There is no existing climate to copy sensors from.
    NoTemplateClimate,
    Hub(HubError),
}

impl Display for ProvisionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisionError::ClimateCreationFailed { name, attempts } => {
                write!(f, "Failed to create climate {} after {} attempts", name, attempts)
            }
            ProvisionError::NoTemplateClimate => write!(f, "Thermostat has no climates to copy sensors from"),
            ProvisionError::Hub(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProvisionError {}

impl From<HubError> for ProvisionError {
    fn from(e: HubError) -> Self {
        ProvisionError::Hub(e)
    }
}

/// Index of the first climate whose reference matches either of the two climates before it.
/// The thermostat sometimes hands a new climate an existing reference.
pub fn find_duplicate_ref(climates: &[Climate]) -> Option<usize> {
    (1..climates.len()).find(|&idx| {
        let climate_ref = climates[idx].get_climate_ref();
        let previous = (idx.saturating_sub(2)..idx)
            .map(|prev| climates[prev].get_climate_ref());
        climate_ref.is_some() && previous.into_iter().any(|prev| prev == climate_ref)
    })
}

/// Make sure every named climate exists, creating the missing ones one at a time.
/// Returns how many were created.
pub async fn ensure_climates(
    session: &mut ThermostatSession<'_>,
    required: &[String],
    max_attempts: usize,
) -> Result<usize, ProvisionError> {
    let mut created = 0;

    for name in required {
        if session.snapshot().get_program().find_climate(name).is_some() {
            debug!("Climate already exists: {}", name);
            continue;
        }
        create_climate(session, name, max_attempts).await?;
        info!("Successfully created climate: {}", name);
        created += 1;
    }

    Ok(created)
}

async fn create_climate(session: &mut ThermostatSession<'_>, name: &str, max_attempts: usize) -> Result<(), ProvisionError> {
    for attempt in 1..=max_attempts {
        let sensors = session.snapshot().get_program().get_climates()
            .first()
            .ok_or(ProvisionError::NoTemplateClimate)?
            .get_sensors()
            .to_vec();
        session.create_climate(Climate::new_user_climate(name, sensors)).await?;

        let program = session.snapshot().get_program();
        match find_duplicate_ref(program.get_climates()) {
            Some(idx) => {
                warn!("Duplicate climateRef found on {} after creating {} (attempt {}/{})",
                      program.get_climates()[idx].get_name(), name, attempt, max_attempts);
                let without = without_climate(program, name);
                session.write_program(&without).await?;
            }
            None if program.find_climate(name).is_some() => return Ok(()),
            None => warn!("Climate {} missing after creating it (attempt {}/{})", name, attempt, max_attempts),
        }
    }

    Err(ProvisionError::ClimateCreationFailed {
        name: name.to_owned(),
        attempts: max_attempts,
    })
}

fn without_climate(program: &Program, name: &str) -> Program {
    let climates = program.get_climates().iter()
        .filter(|climate| !climate.get_name().eq_ignore_ascii_case(name))
        .cloned()
        .collect();
    Program::new(program.get_schedule().clone(), climates)
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::Sender;
    use std::time::Duration;

    use super::*;
    use crate::io::dummy::DummyIO;
    use crate::io::ecobee::dummy::{sample_snapshot, Dummy, ModifyState};
    use crate::io::ecobee::EcobeeHub;
    use crate::time_util::test_utils::date;

    fn climate(name: &str, climate_ref: &str) -> Climate {
        Climate::new(name.to_owned(), Some(climate_ref.to_owned()), None)
    }

    fn names(prefix: &str, days: std::ops::Range<usize>) -> Vec<String> {
        days.map(|day| format!("{}{}", prefix, day)).collect()
    }

    #[test]
    fn test_find_duplicate_ref() {
        assert_eq!(find_duplicate_ref(&[]), None);
        assert_eq!(find_duplicate_ref(&[climate("a", "x"), climate("b", "y"), climate("c", "z")]), None);
        assert_eq!(find_duplicate_ref(&[climate("a", "x"), climate("b", "x")]), Some(1));
        assert_eq!(find_duplicate_ref(&[climate("a", "x"), climate("b", "y"), climate("c", "x")]), Some(2));
        assert_eq!(find_duplicate_ref(&[climate("a", "x"), climate("b", "y"), climate("c", "z"), climate("d", "x")]), None,
                   "Only the two previous climates are compared");
    }

    async fn seeded(existing: &[String]) -> Dummy {
        seeded_with_handle(existing).await.0
    }

    async fn seeded_with_handle(existing: &[String]) -> (Dummy, Sender<ModifyState>) {
        let (dummy, sender) = Dummy::create(&sample_snapshot(date(2021, 7, 7), 950));
        let snapshot = dummy.get_thermostat("Home").await.unwrap();
        for name in existing {
            let program = dummy.get_thermostat("Home").await.unwrap().get_program().clone();
            dummy.create_climate(snapshot.get_identifier(), &program, Climate::new_user_climate(name, vec![])).await.unwrap();
        }
        (dummy, sender)
    }

    #[tokio::test]
    async fn test_creates_missing() {
        let dummy = seeded(&names("sleep", 0..4)).await;
        let stats = dummy.stats();
        let writes_before = stats.program_writes();

        let mut session = ThermostatSession::open(&dummy, "Home", Duration::ZERO).await.unwrap();
        let created = ensure_climates(&mut session, &names("sleep", 0..7), 3).await.unwrap();

        assert_eq!(created, 3);
        assert_eq!(stats.program_writes() - writes_before, 3);
        let program = session.snapshot().get_program();
        assert!(names("sleep", 0..7).iter().all(|name| program.find_climate(name).is_some()));
        let sensors = program.find_climate("sleep6").unwrap().get_sensors();
        assert_eq!(sensors, program.get_climates()[0].get_sensors(), "Sensors come from the first climate");
    }

    #[tokio::test]
    async fn test_nothing_to_create() {
        let dummy = seeded(&names("sleep", 0..2)).await;
        let mut session = ThermostatSession::open(&dummy, "Home", Duration::ZERO).await.unwrap();
        let created = ensure_climates(&mut session, &names("SLEEP", 0..2), 3).await.unwrap();
        assert_eq!(created, 0, "Names should match regardless of case");
    }

    #[tokio::test]
    async fn test_duplicate_retried_once() {
        let (dummy, sender) = Dummy::create(&sample_snapshot(date(2021, 7, 7), 950));
        sender.send(ModifyState::DuplicateNextClimateRef).unwrap();
        let stats = dummy.stats();

        let mut session = ThermostatSession::open(&dummy, "Home", Duration::ZERO).await.unwrap();
        let created = ensure_climates(&mut session, &names("sleep", 0..2), 3).await.unwrap();

        assert_eq!(created, 2);
        // Two creations, one removal of the defective climate, one retry.
        assert_eq!(stats.program_writes(), 4);
        assert_eq!(stats.climates_created(), 3);
        let program = session.snapshot().get_program();
        assert_eq!(find_duplicate_ref(program.get_climates()), None);
        assert_eq!(program.get_climates().iter().filter(|c| c.get_name() == "sleep0").count(), 1);
    }

    #[tokio::test]
    async fn test_creates_missing_with_duplicate() {
        let (dummy, sender) = seeded_with_handle(&names("sleep", 0..4)).await;
        let stats = dummy.stats();
        let writes_before = stats.program_writes();
        let created_before = stats.climates_created();
        sender.send(ModifyState::DuplicateNextClimateRef).unwrap();

        let mut session = ThermostatSession::open(&dummy, "Home", Duration::ZERO).await.unwrap();
        let created = ensure_climates(&mut session, &names("sleep", 0..7), 3).await.unwrap();

        assert_eq!(created, 3);
        // sleep4 is created twice, with the defective copy removed in between.
        assert_eq!(stats.climates_created() - created_before, 4);
        assert_eq!(stats.program_writes() - writes_before, 5);
        let program = session.snapshot().get_program();
        assert_eq!(find_duplicate_ref(program.get_climates()), None);
        for name in names("sleep", 0..7) {
            assert_eq!(program.get_climates().iter().filter(|c| c.get_name() == name).count(), 1, "{} once", name);
        }
    }

    #[tokio::test]
    async fn test_gives_up() {
        let (dummy, sender) = Dummy::create(&sample_snapshot(date(2021, 7, 7), 950));
        sender.send(ModifyState::DuplicateNextClimateRef).unwrap();
        let mut session = ThermostatSession::open(&dummy, "Home", Duration::ZERO).await.unwrap();
        let result = ensure_climates(&mut session, &names("away", 0..1), 1).await;
        assert!(matches!(result, Err(ProvisionError::ClimateCreationFailed { attempts: 1, .. })));
    }

    #[tokio::test]
    async fn test_rejected_create() {
        let (dummy, sender) = Dummy::create(&sample_snapshot(date(2021, 7, 7), 950));
        sender.send(ModifyState::RejectNextWrite(3)).unwrap();
        let mut session = ThermostatSession::open(&dummy, "Home", Duration::ZERO).await.unwrap();
        let result = ensure_climates(&mut session, &names("home", 0..1), 3).await;
        assert!(matches!(result, Err(ProvisionError::Hub(HubError::Status { code: 3, .. }))));
    }
}
