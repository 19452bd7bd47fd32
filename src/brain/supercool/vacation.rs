use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::{error, info, warn};

use crate::config::HolidayConfig;
use crate::io::ecobee::model::VacationRequest;
use crate::io::ecobee::session::ThermostatSession;
use crate::io::ecobee::HubError;

/// 45F, low enough that the heating never comes on.
const HOLIDAY_HEAT_HOLD: i32 = 450;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum VacationOutcome {
    Created,
    InPast,
    AlreadyExists,
}

#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub struct VacationSummary {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// The off-peak hold for a holiday. It starts the evening before so the night is not cooled for
/// a time of use day that isn't one.
pub fn holiday_request(date: NaiveDate, holidays: &HolidayConfig) -> VacationRequest {
    VacationRequest::new(
        date.format("%Y-%m-%d").to_string(),
        holidays.get_cool_temp() * 10,
        HOLIDAY_HEAT_HOLD,
        (date - Duration::days(1)).and_time(holidays.get_start_time()),
        date.and_time(holidays.get_end_time()),
    )
}

pub async fn create_vacation(
    session: &mut ThermostatSession<'_>,
    request: &VacationRequest,
    replace_existing: bool,
    now: NaiveDateTime,
) -> Result<VacationOutcome, HubError> {
    let name = request.get_name();
    if request.get_end() < now {
        info!("Off-peak vacation \"{}\" occurs in the past, skipping creation", name);
        return Ok(VacationOutcome::InPast);
    }

    if session.snapshot().event_exists(name) {
        if !replace_existing {
            info!("Off-peak vacation \"{}\" already exists", name);
            return Ok(VacationOutcome::AlreadyExists);
        }
        info!("Off-peak vacation \"{}\" already exists, deleting existing vacation", name);
        delete_vacation(session, name).await?;
    }

    info!("Creating off-peak vacation \"{}\" from {} to {}", name, request.get_start(), request.get_end());
    session.create_vacation(request).await?;
    Ok(VacationOutcome::Created)
}

/// Returns false if there was no vacation to delete.
pub async fn delete_vacation(session: &mut ThermostatSession<'_>, name: &str) -> Result<bool, HubError> {
    if !session.snapshot().event_exists(name) {
        info!("Off-peak vacation \"{}\" does not exist, nothing to do", name);
        return Ok(false);
    }
    session.delete_vacation(name).await?;
    info!("Deleted off-peak vacation \"{}\"", name);
    Ok(true)
}

/// Create a vacation for each configured holiday. Failures are logged and don't stop the rest.
pub async fn create_holiday_vacations(
    session: &mut ThermostatSession<'_>,
    holidays: &HolidayConfig,
    now: NaiveDateTime,
) -> VacationSummary {
    let mut summary = VacationSummary::default();
    for date in holidays.get_dates() {
        let request = holiday_request(*date, holidays);
        match create_vacation(session, &request, holidays.should_replace_existing(), now).await {
            Ok(VacationOutcome::Created) => summary.created += 1,
            Ok(_) => summary.skipped += 1,
            Err(e) => {
                error!("Failure creating off-peak vacation \"{}\": {}", request.get_name(), e);
                summary.failed += 1;
            }
        }
    }
    if summary.failed > 0 {
        warn!("{} holiday vacation(s) could not be created", summary.failed);
    }
    summary
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use super::*;
    use crate::io::dummy::DummyIO;
    use crate::io::ecobee::dummy::{sample_snapshot, Dummy, ModifyState};
    use crate::time_util::test_utils::{date, local, time};

    fn holidays(dates: Vec<NaiveDate>, replace_existing: bool) -> HolidayConfig {
        HolidayConfig::new(dates, 77, time(20, 0, 0), time(20, 0, 0), replace_existing)
    }

    #[test]
    fn test_holiday_request() {
        let request = holiday_request(date(2021, 7, 5), &holidays(vec![], false));
        assert_eq!(request.get_name(), "2021-07-05");
        assert_eq!(request.get_start(), local(2021, 7, 4, 20, 0));
        assert_eq!(request.get_end(), local(2021, 7, 5, 20, 0));
        assert_eq!(request.get_cool_hold_temp(), 770);
        assert_eq!(request.to_params()["heatHoldTemp"], 450);
    }

    #[tokio::test]
    async fn test_holidays() {
        let (dummy, _sender) = Dummy::create(&sample_snapshot(date(2021, 7, 7), 950));
        let stats = dummy.stats();
        let mut session = ThermostatSession::open(&dummy, "Home", StdDuration::ZERO).await.unwrap();
        let config = holidays(vec![date(2021, 7, 5), date(2021, 9, 6), date(2021, 11, 11)], false);

        let summary = create_holiday_vacations(&mut session, &config, local(2021, 7, 7, 18, 0)).await;
        assert_eq!(summary, VacationSummary { created: 2, skipped: 1, failed: 0 });
        assert!(session.snapshot().event_exists("2021-09-06"));
        assert!(!session.snapshot().event_exists("2021-07-05"));

        let summary = create_holiday_vacations(&mut session, &config, local(2021, 7, 7, 18, 0)).await;
        assert_eq!(summary, VacationSummary { created: 0, skipped: 3, failed: 0 });
        assert_eq!(stats.vacations_created(), 2);
    }

    #[tokio::test]
    async fn test_replace_existing() {
        let (dummy, _sender) = Dummy::create(&sample_snapshot(date(2021, 7, 7), 950));
        let stats = dummy.stats();
        let mut session = ThermostatSession::open(&dummy, "Home", StdDuration::ZERO).await.unwrap();
        let config = holidays(vec![date(2021, 9, 6)], true);

        create_holiday_vacations(&mut session, &config, local(2021, 7, 7, 18, 0)).await;
        let summary = create_holiday_vacations(&mut session, &config, local(2021, 7, 7, 18, 0)).await;

        assert_eq!(summary.created, 1);
        assert_eq!(stats.vacations_deleted(), 1);
        assert_eq!(stats.vacations_created(), 2);
        assert_eq!(session.snapshot().get_events().len(), 1);
        assert_eq!(session.snapshot().get_events()[0].get_type(), "vacation");
    }

    #[tokio::test]
    async fn test_failure_continues() {
        let (dummy, sender) = Dummy::create(&sample_snapshot(date(2021, 7, 7), 950));
        sender.send(ModifyState::RejectNextWrite(2)).unwrap();
        let mut session = ThermostatSession::open(&dummy, "Home", StdDuration::ZERO).await.unwrap();
        let config = holidays(vec![date(2021, 9, 6), date(2021, 11, 11)], false);

        let summary = create_holiday_vacations(&mut session, &config, local(2021, 7, 7, 18, 0)).await;
        assert_eq!(summary, VacationSummary { created: 1, skipped: 0, failed: 1 });
        assert!(session.snapshot().event_exists("2021-11-11"));
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let (dummy, _sender) = Dummy::create(&sample_snapshot(date(2021, 7, 7), 950));
        let mut session = ThermostatSession::open(&dummy, "Home", StdDuration::ZERO).await.unwrap();
        assert!(!delete_vacation(&mut session, "2021-12-24").await.unwrap());
    }
}
