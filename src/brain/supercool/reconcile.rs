use std::collections::BTreeMap;

use log::{debug, warn};

use crate::io::ecobee::model::Program;
use crate::time_util::days::{DaySet, WeekdayRange};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UpdateDecision {
    /// Some requested days are outside the time of use window and updates are restricted to it.
    Refused,
    UpToDate,
    Required,
}

/// Whether the thermostat needs a write to match the candidate schedule and cool setpoints.
/// Days are judged as a whole batch: one day outside the window refuses (or, unrestricted,
/// only warns about) the entire update.
pub fn decide(
    candidate_schedule: &[Vec<String>],
    candidate_temps: &BTreeMap<String, i32>,
    live: &Program,
    day_set: &DaySet,
    time_of_use: &WeekdayRange,
    restricted: bool,
) -> UpdateDecision {
    if !time_of_use.covers(day_set) {
        if restricted {
            warn!("One or more days to set ({}) fall outside the time of use days ({}), \
                   time of use is restricted so not updating", day_set, time_of_use);
            return UpdateDecision::Refused;
        }
        warn!("One or more days to set ({}) fall outside the time of use days ({}), updating anyway",
              day_set, time_of_use);
    }

    if candidate_schedule != live.get_schedule().as_slice() {
        debug!("Schedule differs from the thermostat");
        return UpdateDecision::Required;
    }

    for (climate_ref, temp) in candidate_temps {
        let live_temp = live.get_climates().iter()
            .find(|climate| climate.get_climate_ref() == Some(climate_ref.as_str()))
            .and_then(|climate| climate.get_cool_temp());
        if live_temp != Some(*temp) {
            debug!("Climate {} is at {:?}, wanted {}", climate_ref, live_temp, temp);
            return UpdateDecision::Required;
        }
    }

    debug!("Schedule and climates already up to date");
    UpdateDecision::UpToDate
}

pub fn needs_update(
    candidate_schedule: &[Vec<String>],
    candidate_temps: &BTreeMap<String, i32>,
    live: &Program,
    day_set: &DaySet,
    time_of_use: &WeekdayRange,
    restricted: bool,
) -> bool {
    decide(candidate_schedule, candidate_temps, live, day_set, time_of_use, restricted) == UpdateDecision::Required
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ecobee::model::Climate;

    fn live() -> Program {
        let mut schedule = vec![vec!["sleep".to_owned(); 48]; 7];
        schedule[3][30] = "away".to_owned();
        Program::new(schedule, vec![
            Climate::new("Sleep".to_owned(), Some("sleep".to_owned()), Some(760)),
            Climate::new("Away".to_owned(), Some("away".to_owned()), Some(820)),
        ])
    }

    fn temps(pairs: &[(&str, i32)]) -> BTreeMap<String, i32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn weekdays() -> WeekdayRange {
        WeekdayRange::new(0, 4).unwrap()
    }

    #[test]
    fn test_up_to_date() {
        let live = live();
        let days: DaySet = [3].into_iter().collect();
        let decision = decide(live.get_schedule(), &temps(&[("sleep", 760), ("away", 820)]), &live, &days, &weekdays(), true);
        assert_eq!(decision, UpdateDecision::UpToDate);
    }

    #[test]
    fn test_single_slot_differs() {
        let live = live();
        let mut schedule = live.get_schedule().clone();
        schedule[3][31] = "away".to_owned();
        let days: DaySet = [3].into_iter().collect();
        assert!(needs_update(&schedule, &temps(&[]), &live, &days, &weekdays(), true));
    }

    #[test]
    fn test_single_setpoint_differs() {
        let live = live();
        let days: DaySet = [3].into_iter().collect();
        assert!(needs_update(live.get_schedule(), &temps(&[("sleep", 760), ("away", 821)]), &live, &days, &weekdays(), true));
    }

    #[test]
    fn test_unknown_climate_needs_update() {
        let live = live();
        let days: DaySet = [3].into_iter().collect();
        assert!(needs_update(live.get_schedule(), &temps(&[("smart9", 700)]), &live, &days, &weekdays(), true));
    }

    #[test]
    fn test_partial_overlap_restricted() {
        let live = live();
        let mut schedule = live.get_schedule().clone();
        schedule[4][0] = "away".to_owned();
        let days: DaySet = [4, 5].into_iter().collect();
        assert_eq!(decide(&schedule, &temps(&[]), &live, &days, &weekdays(), true), UpdateDecision::Refused);
    }

    #[test]
    fn test_partial_overlap_unrestricted() {
        let live = live();
        let mut schedule = live.get_schedule().clone();
        schedule[4][0] = "away".to_owned();
        let days: DaySet = [4, 5].into_iter().collect();
        assert_eq!(decide(&schedule, &temps(&[]), &live, &days, &weekdays(), false), UpdateDecision::Required);
        assert_eq!(decide(live.get_schedule(), &temps(&[]), &live, &days, &weekdays(), false), UpdateDecision::UpToDate);
    }
}
