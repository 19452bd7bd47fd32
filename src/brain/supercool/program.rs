use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use itertools::Itertools;
use log::{debug, info, warn};

use crate::io::ecobee::model::Program;
use crate::time_util::days::{day_name, previous_day, DaySet, WeekdayRange, DAYS_PER_WEEK};
use crate::time_util::slots::{slot_of, slot_range, SlotError, SLOTS_PER_DAY};

use super::bands::{BandTable, Tier};
use super::forecast::ForecastView;

/// Climate reference used to fill a week when the thermostat has no usable schedule.
pub const DEFAULT_CLIMATE: &str = "sleep";

#[derive(Debug, PartialEq)]
pub enum SynthesisError {
    /// Days were requested but none of them ended up with a program.
    AllDaysEmptyAfterSynthesis,
    /// A per-day climate has not been created on the thermostat.
    UnknownClimate(String),
    Slot(SlotError),
}

impl Display for SynthesisError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisError::AllDaysEmptyAfterSynthesis => write!(f, "No program values produced for any requested day"),
            SynthesisError::UnknownClimate(name) => write!(f, "Climate '{}' does not exist on the thermostat", name),
            SynthesisError::Slot(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SynthesisError {}

impl From<SlotError> for SynthesisError {
    fn from(e: SlotError) -> Self {
        SynthesisError::Slot(e)
    }
}

/// Everything about the rules that stays fixed for a run.
#[derive(Clone, Copy)]
pub struct SynthesisRules<'a> {
    pub bands: &'a BandTable,
    /// One per tier, in tier order. The last is the night climate.
    pub prefixes: &'a [String],
    pub time_of_use: &'a WeekdayRange,
    pub cutoff: i32,
}

impl SynthesisRules<'_> {
    pub fn climate_name(&self, prefix_index: usize, day: usize) -> String {
        format!("{}{}", self.prefixes[prefix_index], day)
    }

    fn night_prefix(&self) -> usize {
        self.prefixes.len().saturating_sub(1)
    }
}

/// One step of a day: hold `climate_ref` until `until`, or until the end of the day.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateTransition {
    climate_ref: String,
    cool_temp: i32,
    until: Option<String>,
}

impl ClimateTransition {
    pub fn new(climate_ref: &str, cool_temp: i32, until: Option<&str>) -> Self {
        Self {
            climate_ref: climate_ref.to_owned(),
            cool_temp,
            until: until.map(|s| s.to_owned()),
        }
    }

    pub fn get_climate_ref(&self) -> &str {
        &self.climate_ref
    }

    pub fn get_cool_temp(&self) -> i32 {
        self.cool_temp
    }

    pub fn get_until(&self) -> Option<&str> {
        self.until.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DayProgram {
    #[default]
    Unchanged,
    /// Transitions back to back starting at midnight.
    Day(Vec<ClimateTransition>),
    /// A single climate from `from` until the end of the day. Used for the night before a
    /// programmed day so it can start cooling ahead of time.
    Evening {
        climate_ref: String,
        cool_temp: i32,
        from: String,
    },
}

impl DayProgram {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, DayProgram::Unchanged)
    }

    /// (climate_ref, cool_temp) in the order they run.
    fn setpoints(&self) -> Vec<(&str, i32)> {
        match self {
            DayProgram::Unchanged => vec![],
            DayProgram::Day(transitions) => transitions.iter()
                .map(|t| (t.climate_ref.as_str(), t.cool_temp))
                .collect(),
            DayProgram::Evening { climate_ref, cool_temp, .. } => vec![(climate_ref.as_str(), *cool_temp)],
        }
    }

    fn fill(&self, slots: &mut [String]) -> Result<(), SlotError> {
        match self {
            DayProgram::Unchanged => {}
            DayProgram::Day(transitions) => {
                let mut start: &str = "00:00";
                for transition in transitions {
                    let (start_slot, end_slot) = match &transition.until {
                        Some(until) => slot_range(start, Some(until.as_str()))?,
                        None => (slot_of(start)?, SLOTS_PER_DAY),
                    };
                    fill_slots(slots, start_slot, end_slot, &transition.climate_ref);
                    if let Some(until) = &transition.until {
                        start = until.as_str();
                    }
                }
            }
            DayProgram::Evening { climate_ref, from, .. } => {
                fill_slots(slots, slot_of(from)?, SLOTS_PER_DAY, climate_ref);
            }
        }
        Ok(())
    }
}

fn fill_slots(slots: &mut [String], start: usize, end: usize, climate_ref: &str) {
    for slot in &mut slots[start..end] {
        *slot = climate_ref.to_owned();
    }
}

/// One [DayProgram] per weekday, Monday first.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekProgram {
    days: Vec<DayProgram>,
}

impl Default for WeekProgram {
    fn default() -> Self {
        Self {
            days: vec![DayProgram::Unchanged; DAYS_PER_WEEK],
        }
    }
}

impl WeekProgram {
    pub fn get_day(&self, day: usize) -> &DayProgram {
        &self.days[day]
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(|day| day.is_unchanged())
    }

    /// Cool setpoints to write, keyed by climate reference. When a climate shows up more than
    /// once the last one wins. Non-positive temperatures are left alone.
    pub fn climate_temps(&self) -> BTreeMap<String, i32> {
        let mut temps = BTreeMap::new();
        for (climate_ref, cool_temp) in self.days.iter().flat_map(|day| day.setpoints()) {
            if cool_temp > 0 {
                temps.insert(climate_ref.to_owned(), cool_temp);
            }
        }
        temps
    }

    /// Lay this program over an existing schedule, leaving unchanged days alone.
    pub fn apply_program(&self, schedule: &[Vec<String>]) -> Result<Vec<Vec<String>>, SlotError> {
        let mut schedule = if is_complete_schedule(schedule) {
            schedule.to_vec()
        } else {
            debug!("No usable schedule on the thermostat, starting from '{}'", DEFAULT_CLIMATE);
            vec![vec![DEFAULT_CLIMATE.to_owned(); SLOTS_PER_DAY]; DAYS_PER_WEEK]
        };

        for (day, program) in self.days.iter().enumerate() {
            program.fill(&mut schedule[day])?;
        }
        Ok(schedule)
    }

    /// The program the thermostat should end up with: the new schedule plus updated cool setpoints.
    pub fn apply_to(&self, live: &Program) -> Result<Program, SlotError> {
        let schedule = self.apply_program(live.get_schedule())?;
        let temps = self.climate_temps();
        let mut climates = live.get_climates().to_vec();
        for climate in climates.iter_mut() {
            let temp = climate.get_climate_ref()
                .and_then(|climate_ref| temps.get(climate_ref));
            if let Some(temp) = temp {
                climate.set_cool_temp(*temp);
            }
        }
        Ok(Program::new(schedule, climates))
    }
}

fn is_complete_schedule(schedule: &[Vec<String>]) -> bool {
    schedule.len() == DAYS_PER_WEEK && schedule.iter().all(|day| day.len() == SLOTS_PER_DAY)
}

#[derive(Debug, PartialEq)]
pub enum Synthesis {
    OutOfSeason,
    BelowCutoff {
        /// A requested day falls inside the time of use window, so whatever is programmed there
        /// will keep running.
        manual_intervention: bool,
    },
    NoMatchingBand { forecast_high: i32 },
    Program(WeekProgram),
}

/// Work out the week program for the requested days, or why there isn't one.
pub fn synthesize(
    rules: SynthesisRules<'_>,
    day_set: &DaySet,
    forecast: &ForecastView,
    in_season: bool,
    live: &Program,
) -> Result<Synthesis, SynthesisError> {
    if !in_season {
        info!("Outside of the supercool months, nothing to do");
        return Ok(Synthesis::OutOfSeason);
    }

    let forecast_high = forecast.get_forecast_high();
    if forecast_high < rules.cutoff {
        let manual_intervention = rules.time_of_use.overlaps(day_set);
        info!("Forecast high {} is below the supercool cutoff of {}", forecast_high, rules.cutoff);
        return Ok(Synthesis::BelowCutoff { manual_intervention });
    }

    let band = match rules.bands.lookup(forecast_high) {
        Some(band) => band,
        None => {
            info!("No supercool band matches forecast high {}, nothing to do", forecast_high);
            return Ok(Synthesis::NoMatchingBand { forecast_high });
        }
    };
    info!("Forecast high {} matches band {}", forecast_high, band.get_range());

    let climate_ref = |prefix_index: usize, day: usize| -> Result<String, SynthesisError> {
        let name = rules.climate_name(prefix_index, day);
        live.climate_ref(&name)
            .map(|s| s.to_owned())
            .ok_or(SynthesisError::UnknownClimate(name))
    };

    let tiers = band.get_tiers();
    let mut week = WeekProgram::default();
    let mut evenings = Vec::new();

    for day in day_set.iter() {
        if forecast.high_for(day).is_none() {
            warn!("There is no high temperature for {}, skipping it", day_name(day));
            continue;
        }

        let mut transitions = tiers.iter()
            .enumerate()
            .map(|(idx, tier)| Ok(ClimateTransition::new(&climate_ref(idx, day)?, tier.get_temp(), tier.get_until())))
            .collect::<Result<Vec<_>, SynthesisError>>()?;

        if day == forecast.get_tomorrow() {
            if let Some(evening) = prior_night(tiers, climate_ref(rules.night_prefix(), previous_day(day))?) {
                evenings.push((previous_day(day), evening));
            }
        }

        if day == rules.time_of_use.last() {
            info!("{} is the last day of time of use, holding the night temperature", day_name(day));
            if let (Some(last), Some(second_to_last)) = (transitions.last_mut(), second_to_last(tiers)) {
                *last = ClimateTransition::new(&climate_ref(rules.night_prefix(), day)?, second_to_last.get_temp(), None);
            }
        }

        week.days[day] = DayProgram::Day(transitions);
    }

    for (day, evening) in evenings {
        if !week.days[day].is_unchanged() {
            debug!("Replacing {}'s own program with its night before tomorrow", day_name(day));
        }
        week.days[day] = evening;
    }

    if week.is_empty() {
        return Err(SynthesisError::AllDaysEmptyAfterSynthesis);
    }

    info!("Supercool program ready for {}", day_set.iter().map(day_name).join(", "));
    Ok(Synthesis::Program(week))
}

fn second_to_last(tiers: &[Tier]) -> Option<&Tier> {
    tiers.len().checked_sub(2).map(|idx| &tiers[idx])
}

/// The previous night runs at the morning's temperature from when the evening tier ends.
fn prior_night(tiers: &[Tier], climate_ref: String) -> Option<DayProgram> {
    let first = tiers.first()?;
    let from = second_to_last(tiers)?.get_until()?;
    Some(DayProgram::Evening {
        climate_ref,
        cool_temp: first.get_temp(),
        from: from.to_owned(),
    })
}

/// Climates a run over `day_set` needs: every tier for each day, and the night climate of the
/// day before each of them.
pub fn required_climate_names(prefixes: &[String], day_set: &DaySet) -> Vec<String> {
    let night = match prefixes.last() {
        Some(night) => night,
        None => return vec![],
    };
    day_set.iter()
        .flat_map(|day| {
            prefixes.iter()
                .map(move |prefix| format!("{}{}", prefix, day))
                .chain(std::iter::once(format!("{}{}", night, previous_day(day))))
        })
        .unique()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::supercool::bands::tests::sample_tiers;
    use crate::brain::supercool::bands::{Band, BandRange};
    use crate::io::ecobee::model::Climate;

    fn prefixes() -> Vec<String> {
        ["sleep", "precool", "supercool", "away", "home", "sleepnight"].iter().map(|s| s.to_string()).collect()
    }

    fn bands() -> BandTable {
        BandTable::new(vec![
            Band::new(BandRange::try_from("880-979".to_owned()).unwrap(), sample_tiers(760, 770)),
            Band::new(BandRange::try_from("980-1029".to_owned()).unwrap(), sample_tiers(750, 760)),
        ])
    }

    /// Every per-day climate, with its reference equal to its name.
    fn live_program() -> Program {
        let climates = prefixes().iter()
            .flat_map(|prefix| (0..7).map(move |day| format!("{}{}", prefix, day)))
            .map(|name| Climate::new(name.clone(), Some(name), Some(780)))
            .collect();
        Program::new(vec![vec!["home".to_owned(); 48]; 7], climates)
    }

    fn forecast(high: i32) -> ForecastView {
        ForecastView::new([Some(900), Some(900), Some(900), Some(high), Some(900), None, None], 3, high)
    }

    fn days(days: &[usize]) -> DaySet {
        days.iter().copied().collect()
    }

    fn run(day_set: &[usize], high: i32) -> Result<Synthesis, SynthesisError> {
        let bands = bands();
        let prefixes = prefixes();
        let window = WeekdayRange::new(0, 4).unwrap();
        let rules = SynthesisRules { bands: &bands, prefixes: &prefixes, time_of_use: &window, cutoff: 879 };
        synthesize(rules, &days(day_set), &forecast(high), true, &live_program())
    }

    fn week(synthesis: Synthesis) -> WeekProgram {
        match synthesis {
            Synthesis::Program(week) => week,
            other => panic!("Expected a program, got {:?}", other),
        }
    }

    #[test]
    fn test_thursday() {
        let week = week(run(&[3], 950).unwrap());
        let expected = DayProgram::Day(vec![
            ClimateTransition::new("sleep3", 760, Some("12:30")),
            ClimateTransition::new("precool3", 750, Some("13:30")),
            ClimateTransition::new("supercool3", 740, Some("15:00")),
            ClimateTransition::new("away3", 820, Some("20:00")),
            ClimateTransition::new("home3", 770, Some("22:00")),
            ClimateTransition::new("sleepnight3", 760, None),
        ]);
        assert_eq!(week.get_day(3), &expected);

        // Thursday is tomorrow, so Wednesday night starts cooling at the morning temperature.
        let expected_evening = DayProgram::Evening {
            climate_ref: "sleepnight2".to_owned(),
            cool_temp: 760,
            from: "22:00".to_owned(),
        };
        assert_eq!(week.get_day(2), &expected_evening);
        for day in [0, 1, 4, 5, 6] {
            assert!(week.get_day(day).is_unchanged(), "Day {} should be unchanged", day);
        }
    }

    #[test]
    fn test_last_day_of_time_of_use() {
        let forecast = ForecastView::new([None, None, None, None, Some(950), Some(900), None], 3, 950);
        let bands = bands();
        let prefixes = prefixes();
        let window = WeekdayRange::new(0, 4).unwrap();
        let rules = SynthesisRules { bands: &bands, prefixes: &prefixes, time_of_use: &window, cutoff: 879 };
        let week = week(synthesize(rules, &days(&[4]), &forecast, true, &live_program()).unwrap());

        match week.get_day(4) {
            DayProgram::Day(transitions) => {
                assert_eq!(transitions.len(), 6);
                assert_eq!(transitions[5], ClimateTransition::new("sleepnight4", 770, None));
                assert_eq!(transitions[0], ClimateTransition::new("sleep4", 760, Some("12:30")));
            }
            other => panic!("Expected a day program, got {:?}", other),
        }
        // Friday isn't tomorrow here, so Thursday night is left alone.
        assert!(week.get_day(3).is_unchanged());
    }

    #[test]
    fn test_unknown_forecast() {
        assert_eq!(run(&[3], 9999).unwrap(), Synthesis::NoMatchingBand { forecast_high: 9999 });
    }

    #[test]
    fn test_below_cutoff() {
        let bands = bands();
        let prefixes = prefixes();
        let window = WeekdayRange::new(0, 4).unwrap();
        let rules = SynthesisRules { bands: &bands, prefixes: &prefixes, time_of_use: &window, cutoff: 900 };

        let result = synthesize(rules, &days(&[4, 5]), &forecast(850), true, &live_program()).unwrap();
        assert_eq!(result, Synthesis::BelowCutoff { manual_intervention: true });

        let result = synthesize(rules, &days(&[5, 6]), &forecast(850), true, &live_program()).unwrap();
        assert_eq!(result, Synthesis::BelowCutoff { manual_intervention: false });
    }

    #[test]
    fn test_out_of_season() {
        let bands = bands();
        let prefixes = prefixes();
        let window = WeekdayRange::new(0, 4).unwrap();
        let rules = SynthesisRules { bands: &bands, prefixes: &prefixes, time_of_use: &window, cutoff: 879 };
        assert_eq!(synthesize(rules, &days(&[3]), &forecast(950), false, &live_program()).unwrap(), Synthesis::OutOfSeason);
    }

    #[test]
    fn test_all_days_without_forecast() {
        assert_eq!(run(&[5, 6], 950), Err(SynthesisError::AllDaysEmptyAfterSynthesis));
    }

    #[test]
    fn test_missing_climate() {
        let bands = bands();
        let prefixes = prefixes();
        let window = WeekdayRange::new(0, 4).unwrap();
        let rules = SynthesisRules { bands: &bands, prefixes: &prefixes, time_of_use: &window, cutoff: 879 };
        let live = Program::new(vec![], vec![Climate::new("sleep3".to_owned(), Some("sleep3".to_owned()), None)]);
        assert_eq!(
            synthesize(rules, &days(&[3]), &forecast(950), true, &live),
            Err(SynthesisError::UnknownClimate("precool3".to_owned()))
        );
    }

    #[test]
    fn test_prior_night_replaces_own_program() {
        let week = week(run(&[2, 3], 950).unwrap());
        let expected_evening = DayProgram::Evening {
            climate_ref: "sleepnight2".to_owned(),
            cool_temp: 760,
            from: "22:00".to_owned(),
        };
        assert_eq!(week.get_day(2), &expected_evening, "Tomorrow's night before wins over Wednesday's own program");
        assert!(matches!(week.get_day(3), DayProgram::Day(_)));
    }

    #[test]
    fn test_prior_night_wraps_to_sunday() {
        let forecast = ForecastView::new([Some(950), Some(900), None, None, None, None, None], 0, 950);
        let bands = bands();
        let prefixes = prefixes();
        let window = WeekdayRange::new(0, 4).unwrap();
        let rules = SynthesisRules { bands: &bands, prefixes: &prefixes, time_of_use: &window, cutoff: 879 };
        let week = week(synthesize(rules, &days(&[0]), &forecast, true, &live_program()).unwrap());

        let expected_evening = DayProgram::Evening {
            climate_ref: "sleepnight6".to_owned(),
            cool_temp: 760,
            from: "22:00".to_owned(),
        };
        assert_eq!(week.get_day(6), &expected_evening);
        assert!(matches!(week.get_day(0), DayProgram::Day(_)));
        for day in 1..6 {
            assert!(week.get_day(day).is_unchanged(), "Day {} should be unchanged", day);
        }
    }

    #[test]
    fn test_apply_program() {
        let week = week(run(&[3], 950).unwrap());
        let schedule = week.apply_program(live_program().get_schedule()).unwrap();

        assert_eq!(schedule.len(), 7);
        let thursday = &schedule[3];
        assert_eq!(thursday[0], "sleep3");
        assert_eq!(thursday[24], "sleep3");
        assert_eq!(thursday[25], "precool3");
        assert_eq!(thursday[26], "precool3");
        assert_eq!(thursday[27], "supercool3");
        assert_eq!(thursday[29], "supercool3");
        assert_eq!(thursday[30], "away3");
        assert_eq!(thursday[39], "away3");
        assert_eq!(thursday[40], "home3");
        assert_eq!(thursday[43], "home3");
        assert_eq!(thursday[44], "sleepnight3");
        assert_eq!(thursday[47], "sleepnight3");

        let wednesday = &schedule[2];
        assert!(wednesday[..44].iter().all(|slot| slot == "home"));
        assert!(wednesday[44..].iter().all(|slot| slot == "sleepnight2"));

        assert_eq!(schedule[0], vec!["home".to_owned(); 48]);
    }

    #[test]
    fn test_apply_program_without_schedule() {
        let week = week(run(&[3], 950).unwrap());
        let schedule = week.apply_program(&[]).unwrap();
        assert_eq!(schedule[6], vec![DEFAULT_CLIMATE.to_owned(); 48]);
        assert_eq!(schedule[3][47], "sleepnight3");
    }

    #[test]
    fn test_apply_unaligned_time() {
        let mut week = WeekProgram::default();
        week.days[1] = DayProgram::Day(vec![ClimateTransition::new("home", 780, Some("12:15"))]);
        assert_eq!(week.apply_program(&[]), Err(SlotError::UnalignedTime("12:15".to_owned())));
    }

    #[test]
    fn test_climate_temps() {
        let week = week(run(&[4], 950).unwrap());
        let temps = week.climate_temps();
        assert_eq!(temps.get("sleep4"), Some(&760));
        assert_eq!(temps.get("supercool4"), Some(&740));
        assert_eq!(temps.get("sleepnight4"), Some(&770), "Overridden night should win");
        assert_eq!(temps.len(), 6);
    }

    #[test]
    fn test_apply_to_sets_cool_temps() {
        let week = week(run(&[3], 950).unwrap());
        let candidate = week.apply_to(&live_program()).unwrap();
        assert_eq!(candidate.find_climate("supercool3").and_then(|c| c.get_cool_temp()), Some(740));
        assert_eq!(candidate.find_climate("sleepnight2").and_then(|c| c.get_cool_temp()), Some(760));
        assert_eq!(candidate.find_climate("supercool4").and_then(|c| c.get_cool_temp()), Some(780));
    }

    #[test]
    fn test_required_climate_names() {
        let names = required_climate_names(&prefixes(), &days(&[0, 3]));
        assert_eq!(names, vec![
            "sleep0", "precool0", "supercool0", "away0", "home0", "sleepnight0", "sleepnight6",
            "sleep3", "precool3", "supercool3", "away3", "home3", "sleepnight3", "sleepnight2",
        ]);

        let names = required_climate_names(&prefixes(), &days(&[0, 1]));
        assert_eq!(names.iter().filter(|name| *name == "sleepnight0").count(), 1);
    }
}
