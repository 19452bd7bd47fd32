use log::info;
use tokio::runtime::Runtime;

use crate::brain::supercool::SupercoolBrain;
use crate::brain::{Brain, BrainFailure};
use crate::config::Config;
use crate::io::dummy_io_bundle::new_dummy_io;
use crate::io::ecobee::dummy::sample_snapshot;
use crate::time_util::mytime::{RealTimeProvider, TimeProvider};

/// Used when there are no bands to pick a forecast from.
const FALLBACK_HIGH: i32 = 950;

/// Runs the brain once against a thermostat that only has the stock climates, with a forecast
/// that lands in the first configured band, then reports what it would have done.
pub fn simulate(config: Config, rt: &Runtime) -> Result<(), BrainFailure> {
    let time_provider = RealTimeProvider::default();
    let forecast_high = config.get_supercool().get_bands().iter()
        .next()
        .map(|band| band.get_range().get_low())
        .unwrap_or(FALLBACK_HIGH);
    info!("Simulated forecast high: {}", forecast_high);

    let (mut io_bundle, handle) = new_dummy_io(&sample_snapshot(time_provider.today(), forecast_high));
    let mut brain = SupercoolBrain::new(config);
    let result = brain.run(rt, &mut io_bundle, &time_provider);

    let stats = handle.ecobee_stats();
    info!("Program writes: {}, climates created: {}, vacations created: {}, vacations deleted: {}",
          stats.program_writes(), stats.climates_created(), stats.vacations_created(), stats.vacations_deleted());
    for (title, message) in handle.sent_notifications() {
        info!("Would have notified '{}': {}", title, message);
    }
    result
}
