use crate::io::IOBundle;
use crate::time_util::mytime::TimeProvider;
use backtrace::Backtrace;
use std::fmt::{Display, Formatter};
use strum_macros::{Display as StrumDisplay, EnumIter};
use tokio::runtime::Runtime;

pub mod supercool;

#[derive(Debug)]
pub struct BrainFailure {
    description: String,
    trace: Backtrace,
    line_num: u32,
    file_name: String,
    stage: Stage,
}

impl BrainFailure {
    pub fn new(
        description: String,
        trace: Backtrace,
        line_num: u32,
        file_name: String,
        stage: Stage,
    ) -> Self {
        BrainFailure {
            description,
            trace,
            line_num,
            file_name,
            stage,
        }
    }

    pub fn get_stage(&self) -> Stage {
        self.stage
    }

    pub fn get_description(&self) -> &str {
        &self.description
    }
}

impl Display for BrainFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "BrainFailure occured during {}: '{}'", self.stage, self.description)?;
        writeln!(f, "At: Line {} in {}", self.line_num, self.file_name)?;
        writeln!(f, "Trace:{:?}", self.trace)
    }
}

/// Which part of the run failed, so whoever reads the failure knows what state the thermostat is in.
#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumIter, StrumDisplay)]
pub enum Stage {
    /// Reading the thermostat. Nothing was changed.
    #[strum(serialize = "fetch")]
    Fetch,
    /// Creating climates. Some may have been created.
    #[strum(serialize = "climate provisioning")]
    Provisioning,
    /// Working out the schedule. Nothing was changed.
    #[strum(serialize = "synthesis")]
    Synthesis,
    /// Writing the schedule and setpoints. The write was refused or its result is unknown.
    #[strum(serialize = "schedule write")]
    ScheduleWrite,
    #[strum(serialize = "vacation write")]
    VacationWrite,
}

pub trait Brain {
    fn run(
        &mut self,
        runtime: &Runtime,
        io_bundle: &mut IOBundle,
        time_provider: &impl TimeProvider,
    ) -> Result<(), BrainFailure>;
}

#[macro_export]
macro_rules! brain_fail {
    ($msg:expr, $stage:expr) => {{
        let trace = backtrace::Backtrace::new();
        $crate::brain::BrainFailure::new(
            $msg.to_string(),
            trace,
            line!(),
            file!().to_owned(),
            $stage,
        )
    }};
}
