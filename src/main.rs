use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};
use tokio::runtime::{Builder, Runtime};

use crate::brain::supercool::SupercoolBrain;
use crate::brain::Brain;
use crate::config::{read_config, Config};
use crate::io::ecobee::hub::{ApiEcobeeHub, StoredTokens};
use crate::io::notify::Notifications;
use crate::io::IOBundle;
use crate::time_util::mytime::RealTimeProvider;

mod brain;
mod config;
mod io;
mod logging;
mod simulate;
mod time_util;

const CONFIG_FILE: &str = "supercool.toml";
const SIMULATE_ARG: &str = "simulate";

fn main() -> ExitCode {
    println!("Preparing...");

    let mut simulating = false;
    let mut config_path = PathBuf::from(CONFIG_FILE);
    for arg in std::env::args().skip(1) {
        if arg == SIMULATE_ARG {
            simulating = true;
        } else {
            config_path = PathBuf::from(arg);
        }
    }

    let config = match read_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let _logging_handle = match logging::init_logging(config.get_logging()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialise logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let rt = match make_runtime() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if simulating {
        info!("Simulating against a dummy thermostat");
        return match simulate::simulate(config, &rt) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    let io_bundle = match make_io_bundle(&config) {
        Ok(io_bundle) => io_bundle,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    run(config, &rt, io_bundle)
}

fn make_runtime() -> std::io::Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
}

fn make_io_bundle(config: &Config) -> Result<IOBundle, String> {
    let thermostat = config.get_thermostat();
    let tokens = StoredTokens::load(thermostat.get_token_file())
        .map_err(|e| format!("Failed to load ecobee tokens: {}", e))?;
    let hub = ApiEcobeeHub::new(thermostat.get_api_url().to_owned(), tokens);
    Ok(IOBundle::new(hub, Notifications::from_config(config.get_notifications())))
}

fn run(config: Config, rt: &Runtime, mut io_bundle: IOBundle) -> ExitCode {
    let mut brain = SupercoolBrain::new(config);
    match brain.run(rt, &mut io_bundle, &RealTimeProvider::default()) {
        Ok(()) => {
            info!("Done.");
            ExitCode::SUCCESS
        }
        Err(failure) => {
            error!("Brain Failure: {}", failure);
            ExitCode::FAILURE
        }
    }
}
