use std::path::Path;

use time::UtcOffset;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Logs are written on a background thread, they only get flushed while this is alive.
pub struct LoggingHandle {
    _non_blocking_guard: WorkerGuard,
}

pub fn init_logging(config: &LoggingConfig) -> Result<LoggingHandle, String> {
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        UtcOffset::current_local_offset().unwrap_or_else(|err| {
            eprintln!("Failed to get timezone: {}", err);
            UtcOffset::UTC
        }),
        time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second] +[offset_hour]"
        ),
    );

    let (non_blocking, guard) = make_writer(config.get_file());

    let env_filter = EnvFilter::builder()
        .with_default_directive(config.get_level().parse()
            .map_err(|err| format!("Invalid log level '{}': {}", config.get_level(), err))?)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt()
        .with_timer(timer)
        .with_ansi(config.get_file().is_none())
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .finish();

    tracing_log::LogTracer::init()
        .map_err(|err| format!("failed to redirect log records: {}", err))?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| format!("failed to initialize logger: {}", err))?;

    Ok(LoggingHandle {
        _non_blocking_guard: guard,
    })
}

fn make_writer(file: Option<&Path>) -> (NonBlocking, WorkerGuard) {
    match file {
        Some(path) => {
            let directory = path.parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().unwrap_or(path.as_os_str());
            tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name))
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    }
}
