use std::env;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    AppError, Result,
    config::{ConfigPaths, GeneralConfig},
};

const FORMAT_VAR: &str = "SNAPCAST_MPRIS_LOG_FORMAT";
const DAYS_TO_KEEP: usize = 7;

/// Initialize tracing for the bridge
///
/// Uses `RUST_LOG` if set, otherwise the configured level. Output is pretty
/// unless `SNAPCAST_MPRIS_LOG_FORMAT=json`. With `log_to_file` the same
/// events also go to a daily rotated file in the log directory.
///
/// # Errors
/// Returns error if the log directory cannot be created or a subscriber is
/// already installed
pub fn init(general: &GeneralConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(general.log_level.to_string()));

    let json = env::var(FORMAT_VAR).is_ok_and(|format| format == "json");

    let file_writer = if general.log_to_file {
        let log_dir = ConfigPaths::log_dir()?;
        let file_appender = tracing_appender::rolling::Builder::new()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .max_log_files(DAYS_TO_KEEP)
            .filename_prefix("snapcast-mpris")
            .filename_suffix("log")
            .build(&log_dir)
            .map_err(|e| AppError::Logging(e.to_string()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Flushes on drop; must live as long as the process.
        std::mem::forget(guard);
        Some(non_blocking)
    } else {
        None
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .with(file_writer.map(|writer| {
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(writer)
                    .with_ansi(false)
            }))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_names(true)
                    .with_writer(std::io::stderr),
            )
            .with(file_writer.map(|writer| {
                fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(writer)
                    .with_ansi(false)
            }))
            .try_init()
    };

    result.map_err(|e| AppError::Logging(e.to_string()))
}
