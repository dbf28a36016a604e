use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FORMAT_ENV: &str = "FEDI_CLIENT_LOG_FORMAT";
const LOG_FILE_PREFIX: &str = "fedi-client";

pub fn logs_are_json() -> bool {
    matches!(std::env::var(LOG_FORMAT_ENV).as_deref(), Ok("json"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing to stderr according to RUST_LOG and FEDI_CLIENT_LOG_FORMAT.
/// - Defaults to `info` if `RUST_LOG` is unset
/// - `FEDI_CLIENT_LOG_FORMAT=json` switches to JSON lines
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing() {
    let builder = tracing_subscriber::registry().with(env_filter());

    if logs_are_json() {
        let fmt_layer = fmt::layer().with_target(false).json().flatten_event(true);
        let _ = builder.with(fmt_layer).try_init();
    } else {
        let fmt_layer = fmt::layer().with_target(false).compact();
        let _ = builder.with(fmt_layer).try_init();
    }
}

/// Like [`init_tracing`], plus a daily-rolling log file in `dir`.
///
/// Keep the returned guard alive for as long as logs should be flushed.
pub fn init_tracing_with_file(dir: &Path) -> Result<WorkerGuard, InitError> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let builder = tracing_subscriber::registry().with(env_filter());

    if logs_are_json() {
        let stderr_layer = fmt::layer().with_target(false).json().flatten_event(true);
        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .json()
            .flatten_event(true);
        let _ = builder.with(stderr_layer).with(file_layer).try_init();
    } else {
        let stderr_layer = fmt::layer().with_target(false).compact();
        let file_layer = fmt::layer().with_ansi(false).with_writer(writer);
        let _ = builder.with(stderr_layer).with(file_layer).try_init();
    }

    Ok(guard)
}
