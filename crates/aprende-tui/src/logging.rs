use anyhow::Result;
use aprende_core::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "APRENDE_LOG";
pub const LOG_FILE: &str = "aprende.log";

/// Initialize tracing, writing to `<config_dir>/aprende/aprende.log`.
///
/// The terminal belongs to the TUI, so nothing is logged to stdout/stderr.
/// Level defaults to INFO, override via `APRENDE_LOG`. Keep the returned
/// guard alive until exit or buffered lines are lost.
pub fn init() -> Result<WorkerGuard> {
    let dir = Config::config_dir()?;
    std::fs::create_dir_all(&dir)?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, LOG_FILE));

    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()?;

    tracing::debug!(dir = %dir.display(), "Tracing initialized");
    Ok(guard)
}
