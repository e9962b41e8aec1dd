//! File logging. The terminal belongs to the UI, so nothing goes to stdout.

use std::path::PathBuf;

use color_eyre::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "RESTODESK_LOG";

/// `$XDG_DATA_HOME/restodesk`, or a temp dir fallback.
pub fn log_dir() -> PathBuf {
  dirs::data_dir()
    .unwrap_or_else(std::env::temp_dir)
    .join("restodesk")
}

fn env_filter() -> EnvFilter {
  EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber writing to a daily-rotated file.
///
/// Keep the returned guard alive for the life of the process or buffered
/// lines are lost on exit.
pub fn init() -> Result<WorkerGuard> {
  let dir = log_dir();
  std::fs::create_dir_all(&dir)?;
  let appender = tracing_appender::rolling::daily(&dir, "restodesk.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(env_filter())
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true),
    )
    .try_init()?;

  Ok(guard)
}
