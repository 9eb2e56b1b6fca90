//! Tracing setup: console output plus a rotating file under `.loom/logs/`.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Initialize the global subscriber.
///
/// Console verbosity follows `RUST_LOG` when set, otherwise `warn` (or `debug`
/// with `--verbose`). The file layer always records at `debug` so `.loom/logs/`
/// holds a full trace of each run. The returned guard must be kept alive for
/// the duration of the process so buffered file output is flushed.
pub fn init(log_dir: &Path, verbose: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let default_level = if verbose { "loom=debug" } else { "loom=warn" };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let console_layer = fmt::layer()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "loom.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_ansi(false)
        .with_filter(EnvFilter::new("loom=debug"));

    // try_init fails when a subscriber is already set (tests); that is fine
    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .ok();

    Ok(guard)
}
