//! Tracing subscriber setup.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Days of rotated log files kept on disk.
const MAX_LOG_FILES: usize = 30;

/// Install the global subscriber: stderr always, plus a daily-rotated file
/// under `log_dir` when given. Filter comes from `RUST_LOG` (default `info`).
///
/// # Errors
///
/// Returns an error if the log directory or appender cannot be created, or
/// if a global subscriber is already installed.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("aio-server")
                .filename_suffix("log")
                .max_log_files(MAX_LOG_FILES)
                .build(dir)
                .context("failed to create log file appender")?;
            Some(
                fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    if let Some(dir) = log_dir {
        tracing::info!(log_dir = %dir.display(), "file logging enabled");
    }
    Ok(())
}
