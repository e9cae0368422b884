//! Tracing subscriber setup.
//!
//! Filter precedence: `RUST_LOG`, then `[logging].level` from the config
//! file, then `info`. Output goes to stderr; with `[logging].file = true` a
//! daily rolling file is written under the config directory as well.

use anyhow::{Context, Result};
use estate_infrastructure::EstatePaths;
use estate_infrastructure::config::LoggingConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE_PREFIX: &str = "estate.log";

/// Builds the filter from `RUST_LOG` or the configured level.
pub fn build_filter(config: &LoggingConfig, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(&config.level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Installs the global subscriber.
///
/// The returned guard flushes the log file on drop and must be held until
/// the program exits.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(config, rust_log.as_deref());
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let registry = tracing_subscriber::registry().with(filter).with(stderr_layer);

    if !config.file {
        registry.try_init().context("Failed to install tracing subscriber")?;
        return Ok(None);
    }

    let logs_dir = EstatePaths::logs_dir()?;
    let (writer, guard) = file_writer(&logs_dir)?;
    registry
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .context("Failed to install tracing subscriber")?;
    tracing::debug!("[Logging] Writing logs to {}", logs_dir.display());
    Ok(Some(guard))
}

fn file_writer(dir: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}
