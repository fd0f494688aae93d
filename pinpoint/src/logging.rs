//! Tracing subscriber bootstrap.
//!
//! Installs a global subscriber with:
//! - an [`EnvFilter`] built from `RUST_LOG`, falling back to the configured level
//! - a stderr layer with local RFC 3339 timestamps
//! - an optional daily-rolling file layer when a log directory is configured
//!
//! Keep the returned [`LoggingGuard`] alive for the life of the process;
//! dropping it flushes and stops the file writer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Log file prefix; the appender adds the date suffix.
const LOG_FILE_PREFIX: &str = "pinpoint.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{level}': {reason}")]
    InvalidFilter { level: String, reason: String },

    #[error("Failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Keeps the background file writer alive.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug)]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = build_filter(&config.level)?;

    // Falls back to UTC when the local offset cannot be determined safely.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(offset, Rfc3339);

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(timer.clone())
        .with_target(false);

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
                path: dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_timer(timer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(LoggingGuard { _file: guard })
}

/// `RUST_LOG` if set and valid, otherwise `level`.
fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidFilter {
        level: level.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_log_directory_once() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        let config = LoggingConfig {
            level: "debug".into(),
            directory: Some(log_dir.clone()),
        };

        let _guard = init_logging(&config).unwrap();
        assert!(log_dir.is_dir());

        let second = init_logging(&LoggingConfig::default());
        assert!(matches!(second, Err(LoggingError::AlreadyInitialized)));
    }
}
