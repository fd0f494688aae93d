//! CLI error type.

use std::io;

use thiserror::Error;

use pinpoint::asset::AssetLoadError;
use pinpoint::bridge::MalformedMessage;
use pinpoint::config::ConfigError;
use pinpoint::logging::LoggingError;
use pinpoint::picker::PickerError;

/// Errors surfaced to the user. Every variant exits non-zero.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Template error: {0}")]
    Template(#[from] AssetLoadError),

    #[error("Picker error: {0}")]
    Picker(#[from] PickerError),

    #[error("Message would be dropped: {0}")]
    Malformed(#[from] MalformedMessage),

    #[error("{0}")]
    Demo(String),
}
