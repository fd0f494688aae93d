//! Registry of configuration keys.
//!
//! Every setting is addressable as `section.key` for the CLI's
//! `config get/set`, and loading goes through the same validated setters.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::level_filters::LevelFilter;

use crate::picker::RecenterCommand;

use super::file::{ConfigError, ConfigFile};

/// A single configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    AssetsDirectory,
    AssetsTemplate,
    LocationHighAccuracy,
    PickerRecenterCommand,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// All keys in file order.
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::AssetsDirectory,
        ConfigKey::AssetsTemplate,
        ConfigKey::LocationHighAccuracy,
        ConfigKey::PickerRecenterCommand,
        ConfigKey::LoggingLevel,
        ConfigKey::LoggingDirectory,
    ];

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::AssetsDirectory | ConfigKey::AssetsTemplate => "assets",
            ConfigKey::LocationHighAccuracy => "location",
            ConfigKey::PickerRecenterCommand => "picker",
            ConfigKey::LoggingLevel | ConfigKey::LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::AssetsDirectory => "directory",
            ConfigKey::AssetsTemplate => "template",
            ConfigKey::LocationHighAccuracy => "high_accuracy",
            ConfigKey::PickerRecenterCommand => "recenter_command",
            ConfigKey::LoggingLevel => "level",
            ConfigKey::LoggingDirectory => "directory",
        }
    }

    /// `section.key`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// One-line description for `config list`.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigKey::AssetsDirectory => "Directory overriding the bundled renderer template",
            ConfigKey::AssetsTemplate => "Renderer template file name",
            ConfigKey::LocationHighAccuracy => "Request high-accuracy position fixes",
            ConfigKey::PickerRecenterCommand => "Manual recenter command (explicit|implicit)",
            ConfigKey::LoggingLevel => "Log level (overridden by RUST_LOG)",
            ConfigKey::LoggingDirectory => "Directory for daily log files",
        }
    }

    /// Current value as a string. Unset optional values are empty.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::AssetsDirectory => display_path(&config.assets.directory),
            ConfigKey::AssetsTemplate => config.assets.template.clone(),
            ConfigKey::LocationHighAccuracy => config.location.high_accuracy.to_string(),
            ConfigKey::PickerRecenterCommand => {
                config.picker.recenter_command.as_str().to_string()
            }
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingDirectory => display_path(&config.logging.directory),
        }
    }

    /// Validate and apply `value`. An empty value clears optional paths.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            ConfigKey::AssetsDirectory => config.assets.directory = parse_path(value),
            ConfigKey::AssetsTemplate => {
                if value.is_empty() || value.contains(['/', '\\']) {
                    return Err(self.invalid("expected a bare file name"));
                }
                config.assets.template = value.to_string();
            }
            ConfigKey::LocationHighAccuracy => {
                config.location.high_accuracy =
                    parse_bool(value).ok_or_else(|| self.invalid("expected true or false"))?;
            }
            ConfigKey::PickerRecenterCommand => {
                config.picker.recenter_command =
                    RecenterCommand::from_str(value).map_err(|reason| self.invalid(&reason))?;
            }
            ConfigKey::LoggingLevel => {
                LevelFilter::from_str(value).map_err(|e| self.invalid(&e.to_string()))?;
                config.logging.level = value.to_ascii_lowercase();
            }
            ConfigKey::LoggingDirectory => config.logging.directory = parse_path(value),
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_names() {
        for key in ConfigKey::ALL {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), key);
        }
        assert_eq!(
            "Picker.Recenter_Command".parse::<ConfigKey>().unwrap(),
            ConfigKey::PickerRecenterCommand
        );
    }

    #[test]
    fn test_unknown_key() {
        assert!(matches!(
            "picker.zoom".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(k)) if k == "picker.zoom"
        ));
    }

    #[test]
    fn test_set_and_get() {
        let mut config = ConfigFile::default();

        ConfigKey::LocationHighAccuracy.set(&mut config, "no").unwrap();
        assert_eq!(ConfigKey::LocationHighAccuracy.get(&config), "false");

        ConfigKey::LoggingLevel.set(&mut config, "DEBUG").unwrap();
        assert_eq!(config.logging.level, "debug");

        ConfigKey::AssetsDirectory.set(&mut config, "/srv/assets").unwrap();
        assert_eq!(ConfigKey::AssetsDirectory.get(&config), "/srv/assets");
        ConfigKey::AssetsDirectory.set(&mut config, "").unwrap();
        assert_eq!(config.assets.directory, None);
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::AssetsTemplate.set(&mut config, "../map.html").is_err());
        assert!(ConfigKey::LoggingLevel.set(&mut config, "loud").is_err());
        assert!(ConfigKey::PickerRecenterCommand.set(&mut config, "both").is_err());
        assert_eq!(config, ConfigFile::default());
    }
}
