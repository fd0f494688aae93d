//! INI-backed configuration file.

use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use crate::asset::DEFAULT_TEMPLATE_NAME;
use crate::location::Accuracy;
use crate::picker::RecenterCommand;

use super::keys::ConfigKey;

/// Application directory name under the platform config dir.
const APP_DIR: &str = "pinpoint";

/// Configuration file name.
const CONFIG_FILE: &str = "config.ini";

/// Default log level directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors from loading, saving or editing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine the configuration directory")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Platform config directory for pinpoint.
pub fn config_directory() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(ConfigError::NoConfigDir)
}

/// Path of the default configuration file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_directory()?.join(CONFIG_FILE))
}

/// `[assets]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetsConfig {
    /// Filesystem override for the bundled template. `None` uses the
    /// template compiled into the binary.
    pub directory: Option<PathBuf>,
    /// Template file name.
    pub template: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            directory: None,
            template: DEFAULT_TEMPLATE_NAME.to_string(),
        }
    }
}

/// `[location]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationConfig {
    pub high_accuracy: bool,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
        }
    }
}

impl LocationConfig {
    pub fn accuracy(&self) -> Accuracy {
        if self.high_accuracy {
            Accuracy::High
        } else {
            Accuracy::Balanced
        }
    }
}

/// `[picker]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickerSection {
    pub recenter_command: RecenterCommand,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level; `RUST_LOG` takes precedence.
    pub level: String,
    /// Directory for daily-rolling log files. `None` logs to stderr only.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub assets: AssetsConfig,
    pub location: LocationConfig,
    pub picker: PickerSection,
    pub logging: LoggingConfig,
}

/// Settings injected into a [`LocationPicker`](crate::picker::LocationPicker).
#[derive(Debug, Clone, PartialEq)]
pub struct PickerConfig {
    /// Template file name to request from the asset source.
    pub template: String,
    /// Accuracy for the one-shot position fetch.
    pub accuracy: Accuracy,
    /// Command posted on a manual recenter.
    pub recenter_command: RecenterCommand,
}

impl Default for PickerConfig {
    fn default() -> Self {
        ConfigFile::default().picker_config()
    }
}

impl ConfigFile {
    /// Load from the default path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path()?)
    }

    /// Save to the default path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path()?)
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::default();
        for key in ConfigKey::ALL {
            if let Some(value) = ini.get_from(Some(key.section()), key.key_name()) {
                key.set(&mut config, value)?;
            }
        }
        debug!(path = %path.display(), "Config file loaded");
        Ok(config)
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::ALL {
            let value = key.get(self);
            // Unset optional paths are left out rather than written empty.
            if value.is_empty() {
                continue;
            }
            ini.with_section(Some(key.section()))
                .set(key.key_name(), value);
        }
        ini.write_to_file(path).map_err(write_err)?;
        debug!(path = %path.display(), "Config file saved");
        Ok(())
    }

    /// Runtime projection for the picker.
    pub fn picker_config(&self) -> PickerConfig {
        PickerConfig {
            template: self.assets.template.clone(),
            accuracy: self.location.accuracy(),
            recenter_command: self.picker.recenter_command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.assets.template, "map.html");
        assert!(config.location.high_accuracy);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.assets.directory = Some(PathBuf::from("/opt/maps"));
        config.location.high_accuracy = false;
        config.picker.recenter_command = RecenterCommand::Implicit;
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(
            &path,
            "[picker]\nrecenter_command = implicit\nflavour = mint\n\n[extra]\nfoo = bar\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.picker.recenter_command, RecenterCommand::Implicit);
    }

    #[test]
    fn test_invalid_value_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[location]\nhigh_accuracy = sometimes\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "location.high_accuracy"
        ));
    }

    #[test]
    fn test_picker_projection() {
        let mut config = ConfigFile::default();
        config.location.high_accuracy = false;
        config.assets.template = "alt.html".into();

        let picker = config.picker_config();
        assert_eq!(picker.accuracy, Accuracy::Balanced);
        assert_eq!(picker.template, "alt.html");
        assert_eq!(picker.recenter_command, RecenterCommand::Explicit);
        assert_eq!(PickerConfig::default().accuracy, Accuracy::High);
    }
}
