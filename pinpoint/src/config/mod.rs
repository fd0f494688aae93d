//! Configuration file support.
//!
//! Settings live in an INI file at `~/.config/pinpoint/config.ini` (or the
//! platform equivalent):
//!
//! ```ini
//! [assets]
//! ; directory = /opt/pinpoint/assets
//! template = map.html
//!
//! [location]
//! high_accuracy = true
//!
//! [picker]
//! recenter_command = explicit
//!
//! [logging]
//! level = info
//! ; directory = /var/log/pinpoint
//! ```
//!
//! A missing file yields defaults. Unknown keys are ignored.

mod file;
mod keys;

pub use file::{
    config_directory, config_file_path, AssetsConfig, ConfigError, ConfigFile, LocationConfig,
    LoggingConfig, PickerConfig, PickerSection,
};
pub use keys::ConfigKey;
