//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Runtime;

use pinpoint::asset::{AssetSource, DirectoryAssets, EmbeddedAssets};
use pinpoint::config::ConfigFile;
use pinpoint::logging::{init_logging, LoggingGuard};
use pinpoint::Coordinate;

use crate::error::CliError;

/// Load the config file, falling back to defaults on error.
pub fn load_config() -> ConfigFile {
    match ConfigFile::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {} (using defaults)", e);
            ConfigFile::default()
        }
    }
}

/// Install logging from config. `verbose` forces debug level.
pub fn setup_logging(config: &ConfigFile, verbose: bool) -> Result<LoggingGuard, CliError> {
    let mut logging = config.logging.clone();
    if verbose {
        logging.level = "debug".to_string();
    }
    Ok(init_logging(&logging)?)
}

/// Resolve the template source: CLI override, then config, then the
/// template bundled in the binary.
pub fn asset_source(cli_dir: Option<PathBuf>, config: &ConfigFile) -> Arc<dyn AssetSource> {
    match cli_dir.or_else(|| config.assets.directory.clone()) {
        Some(dir) => Arc::new(DirectoryAssets::new(dir)),
        None => Arc::new(EmbeddedAssets),
    }
}

/// Multi-threaded runtime for async commands.
pub fn runtime() -> Result<Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}

/// Parse `LAT,LON` (or `LAT LON`).
pub fn parse_coordinate(s: &str) -> Result<Coordinate, String> {
    let parts: Vec<&str> = s
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    let [lat, lon] = parts.as_slice() else {
        return Err(format!("expected LAT,LON but got '{}'", s));
    };
    let lat: f64 = lat
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat))?;
    let lon: f64 = lon
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon))?;
    Coordinate::new(lat, lon).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(
            parse_coordinate("19.31,73.02").unwrap(),
            Coordinate::new(19.31, 73.02).unwrap()
        );
        assert_eq!(
            parse_coordinate("-33.9 151.2").unwrap(),
            Coordinate::new(-33.9, 151.2).unwrap()
        );
        assert!(parse_coordinate("19.3").is_err());
        assert!(parse_coordinate("north,73").is_err());
        assert!(parse_coordinate("91,0").is_err());
    }

    #[test]
    fn test_asset_source_prefers_cli_override() {
        let mut config = ConfigFile::default();
        config.assets.directory = Some(PathBuf::from("/from/config"));

        let source = asset_source(Some(PathBuf::from("/from/cli")), &config);
        assert!(source.describe().contains("/from/cli"));

        let source = asset_source(None, &config);
        assert!(source.describe().contains("/from/config"));
    }
}
