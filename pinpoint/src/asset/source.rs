//! Asset sources for the renderer template.

use std::io;
use std::path::{Path, PathBuf};

use futures::future::{self, FutureExt};
use thiserror::Error;
use tracing::debug;

use crate::location::PlatformFuture;

use super::loader::DEFAULT_TEMPLATE_NAME;

/// Bundled renderer document.
const EMBEDDED_MAP_HTML: &str = include_str!("../../assets/map.html");

/// Errors that can occur while resolving the renderer template.
///
/// All variants are fatal for the view; a missing or corrupt template is a
/// packaging defect.
#[derive(Debug, Error)]
pub enum AssetLoadError {
    /// No asset with this name exists in the source.
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Reading the asset failed.
    #[error("Failed to read asset '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The asset exists but is not a usable renderer document.
    #[error("Asset '{name}' is corrupt: {reason}")]
    Corrupt { name: String, reason: String },
}

/// A store of bundled application assets.
pub trait AssetSource: Send + Sync + 'static {
    /// Read the raw bytes of the named asset.
    fn read(&self, name: &str) -> PlatformFuture<'_, Result<Vec<u8>, AssetLoadError>>;

    /// Human-readable description of where assets come from.
    fn describe(&self) -> String;
}

/// Assets compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedAssets;

impl EmbeddedAssets {
    pub fn new() -> Self {
        Self
    }
}

impl AssetSource for EmbeddedAssets {
    fn read(&self, name: &str) -> PlatformFuture<'_, Result<Vec<u8>, AssetLoadError>> {
        let result = match name {
            DEFAULT_TEMPLATE_NAME => Ok(EMBEDDED_MAP_HTML.as_bytes().to_vec()),
            other => Err(AssetLoadError::NotFound(other.to_string())),
        };
        future::ready(result).boxed()
    }

    fn describe(&self) -> String {
        "embedded".to_string()
    }
}

/// Assets read from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirectoryAssets {
    fn read(&self, name: &str) -> PlatformFuture<'_, Result<Vec<u8>, AssetLoadError>> {
        let path = self.root.join(name);
        let name = name.to_string();
        Box::pin(async move {
            debug!(path = %path.display(), "Reading asset from disk");
            tokio::fs::read(&path).await.map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    AssetLoadError::NotFound(name)
                } else {
                    AssetLoadError::Io { name, source: e }
                }
            })
        })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}
