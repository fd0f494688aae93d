//! One-shot renderer template loader.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use super::source::{AssetLoadError, AssetSource};

/// File name of the bundled renderer document.
pub const DEFAULT_TEMPLATE_NAME: &str = "map.html";

/// Markers every renderer document must contain (case-insensitive).
const REQUIRED_MARKERS: &[&str] = &["<html", "<script"];

/// Resolves the renderer template to a string, once.
///
/// The first successful [`load_template`](Self::load_template) caches the
/// document; later calls return the same `Arc<str>` without touching the
/// source again.
pub struct AssetHtmlLoader {
    source: Arc<dyn AssetSource>,
    name: String,
    template: OnceCell<Arc<str>>,
}

impl std::fmt::Debug for AssetHtmlLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetHtmlLoader")
            .field("source", &self.source.describe())
            .field("name", &self.name)
            .field("loaded", &self.template.initialized())
            .finish()
    }
}

impl AssetHtmlLoader {
    /// Load [`DEFAULT_TEMPLATE_NAME`] from `source`.
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self::with_name(source, DEFAULT_TEMPLATE_NAME)
    }

    /// Load a custom template name from `source`.
    pub fn with_name(source: Arc<dyn AssetSource>, name: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
            template: OnceCell::new(),
        }
    }

    /// Template file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description of the underlying source.
    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    /// Resolve the template, reading the source only on first success.
    pub async fn load_template(&self) -> Result<Arc<str>, AssetLoadError> {
        self.template
            .get_or_try_init(|| async {
                let bytes = self.source.read(&self.name).await?;
                let html = validate(&self.name, bytes)?;
                info!(
                    name = %self.name,
                    source = %self.source.describe(),
                    bytes = html.len(),
                    "Renderer template loaded"
                );
                Ok::<_, AssetLoadError>(Arc::from(html))
            })
            .await
            .cloned()
    }
}

fn validate(name: &str, bytes: Vec<u8>) -> Result<String, AssetLoadError> {
    let html = String::from_utf8(bytes).map_err(|e| AssetLoadError::Corrupt {
        name: name.to_string(),
        reason: format!("not valid UTF-8 ({})", e.utf8_error()),
    })?;

    if html.trim().is_empty() {
        return Err(AssetLoadError::Corrupt {
            name: name.to_string(),
            reason: "document is empty".to_string(),
        });
    }

    let lower = html.to_ascii_lowercase();
    for marker in REQUIRED_MARKERS {
        if !lower.contains(marker) {
            return Err(AssetLoadError::Corrupt {
                name: name.to_string(),
                reason: format!("missing {}> element", marker),
            });
        }
    }

    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{DirectoryAssets, EmbeddedAssets};
    use crate::location::PlatformFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts reads and serves a fixed body.
    struct CountingSource {
        body: Vec<u8>,
        reads: AtomicUsize,
    }

    impl AssetSource for CountingSource {
        fn read(&self, _name: &str) -> PlatformFuture<'_, Result<Vec<u8>, AssetLoadError>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let body = self.body.clone();
            Box::pin(async move { Ok(body) })
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    #[tokio::test]
    async fn test_embedded_template_is_valid() {
        let loader = AssetHtmlLoader::new(Arc::new(EmbeddedAssets::new()));
        let html = loader.load_template().await.unwrap();
        assert!(html.contains("draggable: true"));
    }

    #[tokio::test]
    async fn test_template_is_read_once_and_shared() {
        let source = Arc::new(CountingSource {
            body: b"<html><script></script></html>".to_vec(),
            reads: AtomicUsize::new(0),
        });
        let loader = AssetHtmlLoader::new(source.clone());

        let first = loader.load_template().await.unwrap();
        let second = loader.load_template().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_corrupt() {
        let source = Arc::new(CountingSource {
            body: vec![0xff, 0xfe, 0x00],
            reads: AtomicUsize::new(0),
        });
        let err = AssetHtmlLoader::new(source)
            .load_template()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssetLoadError::Corrupt { ref reason, .. } if reason.contains("UTF-8")
        ));
    }

    #[tokio::test]
    async fn test_document_without_script_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("map.html"), "<html><body></body></html>").unwrap();
        let err = AssetHtmlLoader::new(Arc::new(DirectoryAssets::new(dir.path())))
            .load_template()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssetLoadError::Corrupt { ref reason, .. } if reason.contains("<script")
        ));
    }

    #[tokio::test]
    async fn test_missing_template_is_not_found() {
        let loader = AssetHtmlLoader::with_name(Arc::new(EmbeddedAssets::new()), "missing.html");
        assert!(matches!(
            loader.load_template().await,
            Err(AssetLoadError::NotFound(_))
        ));
    }
}
