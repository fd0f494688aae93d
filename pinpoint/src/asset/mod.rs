//! Renderer template loading.
//!
//! The renderer's whole executable payload is a single HTML document. The
//! [`AssetHtmlLoader`] resolves it from an [`AssetSource`] exactly once per
//! view lifetime and hands out the same immutable string afterwards.
//!
//! Two sources ship with the crate:
//! - [`EmbeddedAssets`] - the bundled `map.html`, compiled into the binary
//! - [`DirectoryAssets`] - a filesystem directory, for development overrides

mod loader;
mod source;

pub use loader::{AssetHtmlLoader, DEFAULT_TEMPLATE_NAME};
pub use source::{AssetLoadError, AssetSource, DirectoryAssets, EmbeddedAssets};
