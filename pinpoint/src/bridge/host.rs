//! Boundary contract for the platform's sandboxed renderer primitive.

use std::sync::Arc;

use tokio::sync::mpsc;

/// Lifecycle and message signals emitted by a hosted renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererSignal {
    /// The page finished loading and its message listener is registered.
    LoadComplete,
    /// A raw text payload posted by the page.
    Message(String),
}

/// Sender half handed to the host when the page is loaded.
pub type SignalSender = mpsc::UnboundedSender<RendererSignal>;

/// A sandboxed web-content view with a `postMessage`-style string channel.
///
/// Implementations wrap the platform's web view. The bridge calls
/// [`load`](Self::load) once; the host then reports its load-complete event
/// and every inbound payload through `signals`.
pub trait RendererHost: Send + Sync + 'static {
    /// Instantiate the page from a complete HTML document.
    fn load(&self, html: Arc<str>, signals: SignalSender) -> Result<(), String>;

    /// Post a text payload into the page. No acknowledgment, no queuing.
    fn post_message(&self, payload: &str);
}
