//! Typed channel to the sandboxed renderer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::host::{RendererHost, RendererSignal};
use super::message::{decode, encode, BridgeMessage, Decoded, Direction, MalformedMessage};

/// Errors returned by [`RendererBridge`] operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Renderer bridge is already initialized")]
    AlreadyInitialized,

    #[error("Renderer bridge is not initialized")]
    NotInitialized,

    #[error("Renderer host failed to load the page: {0}")]
    Host(String),

    #[error("Failed to encode bridge message: {0}")]
    Encode(#[from] serde_json::Error),
}

type ReadyCallback = Arc<dyn Fn() + Send + Sync>;
type EventCallback = Arc<dyn Fn(BridgeMessage) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    ready: Vec<(u64, ReadyCallback)>,
    events: Vec<(u64, EventCallback)>,
}

/// State shared between the bridge, its pump task and subscriptions.
#[derive(Default)]
struct Shared {
    registry: Mutex<Registry>,
    ready: AtomicBool,
    dropped: AtomicU64,
}

impl Shared {
    fn dispatch(&self, signal: RendererSignal) {
        match signal {
            RendererSignal::LoadComplete => self.mark_ready(),
            RendererSignal::Message(raw) => self.dispatch_raw(&raw),
        }
    }

    fn mark_ready(&self) {
        if self.ready.swap(true, Ordering::SeqCst) {
            debug!("Duplicate renderer load-complete ignored");
            return;
        }
        info!("Renderer ready");

        // Each ready callback fires once; take them out of the registry.
        let callbacks: Vec<ReadyCallback> = {
            let mut registry = self.registry.lock();
            registry.ready.drain(..).map(|(_, cb)| cb).collect()
        };
        for cb in callbacks {
            cb();
        }
    }

    fn dispatch_raw(&self, raw: &str) {
        let message = match decode(raw) {
            Ok(Decoded::Message(message)) => message,
            Ok(Decoded::Unrecognized(message_type)) => {
                debug!(message_type = %message_type, "Ignoring unrecognized renderer message");
                return;
            }
            Err(e) => {
                self.drop_message(raw, &e);
                return;
            }
        };

        if message.direction() != Direction::RendererToHost {
            self.drop_message(raw, &MalformedMessage::UnexpectedDirection(message.type_name()));
            return;
        }

        let callbacks: Vec<EventCallback> = self
            .registry
            .lock()
            .events
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for cb in callbacks {
            cb(message);
        }
    }

    fn drop_message(&self, raw: &str, reason: &MalformedMessage) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        // Truncate: the payload is untrusted and may be arbitrarily large.
        let preview: String = raw.chars().take(120).collect();
        warn!(reason = %reason, payload = %preview, "Dropping malformed renderer message");
    }

    fn remove(&self, kind: SubscriptionKind, id: u64) {
        let mut registry = self.registry.lock();
        match kind {
            SubscriptionKind::Ready => registry.ready.retain(|(i, _)| *i != id),
            SubscriptionKind::Event => registry.events.retain(|(i, _)| *i != id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubscriptionKind {
    Ready,
    Event,
}

/// Registration handle returned by [`RendererBridge::on_ready`] and
/// [`RendererBridge::on_event`].
///
/// The callback stays registered until the handle is unsubscribed or
/// dropped.
#[must_use = "dropping a Subscription unregisters its callback"]
pub struct Subscription {
    kind: SubscriptionKind,
    id: u64,
    shared: Weak<Shared>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}

impl Subscription {
    /// Unregister the callback now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.remove(self.kind, self.id);
        }
    }
}

/// Sole channel between the host and the sandboxed renderer.
///
/// `send` is fire-and-forget: the bridge neither queues nor confirms
/// delivery, and a message posted before the renderer is ready is lost.
/// Inbound payloads are decoded here; malformed ones are logged and dropped
/// and never reach subscribers.
pub struct RendererBridge {
    host: Arc<dyn RendererHost>,
    shared: Arc<Shared>,
    initialized: AtomicBool,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for RendererBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererBridge")
            .field("initialized", &self.is_initialized())
            .field("ready", &self.is_ready())
            .field("dropped_messages", &self.dropped_messages())
            .finish_non_exhaustive()
    }
}

impl RendererBridge {
    /// Create an uninitialized bridge over `host`.
    pub fn new(host: Arc<dyn RendererHost>) -> Self {
        Self {
            host,
            shared: Arc::new(Shared::default()),
            initialized: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// Load `template` into the renderer and start pumping its signals.
    ///
    /// One-time: a second call fails with [`BridgeError::AlreadyInitialized`].
    /// Must be called from within a Tokio runtime.
    pub fn initialize(&self, template: Arc<str>) -> Result<(), BridgeError> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BridgeError::AlreadyInitialized);
        }

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        tokio::spawn(pump(
            signal_rx,
            Arc::clone(&self.shared),
            self.shutdown.clone(),
        ));

        debug!(bytes = template.len(), "Loading renderer page");
        self.host.load(template, signal_tx).map_err(BridgeError::Host)
    }

    /// Encode and post a message into the renderer.
    pub fn send(&self, message: &BridgeMessage) -> Result<(), BridgeError> {
        if !self.is_initialized() {
            return Err(BridgeError::NotInitialized);
        }
        let payload = encode(message)?;
        if !self.is_ready() {
            // Not an error: the bridge does not own ordering.
            debug!(
                message_type = message.type_name(),
                "Posting before renderer is ready; message will be lost"
            );
        }
        debug!(payload = %payload, "Posting to renderer");
        self.host.post_message(&payload);
        Ok(())
    }

    /// Register a callback for the renderer's load-complete signal.
    ///
    /// Fires once. If the renderer is already ready, fires immediately.
    pub fn on_ready<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = {
            let mut registry = self.shared.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            if !self.shared.ready.load(Ordering::SeqCst) {
                registry.ready.push((id, Arc::new(callback)));
                return self.subscription(SubscriptionKind::Ready, id);
            }
            id
        };
        callback();
        self.subscription(SubscriptionKind::Ready, id)
    }

    /// Register a callback for every valid inbound message.
    pub fn on_event<F>(&self, callback: F) -> Subscription
    where
        F: Fn(BridgeMessage) + Send + Sync + 'static,
    {
        let mut registry = self.shared.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.events.push((id, Arc::new(callback)));
        drop(registry);
        self.subscription(SubscriptionKind::Event, id)
    }

    /// Whether [`initialize`](Self::initialize) has been called.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Whether the renderer has signaled load completion.
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::SeqCst)
    }

    /// Number of inbound payloads dropped as malformed.
    pub fn dropped_messages(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Stop the signal pump. Subsequent renderer signals are ignored.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn subscription(&self, kind: SubscriptionKind, id: u64) -> Subscription {
        Subscription {
            kind,
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }
}

impl Drop for RendererBridge {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn pump(
    mut signals: mpsc::UnboundedReceiver<RendererSignal>,
    shared: Arc<Shared>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            signal = signals.recv() => match signal {
                Some(signal) => shared.dispatch(signal),
                None => break,
            },
        }
    }
    debug!("Renderer signal pump stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::SimulatedRenderer;
    use crate::coord::Coordinate;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    const PAGE: &str = "<html><script></script></html>";

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_initialize_is_one_time() {
        let renderer = Arc::new(SimulatedRenderer::new());
        let bridge = RendererBridge::new(renderer);
        bridge.initialize(Arc::from(PAGE)).unwrap();
        assert!(matches!(
            bridge.initialize(Arc::from(PAGE)),
            Err(BridgeError::AlreadyInitialized)
        ));
    }

    #[tokio::test]
    async fn test_send_before_initialize_fails() {
        let bridge = RendererBridge::new(Arc::new(SimulatedRenderer::new()));
        assert!(matches!(
            bridge.send(&BridgeMessage::Recenter),
            Err(BridgeError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_ready_fires_once_even_on_duplicate_signal() {
        let renderer = Arc::new(SimulatedRenderer::new());
        let bridge = RendererBridge::new(renderer.clone());
        let count = Arc::new(AtomicUsize::new(0));
        let _sub = {
            let count = Arc::clone(&count);
            bridge.on_ready(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        bridge.initialize(Arc::from(PAGE)).unwrap();
        renderer.complete_load();
        renderer.complete_load();
        settle().await;

        assert!(bridge.is_ready());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_on_ready_after_ready_fires_immediately() {
        let renderer = Arc::new(SimulatedRenderer::auto_ready());
        let bridge = RendererBridge::new(renderer);
        bridge.initialize(Arc::from(PAGE)).unwrap();
        settle().await;

        let fired = Arc::new(AtomicBool::new(false));
        let _sub = {
            let fired = Arc::clone(&fired);
            bridge.on_ready(move || fired.store(true, Ordering::SeqCst))
        };
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_malformed_messages_are_dropped() {
        let renderer = Arc::new(SimulatedRenderer::auto_ready());
        let bridge = RendererBridge::new(renderer.clone());
        let events = Arc::new(Mutex::new(Vec::new()));
        let _sub = {
            let events = Arc::clone(&events);
            bridge.on_event(move |msg| events.lock().push(msg))
        };
        bridge.initialize(Arc::from(PAGE)).unwrap();

        renderer.emit_raw("not json");
        renderer.emit_raw(r#"{"latitude":1.0,"longitude":2.0}"#);
        renderer.emit_raw(r#"{"type":"recenterTo","latitude":1.0,"longitude":2.0}"#);
        renderer.emit_raw(r#"{"type":"somethingNew"}"#);
        renderer.drag_marker_to(coord(19.31, 73.02));
        settle().await;

        assert_eq!(
            *events.lock(),
            vec![BridgeMessage::MarkerMoved(coord(19.31, 73.02))]
        );
        assert_eq!(bridge.dropped_messages(), 3);
    }

    #[tokio::test]
    async fn test_dropped_subscription_stops_delivery() {
        let renderer = Arc::new(SimulatedRenderer::auto_ready());
        let bridge = RendererBridge::new(renderer.clone());
        let count = Arc::new(AtomicUsize::new(0));
        let sub = {
            let count = Arc::clone(&count);
            bridge.on_event(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        bridge.initialize(Arc::from(PAGE)).unwrap();

        renderer.drag_marker_to(coord(1.0, 1.0));
        settle().await;
        sub.unsubscribe();
        renderer.drag_marker_to(coord(2.0, 2.0));
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_posts_encoded_payload() {
        let renderer = Arc::new(SimulatedRenderer::auto_ready());
        let bridge = RendererBridge::new(renderer.clone());
        bridge.initialize(Arc::from(PAGE)).unwrap();

        bridge
            .send(&BridgeMessage::RecenterTo(coord(19.3, 73.0)))
            .unwrap();

        assert_eq!(
            renderer.received(),
            vec![r#"{"type":"recenterTo","latitude":19.3,"longitude":73.0}"#.to_string()]
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_dispatch() {
        let renderer = Arc::new(SimulatedRenderer::new());
        let bridge = RendererBridge::new(renderer.clone());
        bridge.initialize(Arc::from(PAGE)).unwrap();
        bridge.shutdown();
        settle().await;

        renderer.complete_load();
        settle().await;
        assert!(!bridge.is_ready());
    }
}
