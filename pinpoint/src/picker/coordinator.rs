//! The location picker actor and its handle.
//!
//! [`LocationPicker::mount`] spawns one actor task that owns the
//! [`PickerMachine`] and the [`RendererBridge`]. Every asynchronous
//! completion (position fetch, template load, renderer signals, user
//! commands) is posted into the actor's channel as a [`PickerEvent`] and
//! handled to completion before the next one.
//!
//! ```text
//!  location task ──┐
//!  template task ──┤                    ┌──────────────┐
//!  bridge on_ready ┼──► PickerEvent ──► │ PickerActor  │──► RendererBridge::send
//!  bridge on_event ┤      (mpsc)        │ PickerMachine│──► watch<PickerSnapshot>
//!  handle commands ┘                    └──────────────┘──► LocationConfirmedHandler
//! ```
//!
//! Unmount cancels a shared [`CancellationToken`]. The actor stops draining
//! its channel at once, so completions that arrive afterwards are discarded
//! without touching state.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::asset::{AssetHtmlLoader, AssetSource};
use crate::bridge::{BridgeMessage, RendererBridge, RendererHost, Subscription};
use crate::config::PickerConfig;
use crate::coord::Coordinate;
use crate::location::{LocationError, PermissionLocationService, PlatformLocation};

use super::error::{ConfirmRejected, PickerError};
use super::state::{PickerMachine, PickerPhase, PickerSnapshot};

/// Receives the coordinate chosen by the user.
///
/// Invoked at most once per successful confirm, on the picker's actor task.
pub trait LocationConfirmedHandler: Send + Sync + 'static {
    fn on_location_confirmed(&self, coordinate: Coordinate);
}

impl<F> LocationConfirmedHandler for F
where
    F: Fn(Coordinate) + Send + Sync + 'static,
{
    fn on_location_confirmed(&self, coordinate: Coordinate) {
        self(coordinate)
    }
}

type ConfirmReply = oneshot::Sender<Result<Coordinate, ConfirmRejected>>;

/// Inputs to the picker actor.
#[derive(Debug)]
enum PickerEvent {
    PositionResolved(Coordinate),
    PositionFailed(LocationError),
    TemplateLoaded(Arc<str>),
    TemplateFailed(String),
    RendererReady,
    Renderer(BridgeMessage),
    Recenter,
    Confirm(ConfirmReply),
}

/// Builder for a location picker session.
pub struct LocationPicker {
    platform: Arc<dyn PlatformLocation>,
    assets: Arc<dyn AssetSource>,
    renderer: Arc<dyn RendererHost>,
    config: PickerConfig,
}

impl std::fmt::Debug for LocationPicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationPicker")
            .field("assets", &self.assets.describe())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LocationPicker {
    /// Create a picker over the three platform collaborators.
    pub fn new(
        platform: Arc<dyn PlatformLocation>,
        assets: Arc<dyn AssetSource>,
        renderer: Arc<dyn RendererHost>,
    ) -> Self {
        Self {
            platform,
            assets,
            renderer,
            config: PickerConfig::default(),
        }
    }

    /// Replace the default configuration.
    pub fn with_config(mut self, config: PickerConfig) -> Self {
        self.config = config;
        self
    }

    /// Mount the picker: start the position fetch and the template load
    /// concurrently and return a handle to the running session.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount<H>(self, on_confirmed: H) -> LocationPickerHandle
    where
        H: LocationConfirmedHandler,
    {
        let Self {
            platform,
            assets,
            renderer,
            config,
        } = self;

        let service = Arc::new(PermissionLocationService::with_accuracy(
            platform,
            config.accuracy,
        ));
        let loader = AssetHtmlLoader::with_name(assets, config.template.clone());

        let mut machine = PickerMachine::new(config.recenter_command);
        machine.mount();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());
        let cancel = CancellationToken::new();

        let actor = PickerActor {
            machine,
            renderer,
            bridge: None,
            subscriptions: Vec::new(),
            events: event_tx.clone(),
            snapshots: snapshot_tx,
            on_confirmed: Arc::new(on_confirmed),
        };
        let task = tokio::spawn(actor.run(event_rx, cancel.clone()));

        spawn_position_fetch(Arc::clone(&service), event_tx.clone(), cancel.clone());
        spawn_template_load(loader, event_tx.clone(), cancel.clone());

        info!(
            template = %config.template,
            accuracy = ?config.accuracy,
            recenter = config.recenter_command.as_str(),
            "Location picker mounted"
        );

        LocationPickerHandle {
            events: event_tx,
            snapshots: snapshot_rx,
            service,
            cancel,
            task: Some(task),
        }
    }
}

fn spawn_position_fetch(
    service: Arc<PermissionLocationService>,
    events: mpsc::UnboundedSender<PickerEvent>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Position fetch abandoned: picker unmounted");
            }
            result = service.request_position() => {
                let event = match result {
                    Ok(coordinate) => PickerEvent::PositionResolved(coordinate),
                    Err(e) => PickerEvent::PositionFailed(e),
                };
                // Closed channel means the actor is gone; nothing to update.
                let _ = events.send(event);
            }
        }
    });
}

fn spawn_template_load(
    loader: AssetHtmlLoader,
    events: mpsc::UnboundedSender<PickerEvent>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Template load abandoned: picker unmounted");
            }
            result = loader.load_template() => {
                let event = match result {
                    Ok(template) => PickerEvent::TemplateLoaded(template),
                    Err(e) => PickerEvent::TemplateFailed(e.to_string()),
                };
                let _ = events.send(event);
            }
        }
    });
}

/// Owns all picker state. Runs on a single task.
struct PickerActor {
    machine: PickerMachine,
    renderer: Arc<dyn RendererHost>,
    bridge: Option<RendererBridge>,
    subscriptions: Vec<Subscription>,
    events: mpsc::UnboundedSender<PickerEvent>,
    snapshots: watch::Sender<PickerSnapshot>,
    on_confirmed: Arc<dyn LocationConfirmedHandler>,
}

impl PickerActor {
    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<PickerEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                Some(event) = events.recv() => {
                    self.handle(event);
                    self.snapshots.send_replace(self.machine.snapshot());
                }
            }
        }

        // Unregister first so no callback can post into a closing channel.
        self.subscriptions.clear();
        if let Some(bridge) = self.bridge.take() {
            bridge.shutdown();
        }
        info!(phase = self.machine.phase().label(), "Location picker unmounted");
    }

    fn handle(&mut self, event: PickerEvent) {
        match event {
            PickerEvent::PositionResolved(coordinate) => {
                let command = self.machine.position_resolved(coordinate);
                self.post(command);
            }
            PickerEvent::PositionFailed(error) => self.machine.position_failed(&error),
            PickerEvent::TemplateLoaded(template) => self.attach_renderer(template),
            PickerEvent::TemplateFailed(reason) => self.machine.template_failed(reason),
            PickerEvent::RendererReady => {
                let command = self.machine.renderer_ready();
                self.post(command);
            }
            PickerEvent::Renderer(BridgeMessage::MarkerMoved(coordinate)) => {
                self.machine.marker_moved(coordinate)
            }
            PickerEvent::Renderer(other) => {
                debug!(message_type = other.type_name(), "Ignoring renderer message");
            }
            PickerEvent::Recenter => {
                let command = self.machine.recenter_requested();
                self.post(command);
            }
            PickerEvent::Confirm(reply) => {
                let result = self.machine.confirm();
                match result {
                    Ok(coordinate) => {
                        info!(
                            latitude = coordinate.latitude(),
                            longitude = coordinate.longitude(),
                            "Location confirmed"
                        );
                        self.on_confirmed.on_location_confirmed(coordinate);
                    }
                    Err(reason) => debug!(reason = %reason, "Confirm rejected"),
                }
                let _ = reply.send(result);
            }
        }
    }

    /// Build the bridge, hook its callbacks into the event channel and load
    /// the page.
    fn attach_renderer(&mut self, template: Arc<str>) {
        self.machine.template_loaded();
        if self.machine.phase().is_terminal() {
            debug!(phase = self.machine.phase().label(), "Not loading renderer in terminal phase");
            return;
        }
        if self.bridge.is_some() {
            debug!("Renderer already attached");
            return;
        }

        let bridge = RendererBridge::new(Arc::clone(&self.renderer));

        let ready_tx = self.events.clone();
        self.subscriptions.push(bridge.on_ready(move || {
            let _ = ready_tx.send(PickerEvent::RendererReady);
        }));
        let event_tx = self.events.clone();
        self.subscriptions.push(bridge.on_event(move |message| {
            let _ = event_tx.send(PickerEvent::Renderer(message));
        }));

        let result = bridge.initialize(template);
        self.bridge = Some(bridge);
        if let Err(e) = result {
            self.machine.renderer_failed(e.to_string());
        }
    }

    fn post(&self, command: Option<BridgeMessage>) {
        let Some(message) = command else {
            return;
        };
        let Some(bridge) = self.bridge.as_ref() else {
            warn!(message_type = message.type_name(), "No renderer attached; command dropped");
            return;
        };
        if let Err(e) = bridge.send(&message) {
            warn!(error = %e, message_type = message.type_name(), "Failed to post to renderer");
        }
    }
}

/// Handle to a mounted picker. Dropping it unmounts the picker.
pub struct LocationPickerHandle {
    events: mpsc::UnboundedSender<PickerEvent>,
    snapshots: watch::Receiver<PickerSnapshot>,
    service: Arc<PermissionLocationService>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for LocationPickerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationPickerHandle")
            .field("snapshot", &*self.snapshots.borrow())
            .field("unmounted", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl LocationPickerHandle {
    /// Latest published state.
    pub fn snapshot(&self) -> PickerSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified after every subsequent transition.
    pub fn subscribe(&self) -> watch::Receiver<PickerSnapshot> {
        let mut rx = self.snapshots.clone();
        let _ = rx.borrow_and_update();
        rx
    }

    /// Wait until the published state satisfies `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<PickerSnapshot, PickerError>
    where
        F: FnMut(&PickerSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| PickerError::Unmounted)?;
        Ok(snapshot.clone())
    }

    /// Whether a confirm would currently succeed.
    pub fn can_confirm(&self) -> bool {
        self.snapshots.borrow().can_confirm()
    }

    /// Ask the renderer to move back to the device position.
    ///
    /// Ignored unless the picker is active.
    pub fn recenter(&self) -> Result<(), PickerError> {
        self.command(PickerEvent::Recenter)
    }

    /// Confirm the current selection, invoking the confirmed handler.
    pub async fn confirm(&self) -> Result<Coordinate, PickerError> {
        let (tx, rx) = oneshot::channel();
        self.command(PickerEvent::Confirm(tx))?;
        let result = rx.await.map_err(|_| PickerError::Unmounted)?;
        Ok(result?)
    }

    /// Open the OS location settings. Only offered after a permission denial.
    pub fn open_settings(&self) -> Result<(), PickerError> {
        if self.cancel.is_cancelled() {
            return Err(PickerError::Unmounted);
        }
        if self.snapshots.borrow().phase != PickerPhase::PermissionDenied {
            return Err(PickerError::NotPermissionDenied);
        }
        info!("Opening location settings");
        Ok(self.service.open_settings()?)
    }

    /// Tear the picker down and wait for the actor to stop.
    pub async fn unmount(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Picker actor ended abnormally");
            }
        }
    }

    fn command(&self, event: PickerEvent) -> Result<(), PickerError> {
        if self.cancel.is_cancelled() {
            return Err(PickerError::Unmounted);
        }
        self.events.send(event).map_err(|_| PickerError::Unmounted)
    }
}

impl Drop for LocationPickerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::EmbeddedAssets;
    use crate::bridge::SimulatedRenderer;
    use crate::location::{FixedLocation, FixedOutcome, RawPosition};
    use parking_lot::Mutex;

    fn mount_auto(outcome: FixedOutcome) -> (LocationPickerHandle, Arc<SimulatedRenderer>) {
        let renderer = Arc::new(SimulatedRenderer::auto_ready());
        let picker = LocationPicker::new(
            Arc::new(FixedLocation::new(outcome)),
            Arc::new(EmbeddedAssets),
            renderer.clone(),
        );
        (picker.mount(|_| {}), renderer)
    }

    #[tokio::test]
    async fn test_reaches_active_and_recenters_once() {
        let (handle, renderer) =
            mount_auto(FixedOutcome::Position(RawPosition::new(19.3, 73.0)));

        let snapshot = handle
            .wait_for(|s| s.phase == PickerPhase::Active)
            .await
            .unwrap();

        assert!(snapshot.can_confirm());
        assert_eq!(
            renderer.applied_commands(),
            vec![BridgeMessage::RecenterTo(Coordinate::new(19.3, 73.0).unwrap())]
        );
        handle.unmount().await;
    }

    #[tokio::test]
    async fn test_confirm_invokes_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let renderer = Arc::new(SimulatedRenderer::auto_ready());
        let handle = LocationPicker::new(
            Arc::new(FixedLocation::new(FixedOutcome::Position(RawPosition::new(1.5, 2.5)))),
            Arc::new(EmbeddedAssets),
            renderer,
        )
        .mount(move |c| sink.lock().push(c));

        handle.wait_for(|s| s.can_confirm()).await.unwrap();
        let confirmed = handle.confirm().await.unwrap();

        assert_eq!(confirmed, Coordinate::new(1.5, 2.5).unwrap());
        assert_eq!(*seen.lock(), vec![confirmed]);
        assert_eq!(handle.snapshot().phase, PickerPhase::Active);
    }

    #[tokio::test]
    async fn test_open_settings_requires_denial() {
        let (handle, _) = mount_auto(FixedOutcome::Position(RawPosition::new(1.0, 1.0)));
        handle.wait_for(|s| s.phase == PickerPhase::Active).await.unwrap();
        assert_eq!(handle.open_settings(), Err(PickerError::NotPermissionDenied));
    }

    #[tokio::test]
    async fn test_commands_after_unmount_fail() {
        let (handle, _) = mount_auto(FixedOutcome::Denied);
        handle
            .wait_for(|s| s.phase == PickerPhase::PermissionDenied)
            .await
            .unwrap();
        handle.cancel.cancel();
        assert_eq!(handle.recenter(), Err(PickerError::Unmounted));
        assert_eq!(handle.confirm().await, Err(PickerError::Unmounted));
    }
}
