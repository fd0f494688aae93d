//! Readiness state machine for the location picker.
//!
//! [`PickerMachine`] is a pure, synchronous reducer. Each input is one
//! completion from an asynchronous source; the return value is the message,
//! if any, that must be posted to the renderer as a consequence. The actor in
//! [`super::coordinator`] feeds it one input at a time.
//!
//! # State Machine
//!
//! ```text
//! Init ──mount──► AwaitingBoth ──(position ∧ renderer ready)──► Active
//!                     │                                         (sends one RecenterTo)
//!                     ├──permission denied──► PermissionDenied   (terminal)
//!                     └──asset / fetch / renderer failure──► Error (terminal)
//! ```
//!
//! The join into `Active` is order-independent. Whichever of the two
//! conditions arrives first is recorded; the initial recenter is buffered in
//! `pending_recenter` (latest wins) and flushed exactly once on the
//! transition. Duplicate ready signals and late coordinates after `Active`
//! are ignored.

use tracing::{debug, info, warn};

use crate::bridge::BridgeMessage;
use crate::coord::Coordinate;
use crate::location::{LocationError, PermissionState};

use super::error::ConfirmRejected;

/// Picker lifecycle phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerPhase {
    /// Constructed, sources not started yet.
    Init,
    /// Waiting for the device position and the renderer.
    AwaitingBoth,
    /// Map is interactive; recenter and confirm are available.
    Active,
    /// The user declined location access. Terminal.
    PermissionDenied,
    /// An unrecoverable failure. Terminal.
    Error(PickerFailure),
}

impl PickerPhase {
    /// Whether no further transitions can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PickerPhase::PermissionDenied | PickerPhase::Error(_))
    }

    /// Short label for logs and UI.
    pub fn label(&self) -> &'static str {
        match self {
            PickerPhase::Init => "init",
            PickerPhase::AwaitingBoth => "awaiting",
            PickerPhase::Active => "active",
            PickerPhase::PermissionDenied => "permission-denied",
            PickerPhase::Error(_) => "error",
        }
    }
}

/// Reason the picker entered [`PickerPhase::Error`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PickerFailure {
    #[error("Failed to load map: {0}")]
    AssetLoad(String),

    #[error("Failed to get location. Please try again ({0})")]
    PositionUnavailable(String),

    #[error("Map renderer unavailable: {0}")]
    Renderer(String),
}

/// Renderer readiness. Monotonic: `Loading` → `Ready`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RendererReadiness {
    #[default]
    Loading,
    Ready,
}

/// Which command a manual recenter posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecenterCommand {
    /// `RecenterTo(last known device coordinate)`.
    #[default]
    Explicit,
    /// `Recenter`, letting the renderer reuse its last host coordinate.
    Implicit,
}

impl RecenterCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecenterCommand::Explicit => "explicit",
            RecenterCommand::Implicit => "implicit",
        }
    }
}

impl std::str::FromStr for RecenterCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "explicit" => Ok(RecenterCommand::Explicit),
            "implicit" => Ok(RecenterCommand::Implicit),
            other => Err(format!(
                "invalid recenter command '{}' (expected 'explicit' or 'implicit')",
                other
            )),
        }
    }
}

/// Point-in-time view of the picker, published after every transition.
#[derive(Debug, Clone, PartialEq)]
pub struct PickerSnapshot {
    pub phase: PickerPhase,
    pub permission: PermissionState,
    pub readiness: RendererReadiness,
    /// Renderer template handed to the bridge.
    pub template_loaded: bool,
    /// Last coordinate fetched from the location service.
    pub device_position: Option<Coordinate>,
    /// Coordinate a confirm would report.
    pub selected: Option<Coordinate>,
    /// Initial recenter waiting for the renderer.
    pub pending_recenter: Option<Coordinate>,
}

impl PickerSnapshot {
    /// Whether a confirm would currently succeed.
    pub fn can_confirm(&self) -> bool {
        self.phase == PickerPhase::Active && self.selected.is_some()
    }
}

/// The picker's readiness/selection reducer.
#[derive(Debug)]
pub struct PickerMachine {
    phase: PickerPhase,
    permission: PermissionState,
    readiness: RendererReadiness,
    template_loaded: bool,
    device_position: Option<Coordinate>,
    selected: Option<Coordinate>,
    pending_recenter: Option<Coordinate>,
    recenter_command: RecenterCommand,
}

impl Default for PickerMachine {
    fn default() -> Self {
        Self::new(RecenterCommand::default())
    }
}

impl PickerMachine {
    pub fn new(recenter_command: RecenterCommand) -> Self {
        Self {
            phase: PickerPhase::Init,
            permission: PermissionState::Unknown,
            readiness: RendererReadiness::Loading,
            template_loaded: false,
            device_position: None,
            selected: None,
            pending_recenter: None,
            recenter_command,
        }
    }

    pub fn phase(&self) -> &PickerPhase {
        &self.phase
    }

    pub fn selected(&self) -> Option<Coordinate> {
        self.selected
    }

    pub fn readiness(&self) -> RendererReadiness {
        self.readiness
    }

    /// Current state as a snapshot.
    pub fn snapshot(&self) -> PickerSnapshot {
        PickerSnapshot {
            phase: self.phase.clone(),
            permission: self.permission,
            readiness: self.readiness,
            template_loaded: self.template_loaded,
            device_position: self.device_position,
            selected: self.selected,
            pending_recenter: self.pending_recenter,
        }
    }

    /// `Init → AwaitingBoth`. Called once, before any source is started.
    pub fn mount(&mut self) {
        if self.phase != PickerPhase::Init {
            debug!(phase = self.phase.label(), "Mount ignored: already mounted");
            return;
        }
        self.transition(PickerPhase::AwaitingBoth);
    }

    /// The location service produced a coordinate.
    pub fn position_resolved(&mut self, coordinate: Coordinate) -> Option<BridgeMessage> {
        if self.phase.is_terminal() {
            debug!(phase = self.phase.label(), "Position ignored in terminal phase");
            return None;
        }
        if self.phase == PickerPhase::Active {
            debug!(
                latitude = coordinate.latitude(),
                longitude = coordinate.longitude(),
                "Late position ignored: picker already active"
            );
            return None;
        }

        self.permission = PermissionState::Granted;
        self.device_position = Some(coordinate);
        self.selected = Some(coordinate);
        if self.pending_recenter.replace(coordinate).is_some() {
            debug!("Replaced buffered recenter with newer position");
        }
        self.try_activate()
    }

    /// The location service failed.
    pub fn position_failed(&mut self, error: &LocationError) {
        if self.phase.is_terminal() || self.phase == PickerPhase::Active {
            debug!(phase = self.phase.label(), error = %error, "Position failure ignored");
            return;
        }
        match error {
            LocationError::PermissionDenied => {
                self.permission = PermissionState::Denied;
                self.transition(PickerPhase::PermissionDenied);
            }
            LocationError::PositionUnavailable(reason) => {
                self.permission = PermissionState::Granted;
                self.fail(PickerFailure::PositionUnavailable(reason.clone()));
            }
            // Only `open_settings` produces this; it says nothing about the fetch.
            LocationError::SettingsUnavailable(reason) => {
                warn!(reason = %reason, "Settings error reported as a position failure; ignored");
            }
        }
    }

    /// The renderer template was handed to the bridge.
    pub fn template_loaded(&mut self) {
        self.template_loaded = true;
    }

    /// The renderer template could not be resolved.
    pub fn template_failed(&mut self, reason: String) {
        self.fail(PickerFailure::AssetLoad(reason));
    }

    /// The renderer host refused the page.
    pub fn renderer_failed(&mut self, reason: String) {
        self.fail(PickerFailure::Renderer(reason));
    }

    /// The renderer signaled load completion.
    pub fn renderer_ready(&mut self) -> Option<BridgeMessage> {
        if self.readiness == RendererReadiness::Ready {
            debug!("Duplicate renderer ready ignored");
            return None;
        }
        self.readiness = RendererReadiness::Ready;
        info!(phase = self.phase.label(), "Renderer is ready");
        self.try_activate()
    }

    /// The user dropped the marker at `coordinate`.
    pub fn marker_moved(&mut self, coordinate: Coordinate) {
        if self.phase != PickerPhase::Active {
            debug!(phase = self.phase.label(), "Marker move ignored: picker not active");
            return;
        }
        debug!(
            latitude = coordinate.latitude(),
            longitude = coordinate.longitude(),
            "Selected location updated from marker"
        );
        self.selected = Some(coordinate);
    }

    /// Manual recenter gesture. Idempotent.
    pub fn recenter_requested(&mut self) -> Option<BridgeMessage> {
        if self.phase != PickerPhase::Active {
            debug!(phase = self.phase.label(), "Recenter ignored: picker not active");
            return None;
        }
        let device = self.device_position?;
        // The renderer moves its marker back; keep the selection in step.
        self.selected = Some(device);
        Some(match self.recenter_command {
            RecenterCommand::Explicit => BridgeMessage::RecenterTo(device),
            RecenterCommand::Implicit => BridgeMessage::Recenter,
        })
    }

    /// Confirm the selection. Does not change state.
    pub fn confirm(&self) -> Result<Coordinate, ConfirmRejected> {
        if self.phase != PickerPhase::Active {
            return Err(ConfirmRejected::NotActive);
        }
        self.selected.ok_or(ConfirmRejected::NoSelection)
    }

    fn try_activate(&mut self) -> Option<BridgeMessage> {
        if self.phase != PickerPhase::AwaitingBoth || self.readiness != RendererReadiness::Ready {
            return None;
        }
        let target = self.pending_recenter.take()?;
        self.transition(PickerPhase::Active);
        Some(BridgeMessage::RecenterTo(target))
    }

    fn fail(&mut self, failure: PickerFailure) {
        if self.phase.is_terminal() {
            debug!(
                phase = self.phase.label(),
                failure = %failure,
                "Failure ignored in terminal phase"
            );
            return;
        }
        warn!(failure = %failure, "Location picker failed");
        self.pending_recenter = None;
        self.transition(PickerPhase::Error(failure));
    }

    fn transition(&mut self, next: PickerPhase) {
        info!(from = self.phase.label(), to = next.label(), "Picker transition");
        self.phase = next;
    }
}
