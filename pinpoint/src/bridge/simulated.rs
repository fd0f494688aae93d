//! In-process stand-in for the sandboxed map page.
//!
//! [`SimulatedRenderer`] behaves like the bundled `map.html`:
//!
//! - its message listener only exists after load completion, so anything
//!   posted earlier is silently lost
//! - `recenterTo` moves the view center and the marker, and remembers the
//!   coordinate for later `recenter` commands
//! - a marker drag emits `markerMoved`
//!
//! It records every payload it was handed so tests can assert on exactly
//! what crossed the channel.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::coord::{CoordError, Coordinate};

use super::host::{RendererHost, RendererSignal, SignalSender};
use super::message::{decode, encode, BridgeMessage, Decoded};

/// Center the bundled page opens at before the host recenters it.
pub const DEFAULT_CENTER: Coordinate = Coordinate::new_unchecked(19.3, 73.0);

#[derive(Debug)]
struct SimState {
    signals: Option<SignalSender>,
    loaded: bool,
    listening: bool,
    center: Coordinate,
    marker: Coordinate,
    last_host_coordinate: Option<Coordinate>,
    received: Vec<String>,
    applied: Vec<BridgeMessage>,
    lost: usize,
}

/// A [`RendererHost`] that emulates the bundled map page in memory.
#[derive(Debug)]
pub struct SimulatedRenderer {
    auto_ready: bool,
    state: Mutex<SimState>,
}

impl Default for SimulatedRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRenderer {
    /// A renderer whose load completion is triggered manually with
    /// [`complete_load`](Self::complete_load).
    pub fn new() -> Self {
        Self::build(false)
    }

    /// A renderer that completes loading as soon as the page is handed over.
    pub fn auto_ready() -> Self {
        Self::build(true)
    }

    fn build(auto_ready: bool) -> Self {
        let center = DEFAULT_CENTER;
        Self {
            auto_ready,
            state: Mutex::new(SimState {
                signals: None,
                loaded: false,
                listening: false,
                center,
                marker: center,
                last_host_coordinate: None,
                received: Vec::new(),
                applied: Vec::new(),
                lost: 0,
            }),
        }
    }

    /// Finish loading: register the listener and signal the host.
    ///
    /// Does nothing before the page has been loaded. Calling it again
    /// re-sends the load-complete signal, as some web views do on reload.
    pub fn complete_load(&self) {
        let mut state = self.state.lock();
        if !state.loaded {
            debug!("complete_load called before the page was loaded");
            return;
        }
        state.listening = true;
        Self::emit(&state, RendererSignal::LoadComplete);
    }

    /// Simulate the user dragging the marker to `to` and releasing it.
    pub fn drag_marker_to(&self, to: Coordinate) {
        let mut state = self.state.lock();
        state.marker = to;
        if !state.listening {
            return;
        }
        if let Ok(payload) = encode(&BridgeMessage::MarkerMoved(to)) {
            Self::emit(&state, RendererSignal::Message(payload));
        }
    }

    /// Simulate a drag that ends at a raw map position, possibly on a
    /// neighbouring world copy (longitude past +/-180).
    ///
    /// The longitude is wrapped back into range the way the bundled page
    /// does before posting. Fails only for an out-of-range latitude.
    pub fn drag_marker_across(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Coordinate, CoordError> {
        let to = Coordinate::new(latitude, wrap_longitude(longitude))?;
        self.drag_marker_to(to);
        Ok(to)
    }

    /// Post an arbitrary raw payload to the host.
    pub fn emit_raw(&self, payload: &str) {
        let state = self.state.lock();
        Self::emit(&state, RendererSignal::Message(payload.to_string()));
    }

    /// Current marker position.
    pub fn marker_position(&self) -> Coordinate {
        self.state.lock().marker
    }

    /// Current view center.
    pub fn center(&self) -> Coordinate {
        self.state.lock().center
    }

    /// Whether the host has loaded the page.
    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }

    /// Whether the page's message listener is registered.
    pub fn is_listening(&self) -> bool {
        self.state.lock().listening
    }

    /// Every payload posted by the host, including lost ones.
    pub fn received(&self) -> Vec<String> {
        self.state.lock().received.clone()
    }

    /// Commands the page actually acted on.
    pub fn applied_commands(&self) -> Vec<BridgeMessage> {
        self.state.lock().applied.clone()
    }

    /// Number of payloads posted before the listener existed.
    pub fn lost_messages(&self) -> usize {
        self.state.lock().lost
    }

    fn emit(state: &SimState, signal: RendererSignal) {
        if let Some(signals) = &state.signals {
            // The host may have torn down; nothing to deliver to.
            let _ = signals.send(signal);
        }
    }
}

/// Wrap a longitude into [-180, 180], keeping exactly 180 as is.
fn wrap_longitude(longitude: f64) -> f64 {
    if longitude == 180.0 {
        return longitude;
    }
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

impl RendererHost for SimulatedRenderer {
    fn load(&self, html: Arc<str>, signals: SignalSender) -> Result<(), String> {
        let mut state = self.state.lock();
        if state.loaded {
            return Err("page already loaded".to_string());
        }
        debug!(bytes = html.len(), "Simulated renderer loading page");
        state.signals = Some(signals);
        state.loaded = true;
        if self.auto_ready {
            state.listening = true;
            Self::emit(&state, RendererSignal::LoadComplete);
        }
        Ok(())
    }

    fn post_message(&self, payload: &str) {
        let mut state = self.state.lock();
        state.received.push(payload.to_string());

        if !state.listening {
            state.lost += 1;
            return;
        }

        let Ok(Decoded::Message(message)) = decode(payload) else {
            return;
        };

        match message {
            BridgeMessage::RecenterTo(c) => {
                state.last_host_coordinate = Some(c);
                state.center = c;
                state.marker = c;
            }
            BridgeMessage::Recenter => match state.last_host_coordinate {
                Some(c) => {
                    state.center = c;
                    state.marker = c;
                }
                None => return,
            },
            BridgeMessage::MarkerMoved(_) => return,
        }
        state.applied.push(message);
    }
}
