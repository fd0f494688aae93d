//! Host ↔ renderer message bridge.
//!
//! The map renderer runs in an isolated web context. The only way in or out
//! is a text channel carrying flat JSON objects with a `type` discriminant.
//! This module owns that channel:
//!
//! - [`message`] - the typed vocabulary and its JSON wire form
//! - [`RendererHost`] - the platform primitive that hosts the sandboxed page
//! - [`RendererBridge`] - typed send, ready/event subscriptions, and
//!   containment of untrusted input
//! - [`SimulatedRenderer`] - an in-process renderer for demos and tests
//!
//! # Architecture
//!
//! ```text
//!  Coordinator                RendererBridge                 RendererHost
//!  ───────────                ──────────────                 ────────────
//!  send(BridgeMessage) ──► encode ──► post_message(text) ──► page listener
//!
//!  on_ready(cb)  ◄───────── pump task ◄── RendererSignal::LoadComplete
//!  on_event(cb)  ◄── decode ◄─┘      ◄── RendererSignal::Message(text)
//!                      │
//!                      └── malformed ──► warn! + drop
//! ```
//!
//! Delivery is fire-and-forget. Anything posted before the page registers its
//! listener is lost; ordering against readiness is the caller's job.

mod host;
pub mod message;
mod renderer_bridge;
mod simulated;

pub use host::{RendererHost, RendererSignal, SignalSender};
pub use message::{decode, encode, BridgeMessage, Decoded, Direction, MalformedMessage};
pub use renderer_bridge::{BridgeError, RendererBridge, Subscription};
pub use simulated::{SimulatedRenderer, DEFAULT_CENTER};
