//! Pinpoint - a race-free map location picker core.
//!
//! The picker coordinates three independently timed sources: the platform
//! location service, a sandboxed web renderer that loads on its own
//! schedule, and the host's own readiness state. It never posts a command
//! into a renderer that cannot yet receive it.
//!
//! # Modules
//!
//! - [`coord`]: validated geographic coordinates
//! - [`location`]: permission prompt and one-shot position fetch
//! - [`asset`]: renderer template resolution
//! - [`bridge`]: JSON wire protocol and the renderer channel
//! - [`picker`]: readiness state machine and the mounted picker session
//! - [`config`]: INI configuration
//! - [`logging`]: tracing subscriber setup

pub mod asset;
pub mod bridge;
pub mod config;
pub mod coord;
pub mod location;
pub mod logging;
pub mod picker;

pub use coord::Coordinate;
pub use picker::{LocationPicker, LocationPickerHandle, PickerPhase, PickerSnapshot};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
