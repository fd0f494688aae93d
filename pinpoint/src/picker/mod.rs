//! Location picker coordination.
//!
//! Reconciles three independently timed sources (the device position, the
//! renderer template and the renderer's own readiness) and sends the initial
//! recenter only once the renderer can receive it.
//!
//! - [`PickerMachine`]: the pure state machine. Synchronous and easy to test.
//! - [`LocationPicker`]: builds and mounts a session, running the machine on
//!   an actor task.
//! - [`LocationPickerHandle`]: the view's side of a mounted session
//!   (snapshots, recenter, confirm, settings remediation, unmount).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pinpoint::asset::EmbeddedAssets;
//! use pinpoint::picker::LocationPicker;
//!
//! let picker = LocationPicker::new(platform, Arc::new(EmbeddedAssets), webview);
//! let handle = picker.mount(|c| println!("picked {}", c));
//!
//! handle.wait_for(|s| s.can_confirm()).await?;
//! handle.confirm().await?;
//! handle.unmount().await;
//! ```

mod coordinator;
mod error;
mod state;

pub use coordinator::{LocationConfirmedHandler, LocationPicker, LocationPickerHandle};
pub use error::{ConfirmRejected, PickerError};
pub use state::{
    PickerFailure, PickerMachine, PickerPhase, PickerSnapshot, RecenterCommand, RendererReadiness,
};
