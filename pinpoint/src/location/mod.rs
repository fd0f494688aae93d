//! Platform permission and one-shot position fetch.
//!
//! The [`PermissionLocationService`] wraps a [`PlatformLocation`] boundary:
//! it prompts for permission and, when granted, issues a single
//! high-accuracy position request. It keeps no state between calls.
//!
//! # Flow
//!
//! ```text
//! request_position()
//!   │
//!   ├── request_permission() ──► Denied ──► Err(PermissionDenied)
//!   │
//!   └── Granted
//!         │
//!         └── current_position(accuracy) ──► Err(_)      ──► Err(PositionUnavailable)
//!                                         ├─► out of range ──► Err(PositionUnavailable)
//!                                         └─► Ok(raw)       ──► Ok(Coordinate)
//! ```

mod fixed;
mod platform;
mod service;

pub use fixed::{FixedLocation, FixedOutcome, PositionGate};
pub use platform::{
    Accuracy, PermissionStatus, PlatformFuture, PlatformLocation, PositionFetchError, RawPosition,
};
pub use service::{LocationError, PermissionLocationService, PermissionState};
