//! Boundary contract for the host platform's location APIs.

use futures::future::BoxFuture;
use thiserror::Error;

/// Boxed future returned by platform boundary traits.
///
/// Boxing keeps the traits dyn-compatible so hosts can hand the picker an
/// `Arc<dyn PlatformLocation>`.
pub type PlatformFuture<'a, T> = BoxFuture<'a, T>;

/// Outcome of the OS permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Requested fix quality for the one-shot position fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accuracy {
    /// Coarse network-based fix.
    Balanced,
    /// GPS-quality fix.
    #[default]
    High,
}

/// Unvalidated position as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters, when the platform reports one.
    pub accuracy_m: Option<f64>,
}

impl RawPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m: None,
        }
    }
}

/// Platform-level failure of the position fetch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PositionFetchError {
    #[error("Position request timed out")]
    Timeout,

    #[error("Location services are disabled")]
    ServicesDisabled,

    #[error("{0}")]
    Other(String),
}

/// Host platform location APIs.
///
/// Implementations wrap the OS permission prompt and the one-shot position
/// request. Both calls may take arbitrarily long; the platform owns any
/// timeout.
pub trait PlatformLocation: Send + Sync + 'static {
    /// Show (or re-check) the foreground location permission prompt.
    fn request_permission(&self) -> PlatformFuture<'_, PermissionStatus>;

    /// Fetch the device position once.
    fn current_position(
        &self,
        accuracy: Accuracy,
    ) -> PlatformFuture<'_, Result<RawPosition, PositionFetchError>>;

    /// Open the OS settings page where the user can grant location access.
    fn open_settings(&self) -> Result<(), String>;
}
