//! Permission-gated one-shot position service.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coord::Coordinate;

use super::platform::{Accuracy, PermissionStatus, PlatformLocation};

/// Errors surfaced by [`PermissionLocationService`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocationError {
    /// The user rejected the OS prompt. Recoverable only through OS settings.
    #[error("Permission to access location was denied")]
    PermissionDenied,

    /// The platform could not produce a usable fix. Safe to retry the flow.
    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),

    /// The platform could not open its settings page.
    #[error("Unable to open location settings: {0}")]
    SettingsUnavailable(String),
}

/// Permission state for one picker lifetime.
///
/// Set once; `Denied` is terminal for that lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// Requests permission and fetches the device position once.
///
/// Stateless: every call to [`request_position`](Self::request_position)
/// goes back to the platform.
pub struct PermissionLocationService {
    platform: Arc<dyn PlatformLocation>,
    accuracy: Accuracy,
}

impl std::fmt::Debug for PermissionLocationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionLocationService")
            .field("accuracy", &self.accuracy)
            .finish_non_exhaustive()
    }
}

impl PermissionLocationService {
    /// Create a service requesting high-accuracy fixes.
    pub fn new(platform: Arc<dyn PlatformLocation>) -> Self {
        Self::with_accuracy(platform, Accuracy::High)
    }

    /// Create a service with an explicit accuracy.
    pub fn with_accuracy(platform: Arc<dyn PlatformLocation>, accuracy: Accuracy) -> Self {
        Self { platform, accuracy }
    }

    /// Requested accuracy.
    pub fn accuracy(&self) -> Accuracy {
        self.accuracy
    }

    /// Prompt for permission, then fetch the position once.
    pub async fn request_position(&self) -> Result<Coordinate, LocationError> {
        let status = self.platform.request_permission().await;
        if status == PermissionStatus::Denied {
            info!("Location permission denied");
            return Err(LocationError::PermissionDenied);
        }

        debug!(accuracy = ?self.accuracy, "Location permission granted, fetching position");

        let raw = self
            .platform
            .current_position(self.accuracy)
            .await
            .map_err(|e| {
                warn!(error = %e, "Position fetch failed");
                LocationError::PositionUnavailable(e.to_string())
            })?;

        let coordinate = Coordinate::new(raw.latitude, raw.longitude).map_err(|e| {
            warn!(error = %e, "Platform reported an invalid position");
            LocationError::PositionUnavailable(e.to_string())
        })?;

        info!(
            latitude = coordinate.latitude(),
            longitude = coordinate.longitude(),
            accuracy_m = raw.accuracy_m,
            "Device position resolved"
        );
        Ok(coordinate)
    }

    /// Send the user to the OS settings page.
    pub fn open_settings(&self) -> Result<(), LocationError> {
        self.platform
            .open_settings()
            .map_err(LocationError::SettingsUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{FixedLocation, FixedOutcome, PositionFetchError, RawPosition};

    fn service(outcome: FixedOutcome) -> (PermissionLocationService, Arc<FixedLocation>) {
        let platform = Arc::new(FixedLocation::new(outcome));
        (PermissionLocationService::new(platform.clone()), platform)
    }

    #[tokio::test]
    async fn test_granted_returns_coordinate() {
        let (svc, platform) = service(FixedOutcome::Position(RawPosition::new(19.3, 73.0)));
        let coord = svc.request_position().await.unwrap();
        assert_eq!(coord, Coordinate::new(19.3, 73.0).unwrap());
        assert_eq!(platform.permission_requests(), 1);
        assert_eq!(platform.position_requests(), 1);
    }

    #[tokio::test]
    async fn test_denied_skips_position_fetch() {
        let (svc, platform) = service(FixedOutcome::Denied);
        let err = svc.request_position().await.unwrap_err();
        assert_eq!(err, LocationError::PermissionDenied);
        assert_eq!(platform.position_requests(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_maps_to_unavailable() {
        let (svc, _) = service(FixedOutcome::Unavailable(PositionFetchError::Timeout));
        let err = svc.request_position().await.unwrap_err();
        assert!(matches!(
            err,
            LocationError::PositionUnavailable(ref msg) if msg.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_fix_is_unavailable() {
        let (svc, _) = service(FixedOutcome::Position(RawPosition::new(123.0, 73.0)));
        let err = svc.request_position().await.unwrap_err();
        assert!(matches!(err, LocationError::PositionUnavailable(_)));
    }

    #[tokio::test]
    async fn test_accuracy_is_forwarded() {
        let platform = Arc::new(FixedLocation::new(FixedOutcome::Position(RawPosition::new(
            1.0, 2.0,
        ))));
        let svc = PermissionLocationService::with_accuracy(platform.clone(), Accuracy::Balanced);
        svc.request_position().await.unwrap();
        assert_eq!(platform.last_accuracy(), Some(Accuracy::Balanced));
    }

    #[test]
    fn test_open_settings_failure_is_wrapped() {
        let platform = Arc::new(FixedLocation::new(FixedOutcome::Denied).without_settings());
        let svc = PermissionLocationService::new(platform);
        assert!(matches!(
            svc.open_settings(),
            Err(LocationError::SettingsUnavailable(_))
        ));
    }
}
