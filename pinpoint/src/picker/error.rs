//! Picker error types.

use thiserror::Error;

use crate::location::LocationError;

/// Why a confirm action was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmRejected {
    /// The picker has not reached `Active`, or has failed.
    #[error("Location picker is not active")]
    NotActive,

    /// No coordinate has been selected yet.
    #[error("No location selected")]
    NoSelection,
}

/// Errors returned by [`LocationPickerHandle`](super::LocationPickerHandle).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PickerError {
    /// The picker was unmounted; no further commands are accepted.
    #[error("Location picker has been unmounted")]
    Unmounted,

    /// The confirm action was refused.
    #[error("Confirm rejected: {0}")]
    Rejected(#[from] ConfirmRejected),

    /// Settings remediation is only offered after a permission denial.
    #[error("Location permission was not denied")]
    NotPermissionDenied,

    /// The platform location service failed.
    #[error(transparent)]
    Location(#[from] LocationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display() {
        let err = PickerError::from(ConfirmRejected::NoSelection);
        assert_eq!(err.to_string(), "Confirm rejected: No location selected");
    }

    #[test]
    fn test_location_error_is_transparent() {
        let err = PickerError::from(LocationError::PermissionDenied);
        assert_eq!(err.to_string(), "Permission to access location was denied");
    }
}
