//! Scripted platform used by the CLI demo and tests.
//!
//! [`FixedLocation`] answers every request with a preconfigured outcome,
//! optionally after a delay or after an explicit release through a
//! [`PositionGate`]. It records how often each platform call was made.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::platform::{
    Accuracy, PermissionStatus, PlatformFuture, PlatformLocation, PositionFetchError, RawPosition,
};

/// What the scripted platform reports.
#[derive(Debug, Clone, PartialEq)]
pub enum FixedOutcome {
    /// Permission granted, position fetch succeeds.
    Position(RawPosition),
    /// Permission prompt rejected.
    Denied,
    /// Permission granted, position fetch fails.
    Unavailable(PositionFetchError),
}

/// Releases a gated [`FixedLocation`].
#[derive(Debug, Clone)]
pub struct PositionGate {
    notify: Arc<Notify>,
}

impl PositionGate {
    /// Let the pending (or next) request proceed.
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

/// A [`PlatformLocation`] with a fixed, scripted answer.
#[derive(Debug)]
pub struct FixedLocation {
    outcome: FixedOutcome,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
    settings_available: bool,
    permission_requests: AtomicUsize,
    position_requests: AtomicUsize,
    settings_opened: AtomicUsize,
    last_accuracy: Mutex<Option<Accuracy>>,
}

impl FixedLocation {
    /// Answer immediately with `outcome`.
    pub fn new(outcome: FixedOutcome) -> Self {
        Self {
            outcome,
            delay: None,
            gate: None,
            settings_available: true,
            permission_requests: AtomicUsize::new(0),
            position_requests: AtomicUsize::new(0),
            settings_opened: AtomicUsize::new(0),
            last_accuracy: Mutex::new(None),
        }
    }

    /// Hold every request until the returned gate is released.
    pub fn gated(outcome: FixedOutcome) -> (Self, PositionGate) {
        let notify = Arc::new(Notify::new());
        let mut platform = Self::new(outcome);
        platform.gate = Some(Arc::clone(&notify));
        (platform, PositionGate { notify })
    }

    /// Delay each answer by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make [`PlatformLocation::open_settings`] fail.
    pub fn without_settings(mut self) -> Self {
        self.settings_available = false;
        self
    }

    /// Number of permission prompts shown.
    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    /// Number of position fetches issued.
    pub fn position_requests(&self) -> usize {
        self.position_requests.load(Ordering::SeqCst)
    }

    /// Number of times the settings page was opened.
    pub fn settings_opened(&self) -> usize {
        self.settings_opened.load(Ordering::SeqCst)
    }

    /// Accuracy of the most recent position fetch.
    pub fn last_accuracy(&self) -> Option<Accuracy> {
        *self.last_accuracy.lock()
    }

    async fn wait_turn(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl PlatformLocation for FixedLocation {
    fn request_permission(&self) -> PlatformFuture<'_, PermissionStatus> {
        Box::pin(async move {
            self.permission_requests.fetch_add(1, Ordering::SeqCst);
            self.wait_turn().await;
            match self.outcome {
                FixedOutcome::Denied => PermissionStatus::Denied,
                _ => PermissionStatus::Granted,
            }
        })
    }

    fn current_position(
        &self,
        accuracy: Accuracy,
    ) -> PlatformFuture<'_, Result<RawPosition, PositionFetchError>> {
        Box::pin(async move {
            self.position_requests.fetch_add(1, Ordering::SeqCst);
            *self.last_accuracy.lock() = Some(accuracy);
            match &self.outcome {
                FixedOutcome::Position(raw) => Ok(*raw),
                FixedOutcome::Unavailable(err) => Err(err.clone()),
                FixedOutcome::Denied => Err(PositionFetchError::Other(
                    "position requested without permission".to_string(),
                )),
            }
        })
    }

    fn open_settings(&self) -> Result<(), String> {
        if !self.settings_available {
            return Err("settings page not available on this platform".to_string());
        }
        self.settings_opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gate_holds_permission_until_released() {
        let (platform, gate) = FixedLocation::gated(FixedOutcome::Denied);
        let platform = Arc::new(platform);

        let task = {
            let platform = Arc::clone(&platform);
            tokio::spawn(async move { platform.request_permission().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());

        gate.release();
        let status = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("gate release should unblock the request")
            .unwrap();
        assert_eq!(status, PermissionStatus::Denied);
    }

    #[test]
    fn test_open_settings_counts() {
        let platform = FixedLocation::new(FixedOutcome::Denied);
        platform.open_settings().unwrap();
        platform.open_settings().unwrap();
        assert_eq!(platform.settings_opened(), 2);
    }
}
