//! Render health tracking.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of the process-wide render health record.
///
/// Created once at process start with all fields empty; updated in place for
/// the life of the process; never persisted.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderHealth {
    /// True only immediately after a successful render.
    pub healthy: bool,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_error_message: Option<String>,
    pub last_fallback_at: Option<DateTime<Utc>>,
}

/// Cloneable handle to the single shared render health record.
///
/// Injected into the origin handler rather than living as a module global,
/// so tests can swap it for a fresh instance. The record is advisory
/// telemetry: concurrent writers interleave freely and the last write wins;
/// it is never consulted for request-level control flow.
#[derive(Debug, Clone, Default)]
pub struct HealthTracker {
    inner: Arc<Mutex<RenderHealth>>,
}

impl HealthTracker {
    /// Create a tracker with an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful render.
    pub fn mark_success(&self) {
        let mut health = self.lock();
        health.healthy = true;
        health.last_success_at = Some(Utc::now());
    }

    /// Record a render failure.
    pub fn mark_failure(&self, message: impl Into<String>) {
        let mut health = self.lock();
        Self::record_failure(&mut health, message.into());
    }

    /// Record a fallback.
    ///
    /// A fallback is always caused by a failure, so the error fields are
    /// updated in the same lock acquisition; `last_fallback_at` is never set
    /// without a matching `last_error_at`.
    pub fn mark_fallback(&self, message: impl Into<String>) {
        let mut health = self.lock();
        Self::record_failure(&mut health, message.into());
        health.last_fallback_at = Some(Utc::now());
    }

    /// Read-only copy of the current record.
    pub fn snapshot(&self) -> RenderHealth {
        self.lock().clone()
    }

    fn record_failure(health: &mut RenderHealth, message: String) {
        health.healthy = false;
        health.last_error_at = Some(Utc::now());
        health.last_error_message = Some(message);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RenderHealth> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_record_is_empty() {
        let tracker = HealthTracker::new();
        let health = tracker.snapshot();

        assert!(!health.healthy);
        assert!(health.last_success_at.is_none());
        assert!(health.last_error_at.is_none());
        assert!(health.last_error_message.is_none());
        assert!(health.last_fallback_at.is_none());
    }

    #[test]
    fn test_success_sets_healthy() {
        let tracker = HealthTracker::new();

        tracker.mark_success();
        let health = tracker.snapshot();

        assert!(health.healthy);
        assert!(health.last_success_at.is_some());
    }

    #[test]
    fn test_failure_clears_healthy() {
        let tracker = HealthTracker::new();

        tracker.mark_success();
        tracker.mark_failure("render exploded");
        let health = tracker.snapshot();

        assert!(!health.healthy);
        assert_eq!(health.last_error_message.as_deref(), Some("render exploded"));
    }

    #[test]
    fn test_fallback_records_error_in_same_operation() {
        let tracker = HealthTracker::new();

        tracker.mark_fallback("manifest missing");
        let health = tracker.snapshot();

        assert!(!health.healthy);
        assert!(health.last_error_at.is_some());
        assert_eq!(
            health.last_error_message.as_deref(),
            Some("manifest missing")
        );
        let fallback_at = health.last_fallback_at.expect("fallback timestamp");
        assert!(fallback_at >= health.last_error_at.unwrap());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let tracker = HealthTracker::new();
        tracker.mark_fallback("boom");

        let json = serde_json::to_value(tracker.snapshot()).unwrap();

        assert!(json.get("lastFallbackAt").is_some());
        assert!(json.get("lastErrorMessage").is_some());
        assert_eq!(json["healthy"], serde_json::json!(false));
    }
}
