//! Transient user notifications raised at the send boundary.

use crate::error::FailureKind;

/// A short-lived message for the user (toast, stderr line, log entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub kind: FailureKind,
}

/// Sink for [`Notification`]s.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Logs notifications at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        tracing::warn!(
            kind = ?notification.kind,
            title = %notification.title,
            "{}",
            notification.description
        );
    }
}
