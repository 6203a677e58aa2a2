//! Best-effort user notifications.
//!
//! Backends implement [`Notifier`] and may fail however they like. The engine
//! only ever talks to the [`Notifications`] adapter, which never returns an
//! error and never lets a failed delivery affect a transition.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

/// Title used for every notification.
pub const NOTIFICATION_TITLE: &str = "WorkRest Timer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Not asked yet.
    #[default]
    Default,
    Granted,
    Denied,
}

pub trait Notifier: Send + Sync {
    /// Ask for permission to show notifications.
    fn request_permission(&self) -> Result<Permission, NotifyError>;

    /// Show one notification.
    fn show(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Result-discarding wrapper around a [`Notifier`].
pub struct Notifications {
    inner: Box<dyn Notifier>,
    permission: Permission,
}

impl Notifications {
    pub fn new(inner: Box<dyn Notifier>) -> Self {
        Self {
            inner,
            permission: Permission::Default,
        }
    }

    /// A sink that never shows anything.
    pub fn disabled() -> Self {
        Self::new(Box::new(NullNotifier))
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Request permission if it has not been decided yet.
    ///
    /// A failed request counts as denied.
    pub fn ensure_permission(&mut self) -> Permission {
        if self.permission != Permission::Default {
            return self.permission;
        }
        self.permission = match self.inner.request_permission() {
            Ok(permission) => permission,
            Err(err) => {
                tracing::debug!(error = %err, "notification permission request failed");
                Permission::Denied
            }
        };
        self.permission
    }

    /// Show `body` if permitted. Failures are logged and dropped.
    pub fn notify(&self, body: &str) {
        if self.permission != Permission::Granted {
            tracing::debug!(body, "notification skipped without permission");
            return;
        }
        if let Err(err) = self.inner.show(NOTIFICATION_TITLE, body) {
            tracing::debug!(error = %err, body, "notification dropped");
        }
    }
}

impl std::fmt::Debug for Notifications {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifications")
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

/// Desktop notifications through the platform notification daemon.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    /// `enabled = false` makes every permission request come back denied.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Notifier for DesktopNotifier {
    fn request_permission(&self) -> Result<Permission, NotifyError> {
        if self.enabled {
            Ok(Permission::Granted)
        } else {
            Ok(Permission::Denied)
        }
    }

    fn show(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        notify_rust::Notification::new()
            .appname("workrest")
            .summary(title)
            .body(body)
            .show()
            .map(|_| ())
            .map_err(|e| NotifyError::Backend(e.to_string()))
    }
}

/// Environment without notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn request_permission(&self) -> Result<Permission, NotifyError> {
        Err(NotifyError::Unsupported)
    }

    fn show(&self, _title: &str, _body: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Unsupported)
    }
}

/// Keeps every shown body in memory. Clones share the log.
#[derive(Debug, Clone)]
pub struct RecordingNotifier {
    permission: Permission,
    failing: bool,
    shown: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn granted() -> Self {
        Self {
            permission: Permission::Granted,
            failing: false,
            shown: Arc::default(),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: Permission::Denied,
            ..Self::granted()
        }
    }

    /// Grants permission but fails every delivery.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::granted()
        }
    }

    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn request_permission(&self) -> Result<Permission, NotifyError> {
        Ok(self.permission)
    }

    fn show(&self, _title: &str, body: &str) -> Result<(), NotifyError> {
        if self.failing {
            return Err(NotifyError::Backend("delivery failed".into()));
        }
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(body.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_shown_before_permission() {
        let recorder = RecordingNotifier::granted();
        let notifications = Notifications::new(Box::new(recorder.clone()));
        notifications.notify("hello");
        assert!(recorder.shown().is_empty());
    }

    #[test]
    fn shows_after_grant() {
        let recorder = RecordingNotifier::granted();
        let mut notifications = Notifications::new(Box::new(recorder.clone()));
        assert_eq!(notifications.ensure_permission(), Permission::Granted);
        notifications.notify("hello");
        assert_eq!(recorder.shown(), vec!["hello".to_string()]);
    }

    #[test]
    fn unsupported_backend_counts_as_denied() {
        let mut notifications = Notifications::disabled();
        assert_eq!(notifications.ensure_permission(), Permission::Denied);
        notifications.notify("ignored");
    }

    #[test]
    fn permission_is_requested_once() {
        let mut notifications = Notifications::new(Box::new(RecordingNotifier::denied()));
        assert_eq!(notifications.ensure_permission(), Permission::Denied);
        assert_eq!(notifications.ensure_permission(), Permission::Denied);
    }

    #[test]
    fn delivery_failure_is_swallowed() {
        let mut notifications = Notifications::new(Box::new(RecordingNotifier::failing()));
        notifications.ensure_permission();
        notifications.notify("boom");
    }
}
