//! User-facing notifications emitted by the tracker
//!
//! The tracker never renders text. It emits a [`Notification`] carrying a
//! level and a stable [`MessageKey`] and leaves localisation to the receiver.

use chrono::{DateTime, Utc};
use std::fmt;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    /// Operation succeeded
    Success,
    /// Neutral information
    Info,
    /// Request was rejected locally
    Warning,
    /// Operation failed
    Error,
}

/// Stable message keys for notification text lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// The task completed
    Success,
    /// Generic failure
    Error,
    /// The launch call failed
    OperationFailed,
    /// `start` was called with an empty batch
    NoPrompts,
    /// `start` was called while a task is active
    InProgress,
    /// The backend reported the task as cancelled
    Cancelled,
    /// The backend accepted a cancel request
    StopRequested,
    /// The backend reported the task as failed, with details
    GenerationFailed,
}

impl MessageKey {
    /// Dotted key used by translation tables.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "common.success",
            Self::Error => "common.error",
            Self::OperationFailed => "common.operationFailed",
            Self::NoPrompts => "generation.noPrompts",
            Self::InProgress => "generation.inProgress",
            Self::Cancelled => "generation.cancelled",
            Self::StopRequested => "generation.stopRequested",
            Self::GenerationFailed => "generation.failed",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity
    pub level: NotificationLevel,
    /// Message key
    pub key: MessageKey,
    /// Untranslated detail, such as backend error messages
    pub detail: Option<String>,
    /// When the notification was raised
    pub at: DateTime<Utc>,
}

impl Notification {
    /// Create a notification without detail.
    pub fn new(level: NotificationLevel, key: MessageKey) -> Self {
        Self {
            level,
            key,
            detail: None,
            at: Utc::now(),
        }
    }

    /// Attach detail text.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// The detail if present, otherwise the message key.
    pub fn text(&self) -> &str {
        self.detail.as_deref().unwrap_or(self.key.as_str())
    }

    pub(crate) fn success(key: MessageKey) -> Self {
        Self::new(NotificationLevel::Success, key)
    }

    pub(crate) fn info(key: MessageKey) -> Self {
        Self::new(NotificationLevel::Info, key)
    }

    pub(crate) fn warning(key: MessageKey) -> Self {
        Self::new(NotificationLevel::Warning, key)
    }

    pub(crate) fn error(key: MessageKey) -> Self {
        Self::new(NotificationLevel::Error, key)
    }
}

/// Receiver of tracker notifications.
///
/// Called synchronously from tracker operations and poll ticks, never while
/// the tracker's state lock is held. Implementations should return quickly.
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    fn notify(&self, notification: Notification);
}

impl<F> Notifier for F
where
    F: Fn(Notification) + Send + Sync,
{
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}

/// Notifier that writes every notification to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.level {
            NotificationLevel::Success | NotificationLevel::Info => {
                tracing::info!(key = %n.key, detail = ?n.detail, "Generation notification")
            }
            NotificationLevel::Warning => {
                tracing::warn!(key = %n.key, detail = ?n.detail, "Generation notification")
            }
            NotificationLevel::Error => {
                tracing::error!(key = %n.key, detail = ?n.detail, "Generation notification")
            }
        }
    }
}
