//! User notifications
//!
//! Order and payment events are published as [`Notification`]s through a
//! [`NotificationPublisher`]. The default publisher is the in-process
//! [`MessageBus`]; delivery is fire-and-forget and a failed publish is only
//! logged.

mod bus;

pub use bus::{BusConfig, MessageBus};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderCreated,
    OrderCancelled,
    OrderStatusChanged,
    PaymentSucceeded,
    PaymentFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub kind: NotificationKind,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: i64,
}

impl Notification {
    pub fn new(
        user_id: i64,
        kind: NotificationKind,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            title: title.into(),
            content: content.into(),
            kind,
            metadata: serde_json::Value::Null,
            created_at: shared::util::now_millis(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification channel closed")]
    Closed,

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// Outbound notification sink
pub trait NotificationPublisher: Send + Sync + std::fmt::Debug {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Publish and swallow failures
pub fn notify(publisher: &dyn NotificationPublisher, notification: Notification) {
    let user_id = notification.user_id;
    let kind = notification.kind;
    if let Err(e) = publisher.publish(notification) {
        tracing::warn!(user_id, ?kind, error = %e, "Notification dropped");
    }
}
