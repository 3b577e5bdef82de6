//! In-process notification bus
//!
//! ```text
//! OrdersManager ──▶ publish() ──▶ broadcast::Sender<Notification>
//!                                        │
//!                          ┌─────────────┼─────────────┐
//!                          ▼             ▼             ▼
//!                     subscriber    subscriber    subscriber
//! ```

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::{Notification, NotificationPublisher, NotifyError};

#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Capacity of the broadcast channel (default: 1024)
    pub channel_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// Broadcast bus for user notifications
///
/// Publishing with no live subscriber is not an error; the notification is
/// simply not observed.
#[derive(Debug, Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<Notification>,
    shutdown_token: CancellationToken,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::from_config(BusConfig::default())
    }

    pub fn from_config(config: BusConfig) -> Self {
        let (tx, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            tx,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_config(BusConfig {
            channel_capacity: capacity,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// Stop accepting notifications
    pub fn shutdown(&self) {
        tracing::info!("Shutting down message bus");
        self.shutdown_token.cancel();
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationPublisher for MessageBus {
    fn publish(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.shutdown_token.is_cancelled() {
            return Err(NotifyError::Closed);
        }
        match self.tx.send(notification) {
            Ok(receivers) => {
                tracing::debug!(receivers, "Notification published");
            }
            Err(broadcast::error::SendError(n)) => {
                tracing::debug!(user_id = n.user_id, "Notification published with no subscribers");
            }
        }
        Ok(())
    }
}
