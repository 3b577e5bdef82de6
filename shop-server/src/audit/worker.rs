//! Audit log background worker
//!
//! Drains `AuditLogRequest`s from the mpsc channel into redb. Exits when every
//! sender has been dropped or the shutdown token fires.

use super::service::AuditLogRequest;
use super::storage::AuditStorage;
use tokio_util::sync::CancellationToken;

pub struct AuditWorker {
    storage: AuditStorage,
}

impl AuditWorker {
    pub fn new(storage: AuditStorage) -> Self {
        Self { storage }
    }

    /// Run until the channel closes or `shutdown` fires
    ///
    /// On shutdown the channel is closed and whatever is already queued is
    /// still written.
    pub async fn run(
        self,
        mut rx: tokio::sync::mpsc::Receiver<AuditLogRequest>,
        shutdown: CancellationToken,
    ) {
        tracing::info!("📋 Audit log worker started");

        loop {
            tokio::select! {
                biased;
                req = rx.recv() => match req {
                    Some(req) => self.write(req),
                    None => break,
                },
                _ = shutdown.cancelled() => {
                    rx.close();
                    while let Some(req) = rx.recv().await {
                        self.write(req);
                    }
                    break;
                }
            }
        }

        tracing::info!("Audit log worker stopped");
    }

    fn write(&self, req: AuditLogRequest) {
        match self.storage.append(
            req.action,
            req.resource_type,
            req.resource_id,
            req.operator_id,
            req.details,
        ) {
            Ok(entry) => {
                tracing::debug!(
                    audit_id = entry.id,
                    action = %entry.action,
                    resource = %entry.resource_type,
                    "Audit entry recorded"
                );
            }
            Err(e) => {
                tracing::error!("Failed to write audit entry: {:?}", e);
            }
        }
    }
}
