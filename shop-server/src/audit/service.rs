//! Audit log service
//!
//! Writes go through a bounded mpsc channel drained by [`AuditWorker`]
//! (see `worker.rs`); queries read storage directly.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::storage::{AuditStorage, AuditStorageError};
use super::types::{AuditAction, AuditChainVerification, AuditEntry};

/// Log request sent to the worker
#[derive(Debug)]
pub struct AuditLogRequest {
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: String,
    pub operator_id: Option<i64>,
    pub details: serde_json::Value,
}

/// Audit log service
pub struct AuditService {
    storage: AuditStorage,
    tx: mpsc::Sender<AuditLogRequest>,
}

impl std::fmt::Debug for AuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditService")
            .field("capacity", &self.tx.capacity())
            .finish_non_exhaustive()
    }
}

impl AuditService {
    pub fn new(
        storage: AuditStorage,
        buffer_size: usize,
    ) -> (Arc<Self>, mpsc::Receiver<AuditLogRequest>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        (Arc::new(Self { storage, tx }), rx)
    }

    /// Queue an entry (best-effort, never blocks)
    pub fn log(
        &self,
        action: AuditAction,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        operator_id: Option<i64>,
        details: serde_json::Value,
    ) {
        let req = AuditLogRequest {
            action,
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            operator_id,
            details,
        };
        if let Err(e) = self.tx.try_send(req) {
            let (reason, req) = match e {
                mpsc::error::TrySendError::Full(req) => ("channel full", req),
                mpsc::error::TrySendError::Closed(req) => ("channel closed", req),
            };
            tracing::warn!(
                action = %req.action,
                resource_id = %req.resource_id,
                reason,
                "Audit entry dropped"
            );
        }
    }

    /// Write an entry synchronously, bypassing the channel
    pub fn log_sync(
        &self,
        action: AuditAction,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        operator_id: Option<i64>,
        details: serde_json::Value,
    ) -> Result<AuditEntry, AuditStorageError> {
        self.storage.append(
            action,
            resource_type.into(),
            resource_id.into(),
            operator_id,
            details,
        )
    }

    pub fn query_last(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditStorageError> {
        self.storage.query_last(limit)
    }

    pub fn verify_chain(&self) -> Result<AuditChainVerification, AuditStorageError> {
        self.storage.verify_chain()
    }

    pub fn storage(&self) -> &AuditStorage {
        &self.storage
    }
}
