use thiserror::Error;

use crate::audit::AuditStorageError;
use crate::storage::StorageError;

/// Startup and lifecycle failures
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Audit storage error: {0}")]
    Audit(#[from] AuditStorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
