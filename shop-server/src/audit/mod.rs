//! Append-only audit trail
//!
//! # Architecture
//!
//! ```text
//! Order / payment operation
//!   ├─ AuditService::log()      → mpsc → AuditWorker → redb (audit_log table)
//!   └─ AuditService::log_sync() → redb
//!
//! SHA256 chain: genesis → entry₁ → entry₂ → ... → entryₙ
//! ```
//!
//! Logging is best-effort: a full or closed channel is reported with a
//! warning and never fails the operation that produced the event.

pub mod service;
pub mod storage;
pub mod types;
pub mod worker;

pub use service::{AuditLogRequest, AuditService};
pub use storage::{AuditStorage, AuditStorageError};
pub use types::{AuditAction, AuditChainBreak, AuditChainVerification, AuditEntry};
pub use worker::AuditWorker;
