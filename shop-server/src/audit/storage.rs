//! Audit log persistence (redb, append-only)
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `audit_log` | `id` (u64) | `AuditEntry` (JSON) |
//!
//! The table is only ever appended to; there is no update or delete path.

use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::types::{AuditAction, AuditChainBreak, AuditChainVerification, AuditEntry};

const AUDIT_LOG_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("audit_log");

/// `prev_hash` of the first entry
pub const GENESIS_HASH: &str = "genesis";

#[derive(Debug, Error)]
pub enum AuditStorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AuditStorageResult<T> = Result<T, AuditStorageError>;

#[derive(Clone)]
pub struct AuditStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for AuditStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditStorage").finish_non_exhaustive()
    }
}

impl AuditStorage {
    /// Attach to a database, creating the audit table if needed
    pub fn open(db: Arc<Database>) -> AuditStorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(AUDIT_LOG_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Append one entry, linking it to the current chain head
    pub fn append(
        &self,
        action: AuditAction,
        resource_type: String,
        resource_id: String,
        operator_id: Option<i64>,
        details: serde_json::Value,
    ) -> AuditStorageResult<AuditEntry> {
        let txn = self.db.begin_write()?;
        let entry = {
            let mut table = txn.open_table(AUDIT_LOG_TABLE)?;
            let (id, prev_hash) = match table.last()? {
                Some((_, value)) => {
                    let last: AuditEntry = serde_json::from_slice(value.value())?;
                    (last.id + 1, last.curr_hash)
                }
                None => (1, GENESIS_HASH.to_string()),
            };

            let timestamp = shared::util::now_millis();
            let curr_hash = compute_audit_hash(
                &prev_hash,
                id,
                timestamp,
                &action,
                &resource_type,
                &resource_id,
                operator_id,
                &details,
            );
            let entry = AuditEntry {
                id,
                timestamp,
                action,
                resource_type,
                resource_id,
                operator_id,
                details,
                prev_hash,
                curr_hash,
            };
            let bytes = serde_json::to_vec(&entry)?;
            table.insert(id, bytes.as_slice())?;
            entry
        };
        txn.commit()?;
        Ok(entry)
    }

    /// Most recent `limit` entries, newest first
    pub fn query_last(&self, limit: usize) -> AuditStorageResult<Vec<AuditEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_LOG_TABLE)?;
        let mut entries = Vec::with_capacity(limit.min(256));
        for row in table.iter()?.rev().take(limit) {
            let (_, value) = row?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    /// Walk the whole chain, recomputing every hash
    pub fn verify_chain(&self) -> AuditStorageResult<AuditChainVerification> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_LOG_TABLE)?;

        let mut expected_prev = GENESIS_HASH.to_string();
        let mut total_entries = 0u64;
        let mut breaks = Vec::new();

        for row in table.iter()? {
            let (_, value) = row?;
            let entry: AuditEntry = serde_json::from_slice(value.value())?;
            total_entries += 1;

            let recomputed = compute_audit_hash(
                &entry.prev_hash,
                entry.id,
                entry.timestamp,
                &entry.action,
                &entry.resource_type,
                &entry.resource_id,
                entry.operator_id,
                &entry.details,
            );
            let hash_valid = recomputed == entry.curr_hash;

            if entry.prev_hash != expected_prev || !hash_valid {
                breaks.push(AuditChainBreak {
                    entry_id: entry.id,
                    expected_prev_hash: expected_prev.clone(),
                    actual_prev_hash: entry.prev_hash.clone(),
                    hash_valid,
                });
            }
            expected_prev = entry.curr_hash;
        }

        Ok(AuditChainVerification {
            total_entries,
            chain_intact: breaks.is_empty(),
            breaks,
        })
    }

    #[cfg(test)]
    fn overwrite_raw(&self, entry: &AuditEntry) -> AuditStorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(AUDIT_LOG_TABLE)?;
            let bytes = serde_json::to_vec(entry)?;
            table.insert(entry.id, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

/// SHA256 over the previous hash and every stored field
///
/// - variable-length fields are separated by `\x00`
/// - fixed-width integers are hashed as little-endian bytes
/// - `operator_id` carries a tag byte so `None` never collides with a value
/// - `action` uses its serde form, which is stable across releases
#[allow(clippy::too_many_arguments)]
fn compute_audit_hash(
    prev_hash: &str,
    id: u64,
    timestamp: i64,
    action: &AuditAction,
    resource_type: &str,
    resource_id: &str,
    operator_id: Option<i64>,
    details: &serde_json::Value,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(prev_hash.as_bytes());
    hasher.update(b"\x00");

    hasher.update(id.to_le_bytes());
    hasher.update(timestamp.to_le_bytes());

    hasher.update(action.as_str().as_bytes());
    hasher.update(b"\x00");

    hasher.update(resource_type.as_bytes());
    hasher.update(b"\x00");
    hasher.update(resource_id.as_bytes());
    hasher.update(b"\x00");

    hash_optional_id(&mut hasher, operator_id);

    // serde_json::Map is a BTreeMap here, so object keys serialize sorted
    let details_json = serde_json::to_string(details).unwrap_or_default();
    hasher.update(details_json.as_bytes());
    hasher.update(b"\x00");

    format!("{:x}", hasher.finalize())
}

/// `\x00` = None, `\x01` + LE bytes = Some
fn hash_optional_id(hasher: &mut Sha256, value: Option<i64>) {
    match value {
        Some(v) => {
            hasher.update(b"\x01");
            hasher.update(v.to_le_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
}
