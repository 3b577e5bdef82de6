//! Audit trail types
//!
//! Entries are immutable and chained by SHA256 hashes.

use serde::{Deserialize, Serialize};

/// Audited action (closed enum, never free text)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // ═══ Orders ═══
    OrderCreated,
    OrderCancelled,
    OrderStatusChanged,

    // ═══ Payments ═══
    PaymentStatusChanged,
    /// Gateway IPN accepted and applied
    PaymentIpnReceived,
    /// Gateway IPN rejected (bad signature, unknown order, amount mismatch)
    PaymentIpnRejected,

    // ═══ Inventory ═══
    InventoryAdjusted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::OrderCreated => "order_created",
            AuditAction::OrderCancelled => "order_cancelled",
            AuditAction::OrderStatusChanged => "order_status_changed",
            AuditAction::PaymentStatusChanged => "payment_status_changed",
            AuditAction::PaymentIpnReceived => "payment_ipn_received",
            AuditAction::PaymentIpnRejected => "payment_ipn_rejected",
            AuditAction::InventoryAdjusted => "inventory_adjusted",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit log entry
///
/// - `prev_hash`: hash of the previous entry (`"genesis"` for the first)
/// - `curr_hash`: hash over `prev_hash` and every stored field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Global sequence, starting at 1
    pub id: u64,
    /// Unix millis
    pub timestamp: i64,
    pub action: AuditAction,
    /// e.g. "order", "inventory"
    pub resource_type: String,
    /// e.g. "order:123"
    pub resource_id: String,
    /// Acting user, `None` for gateway/system events
    pub operator_id: Option<i64>,
    pub details: serde_json::Value,
    pub prev_hash: String,
    pub curr_hash: String,
}

/// Chain verification result
#[derive(Debug, Serialize)]
pub struct AuditChainVerification {
    pub total_entries: u64,
    pub chain_intact: bool,
    pub breaks: Vec<AuditChainBreak>,
}

/// A point where the chain does not verify
#[derive(Debug, Serialize)]
pub struct AuditChainBreak {
    pub entry_id: u64,
    pub expected_prev_hash: String,
    pub actual_prev_hash: String,
    /// `false` when the entry's own hash no longer matches its content
    pub hash_valid: bool,
}
