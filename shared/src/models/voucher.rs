//! Voucher Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a voucher's `value` is interpreted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Flat amount off the subtotal
    Fixed,
    /// Percent of the subtotal, optionally capped by `max_discount_value`
    Percentage,
}

/// Voucher entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: i64,
    /// Stored uppercased; lookups uppercase the input
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub min_order_value: Option<Decimal>,
    /// Only meaningful for percentage vouchers
    pub max_discount_value: Option<Decimal>,
    /// Global redemption limit
    pub usage_limit: Option<i64>,
    #[serde(default)]
    pub usage_count: i64,
    pub usage_per_user: Option<i64>,
    /// Validity window start (Unix millis)
    pub start_date: i64,
    /// Validity window end (Unix millis)
    pub end_date: i64,
    pub is_active: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Voucher {
    pub fn is_redeemable(&self) -> bool {
        self.is_active && !self.is_deleted
    }

    pub fn is_within_window(&self, now_millis: i64) -> bool {
        self.start_date <= now_millis && now_millis <= self.end_date
    }

    pub fn has_remaining_uses(&self) -> bool {
        self.usage_limit.is_none_or(|limit| self.usage_count < limit)
    }
}

/// Per-(user, voucher) redemption counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVoucherUsage {
    pub user_id: i64,
    pub voucher_id: i64,
    pub used_count: i64,
    pub updated_at: i64,
}
