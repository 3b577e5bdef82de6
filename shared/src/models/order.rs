//! Order Model
//!
//! # Status machines
//!
//! ```text
//! status:          pending ──► processing ──► shipped ──► delivered
//!                     │            │
//!                     └────────────┴──► cancelled
//!
//! payment_status:  unpaid ──► paid ──► refunded
//!                     └─────► failed
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fulfillment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether the machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }

    /// `delivered` and `cancelled` accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
    Failed,
}

impl PaymentStatus {
    /// Whether the machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Unpaid, Paid) | (Unpaid, Failed) | (Paid, Refunded)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// Payment method chosen at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery
    Cod,
    Momo,
    Vnpay,
}

/// Shipping address snapshot taken at order time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub recipient_name: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
}

/// Priced order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub inventory_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub color_id: Option<i64>,
    pub size_id: Option<i64>,
    pub quantity: i64,
    /// Unit price resolved from the live product at order time
    pub price: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Order entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Gateway correlation key, generated once at creation
    pub txn_ref: String,
    pub items: Vec<OrderItem>,
    /// Sum of line totals before discount
    pub subtotal: Decimal,
    pub voucher_id: Option<i64>,
    pub voucher_code: Option<String>,
    pub discount: Decimal,
    /// `max(0, subtotal - discount)`
    pub total: Decimal,
    pub shipping_info: ShippingInfo,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_by: i64,
    pub updated_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Unpriced line as submitted by the client or translated from a cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLine {
    pub inventory_id: i64,
    pub product_id: i64,
    pub color_id: Option<i64>,
    pub size_id: Option<i64>,
    pub quantity: i64,
}

/// Order lines awaiting pricing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub lines: Vec<DraftLine>,
}

/// Checkout choices that accompany a draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutOptions {
    pub payment_method: PaymentMethod,
    pub shipping_info: ShippingInfo,
    pub voucher_code: Option<String>,
}
