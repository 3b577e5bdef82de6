//! Cart Model

use serde::{Deserialize, Serialize};

/// One line in a shopping cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub inventory_id: i64,
    pub product_id: i64,
    pub color_id: Option<i64>,
    pub size_id: Option<i64>,
    pub quantity: i64,
}

/// Per-user cart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: i64,
    pub items: Vec<CartItem>,
    /// Set once the cart has been turned into an order
    #[serde(default)]
    pub is_checked_out: bool,
    pub updated_at: i64,
}
