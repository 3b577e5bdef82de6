//! Inventory Model

use serde::{Deserialize, Serialize};

/// Stock record for one (product, color, size) combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: i64,
    /// Product reference
    pub product_id: i64,
    pub color_id: Option<i64>,
    pub size_id: Option<i64>,
    /// Units on hand, never negative
    pub quantity: i64,
    pub min_quantity: Option<i64>,
    pub max_quantity: Option<i64>,
    #[serde(default)]
    pub is_deleted: bool,
    pub updated_at: i64,
}

impl Inventory {
    /// Whether `quantity` satisfies the floor, the optional min and the optional max
    pub fn accepts(&self, quantity: i64) -> bool {
        if quantity < 0 {
            return false;
        }
        if self.min_quantity.is_some_and(|min| quantity < min) {
            return false;
        }
        if self.max_quantity.is_some_and(|max| quantity > max) {
            return false;
        }
        true
    }
}
