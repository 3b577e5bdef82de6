//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product entity
///
/// Only the fields the checkout pipeline reads are modelled here; catalog
/// metadata (images, categories, brands) lives with the catalog service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Authoritative unit price (VND)
    pub price: Decimal,
    /// Denormalized sum of the quantities of all live inventory records
    #[serde(default)]
    pub total_stock: i64,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

