//! Data models
//!
//! Shared between shop-server and storefront clients (via API).
//! All IDs are `i64` snowflakes (see [`crate::util::snowflake_id`]),
//! all timestamps are Unix milliseconds.

pub mod cart;
pub mod inventory;
pub mod order;
pub mod product;
pub mod voucher;

// Re-exports
pub use cart::*;
pub use inventory::*;
pub use order::*;
pub use product::*;
pub use voucher::*;
