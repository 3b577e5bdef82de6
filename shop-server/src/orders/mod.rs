//! Order placement and fulfillment
//!
//! - **manager**: `OrdersManager`, the transactional checkout orchestrator
//! - **money**: decimal money helpers shared with vouchers and payments
//!
//! # Data Flow
//!
//! ```text
//! OrderDraft / Cart → OrdersManager ─┬─ Inventory ledger (reserve)
//!                                    ├─ Voucher evaluator (discount + usage)
//!                                    └─ Order insert
//!                                          │  one redb write transaction
//!                                          ▼
//!                         commit → audit, notification, cache invalidation
//! ```

pub mod manager;
pub mod money;

pub use manager::{CancelOutcome, ManagerError, ManagerResult, OrderRef, OrdersManager};
