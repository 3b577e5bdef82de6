//! Inventory stock counters

pub mod ledger;

pub use ledger::{LedgerError, LedgerResult};
