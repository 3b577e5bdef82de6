//! Discount vouchers

pub mod evaluator;

pub use evaluator::{Evaluation, VoucherError, VoucherResult, commit_usage, evaluate, evaluate_in};
