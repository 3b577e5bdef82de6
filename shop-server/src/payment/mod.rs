//! VNPay payment reconciliation
//!
//! ```text
//! client ──▶ create_payment_url ──▶ signed redirect URL ──▶ VNPay
//!                                                          │
//!            ┌─────────────────────────────────────────────┤
//!            ▼ browser redirect                            ▼ server-to-server
//!      handle_return (read-only)                  handle_ipn (authoritative)
//!                                                          │
//!                                          OrdersManager::update_payment_status
//! ```
//!
//! The return redirect is user-controlled and only reports the persisted
//! state. Only the IPN mutates payment status, and it is idempotent under
//! duplicate or out-of-order delivery.

pub mod service;
pub mod signer;
pub mod vnpay;

pub use service::{IpnResponse, PaymentService, ReturnOutcome};
pub use signer::{canonical_query, canonical_sign, verify_signature};
pub use vnpay::{PaymentUrlRequest, VnpayConfig, VnpayGateway};

use crate::orders::ManagerError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Invalid payment signature")]
    InvalidSignature,

    #[error("Missing callback parameter: {0}")]
    MissingParam(&'static str),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order already paid: {0}")]
    OrderAlreadyPaid(String),

    #[error("Order total cannot be expressed in minor units: {0}")]
    InvalidAmount(String),

    #[error("Invalid signing key")]
    InvalidKey,

    #[error(transparent)]
    Manager(#[from] ManagerError),
}

pub type PaymentResult<T> = Result<T, PaymentError>;

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidSignature => AppError::new(ErrorCode::PaymentSignatureInvalid),
            PaymentError::MissingParam(name) => AppError::with_message(
                ErrorCode::InvalidRequest,
                format!("Missing parameter {}", name),
            ),
            PaymentError::OrderNotFound(txn_ref) => {
                AppError::new(ErrorCode::OrderNotFound).with_detail("txn_ref", txn_ref)
            }
            PaymentError::OrderAlreadyPaid(txn_ref) => {
                AppError::new(ErrorCode::OrderAlreadyPaid).with_detail("txn_ref", txn_ref)
            }
            PaymentError::InvalidAmount(amount) => {
                AppError::new(ErrorCode::PaymentFailed).with_detail("amount", amount)
            }
            PaymentError::InvalidKey => {
                AppError::with_message(ErrorCode::ConfigError, "Payment signing key is invalid")
            }
            PaymentError::Manager(e) => e.into(),
        }
    }
}
