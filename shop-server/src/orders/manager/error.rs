use crate::cart::CartError;
use crate::inventory::LedgerError;
use crate::storage::StorageError;
use crate::vouchers::VoucherError;
use shared::error::{AppError, ErrorCode};
use shared::models::{OrderStatus, PaymentStatus};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Voucher(#[from] VoucherError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Order has no line items")]
    EmptyOrder,

    #[error("Invalid quantity {quantity} for inventory {inventory_id}")]
    InvalidQuantity { inventory_id: i64, quantity: i64 },

    #[error("Product is unavailable: inventory {inventory_id}, product {product_id}")]
    ProductUnavailable { inventory_id: i64, product_id: i64 },

    #[error("Product {0} has no valid price")]
    InvalidPrice(i64),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order {order_id} cannot be cancelled in status {status:?}")]
    OrderNotCancellable { order_id: i64, status: OrderStatus },

    #[error("Illegal status transition {from:?} -> {to:?}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Illegal payment status transition {from:?} -> {to:?}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

pub type ManagerResult<T> = Result<T, ManagerError>;

impl From<ManagerError> for AppError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Storage(e) => {
                tracing::error!(error = %e, "Storage error occurred");
                e.into()
            }
            ManagerError::Ledger(e) => e.into(),
            ManagerError::Voucher(e) => e.into(),
            ManagerError::Cart(e) => e.into(),
            ManagerError::EmptyOrder => AppError::new(ErrorCode::OrderEmpty),
            ManagerError::InvalidQuantity {
                inventory_id,
                quantity,
            } => AppError::with_message(
                ErrorCode::ValueOutOfRange,
                format!("Invalid quantity {}", quantity),
            )
            .with_detail("inventory_id", inventory_id)
            .with_detail("quantity", quantity),
            ManagerError::ProductUnavailable {
                inventory_id,
                product_id,
            } => AppError::new(ErrorCode::ProductUnavailable)
                .with_detail("inventory_id", inventory_id)
                .with_detail("product_id", product_id),
            ManagerError::InvalidPrice(product_id) => {
                AppError::new(ErrorCode::ProductInvalidPrice).with_detail("product_id", product_id)
            }
            ManagerError::OrderNotFound(id) => {
                AppError::new(ErrorCode::OrderNotFound).with_detail("order", id)
            }
            ManagerError::OrderNotCancellable { order_id, status } => {
                AppError::new(ErrorCode::OrderNotCancellable)
                    .with_detail("order_id", order_id)
                    .with_detail("status", status.as_str())
            }
            ManagerError::InvalidStatusTransition { from, to } => {
                AppError::new(ErrorCode::InvalidStatusTransition)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            ManagerError::InvalidPaymentTransition { from, to } => {
                AppError::new(ErrorCode::InvalidPaymentTransition)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
        }
    }
}
