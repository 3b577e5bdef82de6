//! Failure taxonomy
//!
//! Every [`ErrorCode`] belongs to exactly one [`ErrorKind`]. Callers that do
//! not care about the specific code (retry policies, gateway acknowledgements,
//! log levels) branch on the kind instead.
//!
//! | Kind          | Meaning                                           |
//! |---------------|---------------------------------------------------|
//! | `Validation`  | Malformed input, empty order, voucher rule failed |
//! | `Conflict`    | Stock, usage limit or state machine violation     |
//! | `NotFound`    | Referenced entity missing or soft-deleted         |
//! | `Signature`   | Gateway callback failed verification              |
//! | `Integration` | Cache / notification / audit side channel failed  |
//! | `Auth`        | Missing or invalid identity                       |
//! | `Internal`    | Storage or unexpected failure                     |

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Signature,
    Integration,
    Auth,
    Internal,
}

impl ErrorCode {
    /// Classify this code into the failure taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound
            | Self::OrderNotFound
            | Self::ProductNotFound
            | Self::InventoryNotFound
            | Self::VoucherNotFound => ErrorKind::NotFound,

            Self::AlreadyExists
            | Self::OrderAlreadyPaid
            | Self::OrderAlreadyCancelled
            | Self::OrderNotCancellable
            | Self::InvalidStatusTransition
            | Self::InvalidPaymentTransition
            | Self::ProductOutOfStock
            | Self::InventoryOutOfBounds
            | Self::VoucherUsageLimitExceeded
            | Self::VoucherPerUserLimitExceeded
            | Self::PaymentAmountMismatch => ErrorKind::Conflict,

            Self::PaymentSignatureInvalid => ErrorKind::Signature,

            Self::CacheError | Self::NotificationFailed | Self::AuditFailed => {
                ErrorKind::Integration
            }

            Self::NotAuthenticated
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::PermissionDenied => ErrorKind::Auth,

            Self::Unknown
            | Self::InternalError
            | Self::DatabaseError
            | Self::NetworkError
            | Self::TimeoutError
            | Self::ConfigError
            | Self::PaymentFailed => ErrorKind::Internal,

            Self::Success
            | Self::ValidationFailed
            | Self::InvalidRequest
            | Self::ValueOutOfRange
            | Self::CartEmpty
            | Self::CartItemUnavailable
            | Self::OrderEmpty
            | Self::PaymentInvalidMethod
            | Self::ProductInvalidPrice
            | Self::ProductUnavailable
            | Self::VoucherExpired
            | Self::VoucherBelowMinimumOrder => ErrorKind::Validation,
        }
    }
}
