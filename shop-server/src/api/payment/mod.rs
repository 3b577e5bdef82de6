//! VNPay payment API
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/payment/vnpay/create | POST | bearer token |
//! | /api/payment/vnpay/return | GET | gateway signature |
//! | /api/payment/vnpay/ipn | GET | gateway signature |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub use handler::{ClientIp, CreatePaymentRequest, PaymentUrlResponse};

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/payment/vnpay", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/create", post(handler::create_payment_url))
        .route("/return", get(handler::vnpay_return))
        .route("/ipn", get(handler::vnpay_ipn))
}
