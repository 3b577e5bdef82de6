//! Order API
//!
//! | Path | Method | Who |
//! |------|--------|-----|
//! | /api/orders | POST | owner |
//! | /api/orders | GET | owner |
//! | /api/orders/{id} | GET | owner, admin |
//! | /api/orders/{id}/cancel | POST | owner, admin |
//! | /api/orders/{id}/status | PUT | admin |
//! | /api/orders/{id}/payment-status | PUT | admin |

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub use handler::{
    CancelOrderResponse, CreateOrderRequest, OrderLineRequest, ShippingInfoRequest,
    UpdatePaymentStatusRequest, UpdateStatusRequest,
};

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/payment-status", put(handler::update_payment_status))
}
