//! Order API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::models::{
    CheckoutOptions, DraftLine, Order, OrderDraft, OrderStatus, PaymentMethod, PaymentStatus,
    ShippingInfo,
};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::OrderRef;
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_NOTE_LEN, MAX_PHONE_LEN, validate_payload,
};
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode};

#[derive(Debug, Deserialize, Validate)]
pub struct OrderLineRequest {
    #[validate(range(min = 1))]
    pub inventory_id: i64,
    #[validate(range(min = 1))]
    pub product_id: i64,
    pub color_id: Option<i64>,
    pub size_id: Option<i64>,
    #[validate(range(min = 1, max = 9999))]
    pub quantity: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShippingInfoRequest {
    #[validate(length(min = 1, max = MAX_NAME_LEN))]
    pub recipient_name: String,
    #[validate(length(min = 6, max = MAX_PHONE_LEN))]
    pub phone: String,
    #[validate(length(min = 1, max = MAX_ADDRESS_LEN))]
    pub address: String,
    #[validate(length(max = MAX_NOTE_LEN))]
    pub note: Option<String>,
}

/// Checkout request
///
/// Either `items` is given, or `from_cart` is set and the user's cart is
/// checked out.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<OrderLineRequest>,
    #[serde(default)]
    pub from_cart: bool,
    pub payment_method: PaymentMethod,
    #[validate(nested)]
    pub shipping_info: ShippingInfoRequest,
    #[validate(length(max = MAX_NAME_LEN))]
    pub voucher_code: Option<String>,
}

impl CreateOrderRequest {
    fn options(&self) -> CheckoutOptions {
        CheckoutOptions {
            payment_method: self.payment_method,
            shipping_info: ShippingInfo {
                recipient_name: self.shipping_info.recipient_name.trim().to_string(),
                phone: self.shipping_info.phone.trim().to_string(),
                address: self.shipping_info.address.trim().to_string(),
                note: self.shipping_info.note.clone(),
            },
            voucher_code: self.voucher_code.clone(),
        }
    }

    fn draft(&self) -> OrderDraft {
        OrderDraft {
            lines: self
                .items
                .iter()
                .map(|line| DraftLine {
                    inventory_id: line.inventory_id,
                    product_id: line.product_id,
                    color_id: line.color_id,
                    size_id: line.size_id,
                    quantity: line.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelOrderResponse {
    /// false when the order was already cancelled
    pub success: bool,
    pub order: Order,
}

/// Place an order
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<ApiResponse<Order>> {
    validate_payload(&payload)?;

    let options = payload.options();
    let order = if payload.from_cart {
        if !payload.items.is_empty() {
            return Err(AppError::validation(
                "items must be empty when checking out the cart",
            ));
        }
        state.orders.create_order_from_cart(user.id, options).await?
    } else {
        state
            .orders
            .create_order(payload.draft(), user.id, options)
            .await?
    };
    Ok(ApiResponse::success(order))
}

/// The caller's orders, newest first
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<Vec<Order>>> {
    let orders = state.orders.list_user_orders(user.id).await?;
    Ok(ApiResponse::success(orders))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<Order>> {
    let order = load_accessible(&state, &user, id).await?;
    Ok(ApiResponse::success(order))
}

/// Cancel an order and restore its stock
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<CancelOrderResponse>> {
    load_accessible(&state, &user, id).await?;
    let outcome = state.orders.cancel_order(id, user.id).await?;
    Ok(ApiResponse::success(CancelOrderResponse {
        success: outcome.is_cancelled(),
        order: outcome.into_order(),
    }))
}

pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<ApiResponse<Order>> {
    require_admin(&user)?;
    let order = state
        .orders
        .update_order_status(id, payload.status, user.id)
        .await?;
    Ok(ApiResponse::success(order))
}

pub async fn update_payment_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePaymentStatusRequest>,
) -> AppResult<ApiResponse<Order>> {
    require_admin(&user)?;
    let order = state
        .orders
        .update_payment_status(OrderRef::Id(id), payload.payment_status, Some(user.id))
        .await?;
    Ok(ApiResponse::success(order))
}

/// Orders of other users look missing to non-admins
async fn load_accessible(state: &ServerState, user: &CurrentUser, id: i64) -> AppResult<Order> {
    let order = state.orders.get_order(id).await?;
    if !user.can_access(order.user_id) {
        return Err(AppError::with_message(
            ErrorCode::OrderNotFound,
            format!("Order not found: {}", id),
        ));
    }
    Ok(order)
}

fn require_admin(user: &CurrentUser) -> AppResult<()> {
    if !user.is_admin() {
        crate::security_log!(
            "WARN",
            "admin_required",
            user_id = user.id,
            username = user.username.as_str()
        );
        return Err(AppError::permission_denied("Admin role required"));
    }
    Ok(())
}
