//! VNPay API handlers

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, FromRequestParts, Query, State},
    http::request::Parts,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::payment::{IpnResponse, PaymentUrlRequest, ReturnOutcome};
use crate::utils::validation::validate_payload;
use crate::utils::{ApiResponse, AppResult};

/// Caller address: first `X-Forwarded-For` hop, else the peer address
#[derive(Debug, Clone, Default)]
pub struct ClientIp(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty());
        if forwarded.is_some() {
            return Ok(Self(forwarded));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(Self(peer))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1, max = 64))]
    pub txn_ref: String,
    #[validate(length(max = 20))]
    pub bank_code: Option<String>,
    #[validate(length(min = 2, max = 5))]
    pub locale: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentUrlResponse {
    pub payment_url: String,
}

/// Signed redirect URL for one of the caller's unpaid orders
pub async fn create_payment_url(
    State(state): State<ServerState>,
    user: CurrentUser,
    ClientIp(ip_addr): ClientIp,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<ApiResponse<PaymentUrlResponse>> {
    validate_payload(&payload)?;

    let req = PaymentUrlRequest {
        txn_ref: payload.txn_ref,
        bank_code: payload.bank_code,
        ip_addr,
        locale: payload.locale,
    };
    let payment_url = state.payment.create_payment_url(user.id, &req)?;
    Ok(ApiResponse::success(PaymentUrlResponse { payment_url }))
}

/// Browser return: verify and report the stored order state
pub async fn vnpay_return(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<ApiResponse<ReturnOutcome>> {
    let outcome = state.payment.handle_return(&params)?;
    Ok(ApiResponse::success(outcome))
}

/// Server-to-server IPN; the gateway expects `{RspCode, Message}` with 200
pub async fn vnpay_ipn(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<IpnResponse> {
    Json(state.payment.handle_ipn(&params).await)
}
