//! `CurrentUser` as an axum extractor
//!
//! Handlers that take a [`CurrentUser`] argument require
//! `Authorization: Bearer <jwt>`. The resolved user is memoized in the
//! request extensions, so a handler can extract it more than once.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::AppError;
use crate::auth::{CurrentUser, JwtError, JwtService};
use crate::core::ServerState;
use crate::security_log;

impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let token = bearer_token(parts)?;
        let claims = state.jwt_service.validate_token(token).map_err(|e| {
            security_log!("WARN", "auth_failed", error = e.to_string(), path = parts.uri.path());
            match e {
                JwtError::ExpiredToken => AppError::token_expired(),
                _ => AppError::invalid_token("Invalid token"),
            }
        })?;

        let user = CurrentUser::try_from(claims)
            .map_err(|e| AppError::invalid_token(format!("Malformed token subject: {}", e)))?;
        tracing::debug!(user_id = user.id, role = %user.role, "Request authenticated");
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let Some(header) = parts.headers.get(http::header::AUTHORIZATION) else {
        security_log!("WARN", "auth_missing", path = parts.uri.path());
        return Err(AppError::not_authenticated());
    };
    header
        .to_str()
        .ok()
        .and_then(JwtService::extract_from_header)
        .ok_or_else(|| AppError::invalid_token("Malformed authorization header"))
}
