//! Authentication extractors.
//!
//! Owners authenticate with a Bearer token that is their owner id. Every
//! favorites and bookings query is scoped by that id, so one owner can never
//! read or change another owner's rows.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AppError;
use crate::AppState;

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized("Missing authorization header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized("Invalid authorization header format"))?;

    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized("Empty bearer token"));
    }
    Ok(token)
}

/// Authenticated owner extracted from request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub owner_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let owner_id = bearer_token(parts)?.to_string();
        Ok(AuthUser { owner_id })
    }
}

/// Caller holding the configured admin token.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser;

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_token.as_deref() else {
            return Err(AppError::Forbidden("Admin access is disabled"));
        };

        if bearer_token(parts)? != expected {
            tracing::warn!("Rejected admin request with wrong token");
            return Err(AppError::Unauthorized("Invalid admin token"));
        }
        Ok(AdminUser)
    }
}
