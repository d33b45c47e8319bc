//! Token auth.
//!
//! Reads are open. Mutations need the write token (the admin token also
//! passes); admin endpoints take only the admin token. A tier with no
//! token configured fails closed: its endpoints answer 401 until a
//! credential exists. Token comparison is constant-time.

use crate::config::AuthConfig;
use crate::error::ApiError;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use shared_crypto::constant_time_eq;

pub const TOKEN_HEADER: &str = "x-gateway-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Write,
    Admin,
}

/// Token presented by the client: `Authorization: Bearer <t>` wins over
/// the `x-gateway-token` header.
fn presented_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token);
            }
        }
    }
    headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Check that the request carries a token valid for `tier`.
pub fn require(auth: &AuthConfig, headers: &HeaderMap, tier: Tier) -> Result<(), ApiError> {
    let accepted: Vec<&str> = match tier {
        Tier::Write => [&auth.write_token, &auth.admin_token],
        Tier::Admin => [&None, &auth.admin_token],
    }
    .into_iter()
    .filter_map(|t| t.as_deref())
    .collect();

    // Fail closed: an unconfigured tier never authorizes anyone.
    if accepted.is_empty() {
        return Err(ApiError::unauthorized(match tier {
            Tier::Write => "write access is not configured",
            Tier::Admin => "admin access is not configured",
        }));
    }

    let Some(token) = presented_token(headers) else {
        return Err(ApiError::unauthorized("missing access token"));
    };
    if accepted.iter().any(|t| constant_time_eq(t, token)) {
        Ok(())
    } else {
        Err(ApiError::forbidden("token not valid for this operation"))
    }
}
