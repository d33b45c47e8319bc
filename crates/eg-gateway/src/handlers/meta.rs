//! Health, policy, and well-known descriptors.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use shared_types::now_iso;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "version": crate::VERSION,
        "backend": state.store.backend_name(),
        "signing": state.store.signing_enabled(),
        "ts": now_iso(),
    }))
}

/// The policy document: proxied from the configured upstream when one is
/// set, otherwise the gateway's own limits and toggles.
pub async fn policy(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let config = &state.config;
    if let Some(url) = &config.policy.url {
        let (policy, http_status) = state.federation.fetch_policy(url).await?;
        return Ok(Json(json!({
            "ok": true,
            "policy": policy,
            "source": url,
            "http_status": http_status,
        })));
    }
    Ok(Json(json!({
        "ok": true,
        "source": "builtin",
        "policy": {
            "rate_limit": {
                "enabled": config.rate_limit.enabled,
                "read_per_min": config.rate_limit.read_per_min,
                "write_per_min": config.rate_limit.write_per_min,
            },
            "audit_public": config.auth.audit_public,
            "inline_limit": config.storage.inline_limit,
            "quorum": { "default_threshold": eg_quorum::DEFAULT_THRESHOLD },
            "federation": {
                "max_targets": config.federation.max_targets,
                "allowlisted_peers": config.federation.peers.len(),
            },
        },
    })))
}

pub async fn agent_trust(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": "envelope-gateway",
        "version": crate::VERSION,
        "signing": state.store.signing_enabled(),
        "auth": { "header": crate::auth::TOKEN_HEADER, "scheme": "bearer" },
        "endpoints": {
            "envelopes": "/envelopes",
            "artifacts": "/artifacts",
            "notary": "/notary",
            "audit": "/audit",
            "quorum": "/quorum/{room}",
            "federation": "/federation/handshake",
        },
    }))
}

pub async fn gateway_spec() -> Json<Value> {
    Json(json!({
        "name": "envelope-gateway",
        "version": crate::VERSION,
        "routes": [
            "GET /health",
            "GET /policy",
            "POST /envelopes",
            "GET /envelopes",
            "GET /envelopes/{id}",
            "PATCH /envelopes/{id}",
            "GET /threads/{root}",
            "GET /artifacts",
            "POST /artifacts",
            "PUT /artifacts/{key}",
            "GET /artifacts/{key}",
            "POST /notary",
            "GET /notary",
            "GET /notary/{id}",
            "GET /audit",
            "POST /rooms/{room}/messages",
            "GET /rooms/{room}/messages",
            "POST /quorum/{room}/propose",
            "POST /quorum/{room}/vote",
            "POST /quorum/{room}/decide",
            "GET /quorum/{room}",
            "GET /federation/handshake",
            "POST /federation/handshake",
        ],
    }))
}

pub async fn fallback() -> ApiError {
    ApiError::not_found("route")
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}
