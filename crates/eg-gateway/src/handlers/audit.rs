//! Audit ledger export.
//!
//! Streams the tail of the ledger as NDJSON, oldest line first. With zero
//! events the body is empty. Admin-gated unless the deployment opts into a
//! public ledger.

use crate::auth::{self, Tier};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

pub const NDJSON: &str = "application/x-ndjson";

#[derive(Deserialize)]
pub struct TailQuery {
    pub limit: Option<usize>,
}

pub async fn tail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TailQuery>,
) -> ApiResult<Response> {
    if !state.config.auth.audit_public {
        auth::require(&state.config.auth, &headers, Tier::Admin)?;
    }
    let limit = query.limit.unwrap_or(100).clamp(1, 1_000);
    let events = state.store.tail_audit(limit).await?;
    let mut body = String::new();
    for event in &events {
        body.push_str(&serde_json::to_string(event).map_err(shared_types::StoreError::from)?);
        body.push('\n');
    }
    Ok(([(CONTENT_TYPE, NDJSON)], body).into_response())
}
