//! Federation endpoints: handshake batches and stored snapshots.

use crate::auth::{self, Tier};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct HandshakeBody {
    pub targets: Vec<String>,
}

/// Fetch and snapshot each target's trust documents.
pub async fn handshake(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<HandshakeBody>,
) -> ApiResult<Json<Value>> {
    auth::require(&state.config.auth, &headers, Tier::Write)?;
    let results = state
        .federation
        .handshake(&state.store, &body.targets)
        .await?;
    Ok(Json(json!({ "ok": true, "results": results })))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// Stored snapshots, newest first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let items = state.store.list_federation(limit).await?;
    Ok(Json(json!({ "ok": true, "items": items })))
}
