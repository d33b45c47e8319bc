//! Envelope intake, lookup, listing, status updates, and thread reads.

use crate::auth::{self, Tier};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use eg_store::EnvelopeFilter;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::Envelope;

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<Envelope>,
) -> ApiResult<Response> {
    auth::require(&state.config.auth, &headers, Tier::Write)?;
    let envelope = state.store.create_envelope(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "envelope": envelope })),
    )
        .into_response())
}

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<EnvelopeFilter>,
) -> ApiResult<Json<Value>> {
    let page = state.store.list_envelopes(&filter).await?;
    Ok(Json(json!({
        "ok": true,
        "items": page.items,
        "next_cursor": page.next_cursor,
    })))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let envelope = state
        .store
        .get_envelope(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("envelope {id}")))?;
    Ok(Json(json!({ "ok": true, "envelope": envelope })))
}

#[derive(Deserialize)]
pub struct UpdateBody {
    pub status: String,
    /// Fields merged into the envelope's meta.
    #[serde(default, alias = "meta")]
    pub extra: Option<Value>,
}

pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> ApiResult<Json<Value>> {
    auth::require(&state.config.auth, &headers, Tier::Write)?;
    let envelope = state
        .store
        .update_status(&id, &body.status, body.extra)
        .await?;
    Ok(Json(json!({ "ok": true, "envelope": envelope })))
}

#[derive(Deserialize)]
pub struct ThreadQuery {
    pub limit: Option<usize>,
}

pub async fn thread(
    State(state): State<AppState>,
    Path(root): Path<String>,
    Query(query): Query<ThreadQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(200).clamp(1, 1_000);
    let items = state.store.list_thread(&root, limit).await?;
    Ok(Json(json!({ "ok": true, "root": root, "items": items })))
}
