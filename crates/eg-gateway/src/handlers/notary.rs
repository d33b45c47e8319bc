//! Notarization receipts.

use crate::auth::{self, Tier};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct NotarizeBody {
    pub sha256: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub meta: Value,
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NotarizeBody>,
) -> ApiResult<Response> {
    auth::require(&state.config.auth, &headers, Tier::Write)?;
    let record = state
        .store
        .notarize(&body.sha256, body.kind, body.subject, body.meta)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "record": record })),
    )
        .into_response())
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let record = state
        .store
        .get_notary(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("notary record {id}")))?;
    Ok(Json(json!({ "ok": true, "record": record })))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// Recent receipts, newest first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(200).clamp(1, 500);
    let records = state.store.list_notary(limit).await?;
    Ok(Json(json!({ "ok": true, "records": records })))
}
