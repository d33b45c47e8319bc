//! Content-addressed artifact storage.

use crate::auth::{self, Tier};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// Stored artifact metadata, newest first. Payloads are never inlined here.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let items = state.store.list_artifacts(limit).await?;
    Ok(Json(json!({ "ok": true, "items": items })))
}

/// JSON upload form: key plus an inline payload. Raw bodies go through
/// the PUT route instead.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult<Response> {
    auth::require(&state.config.auth, &headers, Tier::Write)?;
    let key = body
        .get("key")
        .and_then(Value::as_str)
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("key must be a non-empty string"))?
        .to_string();
    let payload = ["payload", "data", "text"]
        .iter()
        .find_map(|field| body.get(*field))
        .filter(|v| !v.is_null());
    let data = match payload {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => return Err(ApiError::bad_request("payload is required")),
    };
    let content_type = body
        .get("content_type")
        .and_then(Value::as_str)
        .map(String::from);
    let artifact = state.store.put_artifact(&key, data, content_type).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "ok": true,
            "key": artifact.key,
            "sha256": artifact.sha256,
            "size": artifact.size,
            "content_type": artifact.content_type,
            "created_at": artifact.created_at,
            "updated_at": artifact.updated_at,
        })),
    )
        .into_response())
}

pub async fn put(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
    body: String,
) -> ApiResult<Json<Value>> {
    auth::require(&state.config.auth, &headers, Tier::Write)?;
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let artifact = state.store.put_artifact(&key, body, content_type).await?;
    Ok(Json(json!({
        "ok": true,
        "key": artifact.key,
        "sha256": artifact.sha256,
        "size": artifact.size,
        "content_type": artifact.content_type,
        "created_at": artifact.created_at,
        "updated_at": artifact.updated_at,
    })))
}

pub async fn get(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Value>> {
    let (artifact, data_text) = state
        .store
        .get_artifact(&key)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("artifact {key}")))?;
    Ok(Json(json!({
        "ok": true,
        "key": artifact.key,
        "sha256": artifact.sha256,
        "size": artifact.size,
        "content_type": artifact.content_type,
        "created_at": artifact.created_at,
        "updated_at": artifact.updated_at,
        "data_text": data_text,
    })))
}
