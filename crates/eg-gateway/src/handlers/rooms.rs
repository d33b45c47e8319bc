//! Room message board.

use crate::auth::{self, Tier};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct PostBody {
    #[serde(default)]
    pub from: Option<String>,
    pub text: String,
    #[serde(default)]
    pub meta: Value,
}

pub async fn post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room): Path<String>,
    Json(body): Json<PostBody>,
) -> ApiResult<Response> {
    auth::require(&state.config.auth, &headers, Tier::Write)?;
    let message = state
        .store
        .post_room_message(&room, body.from, body.text, body.meta)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "message": message })),
    )
        .into_response())
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

pub async fn list(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1_000);
    let items = state.store.list_room_messages(&room, limit).await?;
    Ok(Json(json!({ "ok": true, "room": room, "items": items })))
}
