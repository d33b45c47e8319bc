//! Quorum endpoints: propose, vote, decide, status.

use crate::auth::{self, Tier};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct ProposeBody {
    #[serde(default)]
    pub threshold: Option<String>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub from: Option<String>,
}

pub async fn propose(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room): Path<String>,
    Json(body): Json<ProposeBody>,
) -> ApiResult<Response> {
    auth::require(&state.config.auth, &headers, Tier::Write)?;
    let (envelope, quorum) = state
        .quorum
        .propose(&room, body.threshold, body.payload, body.from)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "envelope": envelope, "quorum": quorum })),
    )
        .into_response())
}

#[derive(Deserialize)]
pub struct VoteBody {
    pub voter: String,
    pub vote: Value,
}

/// Votes arrive as `true`/`false` or `"yes"`/`"no"`.
fn parse_vote(vote: &Value) -> Result<bool, ApiError> {
    match vote {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" => Ok(true),
            "no" | "n" | "false" => Ok(false),
            other => Err(ApiError::bad_request(format!("unrecognized vote: {other}"))),
        },
        _ => Err(ApiError::bad_request("vote must be yes/no or a boolean")),
    }
}

pub async fn vote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room): Path<String>,
    Json(body): Json<VoteBody>,
) -> ApiResult<Json<Value>> {
    auth::require(&state.config.auth, &headers, Tier::Write)?;
    let yes = parse_vote(&body.vote)?;
    let (envelope, tally) = state.quorum.vote(&room, &body.voter, yes).await?;
    Ok(Json(json!({ "ok": true, "envelope": envelope, "tally": tally })))
}

pub async fn decide(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room): Path<String>,
) -> ApiResult<Json<Value>> {
    auth::require(&state.config.auth, &headers, Tier::Write)?;
    let decision = state.quorum.decide(&room).await?;
    Ok(Json(json!({
        "ok": true,
        "tally": decision.tally,
        "envelope": decision.envelope,
        "decided_at": decision.decided_at,
    })))
}

pub async fn status(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> ApiResult<Json<Value>> {
    let (quorum, tally) = state
        .quorum
        .status(&room)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no proposal in room {room}")))?;
    Ok(Json(json!({ "ok": true, "quorum": quorum, "tally": tally })))
}
