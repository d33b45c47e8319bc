//! HTTP error envelope.
//!
//! Every failure leaves the gateway as `{"ok": false, "error": <kind>,
//! "message": <detail>}` with a matching status code, so clients branch on
//! the stable `error` kind and log the message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use shared_types::StoreError;

/// Stable machine-readable error kinds
pub mod kinds {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const METHOD_NOT_ALLOWED: &str = "method_not_allowed";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const UPSTREAM_FETCH_FAILED: &str = "upstream_fetch_failed";
    pub const INTERNAL: &str = "internal";
}

/// A gateway error: kind, status, human-readable message, optional extras
/// merged into the response body.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: &'static str,
    pub status: StatusCode,
    pub message: String,
    pub extra: Option<Value>,
}

impl ApiError {
    pub fn new(kind: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            extra: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(kinds::BAD_REQUEST, StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(kinds::UNAUTHORIZED, StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(kinds::FORBIDDEN, StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(
            kinds::NOT_FOUND,
            StatusCode::NOT_FOUND,
            format!("not found: {}", what.into()),
        )
    }

    pub fn method_not_allowed() -> Self {
        Self::new(
            kinds::METHOD_NOT_ALLOWED,
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed for this route",
        )
    }

    pub fn rate_limited(retry_after_sec: u64, limit_per_min: u32) -> Self {
        let mut err = Self::new(
            kinds::RATE_LIMITED,
            StatusCode::TOO_MANY_REQUESTS,
            "rate limit exceeded",
        );
        err.extra = Some(json!({
            "retry_after_sec": retry_after_sec,
            "limit_per_min": limit_per_min,
        }));
        err
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(
            kinds::UPSTREAM_FETCH_FAILED,
            StatusCode::BAD_GATEWAY,
            message,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(kinds::INTERNAL, StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => Self::not_found(what),
            StoreError::Invalid(why) => Self::bad_request(why),
            other => {
                tracing::error!(error = %other, "store operation failed");
                Self::internal("storage operation failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "ok": false,
            "error": self.kind,
            "message": self.message,
        });
        if let (Value::Object(body), Some(Value::Object(extra))) = (&mut body, self.extra) {
            for (k, v) in extra {
                body.insert(k, v);
            }
        }
        (self.status, Json(body)).into_response()
    }
}

/// Result type for handler functions
pub type ApiResult<T> = Result<T, ApiError>;
