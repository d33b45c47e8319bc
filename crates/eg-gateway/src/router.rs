//! Route table and middleware stack.

use crate::handlers::{artifacts, audit, envelopes, federation, meta, notary, quorum, rooms};
use crate::middleware::{RateLimitLayer, RateLimiter};
use crate::state::AppState;
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let limiter = Arc::new(RateLimiter::new(state.config.rate_limit.clone()));
    Router::new()
        .route("/health", get(meta::health))
        .route("/policy", get(meta::policy))
        .route("/.well-known/agent-trust.json", get(meta::agent_trust))
        .route("/.well-known/gateway-spec.json", get(meta::gateway_spec))
        .route("/envelopes", post(envelopes::create).get(envelopes::list))
        .route(
            "/envelopes/:id",
            get(envelopes::get).patch(envelopes::update),
        )
        .route("/threads/:root", get(envelopes::thread))
        .route("/artifacts", get(artifacts::list).post(artifacts::create))
        .route("/artifacts/:key", put(artifacts::put).get(artifacts::get))
        .route("/notary", post(notary::create).get(notary::list))
        .route("/notary/:id", get(notary::get))
        .route("/audit", get(audit::tail))
        .route(
            "/rooms/:room/messages",
            post(rooms::post).get(rooms::list),
        )
        .route("/quorum/:room", get(quorum::status))
        .route("/quorum/:room/propose", post(quorum::propose))
        .route("/quorum/:room/vote", post(quorum::vote))
        .route("/quorum/:room/decide", post(quorum::decide))
        .route(
            "/federation/handshake",
            get(federation::list).post(federation::handshake),
        )
        .method_not_allowed_fallback(meta::method_not_allowed)
        .fallback(meta::fallback)
        .layer(RateLimitLayer::new(limiter))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
