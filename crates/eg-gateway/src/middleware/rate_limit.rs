//! Fixed-window rate limiting, per client IP, per minute.
//!
//! Reads and writes draw from separate buckets. A request is admitted when
//! the window's count before increment is below the limit; the count always
//! increments, so a client hammering a closed window stays closed. Stale
//! windows are pruned opportunistically once the map grows past a threshold,
//! never touching the current minute.

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request};
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::{Layer, Service};

/// Map size that triggers a prune pass.
const PRUNE_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Read,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    bucket: Bucket,
    ip: String,
    minute: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub admitted: bool,
    /// Seconds until the current window rolls over.
    pub retry_after_sec: u64,
    pub limit: u32,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<WindowKey, u32>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn limit_for(&self, bucket: Bucket) -> u32 {
        match bucket {
            Bucket::Read => self.config.read_per_min,
            Bucket::Write => self.config.write_per_min,
        }
    }

    pub fn check(&self, bucket: Bucket, ip: &str) -> Decision {
        let now_sec = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.check_at(bucket, ip, now_sec)
    }

    fn check_at(&self, bucket: Bucket, ip: &str, now_sec: u64) -> Decision {
        let limit = self.limit_for(bucket);
        let minute = now_sec / 60;
        let key = WindowKey {
            bucket,
            ip: ip.to_string(),
            minute,
        };
        let admitted = {
            let mut count = self.windows.entry(key).or_insert(0);
            let admitted = *count < limit;
            *count += 1;
            admitted
        };
        if self.windows.len() > PRUNE_THRESHOLD {
            self.windows.retain(|k, _| minute.saturating_sub(k.minute) <= 2);
        }
        Decision {
            admitted,
            retry_after_sec: 60 - (now_sec % 60),
            limit,
        }
    }
}

/// Requesting client's IP: first `x-forwarded-for` entry, then `x-real-ip`,
/// then the socket peer address.
pub fn client_ip<B>(req: &Request<B>) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real) = req.headers().get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real = real.trim();
        if !real.is_empty() {
            return real.to_string();
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn bucket_for(method: &Method) -> Bucket {
    match *method {
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE => Bucket::Write,
        _ => Bucket::Read,
    }
}

#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
}

impl RateLimitLayer {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimit<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimit {
            inner,
            limiter: Arc::clone(&self.limiter),
        }
    }
}

#[derive(Clone)]
pub struct RateLimit<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
}

impl<S> Service<Request<Body>> for RateLimit<S>
where
    S: Service<Request<Body>, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        if !self.limiter.enabled() {
            return Box::pin(self.inner.call(req));
        }
        let bucket = bucket_for(req.method());
        let ip = client_ip(&req);
        let decision = self.limiter.check(bucket, &ip);
        if decision.admitted {
            Box::pin(self.inner.call(req))
        } else {
            tracing::warn!(ip = %ip, bucket = ?bucket, "rate limit exceeded");
            let response =
                ApiError::rate_limited(decision.retry_after_sec, decision.limit).into_response();
            Box::pin(async move { Ok(response) })
        }
    }
}
