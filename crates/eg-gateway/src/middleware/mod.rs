//! Tower middleware for the gateway.

pub mod rate_limit;

pub use rate_limit::{client_ip, Bucket, RateLimitLayer, RateLimiter};
