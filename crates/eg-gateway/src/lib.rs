//! # Envelope Gateway
//!
//! The HTTP surface: token auth, per-minute rate limiting, envelope and
//! artifact endpoints, the audit ledger, quorum rooms, and federation.
//!
//! ## Components
//!
//! | Module | Contents |
//! |--------|----------|
//! | `config` | `GatewayConfig` and `EG_*` environment loading |
//! | `auth` | tiered token checks |
//! | `middleware` | fixed-window rate limiting |
//! | `handlers` | one module per resource |
//! | `federation` | peer handshake client and policy fetch |
//! | `router` | route table and middleware stack |
//! | `state` | `AppState` wiring |

#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod error;
pub mod federation;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-exports
pub use config::GatewayConfig;
pub use error::{ApiError, ApiResult};
pub use router::build_router;
pub use state::AppState;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
