//! # Envelope Gateway Store
//!
//! Persistence for envelopes, artifacts, and the trust ledger, behind one
//! backend trait with two implementations.
//!
//! ## Components
//!
//! | Module | Contents |
//! |--------|----------|
//! | `backend` | `Backend` trait, `EnvelopeFilter`, `Page` |
//! | `memory` | capped in-memory backend, the default |
//! | `sqlite` | pooled WAL-mode SQLite backend |
//! | `blob` | filesystem spill for large artifact payloads |
//! | `store` | the `Store` facade: validation, hashing, proofs, audit |

#![warn(clippy::all)]

pub mod backend;
pub mod blob;
pub mod memory;
pub mod sqlite;
pub mod store;

// Re-exports
pub use backend::{Backend, EnvelopeFilter, Page};
pub use blob::BlobStore;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use store::{Store, DEFAULT_INLINE_LIMIT};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
