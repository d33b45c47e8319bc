//! # Shared Crypto - Canonicalization, Hashing, Proof Signing
//!
//! Deterministic JSON encoding, SHA-256 content addressing, and the tiered
//! proof signer used for envelopes and notary receipts.
//!
//! ## Components
//!
//! | Module | Contents |
//! |--------|----------|
//! | `canonical` | byte-stable JSON encoding |
//! | `hashing` | `sha256_hex`, `canonical_sha256` |
//! | `signing` | `SignerKeys`, `maybe_sign`, `verify_proof` |
//! | `errors` | `CryptoError` |

#![warn(clippy::all)]

pub mod canonical;
pub mod errors;
pub mod hashing;
pub mod signing;

// Re-exports
pub use canonical::canonical_json;
pub use errors::CryptoError;
pub use hashing::{canonical_sha256, sha256_hex};
pub use signing::{constant_time_eq, maybe_sign, verify_proof, SignerKeys};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
