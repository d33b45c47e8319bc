//! # Shared Types - Envelope Gateway Data Model
//!
//! Core record types exchanged between the gateway, the stores, and the
//! quorum engine.
//!
//! ## Components
//!
//! | Module | Contents |
//! |--------|----------|
//! | `envelope` | `Envelope`, `Thread`, `Policy`, `EnvelopeStatus` conventions |
//! | `artifact` | `Artifact`, `StoredPayload` (inline vs externalized) |
//! | `ledger` | `AuditEvent`, `NotaryRecord`, `RoomMessage`, `FederationRecord` |
//! | `proof` | `Proof` - signature / authentication-code attachments |
//! | `quorum` | `QuorumState`, `QuorumVote`, `Tally`, `QuorumResult` |
//! | `ids` | prefixed record ids and RFC-3339 timestamps |

#![warn(clippy::all)]

pub mod artifact;
pub mod envelope;
pub mod errors;
pub mod ids;
pub mod ledger;
pub mod proof;
pub mod quorum;

// Re-exports
pub use artifact::{Artifact, StoredPayload};
pub use envelope::{Envelope, Policy, Thread};
pub use errors::StoreError;
pub use ids::{now_iso, rand_id};
pub use ledger::{AuditEvent, FederationRecord, NotaryRecord, RoomMessage};
pub use proof::Proof;
pub use quorum::{DecisionRecord, QuorumResult, QuorumState, QuorumVote, Tally};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
