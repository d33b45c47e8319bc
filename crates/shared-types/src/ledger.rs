//! Append-only ledger records: audit events, notarizations, room messages,
//! and federation handshake results.

use crate::proof::Proof;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One audit-trail entry. Written on every state-changing operation,
/// never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub ts: String,
    /// Event kind, e.g. `envelope.create`, `artifact.put`, `quorum.decide`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Event-specific details.
    #[serde(default)]
    pub data: Value,
}

impl AuditEvent {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            id: crate::ids::rand_id("audit"),
            ts: crate::ids::now_iso(),
            kind: kind.into(),
            data,
        }
    }
}

/// A notarization receipt: the gateway's attestation binding a subject
/// name to a submitted hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotaryRecord {
    pub id: String,
    pub ts: String,
    /// Attestation kind, `attestation` unless the caller says otherwise.
    pub kind: String,
    /// What the hash is claimed to name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// The hash the caller asked to notarize.
    pub sha256: String,
    #[serde(default)]
    pub meta: Value,
    /// Proof over the receipt's canonical form, when signing is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

/// A message posted to a named room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomMessage {
    pub id: String,
    pub room: String,
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub text: String,
    #[serde(default)]
    pub meta: Value,
}

/// A stored federation handshake: the trust documents fetched from one
/// peer, frozen at fetch time. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationRecord {
    pub id: String,
    pub ts: String,
    /// Peer base URL the documents came from.
    pub remote: String,
    /// Fetched well-known documents plus per-document HTTP status.
    pub snapshot: Value,
}
