//! The envelope: a typed, addressed, timestamped message between agents.

use crate::proof::Proof;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Causal-chain position. `root` names the chain an envelope belongs to,
/// `prev` its immediate predecessor. Chains grow by appending new ids;
/// `prev` is never rewritten, so the forest stays acyclic by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
}

/// Advisory policy metadata. Never authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub score: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

/// The unit of exchange.
///
/// The typed fields are validated at the boundary; `payload` and `meta` are
/// open maps so senders can carry forward-compatible extensions without a
/// schema change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Globally unique id; immutable once assigned.
    #[serde(default)]
    pub id: String,
    /// Free-form type tag (`note`, `alert`, `proposal`, `vote`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Originating agent identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Recipient agent or topic identifiers (e.g. `topic:quorum/<room>`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    /// Advisory ordering hint for consumers; lower is more urgent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// Lifecycle tag, mutable only through explicit status updates.
    #[serde(default = "default_status")]
    pub status: String,
    /// Structured body.
    #[serde(default)]
    pub payload: Value,
    /// Open extension map.
    #[serde(default)]
    pub meta: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,
    /// Attached proofs, append-only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proofs: Vec<Proof>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    /// Content address of the canonical form, excluding this field.
    /// Recomputed on every mutation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sha256: String,
}

fn default_status() -> String {
    "queued".to_string()
}

impl Envelope {
    /// New envelope with only the type tag set; everything else defaulted.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            kind: kind.into(),
            from: None,
            to: Vec::new(),
            thread: None,
            priority: None,
            status: default_status(),
            payload: Value::Null,
            meta: Value::Null,
            policy: None,
            proofs: Vec::new(),
            created_at: String::new(),
            updated_at: String::new(),
            sha256: String::new(),
        }
    }

    /// The causal chain this envelope belongs to, if any.
    pub fn thread_root(&self) -> Option<&str> {
        self.thread.as_ref().and_then(|t| t.root.as_deref())
    }
}
