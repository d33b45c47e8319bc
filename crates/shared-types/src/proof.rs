//! Proof attachments: best-effort signatures over an envelope's canonical form.
//!
//! Absence of a proof is a valid, unsigned state. Callers hold `Option<Proof>`
//! or an empty `proofs` list - never an error.

use serde::{Deserialize, Serialize};

/// A cryptographic proof over a canonicalized payload.
///
/// Tiers are tried in order by the signer: asymmetric signature, then keyed
/// authentication code. Which variant appears depends only on what key
/// material was configured at the time of signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Proof {
    /// Ed25519 signature over the canonical bytes.
    #[serde(rename = "ed25519")]
    Ed25519 {
        /// Signing time (RFC-3339).
        ts: String,
        /// SHA-256 of the canonical bytes the signature covers.
        canonical_sha256: String,
        /// Verifying key, base64.
        public_key_b64: String,
        /// Signature, base64.
        signature_b64: String,
    },
    /// HMAC-SHA256 authentication code over the canonical bytes.
    #[serde(rename = "hmac-sha256")]
    HmacSha256 {
        /// Signing time (RFC-3339).
        ts: String,
        /// SHA-256 of the canonical bytes the code covers.
        canonical_sha256: String,
        /// Authentication code, base64.
        mac_b64: String,
    },
}

impl Proof {
    /// Content address of the canonical bytes this proof covers.
    pub fn canonical_sha256(&self) -> &str {
        match self {
            Proof::Ed25519 {
                canonical_sha256, ..
            }
            | Proof::HmacSha256 {
                canonical_sha256, ..
            } => canonical_sha256,
        }
    }
}
