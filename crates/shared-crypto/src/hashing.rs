//! SHA-256 content addressing.

use sha2::{Digest, Sha256};
use std::fmt::Write;

/// SHA-256 of `bytes` as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(64);
    for b in digest {
        // Writing to a String cannot fail.
        let _ = write!(out, "{:02x}", b);
    }
    out
}

/// Canonicalize `value` and hash the canonical bytes.
pub fn canonical_sha256(value: &serde_json::Value) -> String {
    sha256_hex(crate::canonical::canonical_json(value).as_bytes())
}
