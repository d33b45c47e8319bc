//! Content-addressed artifacts.
//!
//! Small payloads stay inline in the primary store; large ones are spilled to
//! blob storage and the record keeps only the object key. Readers never see
//! the difference: the store re-inlines external payloads on fetch.

use serde::{Deserialize, Serialize};

/// Where an artifact's bytes actually live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "storage", rename_all = "snake_case")]
pub enum StoredPayload {
    /// Payload small enough to keep in the primary store.
    Inline { data_text: String },
    /// Payload spilled to blob storage under `object_key`.
    External { object_key: String },
}

/// A named, versioned-by-content blob of text.
///
/// The key is caller-chosen and stable; the `sha256` changes with the
/// content. Upserting the same key replaces the previous content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub key: String,
    /// SHA-256 hex of the payload text.
    pub sha256: String,
    /// Payload byte length (UTF-8).
    pub size: u64,
    /// MIME type hint, defaulting to `text/plain`.
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(flatten)]
    pub payload: StoredPayload,
    pub created_at: String,
    pub updated_at: String,
}

fn default_content_type() -> String {
    "text/plain".to_string()
}

impl Artifact {
    /// Inline text if present; `None` when the payload is external.
    pub fn inline_text(&self) -> Option<&str> {
        match &self.payload {
            StoredPayload::Inline { data_text } => Some(data_text),
            StoredPayload::External { .. } => None,
        }
    }
}
