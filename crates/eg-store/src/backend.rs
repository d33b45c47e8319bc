//! The storage seam: one trait, two backends.
//!
//! Both backends implement identical pagination semantics so a deployment
//! can move between them without clients noticing: newest-first by
//! `updated_at` (oldest-first with `dir=asc`), cursor equals the last
//! returned timestamp, and the next page takes rows strictly beyond it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{
    AuditEvent, Envelope, FederationRecord, NotaryRecord, QuorumState, RoomMessage, StoreError,
};

/// Envelope listing filter. All fields conjunctive; absent means "any".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvelopeFilter {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Matches envelopes addressed to this recipient.
    pub to: Option<String>,
    /// Matches the sender.
    pub from: Option<String>,
    /// Matches envelopes whose thread root equals this id.
    pub thread: Option<String>,
    pub limit: Option<usize>,
    /// `updated_at` of the last item from the previous page.
    pub cursor: Option<String>,
    /// `desc` (default) or `asc`.
    pub dir: Option<String>,
}

impl EnvelopeFilter {
    /// Requested page size clamped to 1..=200, defaulting to 50.
    pub fn page_size(&self) -> usize {
        self.limit.unwrap_or(50).clamp(1, 200)
    }

    pub fn ascending(&self) -> bool {
        self.dir.as_deref() == Some("asc")
    }
}

/// One page of results plus the cursor for the next page.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Absent when this is the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Page from a full-size slice of items ordered newest-first, where the
    /// cursor is the `updated_at` of the last item.
    pub fn new(items: Vec<T>, full: bool, cursor_of_last: Option<String>) -> Self {
        let next_cursor = if full { cursor_of_last } else { None };
        Self { items, next_cursor }
    }
}

/// Persistence operations shared by the memory and SQLite backends.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    // Envelopes
    async fn insert_envelope(&self, env: &Envelope) -> Result<(), StoreError>;
    async fn get_envelope(&self, id: &str) -> Result<Option<Envelope>, StoreError>;
    /// Replace an existing envelope wholesale. The id must already exist.
    async fn update_envelope(&self, env: &Envelope) -> Result<(), StoreError>;
    async fn list_envelopes(&self, filter: &EnvelopeFilter) -> Result<Page<Envelope>, StoreError>;
    /// All envelopes in a thread, oldest-first.
    async fn list_thread(&self, root: &str, limit: usize) -> Result<Vec<Envelope>, StoreError>;

    // Artifacts
    async fn put_artifact(&self, artifact: &shared_types::Artifact) -> Result<(), StoreError>;
    async fn get_artifact(&self, key: &str)
        -> Result<Option<shared_types::Artifact>, StoreError>;
    /// Up to `limit` artifacts, most recently updated first.
    async fn list_artifacts(&self, limit: usize)
        -> Result<Vec<shared_types::Artifact>, StoreError>;

    // Audit ledger
    async fn append_audit(&self, event: &AuditEvent) -> Result<(), StoreError>;
    /// The last `limit` audit events, oldest-first.
    async fn tail_audit(&self, limit: usize) -> Result<Vec<AuditEvent>, StoreError>;

    // Notary
    async fn insert_notary(&self, record: &NotaryRecord) -> Result<(), StoreError>;
    async fn get_notary(&self, id: &str) -> Result<Option<NotaryRecord>, StoreError>;
    /// Up to `limit` records, newest-first.
    async fn list_notary(&self, limit: usize) -> Result<Vec<NotaryRecord>, StoreError>;

    // Rooms
    async fn insert_room_message(&self, message: &RoomMessage) -> Result<(), StoreError>;
    /// The last `limit` messages in a room, oldest-first.
    async fn list_room_messages(
        &self,
        room: &str,
        limit: usize,
    ) -> Result<Vec<RoomMessage>, StoreError>;

    // Federation
    async fn insert_federation(&self, record: &FederationRecord) -> Result<(), StoreError>;
    /// The last `limit` handshake snapshots, newest-first.
    async fn list_federation(&self, limit: usize) -> Result<Vec<FederationRecord>, StoreError>;

    // Quorum
    async fn get_quorum(&self, room: &str) -> Result<Option<QuorumState>, StoreError>;
    async fn put_quorum(&self, state: &QuorumState) -> Result<(), StoreError>;
    async fn clear_quorum(&self, room: &str) -> Result<(), StoreError>;
}
