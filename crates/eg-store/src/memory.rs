//! In-memory backend.
//!
//! The zero-configuration default: nothing survives a restart, and the
//! append-only collections are capped so an unattended instance cannot grow
//! without bound. Oldest entries are dropped first when a cap is hit.

use crate::backend::{Backend, EnvelopeFilter, Page};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{
    Artifact, AuditEvent, Envelope, FederationRecord, NotaryRecord, QuorumState, RoomMessage,
    StoreError,
};
use std::collections::{HashMap, VecDeque};

const AUDIT_CAP: usize = 5_000;
const ROOM_CAP: usize = 5_000;
const FEDERATION_CAP: usize = 200;

#[derive(Default)]
pub struct MemoryBackend {
    envelopes: RwLock<HashMap<String, Envelope>>,
    artifacts: RwLock<HashMap<String, Artifact>>,
    audit: RwLock<VecDeque<AuditEvent>>,
    notary: RwLock<HashMap<String, NotaryRecord>>,
    rooms: RwLock<VecDeque<RoomMessage>>,
    federation: RwLock<VecDeque<FederationRecord>>,
    quorum: RwLock<HashMap<String, QuorumState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn push_capped<T>(queue: &mut VecDeque<T>, item: T, cap: usize) {
    queue.push_back(item);
    while queue.len() > cap {
        queue.pop_front();
    }
}

fn matches(env: &Envelope, filter: &EnvelopeFilter) -> bool {
    if let Some(status) = &filter.status {
        if &env.status != status {
            return false;
        }
    }
    if let Some(kind) = &filter.kind {
        if &env.kind != kind {
            return false;
        }
    }
    if let Some(to) = &filter.to {
        if !env.to.iter().any(|r| r == to) {
            return false;
        }
    }
    if let Some(from) = &filter.from {
        if env.from.as_deref() != Some(from.as_str()) {
            return false;
        }
    }
    if let Some(thread) = &filter.thread {
        if env.thread_root() != Some(thread.as_str()) {
            return false;
        }
    }
    if let Some(cursor) = &filter.cursor {
        // Strictly beyond the cursor in the listing direction.
        let beyond = if filter.ascending() {
            env.updated_at.as_str() > cursor.as_str()
        } else {
            env.updated_at.as_str() < cursor.as_str()
        };
        if !beyond {
            return false;
        }
    }
    true
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert_envelope(&self, env: &Envelope) -> Result<(), StoreError> {
        self.envelopes.write().insert(env.id.clone(), env.clone());
        Ok(())
    }

    async fn get_envelope(&self, id: &str) -> Result<Option<Envelope>, StoreError> {
        Ok(self.envelopes.read().get(id).cloned())
    }

    async fn update_envelope(&self, env: &Envelope) -> Result<(), StoreError> {
        let mut map = self.envelopes.write();
        if !map.contains_key(&env.id) {
            return Err(StoreError::not_found(format!("envelope {}", env.id)));
        }
        map.insert(env.id.clone(), env.clone());
        Ok(())
    }

    async fn list_envelopes(&self, filter: &EnvelopeFilter) -> Result<Page<Envelope>, StoreError> {
        let page = filter.page_size();
        let mut hits: Vec<Envelope> = self
            .envelopes
            .read()
            .values()
            .filter(|e| matches(e, filter))
            .cloned()
            .collect();
        // Id breaks timestamp ties so pages are stable.
        if filter.ascending() {
            hits.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));
        } else {
            hits.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        }
        hits.truncate(page);
        let full = hits.len() == page;
        let cursor = hits.last().map(|e| e.updated_at.clone());
        Ok(Page::new(hits, full, cursor))
    }

    async fn list_thread(&self, root: &str, limit: usize) -> Result<Vec<Envelope>, StoreError> {
        let mut hits: Vec<Envelope> = self
            .envelopes
            .read()
            .values()
            .filter(|e| e.thread_root() == Some(root))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn put_artifact(&self, artifact: &Artifact) -> Result<(), StoreError> {
        self.artifacts
            .write()
            .insert(artifact.key.clone(), artifact.clone());
        Ok(())
    }

    async fn get_artifact(&self, key: &str) -> Result<Option<Artifact>, StoreError> {
        Ok(self.artifacts.read().get(key).cloned())
    }

    async fn list_artifacts(&self, limit: usize) -> Result<Vec<Artifact>, StoreError> {
        let mut items: Vec<Artifact> = self.artifacts.read().values().cloned().collect();
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.key.cmp(&a.key)));
        items.truncate(limit);
        Ok(items)
    }

    async fn append_audit(&self, event: &AuditEvent) -> Result<(), StoreError> {
        push_capped(&mut self.audit.write(), event.clone(), AUDIT_CAP);
        Ok(())
    }

    async fn tail_audit(&self, limit: usize) -> Result<Vec<AuditEvent>, StoreError> {
        let audit = self.audit.read();
        let skip = audit.len().saturating_sub(limit);
        Ok(audit.iter().skip(skip).cloned().collect())
    }

    async fn insert_notary(&self, record: &NotaryRecord) -> Result<(), StoreError> {
        self.notary.write().insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_notary(&self, id: &str) -> Result<Option<NotaryRecord>, StoreError> {
        Ok(self.notary.read().get(id).cloned())
    }

    async fn list_notary(&self, limit: usize) -> Result<Vec<NotaryRecord>, StoreError> {
        let mut items: Vec<NotaryRecord> = self.notary.read().values().cloned().collect();
        items.sort_by(|a, b| b.ts.cmp(&a.ts).then(b.id.cmp(&a.id)));
        items.truncate(limit);
        Ok(items)
    }

    async fn insert_room_message(&self, message: &RoomMessage) -> Result<(), StoreError> {
        push_capped(&mut self.rooms.write(), message.clone(), ROOM_CAP);
        Ok(())
    }

    async fn list_room_messages(
        &self,
        room: &str,
        limit: usize,
    ) -> Result<Vec<RoomMessage>, StoreError> {
        let rooms = self.rooms.read();
        let hits: Vec<RoomMessage> = rooms.iter().filter(|m| m.room == room).cloned().collect();
        let skip = hits.len().saturating_sub(limit);
        Ok(hits.into_iter().skip(skip).collect())
    }

    async fn insert_federation(&self, record: &FederationRecord) -> Result<(), StoreError> {
        push_capped(&mut self.federation.write(), record.clone(), FEDERATION_CAP);
        Ok(())
    }

    async fn list_federation(&self, limit: usize) -> Result<Vec<FederationRecord>, StoreError> {
        Ok(self
            .federation
            .read()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_quorum(&self, room: &str) -> Result<Option<QuorumState>, StoreError> {
        Ok(self.quorum.read().get(room).cloned())
    }

    async fn put_quorum(&self, state: &QuorumState) -> Result<(), StoreError> {
        self.quorum.write().insert(state.room.clone(), state.clone());
        Ok(())
    }

    async fn clear_quorum(&self, room: &str) -> Result<(), StoreError> {
        self.quorum.write().remove(room);
        Ok(())
    }
}
