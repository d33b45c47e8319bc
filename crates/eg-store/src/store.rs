//! The store facade: validation, content addressing, proof attachment, and
//! audit emission layered over a pluggable backend.
//!
//! Every state-changing operation appends one audit event. Audit writes are
//! best-effort: a failed append is logged and never rolls back the mutation
//! it describes.

use crate::backend::{Backend, EnvelopeFilter, Page};
use crate::blob::{object_key, BlobStore};
use serde_json::{json, Value};
use shared_crypto::{canonical_json, maybe_sign, sha256_hex, SignerKeys};
use shared_types::{
    now_iso, rand_id, Artifact, AuditEvent, Envelope, FederationRecord, NotaryRecord, QuorumState,
    RoomMessage, StoreError, StoredPayload,
};
use std::sync::Arc;

/// Payloads above this many bytes are spilled to blob storage.
pub const DEFAULT_INLINE_LIMIT: usize = 128 * 1024;

pub struct Store {
    backend: Arc<dyn Backend>,
    blob: BlobStore,
    signer: SignerKeys,
    inline_limit: usize,
}

fn canonical_of<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    Ok(canonical_json(&serde_json::to_value(value)?))
}

impl Store {
    pub fn new(backend: Arc<dyn Backend>, blob: BlobStore, signer: SignerKeys) -> Self {
        Self {
            backend,
            blob,
            signer,
            inline_limit: DEFAULT_INLINE_LIMIT,
        }
    }

    pub fn with_inline_limit(mut self, limit: usize) -> Self {
        self.inline_limit = limit;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn signing_enabled(&self) -> bool {
        !self.signer.is_empty()
    }

    /// Append an audit event. Failures are logged, never propagated.
    pub async fn audit(&self, kind: &str, data: Value) {
        let event = AuditEvent::new(kind, data);
        if let Err(e) = self.backend.append_audit(&event).await {
            tracing::error!(error = %e, kind, "audit append failed");
        }
    }

    // ---- Envelopes ----

    /// Accept a new envelope: fill in missing identity and timestamps,
    /// attach a gateway proof when signing is configured, content-address
    /// the result, persist it.
    ///
    /// A caller-supplied `id` and `created_at` are kept; `updated_at` and
    /// `sha256` are always restamped. Caller proofs survive, with the
    /// gateway proof appended after them.
    pub async fn create_envelope(&self, mut env: Envelope) -> Result<Envelope, StoreError> {
        if env.kind.trim().is_empty() {
            return Err(StoreError::invalid("envelope type must not be empty"));
        }
        if env.status.trim().is_empty() {
            env.status = "queued".to_string();
        }
        if env.id.trim().is_empty() {
            env.id = rand_id("env");
        }
        let now = now_iso();
        if env.created_at.trim().is_empty() {
            env.created_at = now.clone();
        }
        env.updated_at = now;
        env.sha256 = String::new();

        // The gateway proof covers the canonical form before it is attached;
        // the hash covers the form including every proof.
        let unsigned = canonical_of(&env)?;
        if let Some(proof) = maybe_sign(&self.signer, &unsigned) {
            env.proofs.push(proof);
        }
        env.sha256 = sha256_hex(canonical_of(&env)?.as_bytes());

        self.backend.insert_envelope(&env).await?;
        self.audit(
            "envelope.create",
            json!({ "id": env.id, "type": env.kind, "sha256": env.sha256 }),
        )
        .await;
        Ok(env)
    }

    pub async fn get_envelope(&self, id: &str) -> Result<Option<Envelope>, StoreError> {
        self.backend.get_envelope(id).await
    }

    pub async fn list_envelopes(
        &self,
        filter: &EnvelopeFilter,
    ) -> Result<Page<Envelope>, StoreError> {
        self.backend.list_envelopes(filter).await
    }

    pub async fn list_thread(&self, root: &str, limit: usize) -> Result<Vec<Envelope>, StoreError> {
        self.backend.list_thread(root, limit).await
    }

    /// Change an envelope's status, merge `extra` into its meta, restamp,
    /// re-address, and append a fresh proof over the updated form.
    pub async fn update_status(
        &self,
        id: &str,
        status: &str,
        extra: Option<Value>,
    ) -> Result<Envelope, StoreError> {
        if status.trim().is_empty() {
            return Err(StoreError::invalid("status must not be empty"));
        }
        let mut env = self
            .backend
            .get_envelope(id)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("envelope {id}")))?;

        env.status = status.to_string();
        if let Some(extra) = extra {
            let Value::Object(extra) = extra else {
                return Err(StoreError::invalid("extra must be a JSON object"));
            };
            if !env.meta.is_object() {
                env.meta = Value::Object(Default::default());
            }
            if let Value::Object(meta) = &mut env.meta {
                for (k, v) in extra {
                    meta.insert(k, v);
                }
            }
        }
        env.updated_at = now_iso();

        env.sha256 = String::new();
        env.sha256 = sha256_hex(canonical_of(&env)?.as_bytes());
        // The update proof covers the re-addressed form and lands after the
        // hash, so it does not invalidate the address it attests to.
        let addressed = canonical_of(&env)?;
        if let Some(proof) = maybe_sign(&self.signer, &addressed) {
            env.proofs.push(proof);
        }

        self.backend.update_envelope(&env).await?;
        self.audit(
            "envelope.update",
            json!({ "id": env.id, "status": env.status, "sha256": env.sha256 }),
        )
        .await;
        Ok(env)
    }

    // ---- Artifacts ----

    /// Upsert a named artifact. Large payloads are spilled to blob storage
    /// and only the object key is kept in the primary store.
    pub async fn put_artifact(
        &self,
        key: &str,
        data_text: String,
        content_type: Option<String>,
    ) -> Result<Artifact, StoreError> {
        if key.trim().is_empty() {
            return Err(StoreError::invalid("artifact key must not be empty"));
        }
        let sha256 = sha256_hex(data_text.as_bytes());
        let size = data_text.len() as u64;
        let now = now_iso();
        let created_at = match self.backend.get_artifact(key).await? {
            Some(existing) => existing.created_at,
            None => now.clone(),
        };
        let payload = if data_text.len() > self.inline_limit {
            let object_key = object_key(key, &sha256);
            self.blob.put(&object_key, &data_text)?;
            StoredPayload::External { object_key }
        } else {
            StoredPayload::Inline { data_text }
        };
        let artifact = Artifact {
            key: key.to_string(),
            sha256,
            size,
            content_type: content_type.unwrap_or_else(|| "text/plain".to_string()),
            payload,
            created_at,
            updated_at: now,
        };
        self.backend.put_artifact(&artifact).await?;
        self.audit(
            "artifact.put",
            json!({
                "key": artifact.key,
                "sha256": artifact.sha256,
                "size": artifact.size,
            }),
        )
        .await;
        Ok(artifact)
    }

    /// Fetch an artifact and resolve its payload text. The text is `None`
    /// when an externalized blob has gone missing.
    pub async fn get_artifact(
        &self,
        key: &str,
    ) -> Result<Option<(Artifact, Option<String>)>, StoreError> {
        let Some(artifact) = self.backend.get_artifact(key).await? else {
            return Ok(None);
        };
        let text = match &artifact.payload {
            StoredPayload::Inline { data_text } => Some(data_text.clone()),
            StoredPayload::External { object_key } => self.blob.get(object_key)?,
        };
        Ok(Some((artifact, text)))
    }

    /// Artifact metadata, newest-updated first. Payload text never appears
    /// in list views.
    pub async fn list_artifacts(&self, limit: usize) -> Result<Vec<Value>, StoreError> {
        let mut items = Vec::new();
        for artifact in self.backend.list_artifacts(limit).await? {
            let mut doc = serde_json::to_value(&artifact)?;
            if let Value::Object(doc) = &mut doc {
                doc.remove("data_text");
            }
            items.push(doc);
        }
        Ok(items)
    }

    // ---- Notary ----

    /// Record an attestation binding `subject` to a caller-submitted hash.
    pub async fn notarize(
        &self,
        sha256: &str,
        kind: Option<String>,
        subject: Option<String>,
        meta: Value,
    ) -> Result<NotaryRecord, StoreError> {
        if sha256.len() != 64 || !sha256.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(StoreError::invalid("sha256 must be 64 hex characters"));
        }
        let mut record = NotaryRecord {
            id: rand_id("notary"),
            ts: now_iso(),
            kind: kind
                .filter(|k| !k.trim().is_empty())
                .unwrap_or_else(|| "attestation".to_string()),
            subject,
            sha256: sha256.to_ascii_lowercase(),
            meta,
            proof: None,
        };
        let canonical = canonical_of(&record)?;
        record.proof = maybe_sign(&self.signer, &canonical);
        self.backend.insert_notary(&record).await?;
        self.audit(
            "notary.create",
            json!({ "id": record.id, "sha256": record.sha256 }),
        )
        .await;
        Ok(record)
    }

    pub async fn get_notary(&self, id: &str) -> Result<Option<NotaryRecord>, StoreError> {
        self.backend.get_notary(id).await
    }

    /// Recent attestations, newest-first.
    pub async fn list_notary(&self, limit: usize) -> Result<Vec<NotaryRecord>, StoreError> {
        self.backend.list_notary(limit).await
    }

    // ---- Audit ----

    pub async fn tail_audit(&self, limit: usize) -> Result<Vec<AuditEvent>, StoreError> {
        self.backend.tail_audit(limit).await
    }

    // ---- Rooms ----

    pub async fn post_room_message(
        &self,
        room: &str,
        from: Option<String>,
        text: String,
        meta: Value,
    ) -> Result<RoomMessage, StoreError> {
        if room.trim().is_empty() {
            return Err(StoreError::invalid("room must not be empty"));
        }
        if text.trim().is_empty() {
            return Err(StoreError::invalid("text must not be empty"));
        }
        let message = RoomMessage {
            id: rand_id("msg"),
            room: room.to_string(),
            ts: now_iso(),
            from,
            text,
            meta,
        };
        self.backend.insert_room_message(&message).await?;
        self.audit(
            "room.post",
            json!({ "id": message.id, "room": message.room }),
        )
        .await;
        Ok(message)
    }

    pub async fn list_room_messages(
        &self,
        room: &str,
        limit: usize,
    ) -> Result<Vec<RoomMessage>, StoreError> {
        self.backend.list_room_messages(room, limit).await
    }

    // ---- Federation ----

    /// Persist one fetched handshake snapshot. Each stored snapshot is its
    /// own audit entry; failed targets are never stored.
    pub async fn store_handshake(&self, record: &FederationRecord) -> Result<(), StoreError> {
        self.backend.insert_federation(record).await?;
        self.audit(
            "federation.handshake",
            json!({ "id": record.id, "remote": record.remote }),
        )
        .await;
        Ok(())
    }

    pub async fn list_federation(&self, limit: usize) -> Result<Vec<FederationRecord>, StoreError> {
        self.backend.list_federation(limit).await
    }

    // ---- Quorum state ----

    pub async fn get_quorum(&self, room: &str) -> Result<Option<QuorumState>, StoreError> {
        self.backend.get_quorum(room).await
    }

    pub async fn put_quorum(&self, state: &QuorumState) -> Result<(), StoreError> {
        self.backend.put_quorum(state).await
    }

    pub async fn clear_quorum(&self, room: &str) -> Result<(), StoreError> {
        self.backend.clear_quorum(room).await
    }
}
