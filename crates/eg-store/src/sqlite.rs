//! SQLite backend.
//!
//! A small pool of WAL-mode connections behind mutexes, handed out
//! round-robin. Records are stored as JSON documents with a few extracted
//! columns for filtering; recipients live in a side table so the `to` filter
//! can use an index instead of scanning documents.

use crate::backend::{Backend, EnvelopeFilter, Page};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use shared_types::{
    Artifact, AuditEvent, Envelope, FederationRecord, NotaryRecord, QuorumState, RoomMessage,
    StoreError,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

const POOL_SIZE: usize = 4;

const MIGRATIONS: &[(&str, &str)] = &[("001_init", include_str!("../migrations/001_init.sql"))];

pub struct SqliteBackend {
    connections: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::database(e.to_string())
}

fn open_connection(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path).map_err(db_err)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )
    .map_err(db_err)?;
    Ok(conn)
}

fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
             name       TEXT PRIMARY KEY,
             applied_at TEXT NOT NULL
         );",
    )
    .map_err(db_err)?;
    for (name, sql) in MIGRATIONS {
        let applied: bool = conn
            .query_row(
                "SELECT EXISTS (SELECT 1 FROM schema_migrations WHERE name = ?1)",
                params![name],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        if applied {
            continue;
        }
        conn.execute_batch(sql).map_err(db_err)?;
        conn.execute(
            "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, ?2)",
            params![name, shared_types::now_iso()],
        )
        .map_err(db_err)?;
        tracing::info!(migration = name, "applied schema migration");
    }
    Ok(())
}

impl SqliteBackend {
    /// Open (creating if needed) the database at `path` and apply any
    /// pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| StoreError::database(format!("create {}: {e}", dir.display())))?;
            }
        }
        let mut connections = Vec::with_capacity(POOL_SIZE);
        for i in 0..POOL_SIZE {
            let conn = open_connection(path)?;
            if i == 0 {
                run_migrations(&conn)?;
            }
            connections.push(Mutex::new(conn));
        }
        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        let mut conn = self.connections[idx].lock();
        f(&mut conn)
    }
}

fn to_doc<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    Ok(serde_json::to_string(value)?)
}

fn from_doc<T: serde::de::DeserializeOwned>(doc: String) -> Result<T, StoreError> {
    Ok(serde_json::from_str(&doc)?)
}

fn replace_recipients(conn: &Connection, env: &Envelope) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM envelope_recipients WHERE envelope_id = ?1",
        params![env.id],
    )
    .map_err(db_err)?;
    for recipient in &env.to {
        conn.execute(
            "INSERT OR IGNORE INTO envelope_recipients (envelope_id, recipient) VALUES (?1, ?2)",
            params![env.id, recipient],
        )
        .map_err(db_err)?;
    }
    Ok(())
}

#[async_trait]
impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn insert_envelope(&self, env: &Envelope) -> Result<(), StoreError> {
        let doc = to_doc(env)?;
        self.with_conn(|conn| {
            let tx = conn.transaction().map_err(db_err)?;
            tx.execute(
                "INSERT INTO envelopes
                     (id, kind, status, sender, thread_root, created_at, updated_at, doc)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    env.id,
                    env.kind,
                    env.status,
                    env.from,
                    env.thread_root(),
                    env.created_at,
                    env.updated_at,
                    doc
                ],
            )
            .map_err(db_err)?;
            replace_recipients(&tx, env)?;
            tx.commit().map_err(db_err)
        })
    }

    async fn get_envelope(&self, id: &str) -> Result<Option<Envelope>, StoreError> {
        self.with_conn(|conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM envelopes WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            doc.map(from_doc).transpose()
        })
    }

    async fn update_envelope(&self, env: &Envelope) -> Result<(), StoreError> {
        let doc = to_doc(env)?;
        self.with_conn(|conn| {
            let tx = conn.transaction().map_err(db_err)?;
            let changed = tx
                .execute(
                    "UPDATE envelopes
                     SET kind = ?2, status = ?3, sender = ?4, thread_root = ?5,
                         updated_at = ?6, doc = ?7
                     WHERE id = ?1",
                    params![
                        env.id,
                        env.kind,
                        env.status,
                        env.from,
                        env.thread_root(),
                        env.updated_at,
                        doc
                    ],
                )
                .map_err(db_err)?;
            if changed == 0 {
                return Err(StoreError::not_found(format!("envelope {}", env.id)));
            }
            replace_recipients(&tx, env)?;
            tx.commit().map_err(db_err)
        })
    }

    async fn list_envelopes(&self, filter: &EnvelopeFilter) -> Result<Page<Envelope>, StoreError> {
        let page = filter.page_size();
        let mut sql = String::from("SELECT e.doc FROM envelopes e WHERE 1 = 1");
        let mut args: Vec<&str> = Vec::new();
        if let Some(status) = &filter.status {
            sql.push_str(" AND e.status = ?");
            args.push(status);
        }
        if let Some(kind) = &filter.kind {
            sql.push_str(" AND e.kind = ?");
            args.push(kind);
        }
        if let Some(from) = &filter.from {
            sql.push_str(" AND e.sender = ?");
            args.push(from);
        }
        if let Some(thread) = &filter.thread {
            sql.push_str(" AND e.thread_root = ?");
            args.push(thread);
        }
        if let Some(to) = &filter.to {
            sql.push_str(
                " AND EXISTS (SELECT 1 FROM envelope_recipients r
                              WHERE r.envelope_id = e.id AND r.recipient = ?)",
            );
            args.push(to);
        }
        let asc = filter.ascending();
        if let Some(cursor) = &filter.cursor {
            sql.push_str(if asc {
                " AND e.updated_at > ?"
            } else {
                " AND e.updated_at < ?"
            });
            args.push(cursor);
        }
        let order = if asc { "ASC" } else { "DESC" };
        sql.push_str(&format!(
            " ORDER BY e.updated_at {order}, e.id {order} LIMIT {page}"
        ));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql).map_err(db_err)?;
            let rows = stmt
                .query_map(params_from_iter(args.iter()), |row| {
                    row.get::<_, String>(0)
                })
                .map_err(db_err)?;
            let mut items = Vec::new();
            for doc in rows {
                items.push(from_doc::<Envelope>(doc.map_err(db_err)?)?);
            }
            let full = items.len() == page;
            let cursor = items.last().map(|e: &Envelope| e.updated_at.clone());
            Ok(Page::new(items, full, cursor))
        })
    }

    async fn list_thread(&self, root: &str, limit: usize) -> Result<Vec<Envelope>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT doc FROM envelopes WHERE thread_root = ?1
                     ORDER BY created_at ASC, id ASC LIMIT {limit}"
                ))
                .map_err(db_err)?;
            let rows = stmt
                .query_map(params![root], |row| row.get::<_, String>(0))
                .map_err(db_err)?;
            let mut items = Vec::new();
            for doc in rows {
                items.push(from_doc(doc.map_err(db_err)?)?);
            }
            Ok(items)
        })
    }

    async fn put_artifact(&self, artifact: &Artifact) -> Result<(), StoreError> {
        let doc = to_doc(artifact)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO artifacts (key, sha256, updated_at, doc) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (key) DO UPDATE SET
                     sha256 = excluded.sha256,
                     updated_at = excluded.updated_at,
                     doc = excluded.doc",
                params![artifact.key, artifact.sha256, artifact.updated_at, doc],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    async fn get_artifact(&self, key: &str) -> Result<Option<Artifact>, StoreError> {
        self.with_conn(|conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM artifacts WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            doc.map(from_doc).transpose()
        })
    }

    async fn list_artifacts(&self, limit: usize) -> Result<Vec<Artifact>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT doc FROM artifacts ORDER BY updated_at DESC, key DESC LIMIT {limit}"
                ))
                .map_err(db_err)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(db_err)?;
            let mut items = Vec::new();
            for doc in rows {
                items.push(from_doc(doc.map_err(db_err)?)?);
            }
            Ok(items)
        })
    }

    async fn append_audit(&self, event: &AuditEvent) -> Result<(), StoreError> {
        let doc = to_doc(event)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO audit_events (id, ts, doc) VALUES (?1, ?2, ?3)",
                params![event.id, event.ts, doc],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    async fn tail_audit(&self, limit: usize) -> Result<Vec<AuditEvent>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT doc FROM audit_events ORDER BY ts DESC, id DESC LIMIT {limit}"
                ))
                .map_err(db_err)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(db_err)?;
            let mut items: Vec<AuditEvent> = Vec::new();
            for doc in rows {
                items.push(from_doc(doc.map_err(db_err)?)?);
            }
            items.reverse();
            Ok(items)
        })
    }

    async fn insert_notary(&self, record: &NotaryRecord) -> Result<(), StoreError> {
        let doc = to_doc(record)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notary_records (id, ts, doc) VALUES (?1, ?2, ?3)",
                params![record.id, record.ts, doc],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    async fn get_notary(&self, id: &str) -> Result<Option<NotaryRecord>, StoreError> {
        self.with_conn(|conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM notary_records WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            doc.map(from_doc).transpose()
        })
    }

    async fn list_notary(&self, limit: usize) -> Result<Vec<NotaryRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT doc FROM notary_records ORDER BY ts DESC, id DESC LIMIT {limit}"
                ))
                .map_err(db_err)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(db_err)?;
            let mut items = Vec::new();
            for doc in rows {
                items.push(from_doc(doc.map_err(db_err)?)?);
            }
            Ok(items)
        })
    }

    async fn insert_room_message(&self, message: &RoomMessage) -> Result<(), StoreError> {
        let doc = to_doc(message)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO room_messages (id, room, ts, doc) VALUES (?1, ?2, ?3, ?4)",
                params![message.id, message.room, message.ts, doc],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    async fn list_room_messages(
        &self,
        room: &str,
        limit: usize,
    ) -> Result<Vec<RoomMessage>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT doc FROM room_messages WHERE room = ?1
                     ORDER BY ts DESC, id DESC LIMIT {limit}"
                ))
                .map_err(db_err)?;
            let rows = stmt
                .query_map(params![room], |row| row.get::<_, String>(0))
                .map_err(db_err)?;
            let mut items: Vec<RoomMessage> = Vec::new();
            for doc in rows {
                items.push(from_doc(doc.map_err(db_err)?)?);
            }
            items.reverse();
            Ok(items)
        })
    }

    async fn insert_federation(&self, record: &FederationRecord) -> Result<(), StoreError> {
        let doc = to_doc(record)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO federation_records (id, ts, doc) VALUES (?1, ?2, ?3)",
                params![record.id, record.ts, doc],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    async fn list_federation(&self, limit: usize) -> Result<Vec<FederationRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT doc FROM federation_records ORDER BY ts DESC, id DESC LIMIT {limit}"
                ))
                .map_err(db_err)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(db_err)?;
            let mut items = Vec::new();
            for doc in rows {
                items.push(from_doc(doc.map_err(db_err)?)?);
            }
            Ok(items)
        })
    }

    async fn get_quorum(&self, room: &str) -> Result<Option<QuorumState>, StoreError> {
        self.with_conn(|conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM quorum_states WHERE room = ?1",
                    params![room],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            doc.map(from_doc).transpose()
        })
    }

    async fn put_quorum(&self, state: &QuorumState) -> Result<(), StoreError> {
        let doc = to_doc(state)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO quorum_states (room, doc) VALUES (?1, ?2)
                 ON CONFLICT (room) DO UPDATE SET doc = excluded.doc",
                params![state.room, doc],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    async fn clear_quorum(&self, room: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM quorum_states WHERE room = ?1", params![room])
                .map_err(db_err)?;
            Ok(())
        })
    }
}
