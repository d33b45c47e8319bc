//! Both backends must expose identical listing and pagination semantics
//! through the store facade.

use eg_store::{Backend, BlobStore, EnvelopeFilter, MemoryBackend, SqliteBackend, Store};
use rand::Rng;
use serde_json::json;
use shared_crypto::SignerKeys;
use shared_types::Envelope;
use std::sync::Arc;

fn store_over(backend: Arc<dyn Backend>) -> Store {
    let tag: u64 = rand::thread_rng().gen();
    let blob = BlobStore::new(std::env::temp_dir().join(format!("eg-parity-{tag:016x}")));
    Store::new(backend, blob, SignerKeys::default())
}

fn backends() -> Vec<(&'static str, Store)> {
    let tag: u64 = rand::thread_rng().gen();
    let sqlite_path = std::env::temp_dir().join(format!("eg-parity-{tag:016x}.db"));
    vec![
        ("memory", store_over(Arc::new(MemoryBackend::new()))),
        (
            "sqlite",
            store_over(Arc::new(SqliteBackend::open(sqlite_path).unwrap())),
        ),
    ]
}

#[tokio::test]
async fn test_pagination_walks_identically() {
    for (name, store) in backends() {
        let mut ids = Vec::new();
        for i in 0..7 {
            let mut env = Envelope::new("note");
            env.payload = json!({ "i": i });
            ids.push(store.create_envelope(env).await.unwrap().id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        ids.reverse();

        let mut seen = Vec::new();
        let mut filter = EnvelopeFilter {
            limit: Some(3),
            ..Default::default()
        };
        loop {
            let page = store.list_envelopes(&filter).await.unwrap();
            seen.extend(page.items.iter().map(|e| e.id.clone()));
            match page.next_cursor {
                Some(cursor) => filter.cursor = Some(cursor),
                None => break,
            }
        }
        assert_eq!(seen, ids, "backend {name}");
    }
}

#[tokio::test]
async fn test_filters_agree_across_backends() {
    for (name, store) in backends() {
        let mut a = Envelope::new("note");
        a.to = vec!["topic:ops".into()];
        let a = store.create_envelope(a).await.unwrap();
        let mut b = Envelope::new("alert");
        b.to = vec!["topic:ops".into(), "agent:z".into()];
        store.create_envelope(b).await.unwrap();
        store.update_status(&a.id, "done", None).await.unwrap();

        let ops = store
            .list_envelopes(&EnvelopeFilter {
                to: Some("topic:ops".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ops.items.len(), 2, "backend {name}");

        let done = store
            .list_envelopes(&EnvelopeFilter {
                status: Some("done".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(done.items.len(), 1, "backend {name}");
        assert_eq!(done.items[0].id, a.id, "backend {name}");

        let alerts = store
            .list_envelopes(&EnvelopeFilter {
                kind: Some("alert".into()),
                to: Some("agent:z".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(alerts.items.len(), 1, "backend {name}");
    }
}

#[tokio::test]
async fn test_ascending_walk_and_sender_filter_agree() {
    for (name, store) in backends() {
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut env = Envelope::new("note");
            env.from = Some(if i % 2 == 0 { "agent:even" } else { "agent:odd" }.into());
            ids.push(store.create_envelope(env).await.unwrap().id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let mut seen = Vec::new();
        let mut filter = EnvelopeFilter {
            limit: Some(2),
            dir: Some("asc".into()),
            ..Default::default()
        };
        loop {
            let page = store.list_envelopes(&filter).await.unwrap();
            seen.extend(page.items.iter().map(|e| e.id.clone()));
            match page.next_cursor {
                Some(cursor) => filter.cursor = Some(cursor),
                None => break,
            }
        }
        assert_eq!(seen, ids, "backend {name}");

        let odd = store
            .list_envelopes(&EnvelopeFilter {
                from: Some("agent:odd".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(odd.items.len(), 2, "backend {name}");
        assert!(odd
            .items
            .iter()
            .all(|e| e.from.as_deref() == Some("agent:odd")));
    }
}

#[tokio::test]
async fn test_audit_tail_shape_agrees() {
    for (name, store) in backends() {
        for i in 0..5 {
            let mut env = Envelope::new("note");
            env.payload = json!({ "i": i });
            store.create_envelope(env).await.unwrap();
        }
        let tail = store.tail_audit(3).await.unwrap();
        assert_eq!(tail.len(), 3, "backend {name}");
        assert!(tail.windows(2).all(|w| w[0].ts <= w[1].ts), "backend {name}");
        assert!(tail.iter().all(|e| e.kind == "envelope.create"));
    }
}
