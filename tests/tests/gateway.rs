//! HTTP surface tests: envelopes, artifacts, auth, rate limits, audit.

use axum::http::{Method, StatusCode};
use eg_tests::*;
use serde_json::{json, Value};
use shared_crypto::{canonical_json, sha256_hex};
use std::time::Duration;

#[tokio::test]
async fn test_health_reports_backend_and_version() {
    let app = unsigned_router(base_config());
    let (status, body) = send_json(&app, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["backend"], "memory");
    assert_eq!(body["signing"], false);
}

#[tokio::test]
async fn test_envelope_create_then_get() {
    let app = signed_router(base_config());
    let (status, created) = send_json(
        &app,
        json_request(
            Method::POST,
            "/envelopes",
            json!({"type": "note", "from": "agent:a", "to": ["agent:b"], "payload": {"msg": "hi"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let envelope = &created["envelope"];
    let id = envelope["id"].as_str().unwrap();
    assert!(id.starts_with("env_"));
    assert_eq!(envelope["status"], "queued");
    assert_eq!(envelope["proofs"][0]["type"], "hmac-sha256");

    let (status, fetched) = send_json(&app, get_request(&format!("/envelopes/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["envelope"]["payload"]["msg"], "hi");
}

#[tokio::test]
async fn test_envelope_create_keeps_sender_assigned_identity() {
    let app = unsigned_router(base_config());
    let (status, created) = send_json(
        &app,
        json_request(
            Method::POST,
            "/envelopes",
            json!({
                "type": "note",
                "id": "env_client_chosen",
                "created_at": "2026-01-01T00:00:00.000000Z",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let envelope = &created["envelope"];
    assert_eq!(envelope["id"], "env_client_chosen");
    assert_eq!(envelope["created_at"], "2026-01-01T00:00:00.000000Z");
    assert_ne!(envelope["updated_at"], envelope["created_at"]);

    let (status, fetched) = send_json(&app, get_request("/envelopes/env_client_chosen")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["envelope"]["id"], "env_client_chosen");
}

#[tokio::test]
async fn test_envelope_hash_covers_canonical_form() {
    let app = signed_router(base_config());
    let (_, created) = send_json(
        &app,
        json_request(
            Method::POST,
            "/envelopes",
            json!({"type": "note", "payload": {"b": 2, "a": 1}}),
        ),
    )
    .await;
    let envelope = created["envelope"].clone();
    let sha = envelope["sha256"].as_str().unwrap().to_string();
    let mut unhashed = envelope;
    unhashed.as_object_mut().unwrap().remove("sha256");
    assert_eq!(sha, sha256_hex(canonical_json(&unhashed).as_bytes()));
}

#[tokio::test]
async fn test_create_rejects_missing_type() {
    let app = unsigned_router(base_config());
    let (status, body) = send_json(
        &app,
        json_request(Method::POST, "/envelopes", json!({"type": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_list_pagination_visits_every_envelope_once() {
    let app = unsigned_router(base_config());
    let mut created = Vec::new();
    for i in 0..5 {
        let (_, body) = send_json(
            &app,
            json_request(Method::POST, "/envelopes", json!({"type": "note", "payload": {"i": i}})),
        )
        .await;
        created.push(body["envelope"]["id"].as_str().unwrap().to_string());
        // Distinct microsecond timestamps keep the cursor unambiguous.
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let mut seen = Vec::new();
    let mut uri = "/envelopes?limit=2".to_string();
    loop {
        let (status, body) = send_json(&app, get_request(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        for item in body["items"].as_array().unwrap() {
            seen.push(item["id"].as_str().unwrap().to_string());
        }
        match body["next_cursor"].as_str() {
            Some(cursor) => uri = format!("/envelopes?limit=2&cursor={}", cursor),
            None => break,
        }
    }
    let mut expected = created.clone();
    expected.reverse();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_list_filters_by_status_and_recipient() {
    let app = unsigned_router(base_config());
    send_json(
        &app,
        json_request(
            Method::POST,
            "/envelopes",
            json!({"type": "note", "to": ["topic:ops"]}),
        ),
    )
    .await;
    send_json(
        &app,
        json_request(
            Method::POST,
            "/envelopes",
            json!({"type": "alert", "to": ["topic:dev"]}),
        ),
    )
    .await;

    let (_, ops) = send_json(&app, get_request("/envelopes?to=topic:ops")).await;
    assert_eq!(ops["items"].as_array().unwrap().len(), 1);
    assert_eq!(ops["items"][0]["type"], "note");

    let (_, alerts) = send_json(&app, get_request("/envelopes?type=alert")).await;
    assert_eq!(alerts["items"].as_array().unwrap().len(), 1);

    let (_, queued) = send_json(&app, get_request("/envelopes?status=queued")).await;
    assert_eq!(queued["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_filters_by_sender() {
    let app = unsigned_router(base_config());
    send_json(
        &app,
        json_request(
            Method::POST,
            "/envelopes",
            json!({"type": "note", "from": "agent:a"}),
        ),
    )
    .await;
    send_json(
        &app,
        json_request(
            Method::POST,
            "/envelopes",
            json!({"type": "note", "from": "agent:b"}),
        ),
    )
    .await;

    let (_, from_a) = send_json(&app, get_request("/envelopes?from=agent:a")).await;
    assert_eq!(from_a["items"].as_array().unwrap().len(), 1);
    assert_eq!(from_a["items"][0]["from"], "agent:a");
}

#[tokio::test]
async fn test_ascending_listing_pages_oldest_first() {
    let app = unsigned_router(base_config());
    let mut created = Vec::new();
    for i in 0..4 {
        let (_, body) = send_json(
            &app,
            json_request(Method::POST, "/envelopes", json!({"type": "note", "payload": {"i": i}})),
        )
        .await;
        created.push(body["envelope"]["id"].as_str().unwrap().to_string());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let mut seen = Vec::new();
    let mut uri = "/envelopes?limit=3&dir=asc".to_string();
    loop {
        let (status, body) = send_json(&app, get_request(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        for item in body["items"].as_array().unwrap() {
            seen.push(item["id"].as_str().unwrap().to_string());
        }
        match body["next_cursor"].as_str() {
            Some(cursor) => uri = format!("/envelopes?limit=3&dir=asc&cursor={}", cursor),
            None => break,
        }
    }
    assert_eq!(seen, created);
}

#[tokio::test]
async fn test_status_update_merges_meta_and_rehashes() {
    let app = signed_router(base_config());
    let (_, created) = send_json(
        &app,
        json_request(Method::POST, "/envelopes", json!({"type": "task"})),
    )
    .await;
    let id = created["envelope"]["id"].as_str().unwrap();
    let sha_before = created["envelope"]["sha256"].as_str().unwrap();

    let (status, updated) = send_json(
        &app,
        json_request(
            Method::PATCH,
            &format!("/envelopes/{id}"),
            json!({"status": "done", "extra": {"worker": "w1"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["envelope"]["status"], "done");
    assert_eq!(updated["envelope"]["meta"]["worker"], "w1");
    assert_ne!(updated["envelope"]["sha256"].as_str().unwrap(), sha_before);
    assert_eq!(updated["envelope"]["proofs"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_status_update_unknown_envelope_is_404() {
    let app = unsigned_router(base_config());
    let (status, body) = send_json(
        &app,
        json_request(
            Method::PATCH,
            "/envelopes/env_missing",
            json!({"status": "done"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_threads_return_followers_in_causal_order() {
    let app = unsigned_router(base_config());
    let (_, root) = send_json(
        &app,
        json_request(Method::POST, "/envelopes", json!({"type": "proposal"})),
    )
    .await;
    let root_id = root["envelope"]["id"].as_str().unwrap().to_string();
    let mut follower_ids = Vec::new();
    for i in 0..3 {
        let (_, body) = send_json(
            &app,
            json_request(
                Method::POST,
                "/envelopes",
                json!({"type": "vote", "thread": {"root": root_id, "prev": root_id}, "payload": {"i": i}}),
            ),
        )
        .await;
        follower_ids.push(body["envelope"]["id"].as_str().unwrap().to_string());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    let (status, thread) = send_json(&app, get_request(&format!("/threads/{root_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = thread["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, follower_ids);
}

#[tokio::test]
async fn test_write_token_gates_mutations() {
    let mut config = base_config();
    config.auth.admin_token = Some("a".into());
    let app = unsigned_router(config);

    let (status, body) = send_json(
        &app,
        json_request_unauth(Method::POST, "/envelopes", json!({"type": "note"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send_json(
        &app,
        json_request_with_token(Method::POST, "/envelopes", json!({"type": "note"}), "nope"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_json(
        &app,
        json_request(Method::POST, "/envelopes", json!({"type": "note"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // The admin token satisfies the write tier too.
    let (status, _) = send_json(
        &app,
        json_request_with_token(Method::POST, "/envelopes", json!({"type": "note"}), "a"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Reads stay open.
    let (status, _) = send_json(&app, get_request("/envelopes")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unconfigured_write_token_fails_closed() {
    let mut config = base_config();
    config.auth.write_token = None;
    let app = unsigned_router(config);

    // No token at all can open the write tier when none is configured.
    let (status, body) = send_json(
        &app,
        json_request_with_token(Method::POST, "/envelopes", json!({"type": "note"}), "anything"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_write_rate_limit_admits_first_n_then_429() {
    let mut config = base_config();
    config.rate_limit.enabled = true;
    config.rate_limit.write_per_min = 2;
    config.rate_limit.read_per_min = 100;
    let app = unsigned_router(config);

    for _ in 0..2 {
        let (status, _) = send_json(
            &app,
            json_request(Method::POST, "/envelopes", json!({"type": "note"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, body) = send_json(
        &app,
        json_request(Method::POST, "/envelopes", json!({"type": "note"})),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");
    assert_eq!(body["limit_per_min"], 2);
    let retry = body["retry_after_sec"].as_u64().unwrap();
    assert!((1..=60).contains(&retry));

    // Reads draw from their own bucket.
    let (status, _) = send_json(&app, get_request("/envelopes")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_artifact_roundtrip_inline_and_spilled() {
    let mut config = base_config();
    config.storage.inline_limit = 16;
    let app = unsigned_router(config);

    let small = "hello";
    let (status, put) = send(
        &app,
        axum::http::Request::builder()
            .method(Method::PUT)
            .uri("/artifacts/small")
            .header("content-type", "text/plain")
            .header("x-gateway-token", WRITE_TOKEN)
            .body(axum::body::Body::from(small))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let put: Value = serde_json::from_slice(&put).unwrap();
    assert_eq!(put["sha256"], sha256_hex(small.as_bytes()));

    let big = "x".repeat(64);
    let (status, _) = send(
        &app,
        axum::http::Request::builder()
            .method(Method::PUT)
            .uri("/artifacts/big")
            .header("content-type", "text/plain")
            .header("x-gateway-token", WRITE_TOKEN)
            .body(axum::body::Body::from(big.clone()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, got_small) = send_json(&app, get_request("/artifacts/small")).await;
    assert_eq!(got_small["data_text"], "hello");
    let (_, got_big) = send_json(&app, get_request("/artifacts/big")).await;
    assert_eq!(got_big["data_text"].as_str().unwrap(), big);
    assert_eq!(got_big["size"], 64);

    let (status, _) = send_json(&app, get_request("/artifacts/absent")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_artifact_create_and_list() {
    let app = unsigned_router(base_config());

    let (status, body) = send_json(
        &app,
        json_request(
            Method::POST,
            "/artifacts",
            json!({"key": "report", "payload": "quarterly numbers", "content_type": "text/plain"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["key"], "report");
    assert_eq!(body["sha256"], sha256_hex(b"quarterly numbers"));

    // Structured payloads are stored as their JSON text.
    let (status, _) = send_json(
        &app,
        json_request(
            Method::POST,
            "/artifacts",
            json!({"key": "config", "data": {"debug": false}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_json(
        &app,
        json_request(Method::POST, "/artifacts", json!({"key": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, listed) = send_json(&app, get_request("/artifacts")).await;
    assert_eq!(status, StatusCode::OK);
    let items = listed["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    // Listing is metadata only.
    assert!(items[0].get("data_text").is_none());

    let (_, got) = send_json(&app, get_request("/artifacts/config")).await;
    assert_eq!(got["data_text"], json!({"debug": false}).to_string());
}

#[tokio::test]
async fn test_notary_validates_and_attaches_proof() {
    let app = signed_router(base_config());
    let (status, body) = send_json(
        &app,
        json_request(Method::POST, "/notary", json!({"sha256": "nothex"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let digest = sha256_hex(b"artifact bytes");
    let (status, body) = send_json(
        &app,
        json_request(
            Method::POST,
            "/notary",
            json!({"sha256": digest, "subject": "build-42", "meta": {"ci": true}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let record = &body["record"];
    assert_eq!(record["sha256"], digest);
    assert_eq!(record["kind"], "attestation");
    assert_eq!(record["proof"]["type"], "hmac-sha256");

    let id = record["id"].as_str().unwrap();
    let (status, fetched) = send_json(&app, get_request(&format!("/notary/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["record"]["subject"], "build-42");
    assert_eq!(fetched["record"]["meta"]["ci"], true);
}

#[tokio::test]
async fn test_notary_listing_shows_recent_receipts() {
    let app = unsigned_router(base_config());
    for subject in ["build-1", "build-2"] {
        let (status, _) = send_json(
            &app,
            json_request(
                Method::POST,
                "/notary",
                json!({"sha256": sha256_hex(subject.as_bytes()), "subject": subject}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // Listing is an open read.
    let (status, body) = send_json(&app, get_request("/notary")).await;
    assert_eq!(status, StatusCode::OK);
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    let subjects: Vec<&str> = records
        .iter()
        .map(|r| r["subject"].as_str().unwrap())
        .collect();
    assert!(subjects.contains(&"build-1"));
    assert!(subjects.contains(&"build-2"));

    let (_, capped) = send_json(&app, get_request("/notary?limit=1")).await;
    assert_eq!(capped["records"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_audit_requires_admin_unless_public() {
    let mut config = base_config();
    config.auth.admin_token = Some("a".into());
    let app = unsigned_router(config);

    let (status, _) = send_json(&app, get_request("/audit")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get_request_with_token("/audit", "a")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_audit_tail_is_ndjson_oldest_first() {
    let mut config = base_config();
    config.auth.audit_public = true;
    let app = unsigned_router(config);

    // Empty ledger yields an empty body.
    let (status, bytes) = send(&app, get_request("/audit")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.is_empty());

    send_json(
        &app,
        json_request(Method::POST, "/envelopes", json!({"type": "note"})),
    )
    .await;
    send(
        &app,
        axum::http::Request::builder()
            .method(Method::PUT)
            .uri("/artifacts/k")
            .header("x-gateway-token", WRITE_TOKEN)
            .body(axum::body::Body::from("v"))
            .unwrap(),
    )
    .await;

    let (_, bytes) = send(&app, get_request("/audit")).await;
    let lines: Vec<Value> = String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["type"], "envelope.create");
    assert_eq!(lines[1]["type"], "artifact.put");
}

#[tokio::test]
async fn test_unknown_route_gets_error_envelope() {
    let app = unsigned_router(base_config());
    let (status, body) = send_json(&app, get_request("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_wrong_method_gets_error_envelope() {
    let app = unsigned_router(base_config());
    let (status, body) = send_json(
        &app,
        json_request(Method::DELETE, "/envelopes", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "method_not_allowed");
}

#[tokio::test]
async fn test_sqlite_backend_serves_the_same_surface() {
    let mut config = base_config();
    config.storage.backend = "sqlite".into();
    let tag: u64 = rand::random();
    config.storage.sqlite_path = std::env::temp_dir().join(format!("eg-tests-{tag:016x}.db"));
    let app = unsigned_router(config);

    let (_, health) = send_json(&app, get_request("/health")).await;
    assert_eq!(health["backend"], "sqlite");

    let (status, created) = send_json(
        &app,
        json_request(
            Method::POST,
            "/envelopes",
            json!({"type": "note", "to": ["agent:x"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["envelope"]["id"].as_str().unwrap();

    let (_, listed) = send_json(&app, get_request("/envelopes?to=agent:x")).await;
    assert_eq!(listed["items"][0]["id"].as_str().unwrap(), id);
}
