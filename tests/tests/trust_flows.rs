//! Quorum and federation flows over the HTTP surface.

use axum::http::{Method, StatusCode};
use eg_tests::*;
use serde_json::json;

#[tokio::test]
async fn test_quorum_two_of_three_accepts() {
    let app = unsigned_router(base_config());
    let (status, proposed) = send_json(
        &app,
        json_request(
            Method::POST,
            "/quorum/deploy/propose",
            json!({"threshold": "2-of-3", "payload": {"question": "ship v2?"}, "from": "agent:a"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let proposal_id = proposed["quorum"]["proposal_id"].as_str().unwrap().to_string();
    assert_eq!(proposed["envelope"]["type"], "proposal");

    let (_, first) = send_json(
        &app,
        json_request(
            Method::POST,
            "/quorum/deploy/vote",
            json!({"voter": "agent:a", "vote": "yes"}),
        ),
    )
    .await;
    assert_eq!(first["tally"]["result"], "undecided");

    let (_, second) = send_json(
        &app,
        json_request(
            Method::POST,
            "/quorum/deploy/vote",
            json!({"voter": "agent:b", "vote": true}),
        ),
    )
    .await;
    assert_eq!(second["tally"]["result"], "accepted");
    assert_eq!(
        second["envelope"]["thread"]["root"].as_str().unwrap(),
        proposal_id
    );

    let (status, decided) = send_json(
        &app,
        json_request(Method::POST, "/quorum/deploy/decide", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["envelope"]["type"], "decision");
    assert_eq!(decided["envelope"]["payload"]["result"], "accepted");
    assert!(decided["decided_at"].is_string());

    // Deciding again with an unchanged outcome returns the standing tally,
    // no new envelope.
    let (_, again) = send_json(
        &app,
        json_request(Method::POST, "/quorum/deploy/decide", json!({})),
    )
    .await;
    assert!(again["envelope"].is_null());
}

#[tokio::test]
async fn test_votes_still_count_after_decision() {
    let app = unsigned_router(base_config());
    send_json(
        &app,
        json_request(
            Method::POST,
            "/quorum/q/propose",
            json!({"threshold": "1-of-1"}),
        ),
    )
    .await;
    send_json(
        &app,
        json_request(
            Method::POST,
            "/quorum/q/vote",
            json!({"voter": "a", "vote": "yes"}),
        ),
    )
    .await;
    let (_, decided) = send_json(
        &app,
        json_request(Method::POST, "/quorum/q/decide", json!({})),
    )
    .await;
    assert_eq!(decided["tally"]["result"], "accepted");

    let (status, voted) = send_json(
        &app,
        json_request(
            Method::POST,
            "/quorum/q/vote",
            json!({"voter": "b", "vote": "yes"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(voted["tally"]["yes"], 2);
}

#[tokio::test]
async fn test_quorum_rejection_needs_threshold_no_votes() {
    let app = unsigned_router(base_config());
    send_json(
        &app,
        json_request(Method::POST, "/quorum/r/propose", json!({})),
    )
    .await;
    for voter in ["a", "b"] {
        send_json(
            &app,
            json_request(
                Method::POST,
                "/quorum/r/vote",
                json!({"voter": voter, "vote": "no"}),
            ),
        )
        .await;
    }
    let (_, decided) = send_json(
        &app,
        json_request(Method::POST, "/quorum/r/decide", json!({})),
    )
    .await;
    assert_eq!(decided["tally"]["result"], "rejected");
    assert_eq!(decided["envelope"]["payload"]["no"], 2);
}

#[tokio::test]
async fn test_vote_without_proposal_is_rejected() {
    let app = unsigned_router(base_config());
    let (status, body) = send_json(
        &app,
        json_request(
            Method::POST,
            "/quorum/empty/vote",
            json!({"voter": "a", "vote": "yes"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_quorum_status_and_repropose() {
    let app = unsigned_router(base_config());
    let (status, _) = send_json(&app, get_request("/quorum/fresh")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send_json(
        &app,
        json_request(Method::POST, "/quorum/fresh/propose", json!({})),
    )
    .await;
    send_json(
        &app,
        json_request(
            Method::POST,
            "/quorum/fresh/vote",
            json!({"voter": "a", "vote": "yes"}),
        ),
    )
    .await;
    let (_, status_body) = send_json(&app, get_request("/quorum/fresh")).await;
    assert_eq!(status_body["tally"]["yes"], 1);

    // A new proposal wipes the previous votes.
    send_json(
        &app,
        json_request(Method::POST, "/quorum/fresh/propose", json!({})),
    )
    .await;
    let (_, status_body) = send_json(&app, get_request("/quorum/fresh")).await;
    assert_eq!(status_body["tally"]["yes"], 0);
}

#[tokio::test]
async fn test_handshake_reports_per_target_results() {
    let mut config = base_config();
    config.auth.audit_public = true;
    let app = unsigned_router(config);

    // All three targets fail validation, so no network is touched and each
    // still gets its own result entry.
    let (status, body) = send_json(
        &app,
        json_request(
            Method::POST,
            "/federation/handshake",
            json!({"targets": ["http://remote.example", "ftp://x", "not a url"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    for result in results {
        assert_eq!(result["ok"], false);
        assert!(result["error"].is_string());
        assert!(result.get("record_id").is_none());
    }

    // Failed targets leave no snapshot and no audit event behind.
    let (_, records) = send_json(&app, get_request("/federation/handshake?limit=10")).await;
    assert!(records["items"].as_array().unwrap().is_empty());

    let (_, bytes) = send(&app, get_request("/audit")).await;
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_handshake_validates_target_count() {
    let app = unsigned_router(base_config());

    let (status, _) = send_json(
        &app,
        json_request(Method::POST, "/federation/handshake", json!({"targets": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let too_many: Vec<String> = (0..21).map(|i| format!("https://p{i}.example")).collect();
    let (status, _) = send_json(
        &app,
        json_request(
            Method::POST,
            "/federation/handshake",
            json!({"targets": too_many}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Handshakes are write-gated.
    let (status, _) = send_json(
        &app,
        json_request_unauth(
            Method::POST,
            "/federation/handshake",
            json!({"targets": ["https://p.example"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_policy_and_well_known_descriptors() {
    let app = unsigned_router(base_config());
    let (status, policy) = send_json(&app, get_request("/policy")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(policy["source"], "builtin");
    assert_eq!(policy["policy"]["rate_limit"]["write_per_min"], 30);
    assert_eq!(policy["policy"]["quorum"]["default_threshold"], "2-of-3");

    let (status, trust) = send_json(&app, get_request("/.well-known/agent-trust.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trust["name"], "envelope-gateway");
    assert_eq!(trust["auth"]["header"], "x-gateway-token");

    let (status, spec) = send_json(&app, get_request("/.well-known/gateway-spec.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["routes"].as_array().unwrap().len() > 10);
}
