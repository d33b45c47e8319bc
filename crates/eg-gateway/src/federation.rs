//! Federation: fetching and snapshotting peer trust documents.
//!
//! A handshake batch pulls each target's well-known documents, stores one
//! immutable snapshot per reachable peer, and reports one result per
//! target in input order. Failures are per-target: one unreachable peer
//! never aborts the batch.

use crate::config::FederationConfig;
use crate::error::ApiError;
use eg_store::Store;
use serde::Serialize;
use serde_json::{json, Value};
use shared_types::{now_iso, rand_id, FederationRecord};
use std::time::Duration;
use url::Url;

const TRUST_DOC_PATH: &str = "/.well-known/agent-trust.json";
const SPEC_DOC_PATH: &str = "/.well-known/gateway-spec.json";

pub struct FederationClient {
    http: reqwest::Client,
    config: FederationConfig,
}

/// Per-target handshake outcome.
#[derive(Debug, Clone, Serialize)]
pub struct HandshakeResult {
    /// The target as submitted (normalized when it validated).
    pub remote: String,
    pub ok: bool,
    /// Id of the stored snapshot, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FederationClient {
    pub fn new(config: FederationConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    /// Normalize and vet a peer base URL. Plain http is tolerated only for
    /// loopback peers; a non-empty allowlist is authoritative.
    fn validate_target(&self, target: &str) -> Result<String, String> {
        let base = target.trim().trim_end_matches('/').to_string();
        let url = Url::parse(&base).map_err(|e| format!("invalid url: {e}"))?;
        match url.scheme() {
            "https" => {}
            "http" => {
                let host = url.host_str().unwrap_or_default();
                if host != "localhost" && host != "127.0.0.1" {
                    return Err("https required for non-local peers".to_string());
                }
            }
            other => return Err(format!("unsupported scheme: {other}")),
        }
        if !self.config.peers.is_empty() && !self.config.peers.iter().any(|p| p == &base) {
            return Err("target not in peer allowlist".to_string());
        }
        Ok(base)
    }

    /// Fetch and store each target's trust documents. Always returns one
    /// result per target, in input order; only reachable peers leave a
    /// stored snapshot behind.
    pub async fn handshake(
        &self,
        store: &Store,
        targets: &[String],
    ) -> Result<Vec<HandshakeResult>, ApiError> {
        if targets.is_empty() {
            return Err(ApiError::bad_request("targets must not be empty"));
        }
        if targets.len() > self.config.max_targets {
            return Err(ApiError::bad_request(format!(
                "at most {} targets per handshake",
                self.config.max_targets
            )));
        }
        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            let result = match self.validate_target(target) {
                Ok(base) => self.fetch_one(store, base).await,
                Err(why) => HandshakeResult {
                    remote: target.clone(),
                    ok: false,
                    record_id: None,
                    error: Some(why),
                },
            };
            results.push(result);
        }
        Ok(results)
    }

    async fn fetch_one(&self, store: &Store, base: String) -> HandshakeResult {
        let trust = self.fetch_doc(&base, TRUST_DOC_PATH).await;
        let spec = self.fetch_doc(&base, SPEC_DOC_PATH).await;
        let ((trust_doc, trust_status), (spec_doc, spec_status)) = match (trust, spec) {
            (Ok(t), Ok(s)) => (t, s),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(remote = base, error = %e, "handshake fetch failed");
                return HandshakeResult {
                    remote: base,
                    ok: false,
                    record_id: None,
                    error: Some(e),
                };
            }
        };
        let record = FederationRecord {
            id: rand_id("fed"),
            ts: now_iso(),
            remote: base.clone(),
            snapshot: json!({
                "fetched_at": now_iso(),
                "trust_doc": trust_doc,
                "gateway_spec": spec_doc,
                "http": { "trust_status": trust_status, "spec_status": spec_status },
            }),
        };
        match store.store_handshake(&record).await {
            Ok(()) => HandshakeResult {
                remote: base,
                ok: true,
                record_id: Some(record.id),
                error: None,
            },
            Err(e) => HandshakeResult {
                remote: base,
                ok: false,
                record_id: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// One well-known document: the parsed body (null when the peer sent
    /// something that is not JSON) plus the HTTP status. Transport errors
    /// bubble up as the per-target failure.
    async fn fetch_doc(&self, base: &str, path: &str) -> Result<(Value, u16), String> {
        let url = format!("{base}{path}");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("fetch {path}: {e}"))?;
        let status = resp.status().as_u16();
        let doc = resp.json::<Value>().await.unwrap_or(Value::Null);
        Ok((doc, status))
    }

    /// Fetch an upstream policy document; transport failures surface as
    /// upstream errors.
    pub async fn fetch_policy(&self, url: &str) -> Result<(Value, u16), ApiError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::upstream(format!("fetch policy: {e}")))?;
        let status = resp.status().as_u16();
        let doc = resp
            .json::<Value>()
            .await
            .map_err(|e| ApiError::upstream(format!("policy document is not JSON: {e}")))?;
        Ok((doc, status))
    }
}
