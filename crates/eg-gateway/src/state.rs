//! Shared application state.

use crate::config::GatewayConfig;
use crate::federation::FederationClient;
use anyhow::Context;
use eg_quorum::QuorumEngine;
use eg_store::{Backend, BlobStore, MemoryBackend, SqliteBackend, Store};
use shared_crypto::SignerKeys;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub store: Arc<Store>,
    pub quorum: Arc<QuorumEngine>,
    pub federation: Arc<FederationClient>,
}

impl AppState {
    /// Wire up the backend named by the config, the blob spill, signing
    /// keys from the environment, and the engines on top.
    pub fn build(config: GatewayConfig) -> anyhow::Result<Self> {
        Self::build_with_signer(config, SignerKeys::from_env())
    }

    pub fn build_with_signer(config: GatewayConfig, signer: SignerKeys) -> anyhow::Result<Self> {
        let backend: Arc<dyn Backend> = match config.storage.backend.as_str() {
            "sqlite" => Arc::new(
                SqliteBackend::open(&config.storage.sqlite_path)
                    .context("opening sqlite backend")?,
            ),
            _ => Arc::new(MemoryBackend::new()),
        };
        tracing::info!(backend = backend.name(), "storage backend selected");
        let blob = BlobStore::new(&config.storage.blob_dir);
        let store = Arc::new(
            Store::new(backend, blob, signer).with_inline_limit(config.storage.inline_limit),
        );
        let quorum = Arc::new(QuorumEngine::new(Arc::clone(&store)));
        let federation = Arc::new(
            FederationClient::new(config.federation.clone())
                .context("building federation client")?,
        );
        Ok(Self {
            config: Arc::new(config),
            store,
            quorum,
            federation,
        })
    }
}
