//! Gateway configuration with validation.
//!
//! Every field has a working default; a bare `GatewayConfig::default()` runs
//! a read-open, in-memory gateway whose mutating endpoints stay locked until
//! a write token is configured. Deployments override through `EG_*`
//! environment variables.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Access token configuration
    pub auth: AuthConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// Storage backend selection
    pub storage: StorageConfig,
    /// Federation configuration
    pub federation: FederationConfig,
    /// Policy document proxy
    pub policy: PolicyConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8787)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8787,
        }
    }
}

/// Access tokens. Reads are open; mutations need the write token (the
/// admin token also satisfies write). An unset token fails closed: the
/// endpoints it gates stay unauthorized until one is configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub write_token: Option<String>,
    pub admin_token: Option<String>,
    /// Expose the audit ledger without the admin token
    pub audit_public: bool,
}

/// Per-minute fixed-window rate limits, keyed by client IP
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// GET/HEAD requests per minute per IP
    pub read_per_min: u32,
    /// Mutating requests per minute per IP
    pub write_per_min: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            read_per_min: 120,
            write_per_min: 30,
        }
    }
}

/// Which backend holds the records, and where blobs spill
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `memory` or `sqlite`; fixed for the life of the process
    pub backend: String,
    pub sqlite_path: PathBuf,
    pub blob_dir: PathBuf,
    /// Artifact payloads above this many bytes spill to blob storage
    pub inline_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            sqlite_path: PathBuf::from("data/gateway.db"),
            blob_dir: PathBuf::from("data/blobs"),
            inline_limit: eg_store::DEFAULT_INLINE_LIMIT,
        }
    }
}

/// Outbound handshake configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    /// Peer allowlist. Empty means any https target is accepted.
    pub peers: Vec<String>,
    /// Per-target request timeout in seconds
    pub timeout_secs: u64,
    /// Max targets in one handshake batch
    pub max_targets: usize,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            timeout_secs: 10,
            max_targets: 20,
        }
    }
}

/// Upstream policy document. When `url` is set, `GET /policy` proxies it;
/// otherwise the gateway serves its built-in limits document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub url: Option<String>,
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    #[error("unknown storage backend: {0}")]
    UnknownBackend(String),
    #[error("invalid federation config: {0}")]
    InvalidFederation(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl GatewayConfig {
    /// Build configuration from `EG_*` environment variables over defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(host) = env_var("EG_HOST") {
            config.http.host = host
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("EG_HOST: {host}")))?;
        }
        if let Some(port) = env_var("EG_PORT") {
            config.http.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("EG_PORT: {port}")))?;
        }
        config.auth.write_token = env_var("EG_WRITE_TOKEN");
        config.auth.admin_token = env_var("EG_ADMIN_TOKEN");
        if let Some(v) = env_var("EG_AUDIT_PUBLIC") {
            config.auth.audit_public = matches!(v.as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = env_var("EG_RATE_LIMIT_ENABLED") {
            config.rate_limit.enabled = !matches!(v.as_str(), "0" | "false" | "no");
        }
        if let Some(v) = env_var("EG_RATE_READ_PER_MIN") {
            config.rate_limit.read_per_min = v
                .parse()
                .map_err(|_| ConfigError::InvalidRateLimit(format!("EG_RATE_READ_PER_MIN: {v}")))?;
        }
        if let Some(v) = env_var("EG_RATE_WRITE_PER_MIN") {
            config.rate_limit.write_per_min = v.parse().map_err(|_| {
                ConfigError::InvalidRateLimit(format!("EG_RATE_WRITE_PER_MIN: {v}"))
            })?;
        }
        if let Some(v) = env_var("EG_BACKEND") {
            config.storage.backend = v;
        }
        if let Some(v) = env_var("EG_SQLITE_PATH") {
            config.storage.sqlite_path = PathBuf::from(v);
        }
        if let Some(v) = env_var("EG_BLOB_DIR") {
            config.storage.blob_dir = PathBuf::from(v);
        }
        if let Some(v) = env_var("EG_INLINE_LIMIT") {
            config.storage.inline_limit = v
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("EG_INLINE_LIMIT: {v}")))?;
        }
        if let Some(v) = env_var("EG_FED_PEERS") {
            config.federation.peers = v
                .split(',')
                .map(|p| p.trim().trim_end_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Some(v) = env_var("EG_FED_TIMEOUT_SECS") {
            config.federation.timeout_secs = v
                .parse()
                .map_err(|_| ConfigError::InvalidFederation(format!("EG_FED_TIMEOUT_SECS: {v}")))?;
        }
        config.policy.url = env_var("EG_POLICY_URL");
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.enabled {
            if self.rate_limit.read_per_min == 0 {
                return Err(ConfigError::InvalidRateLimit(
                    "read_per_min cannot be 0".into(),
                ));
            }
            if self.rate_limit.write_per_min == 0 {
                return Err(ConfigError::InvalidRateLimit(
                    "write_per_min cannot be 0".into(),
                ));
            }
        }
        match self.storage.backend.as_str() {
            "memory" | "sqlite" => {}
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        }
        if self.federation.timeout_secs == 0 {
            return Err(ConfigError::InvalidFederation(
                "timeout_secs cannot be 0".into(),
            ));
        }
        if self.federation.max_targets == 0 {
            return Err(ConfigError::InvalidFederation(
                "max_targets cannot be 0".into(),
            ));
        }
        Ok(())
    }

    /// HTTP bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}
