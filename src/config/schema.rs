//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chain::Network;

/// Environment variable consulted for the BlockCypher API token by default.
pub const BLOCKCYPHER_TOKEN_ENV_VAR: &str = "BLOCKCYPHER_TOKEN";

/// Default location of the wallet document for the file backend.
pub const DEFAULT_STORAGE_PATH: &str = "wallets.json";

/// Root configuration for the wallet gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WalletConfig {
    /// Bitcoin network (mainnet or testnet).
    pub network: Network,

    /// HTTP server settings.
    pub server: ServerConfig,

    /// Balance and transaction provider chains.
    pub providers: ProvidersConfig,

    /// Remote address-generation API.
    pub address_api: AddressApiConfig,

    /// Per-user document storage.
    pub storage: StorageConfig,

    /// Session credentials accepted by the HTTP surface.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Upper bound on handling one request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 45,
        }
    }
}

/// How a provider chain is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// One provider at a time, in list order.
    #[default]
    Sequential,
    /// All providers at once; the first successful response wins.
    Race,
}

/// Known explorer APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    BlockchainInfo,
    Blockstream,
    MempoolSpace,
    Blockcypher,
}

impl ProviderKind {
    /// Stable identifier used in logs, metrics and error reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            ProviderKind::BlockchainInfo => "blockchain_info",
            ProviderKind::Blockstream => "blockstream",
            ProviderKind::MempoolSpace => "mempool_space",
            ProviderKind::Blockcypher => "blockcypher",
        }
    }

    /// Public base URL for the given network, if the provider serves it.
    pub const fn default_base_url(self, network: Network) -> Option<&'static str> {
        match (self, network) {
            (ProviderKind::BlockchainInfo, Network::Mainnet) => Some("https://blockchain.info"),
            (ProviderKind::BlockchainInfo, Network::Testnet) => None,
            (ProviderKind::Blockstream, Network::Mainnet) => Some("https://blockstream.info/api"),
            (ProviderKind::Blockstream, Network::Testnet) => {
                Some("https://blockstream.info/testnet/api")
            }
            (ProviderKind::MempoolSpace, Network::Mainnet) => Some("https://mempool.space/api"),
            (ProviderKind::MempoolSpace, Network::Testnet) => {
                Some("https://mempool.space/testnet/api")
            }
            (ProviderKind::Blockcypher, Network::Mainnet) => {
                Some("https://api.blockcypher.com/v1/btc/main")
            }
            (ProviderKind::Blockcypher, Network::Testnet) => {
                Some("https://api.blockcypher.com/v1/btc/test3")
            }
        }
    }
}

/// One entry in a provider chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Which API this entry talks to.
    pub kind: ProviderKind,

    /// Name for logs and error reports (defaults to the kind).
    #[serde(default)]
    pub name: Option<String>,

    /// Override of the public base URL (self-hosted Esplora, test servers).
    #[serde(default)]
    pub base_url: Option<String>,

    /// API token sent as a `token` query parameter.
    #[serde(default)]
    pub token: Option<String>,

    /// Environment variable to read the token from when `token` is unset.
    #[serde(default)]
    pub token_env: Option<String>,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            name: None,
            base_url: None,
            token: None,
            token_env: None,
        }
    }

    /// Builder-style base URL override.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Builder-style display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.kind.as_str().to_string())
    }

    pub fn resolved_base_url(&self, network: Network) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| self.kind.default_base_url(network).map(str::to_string))
    }

    pub fn resolved_token(&self) -> Option<String> {
        resolve_token(self.token.as_deref(), self.token_env.as_deref())
    }
}

fn resolve_token(token: Option<&str>, token_env: Option<&str>) -> Option<String> {
    token
        .map(str::to_string)
        .or_else(|| token_env.and_then(|var| std::env::var(var).ok()))
        .filter(|t| !t.is_empty())
}

/// Provider chain configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Deadline for a single provider attempt, in seconds.
    pub timeout_secs: u64,

    /// Sequential (default) or race.
    pub strategy: ResolutionStrategy,

    /// Balance providers in priority order.
    pub balance: Vec<ProviderConfig>,

    /// Transaction providers in priority order.
    pub transactions: Vec<ProviderConfig>,

    /// Addresses whose merged transaction history is kept in memory.
    /// The least recently queried address is evicted first.
    pub history_capacity: usize,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        let mut blockcypher = ProviderConfig::new(ProviderKind::Blockcypher);
        blockcypher.token_env = Some(BLOCKCYPHER_TOKEN_ENV_VAR.to_string());

        Self {
            timeout_secs: 10,
            strategy: ResolutionStrategy::Sequential,
            balance: vec![
                ProviderConfig::new(ProviderKind::BlockchainInfo),
                ProviderConfig::new(ProviderKind::Blockstream),
                ProviderConfig::new(ProviderKind::MempoolSpace),
            ],
            transactions: vec![blockcypher, ProviderConfig::new(ProviderKind::BlockchainInfo)],
            history_capacity: 1024,
        }
    }
}

/// Address-generation API configuration (BlockCypher `POST /addrs`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AddressApiConfig {
    /// Override of the BlockCypher base URL.
    pub base_url: Option<String>,

    /// API token.
    pub token: Option<String>,

    /// Environment variable to read the token from when `token` is unset.
    pub token_env: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl AddressApiConfig {
    pub fn resolved_base_url(&self, network: Network) -> Option<String> {
        self.base_url.clone().or_else(|| {
            ProviderKind::Blockcypher
                .default_base_url(network)
                .map(str::to_string)
        })
    }

    pub fn resolved_token(&self) -> Option<String> {
        resolve_token(self.token.as_deref(), self.token_env.as_deref())
    }
}

impl Default for AddressApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            token_env: Some(BLOCKCYPHER_TOKEN_ENV_VAR.to_string()),
            timeout_secs: 10,
        }
    }
}

/// Where user wallet records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process memory; lost on restart. Tests and throwaway runs only.
    Memory,
    /// JSON document on disk.
    #[default]
    File,
}

impl StorageBackend {
    /// Whether records survive a restart. A non-durable backend hands out a
    /// fresh address to the same user on every run.
    pub const fn is_durable(self) -> bool {
        matches!(self, StorageBackend::File)
    }
}

/// Document storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Path of the JSON document (file backend only).
    pub path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: Some(DEFAULT_STORAGE_PATH.to_string()),
        }
    }
}

/// Bearer sessions for the HTTP surface.
///
/// ```toml
/// [auth.sessions]
/// "3f9c0a7e..." = "alice"
/// ```
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session token to user id.
    pub sessions: HashMap<String, String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("sessions", &format_args!("<{} redacted>", self.sessions.len()))
            .finish()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
