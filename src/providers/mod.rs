//! Explorer providers.
//!
//! # Data Flow
//! ```text
//! ProviderConfig list (priority order)
//!     → build_balance_chain / build_transaction_chain
//!     → Vec<Arc<dyn BalanceProvider>> / Vec<Arc<dyn TransactionProvider>>
//!     → resolver (first-success-wins walk)
//! ```
//!
//! # Design Decisions
//! - Each provider normalizes its own response shape to satoshis at the boundary
//! - Providers never retry and never apply timeouts; the resolver owns both concerns
//! - Esplora-compatible explorers (Blockstream, mempool.space) share one implementation

pub mod blockchain_info;
pub mod blockcypher;
pub mod esplora;
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::chain::{BitcoinAddress, Network, ProviderError, TransactionRecord};
use crate::config::validation::ValidationError;
use crate::config::{ConfigError, ProviderConfig, ProviderKind};

pub use blockchain_info::BlockchainInfoProvider;
pub use blockcypher::BlockcypherProvider;
pub use esplora::EsploraProvider;

/// A source of address balances.
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Name used in logs, metrics and failure reports.
    fn name(&self) -> &str;

    /// Confirmed balance of `address` in satoshis.
    async fn fetch_balance(&self, address: &BitcoinAddress) -> Result<u64, ProviderError>;
}

/// A source of address transaction lists.
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    /// Name used in logs, metrics and failure reports.
    fn name(&self) -> &str;

    /// Transactions touching `address`, in provider order.
    async fn fetch_transactions(&self, address: &BitcoinAddress) -> Result<Vec<TransactionRecord>, ProviderError>;
}

enum Explorer {
    BlockchainInfo(BlockchainInfoProvider),
    Esplora(EsploraProvider),
    Blockcypher(BlockcypherProvider),
}

fn build_explorer(
    field: &str,
    config: &ProviderConfig,
    network: Network,
    client: &Client,
) -> Result<Explorer, ConfigError> {
    let base_url = config.resolved_base_url(network).ok_or_else(|| {
        ConfigError::Validation(vec![ValidationError::new(
            format!("{}.base_url", field),
            format!("{} has no public endpoint on {}", config.kind.as_str(), network),
        )])
    })?;
    let name = config.display_name();

    Ok(match config.kind {
        ProviderKind::BlockchainInfo => {
            Explorer::BlockchainInfo(BlockchainInfoProvider::new(name, base_url, client.clone()))
        }
        ProviderKind::Blockstream | ProviderKind::MempoolSpace => {
            Explorer::Esplora(EsploraProvider::new(name, base_url, client.clone()))
        }
        ProviderKind::Blockcypher => Explorer::Blockcypher(BlockcypherProvider::new(
            name,
            base_url,
            config.resolved_token(),
            client.clone(),
        )),
    })
}

/// Build the balance provider chain in configured priority order.
pub fn build_balance_chain(
    configs: &[ProviderConfig],
    network: Network,
    client: &Client,
) -> Result<Vec<Arc<dyn BalanceProvider>>, ConfigError> {
    configs
        .iter()
        .enumerate()
        .map(|(i, config)| {
            let field = format!("providers.balance[{}]", i);
            let provider: Arc<dyn BalanceProvider> = match build_explorer(&field, config, network, client)? {
                Explorer::BlockchainInfo(p) => Arc::new(p),
                Explorer::Esplora(p) => Arc::new(p),
                Explorer::Blockcypher(p) => Arc::new(p),
            };
            Ok(provider)
        })
        .collect()
}

/// Build the transaction provider chain in configured priority order.
pub fn build_transaction_chain(
    configs: &[ProviderConfig],
    network: Network,
    client: &Client,
) -> Result<Vec<Arc<dyn TransactionProvider>>, ConfigError> {
    configs
        .iter()
        .enumerate()
        .map(|(i, config)| {
            let field = format!("providers.transactions[{}]", i);
            let provider: Arc<dyn TransactionProvider> = match build_explorer(&field, config, network, client)? {
                Explorer::BlockchainInfo(p) => Arc::new(p),
                Explorer::Esplora(p) => Arc::new(p),
                Explorer::Blockcypher(p) => Arc::new(p),
            };
            Ok(provider)
        })
        .collect()
}
