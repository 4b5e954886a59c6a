//! BlockCypher client: balances, transactions and address generation.
//!
//! # Endpoints
//! ```text
//! GET  {base}/addrs/{addr}/balance   final_balance
//! GET  {base}/addrs/{addr}/full      txs[].{hash,total,received}
//! POST {base}/addrs                  {address, private, ...}
//! ```
//!
//! # Design Decisions
//! - The token rides as a `token` query parameter and is redacted from `Debug`
//! - The generated private key is wrapped in `PrivateKey` straight from the
//!   response body and never logged

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::chain::{BitcoinAddress, ProviderError, TransactionRecord};
use crate::provisioning::key::PrivateKey;
use crate::provisioning::{AddressGenerator, GeneratedAddress};
use crate::providers::http::{endpoint, get_json, post_json};
use crate::providers::{BalanceProvider, TransactionProvider};

/// BlockCypher chain API.
///
/// Serves balances, full transaction lists and the address-generation
/// endpoint used for provisioning. The API token is optional but rate limits
/// without one are tight.
pub struct BlockcypherProvider {
    name: String,
    base_url: String,
    token: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct AddressBalance {
    final_balance: i64,
}

#[derive(Debug, Deserialize)]
struct FullAddress {
    #[serde(default)]
    txs: Vec<FullTx>,
}

#[derive(Debug, Deserialize)]
struct FullTx {
    hash: String,
    total: u64,
    received: DateTime<Utc>,
}

// The key pair endpoint also returns `public` and `wif`; neither is used.
#[derive(Deserialize)]
struct KeyPair {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    private: Option<String>,
}

impl BlockcypherProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        token: Option<String>,
        client: Client,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            token,
            client,
        }
    }
}

impl std::fmt::Debug for BlockcypherProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockcypherProvider")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn key_pair_to_generated(pair: KeyPair) -> Result<GeneratedAddress, ProviderError> {
    let address = pair
        .address
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| ProviderError::Malformed("response has no address".to_string()))?;
    let private_key = pair
        .private
        .filter(|k| !k.is_empty())
        .map(PrivateKey::new)
        .ok_or_else(|| ProviderError::Malformed("response has no private key".to_string()))?;

    Ok(GeneratedAddress {
        address,
        private_key,
    })
}

#[async_trait]
impl BalanceProvider for BlockcypherProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_balance(&self, address: &BitcoinAddress) -> Result<u64, ProviderError> {
        let url = endpoint(
            &self.base_url,
            &format!("addrs/{}/balance", address),
            self.token.as_deref(),
        )?;
        let balance: AddressBalance = get_json(&self.client, url).await?;
        u64::try_from(balance.final_balance).map_err(|_| {
            ProviderError::Malformed(format!("negative final_balance {}", balance.final_balance))
        })
    }
}

#[async_trait]
impl TransactionProvider for BlockcypherProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_transactions(&self, address: &BitcoinAddress) -> Result<Vec<TransactionRecord>, ProviderError> {
        let url = endpoint(
            &self.base_url,
            &format!("addrs/{}/full", address),
            self.token.as_deref(),
        )?;
        let full: FullAddress = get_json(&self.client, url).await?;
        Ok(full
            .txs
            .into_iter()
            .map(|tx| TransactionRecord {
                hash: tx.hash,
                total_value: tx.total,
                received_at: tx.received,
            })
            .collect())
    }
}

#[async_trait]
impl AddressGenerator for BlockcypherProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_address(&self) -> Result<GeneratedAddress, ProviderError> {
        let url = endpoint(&self.base_url, "addrs", self.token.as_deref())?;
        let pair: KeyPair = post_json(&self.client, url).await?;
        key_pair_to_generated(pair)
    }
}
