//! Blockchain.com explorer client.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::chain::{BitcoinAddress, ProviderError, TransactionRecord};
use crate::providers::http::{endpoint, get_json, get_text};
use crate::providers::{BalanceProvider, TransactionProvider};

/// Blockchain.com explorer (`blockchain.info`).
///
/// Balances come from the plain-text `q/addressbalance` query, transactions
/// from `rawaddr`. Mainnet only.
pub struct BlockchainInfoProvider {
    name: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct RawAddress {
    #[serde(default)]
    txs: Vec<RawTx>,
}

#[derive(Debug, Deserialize)]
struct RawTx {
    hash: String,
    time: i64,
    #[serde(default)]
    out: Vec<RawOutput>,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    value: u64,
}

impl BlockchainInfoProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, client: Client) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            client,
        }
    }
}

fn parse_satoshis(body: &str) -> Result<u64, ProviderError> {
    let trimmed = body.trim();
    trimmed
        .parse::<u64>()
        .map_err(|_| ProviderError::Malformed(format!("expected satoshi integer, got {:?}", trimmed)))
}

fn to_record(tx: RawTx) -> Result<TransactionRecord, ProviderError> {
    let received_at = DateTime::from_timestamp(tx.time, 0)
        .ok_or_else(|| ProviderError::Malformed(format!("time {} out of range", tx.time)))?;
    let total_value = tx
        .out
        .iter()
        .try_fold(0u64, |acc, out| acc.checked_add(out.value))
        .ok_or_else(|| ProviderError::Malformed(format!("output sum overflows for {}", tx.hash)))?;

    Ok(TransactionRecord {
        hash: tx.hash,
        total_value,
        received_at,
    })
}

#[async_trait]
impl BalanceProvider for BlockchainInfoProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_balance(&self, address: &BitcoinAddress) -> Result<u64, ProviderError> {
        let url = endpoint(&self.base_url, &format!("q/addressbalance/{}", address), None)?;
        let body = get_text(&self.client, url).await?;
        parse_satoshis(&body)
    }
}

#[async_trait]
impl TransactionProvider for BlockchainInfoProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_transactions(&self, address: &BitcoinAddress) -> Result<Vec<TransactionRecord>, ProviderError> {
        let url = endpoint(&self.base_url, &format!("rawaddr/{}", address), None)?;
        let raw: RawAddress = get_json(&self.client, url).await?;
        raw.txs.into_iter().map(to_record).collect()
    }
}
