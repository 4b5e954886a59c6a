//! Esplora REST client (Blockstream, mempool.space).
//!
//! # Endpoints
//! ```text
//! GET {base}/address/{addr}       balance = chain_stats.funded_txo_sum - spent_txo_sum
//! GET {base}/address/{addr}/txs   txid, Σ vout[].value, status.block_time
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::chain::{BitcoinAddress, ProviderError, TransactionRecord};
use crate::providers::http::{endpoint, get_json};
use crate::providers::{BalanceProvider, TransactionProvider};

// Esplora is the REST interface behind blockstream.info and mempool.space.
// Both expose the same routes, so one client serves either explorer.
pub struct EsploraProvider {
    name: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct AddressInfo {
    chain_stats: ChainStats,
}

#[derive(Debug, Deserialize)]
struct ChainStats {
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

#[derive(Debug, Deserialize)]
struct EsploraTx {
    txid: String,
    #[serde(default)]
    vout: Vec<EsploraOutput>,
    status: EsploraStatus,
}

#[derive(Debug, Deserialize)]
struct EsploraOutput {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct EsploraStatus {
    #[serde(default)]
    block_time: Option<i64>,
}

impl EsploraProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, client: Client) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            client,
        }
    }

    fn to_record(tx: EsploraTx, fetched_at: DateTime<Utc>) -> Result<TransactionRecord, ProviderError> {
        let received_at = match tx.status.block_time {
            Some(ts) => DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| ProviderError::Malformed(format!("block_time {} out of range", ts)))?,
            // still in the mempool
            None => fetched_at,
        };
        let total_value = tx
            .vout
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
            .ok_or_else(|| ProviderError::Malformed(format!("output sum overflows for {}", tx.txid)))?;

        Ok(TransactionRecord {
            hash: tx.txid,
            total_value,
            received_at,
        })
    }
}

#[async_trait]
impl BalanceProvider for EsploraProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_balance(&self, address: &BitcoinAddress) -> Result<u64, ProviderError> {
        let url = endpoint(&self.base_url, &format!("address/{}", address), None)?;
        let info: AddressInfo = get_json(&self.client, url).await?;
        info.chain_stats
            .funded_txo_sum
            .checked_sub(info.chain_stats.spent_txo_sum)
            .ok_or_else(|| {
                ProviderError::Malformed(format!(
                    "spent {} exceeds funded {}",
                    info.chain_stats.spent_txo_sum, info.chain_stats.funded_txo_sum
                ))
            })
    }
}

#[async_trait]
impl TransactionProvider for EsploraProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_transactions(&self, address: &BitcoinAddress) -> Result<Vec<TransactionRecord>, ProviderError> {
        let url = endpoint(&self.base_url, &format!("address/{}/txs", address), None)?;
        let txs: Vec<EsploraTx> = get_json(&self.client, url).await?;
        let fetched_at = Utc::now();
        txs.into_iter()
            .map(|tx| Self::to_record(tx, fetched_at))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::http::decode;

    #[test]
    fn test_address_info_shape() {
        let info: AddressInfo = decode(
            r#"{"address":"bc1q","chain_stats":{"funded_txo_count":2,"funded_txo_sum":250000000,
                "spent_txo_count":1,"spent_txo_sum":100000000,"tx_count":3},
                "mempool_stats":{"funded_txo_sum":0,"spent_txo_sum":0}}"#,
        )
        .unwrap();
        assert_eq!(info.chain_stats.funded_txo_sum - info.chain_stats.spent_txo_sum, 150_000_000);
    }

    #[test]
    fn test_unconfirmed_tx_uses_fetch_time() {
        let txs: Vec<EsploraTx> = decode(
            r#"[{"txid":"aa","vout":[{"value":1000},{"value":234}],"status":{"confirmed":false}},
                {"txid":"bb","vout":[{"value":5}],"status":{"confirmed":true,"block_time":1700000000}}]"#,
        )
        .unwrap();
        let fetched_at = DateTime::from_timestamp(1_800_000_000, 0).unwrap();
        let records: Vec<_> = txs
            .into_iter()
            .map(|tx| EsploraProvider::to_record(tx, fetched_at).unwrap())
            .collect();

        assert_eq!(records[0].total_value, 1234);
        assert_eq!(records[0].received_at, fetched_at);
        assert_eq!(records[1].received_at.timestamp(), 1_700_000_000);
    }
}
