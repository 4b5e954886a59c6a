//! Transaction resolution with a merged, bounded per-address history.
//!
//! # Data Flow
//! ```text
//! resolve_transactions(address)
//!     → FallbackChain over TransactionProviders   (exhaustion → error)
//!     → merge by hash into history[address]
//!     → evict least recently queried addresses over capacity
//!     → sort newest first
//! ```
//!
//! # Design Decisions
//! - History exists so a provider switch never duplicates a transaction; it is
//!   a cache, so any address may be evicted and rebuilt from the next answer
//! - Recency is a logical clock rather than wall time

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::chain::{BitcoinAddress, TransactionRecord, WalletError, WalletResult};
use crate::config::ResolutionStrategy;
use crate::observability::metrics;
use crate::providers::TransactionProvider;
use crate::resilience::{Attempt, FallbackChain};

/// Addresses kept when no capacity is configured.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1024;

#[derive(Default)]
struct AddressHistory {
    records: HashMap<String, TransactionRecord>,
    last_used: u64,
}

/// Resolves an address's transactions from the first provider that answers.
///
/// Each call uses one provider's list, but results are merged by hash into a
/// per-address history, so repeated calls that land on different providers
/// never yield the same transaction twice.
pub struct TransactionResolver {
    providers: Vec<Arc<dyn TransactionProvider>>,
    chain: FallbackChain,
    history: DashMap<String, AddressHistory>,
    capacity: usize,
    clock: AtomicU64,
}

impl TransactionResolver {
    pub fn new(
        providers: Vec<Arc<dyn TransactionProvider>>,
        timeout: Duration,
        strategy: ResolutionStrategy,
    ) -> Self {
        Self {
            providers,
            chain: FallbackChain::new("transactions", timeout, strategy),
            history: DashMap::new(),
            capacity: DEFAULT_HISTORY_CAPACITY,
            clock: AtomicU64::new(0),
        }
    }

    /// Keep the history of at most `capacity` addresses (minimum one).
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Transactions for `address`, newest first.
    pub async fn resolve_transactions(&self, address: &BitcoinAddress) -> WalletResult<Vec<TransactionRecord>> {
        let attempts = self
            .providers
            .iter()
            .map(|provider| Attempt::new(provider.name(), provider.fetch_transactions(address)))
            .collect();

        let resolved = match self.chain.run(attempts).await {
            Ok(resolved) => resolved,
            Err(failures) => {
                metrics::record_resolution(self.chain.operation(), "exhausted");
                tracing::error!(address = %address, attempts = failures.len(), "All transaction providers failed");
                return Err(WalletError::AllProvidersExhausted {
                    operation: self.chain.operation(),
                    failures,
                });
            }
        };
        metrics::record_resolution(self.chain.operation(), "success");

        let fetched = resolved.value.len();
        let mut entry = self.history.entry(address.as_str().to_string()).or_default();
        entry.last_used = self.clock.fetch_add(1, AtomicOrdering::Relaxed);
        for record in resolved.value {
            entry.records.insert(record.hash.clone(), record);
        }
        let mut merged: Vec<TransactionRecord> = entry.records.values().cloned().collect();
        drop(entry);

        self.evict_over_capacity(address.as_str());
        merged.sort_by(newest_first);

        tracing::info!(
            address = %address,
            provider = %resolved.provider,
            fetched,
            known = merged.len(),
            "Transactions resolved"
        );
        Ok(merged)
    }

    /// Drop least recently queried histories until the map fits, never `keep`.
    fn evict_over_capacity(&self, keep: &str) {
        while self.history.len() > self.capacity {
            let oldest = self
                .history
                .iter()
                .filter(|entry| entry.key() != keep)
                .min_by_key(|entry| entry.value().last_used)
                .map(|entry| entry.key().clone());

            let Some(oldest) = oldest else { break };
            self.history.remove(&oldest);
            tracing::debug!(address = %oldest, capacity = self.capacity, "Transaction history evicted");
        }
    }
}

fn newest_first(a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
    b.received_at
        .cmp(&a.received_at)
        .then_with(|| a.hash.cmp(&b.hash))
}
