//! Balance resolution over the configured provider chain.
//!
//! # Data Flow
//! ```text
//! resolve_balance(address)
//!     → FallbackChain over BalanceProviders   (sequential or race)
//!     → Balance { satoshis, provider }        (all failed → AllProvidersExhausted)
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::chain::{Balance, BitcoinAddress, WalletError, WalletResult};
use crate::config::ResolutionStrategy;
use crate::observability::metrics;
use crate::providers::BalanceProvider;
use crate::resilience::{Attempt, FallbackChain};

/// Resolves an address balance from the first provider that answers.
pub struct BalanceResolver {
    providers: Vec<Arc<dyn BalanceProvider>>,
    chain: FallbackChain,
}

impl BalanceResolver {
    pub fn new(providers: Vec<Arc<dyn BalanceProvider>>, timeout: Duration, strategy: ResolutionStrategy) -> Self {
        Self {
            providers,
            chain: FallbackChain::new("balance", timeout, strategy),
        }
    }

    /// Provider names in priority order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn resolve_balance(&self, address: &BitcoinAddress) -> WalletResult<Balance> {
        let attempts = self
            .providers
            .iter()
            .map(|provider| Attempt::new(provider.name(), provider.fetch_balance(address)))
            .collect();

        match self.chain.run(attempts).await {
            Ok(resolved) => {
                metrics::record_resolution(self.chain.operation(), "success");
                let balance = Balance::new(resolved.value, resolved.provider);
                tracing::info!(
                    address = %address,
                    provider = %balance.provider,
                    satoshis = balance.satoshis,
                    skipped = resolved.failures.len(),
                    "Balance resolved"
                );
                Ok(balance)
            }
            Err(failures) => {
                metrics::record_resolution(self.chain.operation(), "exhausted");
                tracing::error!(address = %address, attempts = failures.len(), "All balance providers failed");
                Err(WalletError::AllProvidersExhausted {
                    operation: self.chain.operation(),
                    failures,
                })
            }
        }
    }
}
