//! Wallet façade.
//!
//! # Responsibilities
//! - Wire providers, resolvers, generator and store from `WalletConfig`
//! - Validate raw address input before any network call
//! - Run the wallet-open flow: identity → provision → reveal → balance and transactions
//!
//! # Data Flow
//! ```text
//! open_wallet(identity, sink)
//!     → current_user_id (NoIdentity if signed out)
//!     → AddressProvisioner::get_or_create_address   (errors abort)
//!     → reveal_private_key_once(sink)               (created only, before any provider call)
//!     → BalanceResolver::resolve_balance      ┐ concurrently, each bounded by
//!     → TransactionResolver::resolve_transactions ┘ the resolution budget
//!     → WalletView                                  (exhaustion or budget → Unavailable)
//! ```
//!
//! # Design Decisions
//! - The key is handed over before the slow part of the flow, so nothing
//!   that cuts the flow short afterwards can lose it
//! - `from_config` derives the resolution budget from the server request
//!   timeout, so a creation response always beats the timeout layer

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::chain::{
    AddressFormat, Balance, BitcoinAddress, Network, ProviderFailure, TransactionRecord, UserId, WalletError,
    WalletResult,
};
use crate::config::validation::{validate_config, ValidationError, WALLET_RESPONSE_MARGIN_SECS};
use crate::config::{ConfigError, StorageBackend, WalletConfig};
use crate::identity::IdentityProvider;
use crate::providers::http::build_client;
use crate::providers::{build_balance_chain, build_transaction_chain, BlockcypherProvider};
use crate::provisioning::{
    AddressProvisioner, DocumentStore, JsonFileStore, KeyDisclosure, MemoryStore, OneTimeKey, ProvisionedAddress,
};
use crate::resolver::{BalanceResolver, TransactionResolver};

/// Balance section of a wallet view.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BalanceView {
    Available { satoshis: u64, btc: f64, provider: String },
    Unavailable { failures: Vec<String> },
}

/// Transaction section of a wallet view.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionsView {
    Available { transactions: Vec<TransactionRecord> },
    Unavailable { failures: Vec<String> },
}

/// Everything the wallet screen shows after opening.
#[derive(Debug, Serialize)]
pub struct WalletView {
    pub user_id: UserId,
    pub address: BitcoinAddress,
    pub format: AddressFormat,
    pub created: bool,
    /// The private key has been handed out, by this open or an earlier one.
    pub key_revealed: bool,
    pub balance: BalanceView,
    pub transactions: TransactionsView,
}

fn failure_strings(failures: &[ProviderFailure]) -> Vec<String> {
    failures.iter().map(ToString::to_string).collect()
}

fn budget_exceeded(budget: Duration) -> Vec<String> {
    vec![format!("resolution budget of {}ms exceeded", budget.as_millis())]
}

/// `Err(budget)` when `budget` runs out first.
async fn within<T>(budget: Option<Duration>, fut: impl std::future::Future<Output = T>) -> Result<T, Duration> {
    match budget {
        Some(budget) => tokio::time::timeout(budget, fut).await.map_err(|_| budget),
        None => Ok(fut.await),
    }
}

impl From<WalletResult<Balance>> for BalanceView {
    fn from(result: WalletResult<Balance>) -> Self {
        match result {
            Ok(balance) => BalanceView::Available {
                satoshis: balance.satoshis,
                btc: balance.btc(),
                provider: balance.provider,
            },
            Err(WalletError::AllProvidersExhausted { failures, .. }) => BalanceView::Unavailable {
                failures: failure_strings(&failures),
            },
            Err(other) => BalanceView::Unavailable {
                failures: vec![other.to_string()],
            },
        }
    }
}

impl From<WalletResult<Vec<TransactionRecord>>> for TransactionsView {
    fn from(result: WalletResult<Vec<TransactionRecord>>) -> Self {
        match result {
            Ok(transactions) => TransactionsView::Available { transactions },
            Err(WalletError::AllProvidersExhausted { failures, .. }) => TransactionsView::Unavailable {
                failures: failure_strings(&failures),
            },
            Err(other) => TransactionsView::Unavailable {
                failures: vec![other.to_string()],
            },
        }
    }
}

/// Entry point for every wallet operation.
pub struct WalletService {
    network: Network,
    balances: BalanceResolver,
    transactions: TransactionResolver,
    provisioner: AddressProvisioner,
    resolution_budget: Option<Duration>,
}

impl WalletService {
    pub fn new(
        network: Network,
        balances: BalanceResolver,
        transactions: TransactionResolver,
        provisioner: AddressProvisioner,
    ) -> Self {
        Self {
            network,
            balances,
            transactions,
            provisioner,
            resolution_budget: None,
        }
    }

    /// Bound the balance and transaction phase of `open_wallet`.
    pub fn with_resolution_budget(mut self, budget: Duration) -> Self {
        self.resolution_budget = Some(budget);
        self
    }

    /// Build the service described by a configuration.
    pub fn from_config(config: &WalletConfig) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let network = config.network;
        let providers = &config.providers;
        let timeout = Duration::from_secs(providers.timeout_secs);
        let client = build_client(timeout)?;

        let balances = BalanceResolver::new(
            build_balance_chain(&providers.balance, network, &client)?,
            timeout,
            providers.strategy,
        );
        let transactions = TransactionResolver::new(
            build_transaction_chain(&providers.transactions, network, &client)?,
            timeout,
            providers.strategy,
        )
        .with_history_capacity(providers.history_capacity);

        let api = &config.address_api;
        let generator_url = api.resolved_base_url(network).ok_or_else(|| {
            ConfigError::Validation(vec![ValidationError::new(
                "address_api.base_url",
                format!("no default address API on {}", network),
            )])
        })?;
        let generator = Arc::new(BlockcypherProvider::new(
            "blockcypher",
            generator_url,
            api.resolved_token(),
            client,
        ));

        let store: Arc<dyn DocumentStore> = match config.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("Memory storage selected: wallet addresses are lost on restart and regenerated");
                Arc::new(MemoryStore::new())
            }
            StorageBackend::File => {
                let path = config.storage.path.as_deref().ok_or_else(|| {
                    ConfigError::Validation(vec![ValidationError::new(
                        "storage.path",
                        "required for the file backend",
                    )])
                })?;
                Arc::new(JsonFileStore::open(path)?)
            }
        };

        let provisioner = AddressProvisioner::new(store, generator, network, Duration::from_secs(api.timeout_secs));
        let resolution_budget = Duration::from_secs(
            config
                .server
                .request_timeout_secs
                .saturating_sub(api.timeout_secs + WALLET_RESPONSE_MARGIN_SECS)
                .max(1),
        );

        tracing::info!(
            network = %network,
            strategy = ?providers.strategy,
            balance_providers = ?balances.provider_names(),
            transaction_providers = ?transactions.provider_names(),
            storage = ?config.storage.backend,
            history_capacity = providers.history_capacity,
            resolution_budget_secs = resolution_budget.as_secs(),
            "Wallet service ready"
        );

        Ok(Self::new(network, balances, transactions, provisioner).with_resolution_budget(resolution_budget))
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn provisioner(&self) -> &AddressProvisioner {
        &self.provisioner
    }

    /// Validate a raw address for the configured network. No I/O.
    pub fn check_address(&self, raw: &str) -> WalletResult<BitcoinAddress> {
        BitcoinAddress::parse(raw, self.network)
    }

    pub async fn balance(&self, raw: &str) -> WalletResult<Balance> {
        let address = self.check_address(raw)?;
        self.balances.resolve_balance(&address).await
    }

    pub async fn transactions(&self, raw: &str) -> WalletResult<Vec<TransactionRecord>> {
        let address = self.check_address(raw)?;
        self.transactions.resolve_transactions(&address).await
    }

    pub async fn provision(&self, user: &UserId) -> WalletResult<ProvisionedAddress> {
        self.provisioner.get_or_create_address(user).await
    }

    pub async fn reveal(&self, user: &UserId, key: &OneTimeKey, sink: &dyn KeyDisclosure) -> WalletResult<()> {
        self.provisioner.reveal_private_key_once(user, key, sink).await
    }

    /// Open the current user's wallet.
    ///
    /// When this call creates the wallet, the private key goes to `sink`
    /// before any provider is contacted. Provisioning and disclosure
    /// failures abort. Provider exhaustion, or running out of the resolution
    /// budget, is rendered as an `Unavailable` section; the caller refreshes
    /// by opening again.
    pub async fn open_wallet(
        &self,
        identity: &dyn IdentityProvider,
        sink: &dyn KeyDisclosure,
    ) -> WalletResult<WalletView> {
        let user = identity.current_user_id().ok_or(WalletError::NoIdentity)?;
        let provisioned = self.provision(&user).await?;
        let address = provisioned.address;

        let key_revealed = match provisioned.one_time_key {
            Some(key) => {
                self.reveal(&user, &key, sink).await?;
                true
            }
            None => self.provisioner.is_key_revealed(&user).await?,
        };

        let budget = self.resolution_budget;
        let (balance, transactions) = tokio::join!(
            within(budget, self.balances.resolve_balance(&address)),
            within(budget, self.transactions.resolve_transactions(&address)),
        );

        let balance = match balance {
            Ok(result) => result.into(),
            Err(budget) => {
                tracing::warn!(user = %user, address = %address, "Balance resolution ran out of budget");
                BalanceView::Unavailable {
                    failures: budget_exceeded(budget),
                }
            }
        };
        let transactions = match transactions {
            Ok(result) => result.into(),
            Err(budget) => {
                tracing::warn!(user = %user, address = %address, "Transaction resolution ran out of budget");
                TransactionsView::Unavailable {
                    failures: budget_exceeded(budget),
                }
            }
        };

        Ok(WalletView {
            user_id: user,
            format: address.format(),
            address,
            created: provisioned.created,
            key_revealed,
            balance,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ProviderError;
    use crate::config::ResolutionStrategy;
    use crate::identity::StaticIdentity;
    use crate::providers::{BalanceProvider, TransactionProvider};
    use crate::provisioning::{AddressGenerator, GeneratedAddress, PrivateKey, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Fixed {
        satoshis: Option<u64>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn new(satoshis: Option<u64>) -> Self {
            Self {
                satoshis,
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl BalanceProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch_balance(&self, _address: &BitcoinAddress) -> Result<u64, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.satoshis.ok_or(ProviderError::Status(503))
        }
    }

    struct NoTransactions;

    #[async_trait]
    impl TransactionProvider for NoTransactions {
        fn name(&self) -> &str {
            "none"
        }

        async fn fetch_transactions(&self, _address: &BitcoinAddress) -> Result<Vec<TransactionRecord>, ProviderError> {
            Ok(Vec::new())
        }
    }

    struct Generator;

    #[async_trait]
    impl AddressGenerator for Generator {
        fn name(&self) -> &str {
            "gen"
        }

        async fn create_address(&self) -> Result<GeneratedAddress, ProviderError> {
            Ok(GeneratedAddress {
                address: "1DEP8i3QJCsomS4BSMY2RpU1upv62aGvhD".to_string(),
                private_key: PrivateKey::new("k".to_string()),
            })
        }
    }

    /// Records each key along with how many balance lookups had started.
    #[derive(Default)]
    struct RecordingSink {
        balance_calls: Option<Arc<AtomicUsize>>,
        seen: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl KeyDisclosure for RecordingSink {
        async fn disclose(&self, _address: &BitcoinAddress, key: &PrivateKey) -> WalletResult<()> {
            let calls = self
                .balance_calls
                .as_ref()
                .map_or(0, |calls| calls.load(Ordering::SeqCst));
            self.seen.lock().unwrap().push((key.expose().to_string(), calls));
            Ok(())
        }
    }

    /// Memory store whose plain field writes fail.
    #[derive(Default)]
    struct FlagWriteFails(MemoryStore);

    #[async_trait]
    impl DocumentStore for FlagWriteFails {
        async fn get_field(&self, user: &UserId, field: &str) -> Result<Option<String>, StoreError> {
            self.0.get_field(user, field).await
        }

        async fn set_field(&self, _user: &UserId, _field: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("quota exceeded".to_string()))
        }

        async fn compare_and_set(
            &self,
            user: &UserId,
            field: &str,
            expected: Option<&str>,
            value: &str,
        ) -> Result<bool, StoreError> {
            self.0.compare_and_set(user, field, expected, value).await
        }
    }

    fn build(balance: Fixed, store: Arc<dyn DocumentStore>) -> WalletService {
        let timeout = Duration::from_millis(200);
        WalletService::new(
            Network::Mainnet,
            BalanceResolver::new(vec![Arc::new(balance)], timeout, ResolutionStrategy::Sequential),
            TransactionResolver::new(vec![Arc::new(NoTransactions)], timeout, ResolutionStrategy::Sequential),
            AddressProvisioner::new(store, Arc::new(Generator), Network::Mainnet, timeout),
        )
    }

    fn service(balance: Option<u64>) -> WalletService {
        build(Fixed::new(balance), Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_invalid_address_rejected_before_io() {
        let err = service(Some(1)).balance("hello").await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidAddressFormat(_)));
    }

    #[tokio::test]
    async fn test_open_wallet_requires_identity() {
        let sink = RecordingSink::default();
        let err = service(Some(1))
            .open_wallet(&StaticIdentity::signed_out(), &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::NoIdentity));
        assert!(sink.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_wallet_happy_path() {
        let service = service(Some(250_000_000));
        let sink = RecordingSink::default();
        let view = service
            .open_wallet(&StaticIdentity::signed_in("u1"), &sink)
            .await
            .unwrap();

        assert!(view.created);
        assert!(view.key_revealed);
        assert!(matches!(view.balance, BalanceView::Available { satoshis: 250_000_000, .. }));
        assert!(matches!(view.transactions, TransactionsView::Available { ref transactions } if transactions.is_empty()));

        let again = service
            .open_wallet(&StaticIdentity::signed_in("u1"), &sink)
            .await
            .unwrap();
        assert!(!again.created);
        assert!(again.key_revealed);
        assert_eq!(again.address, view.address);
        assert_eq!(sink.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_key_is_disclosed_before_any_provider_call() {
        let balance = Fixed::new(Some(1));
        let sink = RecordingSink {
            balance_calls: Some(balance.calls.clone()),
            ..Default::default()
        };
        let calls = balance.calls.clone();
        let service = build(balance, Arc::new(MemoryStore::new()));

        service
            .open_wallet(&StaticIdentity::signed_in("u1"), &sink)
            .await
            .unwrap();

        assert_eq!(*sink.seen.lock().unwrap(), vec![("k".to_string(), 0)]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolution_budget_keeps_the_view() {
        let mut balance = Fixed::new(Some(1));
        balance.delay = Duration::from_secs(30);
        let timeout = Duration::from_secs(60);
        let service = WalletService::new(
            Network::Mainnet,
            BalanceResolver::new(vec![Arc::new(balance)], timeout, ResolutionStrategy::Sequential),
            TransactionResolver::new(vec![Arc::new(NoTransactions)], timeout, ResolutionStrategy::Sequential),
            AddressProvisioner::new(Arc::new(MemoryStore::new()), Arc::new(Generator), Network::Mainnet, timeout),
        )
        .with_resolution_budget(Duration::from_millis(100));
        let sink = RecordingSink::default();

        let started = std::time::Instant::now();
        let view = service
            .open_wallet(&StaticIdentity::signed_in("u1"), &sink)
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(view.created);
        assert_eq!(sink.seen.lock().unwrap().len(), 1);
        match view.balance {
            BalanceView::Unavailable { ref failures } => assert!(failures[0].contains("budget of 100ms")),
            ref other => panic!("expected unavailable balance, got {:?}", other),
        }
        assert!(matches!(view.transactions, TransactionsView::Available { .. }));
    }

    #[tokio::test]
    async fn test_failed_flag_write_still_opens_wallet() {
        let service = build(Fixed::new(Some(5)), Arc::new(FlagWriteFails::default()));
        let sink = RecordingSink::default();

        let view = service
            .open_wallet(&StaticIdentity::signed_in("u1"), &sink)
            .await
            .unwrap();

        assert!(view.created);
        assert_eq!(sink.seen.lock().unwrap()[0].0, "k");
    }

    #[tokio::test]
    async fn test_exhaustion_renders_unavailable_not_zero() {
        let view = service(None)
            .open_wallet(&StaticIdentity::signed_in("u1"), &RecordingSink::default())
            .await
            .unwrap();

        let json = serde_json::to_value(&view.balance).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert!(json.get("btc").is_none());
        assert_eq!(json["failures"][0], "fixed: unexpected HTTP status 503");
    }
}
