//! Provider fallback against mock explorers over real HTTP.

mod common;

use std::sync::Arc;
use std::time::Duration;

use btc_wallet_gateway::chain::{BitcoinAddress, Network, ProviderError, WalletError};
use btc_wallet_gateway::config::{ProviderConfig, ProviderKind, ResolutionStrategy, StorageBackend, WalletConfig};
use btc_wallet_gateway::providers::http::build_client;
use btc_wallet_gateway::providers::{BalanceProvider, BlockchainInfoProvider, EsploraProvider};
use btc_wallet_gateway::resolver::BalanceResolver;
use btc_wallet_gateway::WalletService;

use common::{esplora_address_body, start_hung_backend, start_mock_backend, start_programmable_backend};

const GENESIS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

fn config_with(balance: Vec<ProviderConfig>, transactions: Vec<ProviderConfig>) -> WalletConfig {
    let mut config = WalletConfig::default();
    config.providers.timeout_secs = 2;
    config.providers.balance = balance;
    config.providers.transactions = transactions;
    config.storage.backend = StorageBackend::Memory;
    config
}

#[tokio::test]
async fn test_balance_falls_through_to_second_provider() {
    let blockchain_info = start_mock_backend(500, "oops").await;
    let blockstream = start_programmable_backend(|_, target| async move {
        assert_eq!(target, format!("/address/{}", GENESIS));
        (200, esplora_address_body(250_000_000, 100_000_000))
    })
    .await;
    let mempool = start_mock_backend(200, "{}").await;

    let config = config_with(
        vec![
            ProviderConfig::new(ProviderKind::BlockchainInfo).with_base_url(blockchain_info.url()),
            ProviderConfig::new(ProviderKind::Blockstream).with_base_url(blockstream.url()),
            ProviderConfig::new(ProviderKind::MempoolSpace).with_base_url(mempool.url()),
        ],
        vec![ProviderConfig::new(ProviderKind::BlockchainInfo).with_base_url(blockchain_info.url())],
    );
    let service = WalletService::from_config(&config).unwrap();

    let balance = service.balance(GENESIS).await.unwrap();
    assert_eq!(balance.satoshis, 150_000_000);
    assert_eq!(balance.btc(), 1.5);
    assert_eq!(balance.provider, "blockstream");

    assert_eq!(blockchain_info.hits(), 1);
    assert_eq!(blockstream.hits(), 1);
    assert_eq!(mempool.hits(), 0, "providers after the first success are never called");
}

#[tokio::test]
async fn test_plain_text_balance() {
    let blockchain_info = start_programmable_backend(|_, target| async move {
        assert_eq!(target, format!("/q/addressbalance/{}", GENESIS));
        (200, "5000000000".to_string())
    })
    .await;

    let config = config_with(
        vec![ProviderConfig::new(ProviderKind::BlockchainInfo).with_base_url(blockchain_info.url())],
        vec![ProviderConfig::new(ProviderKind::BlockchainInfo).with_base_url(blockchain_info.url())],
    );
    let balance = WalletService::from_config(&config)
        .unwrap()
        .balance(GENESIS)
        .await
        .unwrap();
    assert_eq!(balance.btc(), 50.0);
}

#[tokio::test]
async fn test_all_providers_failing_is_exhaustion() {
    let a = start_mock_backend(503, "").await;
    let b = start_mock_backend(200, "not json").await;
    let c = start_mock_backend(200, r#"{"chain_stats":{"funded_txo_sum":1,"spent_txo_sum":5}}"#).await;

    let config = config_with(
        vec![
            ProviderConfig::new(ProviderKind::BlockchainInfo).with_base_url(a.url()),
            ProviderConfig::new(ProviderKind::Blockstream).with_base_url(b.url()),
            ProviderConfig::new(ProviderKind::MempoolSpace).with_base_url(c.url()),
        ],
        vec![ProviderConfig::new(ProviderKind::BlockchainInfo).with_base_url(a.url())],
    );

    let err = WalletService::from_config(&config)
        .unwrap()
        .balance(GENESIS)
        .await
        .unwrap_err();

    match err {
        WalletError::AllProvidersExhausted { operation, failures } => {
            assert_eq!(operation, "balance");
            assert_eq!(failures.len(), 3);
            assert_eq!(failures[0].error, ProviderError::Status(503));
            assert!(matches!(failures[1].error, ProviderError::Malformed(_)));
            // spent > funded cannot be a balance
            assert!(matches!(failures[2].error, ProviderError::Malformed(_)));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_hung_provider_is_abandoned_after_timeout() {
    let hung = start_hung_backend().await;
    let healthy = start_mock_backend(200, "42").await;
    let client = build_client(Duration::from_secs(1)).unwrap();

    let providers: Vec<Arc<dyn BalanceProvider>> = vec![
        Arc::new(EsploraProvider::new("hung", hung.url(), client.clone())),
        Arc::new(BlockchainInfoProvider::new("healthy", healthy.url(), client)),
    ];
    let resolver = BalanceResolver::new(providers, Duration::from_millis(300), ResolutionStrategy::Sequential);
    let address = BitcoinAddress::parse(GENESIS, Network::Mainnet).unwrap();

    let started = std::time::Instant::now();
    let balance = resolver.resolve_balance(&address).await.unwrap();
    assert_eq!(balance.provider, "healthy");
    assert_eq!(balance.satoshis, 42);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_race_returns_fastest_success() {
    let slow = start_programmable_backend(|_, _| async {
        tokio::time::sleep(Duration::from_millis(400)).await;
        (200, "1".to_string())
    })
    .await;
    let fast = start_mock_backend(200, "2").await;

    let mut config = config_with(
        vec![
            ProviderConfig::new(ProviderKind::BlockchainInfo)
                .with_name("slow")
                .with_base_url(slow.url()),
            ProviderConfig::new(ProviderKind::BlockchainInfo)
                .with_name("fast")
                .with_base_url(fast.url()),
        ],
        vec![ProviderConfig::new(ProviderKind::BlockchainInfo).with_base_url(fast.url())],
    );
    config.providers.strategy = ResolutionStrategy::Race;

    let balance = WalletService::from_config(&config)
        .unwrap()
        .balance(GENESIS)
        .await
        .unwrap();
    assert_eq!(balance.provider, "fast");
    assert_eq!(balance.satoshis, 2);
}

#[tokio::test]
async fn test_transactions_merge_across_providers() {
    let blockcypher = start_programmable_backend(|_, target| async move {
        assert!(target.starts_with(&format!("/addrs/{}/full", GENESIS)));
        (
            200,
            r#"{"txs":[
                {"hash":"aaa","total":1000,"received":"2024-01-02T00:00:00Z"},
                {"hash":"bbb","total":2000,"received":"2024-01-01T00:00:00Z"}
            ]}"#
            .to_string(),
        )
    })
    .await;
    // Fails on the first call and answers afterwards.
    let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let blockcypher_calls = calls.clone();
    let flaky = start_programmable_backend(move |_, _| {
        let n = blockcypher_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        async move {
            if n == 0 {
                (500, String::new())
            } else {
                (
                    200,
                    r#"{"txs":[
                        {"hash":"bbb","time":1704067200,"out":[{"value":2000}]},
                        {"hash":"ccc","time":1704240000,"out":[{"value":100},{"value":200}]}
                    ]}"#
                    .to_string(),
                )
            }
        }
    })
    .await;

    // First call: flaky (blockchain_info) fails, blockcypher answers.
    // Second call: flaky answers.
    let config = config_with(
        vec![ProviderConfig::new(ProviderKind::BlockchainInfo).with_base_url(flaky.url())],
        vec![
            ProviderConfig::new(ProviderKind::BlockchainInfo).with_base_url(flaky.url()),
            ProviderConfig::new(ProviderKind::Blockcypher).with_base_url(blockcypher.url()),
        ],
    );
    let service = WalletService::from_config(&config).unwrap();

    let first = service.transactions(GENESIS).await.unwrap();
    let hashes: Vec<_> = first.iter().map(|t| t.hash.clone()).collect();
    assert_eq!(hashes, vec!["aaa", "bbb"]);

    let second = service.transactions(GENESIS).await.unwrap();
    let hashes: Vec<_> = second.iter().map(|t| t.hash.clone()).collect();
    assert_eq!(hashes, vec!["ccc", "aaa", "bbb"]);
    assert_eq!(second[0].total_value, 300);
    assert_eq!(blockcypher.hits(), 1);
}

#[tokio::test]
async fn test_invalid_address_makes_no_request() {
    let backend = start_mock_backend(200, "1").await;
    let config = config_with(
        vec![ProviderConfig::new(ProviderKind::BlockchainInfo).with_base_url(backend.url())],
        vec![ProviderConfig::new(ProviderKind::BlockchainInfo).with_base_url(backend.url())],
    );
    let service = WalletService::from_config(&config).unwrap();

    assert!(matches!(
        service.balance("hello").await,
        Err(WalletError::InvalidAddressFormat(_))
    ));
    assert!(matches!(
        service.transactions("bc1qINVALID").await,
        Err(WalletError::InvalidAddressFormat(_))
    ));
    assert_eq!(backend.hits(), 0);
}
