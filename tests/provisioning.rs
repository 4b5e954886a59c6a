//! Wallet provisioning against a mock address API and a file-backed store.

mod common;

use std::sync::Mutex;

use async_trait::async_trait;
use btc_wallet_gateway::chain::{BitcoinAddress, UserId, WalletError, WalletResult};
use btc_wallet_gateway::config::{ProviderConfig, ProviderKind, StorageBackend, WalletConfig};
use btc_wallet_gateway::identity::StaticIdentity;
use btc_wallet_gateway::provisioning::{KeyDisclosure, PrivateKey, WALLET_ADDRESS_FIELD};
use btc_wallet_gateway::WalletService;

use common::{keypair_body, start_mock_backend, start_programmable_backend, MockBackend};

const NEW_ADDRESS: &str = "1DEP8i3QJCsomS4BSMY2RpU1upv62aGvhD";

#[derive(Default)]
struct CollectingSink {
    keys: Mutex<Vec<String>>,
}

#[async_trait]
impl KeyDisclosure for CollectingSink {
    async fn disclose(&self, _address: &BitcoinAddress, key: &PrivateKey) -> WalletResult<()> {
        self.keys.lock().unwrap().push(key.expose().to_string());
        Ok(())
    }
}

async fn address_api() -> MockBackend {
    start_programmable_backend(|method, target| async move {
        assert_eq!(method, "POST");
        assert!(target.starts_with("/addrs"));
        (201, keypair_body(NEW_ADDRESS))
    })
    .await
}

fn file_config(api: &MockBackend, path: &std::path::Path) -> WalletConfig {
    let mut config = WalletConfig::default();
    config.address_api.base_url = Some(api.url());
    config.address_api.token_env = None;
    config.storage.backend = StorageBackend::File;
    config.storage.path = Some(path.display().to_string());
    config
}

fn memory_config(api: &MockBackend) -> WalletConfig {
    let mut config = WalletConfig::default();
    config.address_api.base_url = Some(api.url());
    config.storage.backend = StorageBackend::Memory;
    config
}

#[tokio::test]
async fn test_provision_once_and_persist_only_the_address() {
    let api = address_api().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wallets.json");
    let user = UserId::from("alice");

    {
        let service = WalletService::from_config(&file_config(&api, &path)).unwrap();

        let first = service.provision(&user).await.unwrap();
        assert!(first.created);
        assert_eq!(first.address.as_str(), NEW_ADDRESS);

        let sink = CollectingSink::default();
        let key = first.one_time_key.unwrap();
        service.reveal(&user, &key, &sink).await.unwrap();
        assert!(matches!(
            service.reveal(&user, &key, &sink).await,
            Err(WalletError::KeyAlreadyRevealed)
        ));
        assert_eq!(sink.keys.lock().unwrap().len(), 1);

        let second = service.provision(&user).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.address, first.address);
    }

    // A fresh process over the same file reuses the stored address.
    let service = WalletService::from_config(&file_config(&api, &path)).unwrap();
    let again = service.provision(&user).await.unwrap();
    assert!(!again.created);
    assert_eq!(again.address.as_str(), NEW_ADDRESS);
    assert!(service.provisioner().is_key_revealed(&user).await.unwrap());
    assert_eq!(api.hits(), 1);

    let document = std::fs::read_to_string(&path).unwrap();
    assert!(document.contains(WALLET_ADDRESS_FIELD));
    assert!(document.contains(NEW_ADDRESS));
    assert!(!document.contains("81ec79d2fa6c3f7e"), "private key must never be persisted");
}

#[tokio::test]
async fn test_concurrent_opens_generate_one_address() {
    let api = address_api().await;
    let dir = tempfile::tempdir().unwrap();
    let service = std::sync::Arc::new(
        WalletService::from_config(&file_config(&api, &dir.path().join("w.json"))).unwrap(),
    );

    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.provision(&UserId::from("bob")).await })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        if task.await.unwrap().unwrap().created {
            created += 1;
        }
    }
    assert_eq!(created, 1);
    assert_eq!(api.hits(), 1);
}

#[tokio::test]
async fn test_address_api_failure_is_provisioning_error() {
    let api = start_mock_backend(429, r#"{"error":"Limits reached."}"#).await;
    let service = WalletService::from_config(&memory_config(&api)).unwrap();
    let sink = CollectingSink::default();

    let err = service
        .open_wallet(&StaticIdentity::signed_in("carol"), &sink)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Provisioning(ref msg) if msg.contains("429")));
    assert!(sink.keys.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_address_api_without_address_field() {
    let api = start_mock_backend(201, r#"{"private":"abc","public":"def"}"#).await;

    let err = WalletService::from_config(&memory_config(&api))
        .unwrap()
        .provision(&UserId::from("dave"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Provisioning(ref msg) if msg.contains("no address")));
}

#[tokio::test]
async fn test_default_storage_keeps_one_address_across_restarts() {
    let api = address_api().await;
    let dir = tempfile::tempdir().unwrap();
    let user = UserId::from("alice");

    // Only the location moves; the backend stays at its default.
    let mut config = WalletConfig::default();
    config.address_api.base_url = Some(api.url());
    config.address_api.token_env = None;
    config.storage.path = Some(dir.path().join("data").join("wallets.json").display().to_string());

    let first = WalletService::from_config(&config).unwrap().provision(&user).await.unwrap();
    let second = WalletService::from_config(&config).unwrap().provision(&user).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(second.address, first.address);
    assert_eq!(api.hits(), 1);
}

#[tokio::test]
async fn test_open_wallet_reports_earlier_reveal() {
    let api = address_api().await;
    let dir = tempfile::tempdir().unwrap();
    let down = start_mock_backend(500, "").await;
    let mut config = file_config(&api, &dir.path().join("wallets.json"));
    config.providers.balance = vec![ProviderConfig::new(ProviderKind::Blockstream).with_base_url(down.url())];
    config.providers.transactions = vec![ProviderConfig::new(ProviderKind::Blockcypher).with_base_url(down.url())];
    let identity = StaticIdentity::signed_in("erin");
    let sink = CollectingSink::default();

    let first = WalletService::from_config(&config)
        .unwrap()
        .open_wallet(&identity, &sink)
        .await
        .unwrap();
    assert!(first.created);
    assert!(first.key_revealed);

    let reopened = WalletService::from_config(&config)
        .unwrap()
        .open_wallet(&identity, &sink)
        .await
        .unwrap();
    assert!(!reopened.created);
    assert!(reopened.key_revealed);
    assert_eq!(*sink.keys.lock().unwrap(), vec!["81ec79d2fa6c3f7e".to_string()]);
}
