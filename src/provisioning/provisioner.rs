//! One wallet address per user.
//!
//! # Responsibilities
//! - Return the stored address or generate, validate and persist a new one
//! - Serialize concurrent provisioning of the same user
//! - Hand the one-time private key to a disclosure sink and record that it was shown
//!
//! # Data Flow
//! ```text
//! get_or_create_address(user)
//!     → per-user lock
//!     → store.get_field(walletAddress)      (valid → created = false)
//!     → generator.create_address            (deadline)
//!     → store.compare_and_set(walletAddress) (lost → reread the winner)
//!     → ProvisionedAddress { one_time_key }
//! ```
//!
//! # Design Decisions
//! - The private key never reaches the store; only the address and the
//!   revealed flag are written
//! - Once the sink has the key, a failed flag write is logged and the reveal
//!   still succeeds, since the key cannot be taken back

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::chain::{BitcoinAddress, Network, UserId, WalletError, WalletResult};
use crate::observability::metrics;
use crate::provisioning::key::{KeyDisclosure, OneTimeKey};
use crate::provisioning::store::DocumentStore;
use crate::provisioning::AddressGenerator;
use crate::resilience::with_deadline;

/// Field holding the user's wallet address.
pub const WALLET_ADDRESS_FIELD: &str = "walletAddress";

/// Field set to `"true"` once the private key has been shown.
pub const PRIVATE_KEY_REVEALED_FIELD: &str = "privateKeyRevealed";

/// Result of `get_or_create_address`.
#[derive(Debug)]
pub struct ProvisionedAddress {
    pub address: BitcoinAddress,
    /// Whether this call generated and persisted the address.
    pub created: bool,
    /// Present only when `created` is true.
    pub one_time_key: Option<OneTimeKey>,
}

/// Guarantees one wallet address per user.
pub struct AddressProvisioner {
    store: Arc<dyn DocumentStore>,
    generator: Arc<dyn AddressGenerator>,
    network: Network,
    timeout: Duration,
    in_flight: DashMap<UserId, Arc<Mutex<()>>>,
}

impl AddressProvisioner {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        generator: Arc<dyn AddressGenerator>,
        network: Network,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            network,
            timeout,
            in_flight: DashMap::new(),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Return the user's address, generating and persisting one on first use.
    ///
    /// Concurrent calls for the same user are serialized; the later callers
    /// observe the address written by the first.
    pub async fn get_or_create_address(&self, user: &UserId) -> WalletResult<ProvisionedAddress> {
        let lock = self.in_flight.entry(user.clone()).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            self.provision(user).await
        };
        drop(lock);
        self.in_flight.remove_if(user, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn provision(&self, user: &UserId) -> WalletResult<ProvisionedAddress> {
        let stored = self
            .store
            .get_field(user, WALLET_ADDRESS_FIELD)
            .await
            .map_err(|e| WalletError::Provisioning(format!("address lookup failed: {}", e)))?;

        if let Some(raw) = stored.as_deref() {
            match BitcoinAddress::parse(raw, self.network) {
                Ok(address) => {
                    tracing::debug!(user = %user, address = %address, "Wallet address found");
                    return Ok(ProvisionedAddress {
                        address,
                        created: false,
                        one_time_key: None,
                    });
                }
                Err(_) => {
                    tracing::warn!(user = %user, stored = %raw, "Stored wallet address is malformed, regenerating");
                }
            }
        }

        let generated = with_deadline(self.timeout, self.generator.create_address())
            .await
            .map_err(|e| {
                tracing::error!(user = %user, generator = %self.generator.name(), error = %e, "Address generation failed");
                WalletError::Provisioning(format!("{}: {}", self.generator.name(), e))
            })?;

        let address = BitcoinAddress::parse(&generated.address, self.network).map_err(|_| {
            WalletError::Provisioning(format!(
                "{} returned an invalid {} address",
                self.generator.name(),
                self.network
            ))
        })?;

        let written = self
            .store
            .compare_and_set(user, WALLET_ADDRESS_FIELD, stored.as_deref(), address.as_str())
            .await
            .map_err(|e| WalletError::Provisioning(format!("address write failed: {}", e)))?;

        if written {
            metrics::record_address_created();
            tracing::info!(user = %user, address = %address, format = ?address.format(), "Wallet address created");
            return Ok(ProvisionedAddress {
                one_time_key: Some(OneTimeKey::new(address.clone(), generated.private_key)),
                address,
                created: true,
            });
        }

        // Another writer got there first; this key is dropped without being shown.
        drop(generated);
        tracing::warn!(user = %user, "Concurrent provisioning detected, using the stored address");

        let winner = self
            .store
            .get_field(user, WALLET_ADDRESS_FIELD)
            .await
            .map_err(|e| WalletError::Provisioning(format!("address lookup failed: {}", e)))?
            .ok_or_else(|| WalletError::Provisioning("stored address vanished after write conflict".to_string()))?;
        let address = BitcoinAddress::parse(&winner, self.network)
            .map_err(|_| WalletError::Provisioning("concurrent writer stored an invalid address".to_string()))?;

        Ok(ProvisionedAddress {
            address,
            created: false,
            one_time_key: None,
        })
    }

    /// Hand the key to `sink` and mark it revealed on the user's record.
    ///
    /// A second call with the same key fails with `KeyAlreadyRevealed` and
    /// does not touch the sink. A failure to write the revealed flag after
    /// the sink accepted the key is logged, not returned.
    pub async fn reveal_private_key_once(
        &self,
        user: &UserId,
        key: &OneTimeKey,
        sink: &dyn KeyDisclosure,
    ) -> WalletResult<()> {
        let secret = key.take().ok_or(WalletError::KeyAlreadyRevealed)?;
        sink.disclose(key.address(), &secret).await?;
        drop(secret);

        if let Err(e) = self.store.set_field(user, PRIVATE_KEY_REVEALED_FIELD, "true").await {
            tracing::error!(
                user = %user,
                address = %key.address(),
                error = %e,
                "Private key disclosed but the revealed flag could not be stored"
            );
            return Ok(());
        }
        tracing::info!(user = %user, address = %key.address(), "Private key disclosed");
        Ok(())
    }

    /// Whether the user's record says the key was already shown.
    pub async fn is_key_revealed(&self, user: &UserId) -> WalletResult<bool> {
        let flag = self.store.get_field(user, PRIVATE_KEY_REVEALED_FIELD).await?;
        Ok(flag.as_deref() == Some("true"))
    }
}
