//! Wallet address provisioning.
//!
//! # Data Flow
//! ```text
//! UserId
//!     → store lookup ("walletAddress")
//!     → [absent or malformed] AddressGenerator::create_address (bounded by timeout)
//!     → validate returned address
//!     → compare_and_set against the value that was read
//!     → ProvisionedAddress { address, created, one_time_key }
//!     → reveal_private_key_once → KeyDisclosure sink → "privateKeyRevealed" = "true"
//! ```
//!
//! # Design Decisions
//! - Only the address is persisted; the private key lives in a `OneTimeKey`
//! - One generation per user per process (single-flight), and across
//!   processes the compare-and-set decides the winner

pub mod key;
pub mod provisioner;
pub mod store;

use async_trait::async_trait;

use crate::chain::ProviderError;

pub use key::{KeyDisclosure, OneTimeKey, PrivateKey};
pub use provisioner::{AddressProvisioner, ProvisionedAddress, PRIVATE_KEY_REVEALED_FIELD, WALLET_ADDRESS_FIELD};
pub use store::{DocumentStore, JsonFileStore, MemoryStore, StoreError};

/// An address and its key, straight from the generation API.
#[derive(Debug)]
pub struct GeneratedAddress {
    pub address: String,
    pub private_key: PrivateKey,
}

/// Remote address-generation API.
#[async_trait]
pub trait AddressGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn create_address(&self) -> Result<GeneratedAddress, ProviderError>;
}
