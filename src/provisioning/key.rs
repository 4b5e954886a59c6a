//! Private key handling.
//!
//! # Responsibilities
//! - Hold a freshly generated private key in zeroizing memory
//! - Allow the key to be taken exactly once for disclosure
//!
//! # Design Decisions
//! - `Debug` never prints key material
//! - There is no `Serialize` impl, so a key cannot end up in the document store
//! - `OneTimeKey` is the only path from provisioning to a disclosure sink

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::chain::{BitcoinAddress, WalletResult};

/// Private key material returned by the address generator.
pub struct PrivateKey(Zeroizing<String>);

impl PrivateKey {
    pub fn new(secret: String) -> Self {
        Self(Zeroizing::new(secret))
    }

    /// Borrow the raw key. Callers must not log or persist the result.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// A private key that can be taken out once.
///
/// After `take` succeeds the slot is empty and the key is dropped (and zeroized)
/// by whoever took it.
pub struct OneTimeKey {
    address: BitcoinAddress,
    slot: Mutex<Option<PrivateKey>>,
}

impl OneTimeKey {
    pub fn new(address: BitcoinAddress, key: PrivateKey) -> Self {
        Self {
            address,
            slot: Mutex::new(Some(key)),
        }
    }

    /// The address this key controls.
    pub fn address(&self) -> &BitcoinAddress {
        &self.address
    }

    pub fn is_revealed(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_none()).unwrap_or(true)
    }

    /// Remove the key. Returns `None` on every call after the first.
    pub fn take(&self) -> Option<PrivateKey> {
        // A poisoned lock is treated as already revealed.
        self.slot.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl fmt::Debug for OneTimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneTimeKey")
            .field("address", &self.address.as_str())
            .field("revealed", &self.is_revealed())
            .finish()
    }
}

/// Where a private key is shown to its owner.
#[async_trait]
pub trait KeyDisclosure: Send + Sync {
    async fn disclose(&self, address: &BitcoinAddress, key: &PrivateKey) -> WalletResult<()>;
}
