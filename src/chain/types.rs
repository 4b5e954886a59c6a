//! Wallet-wide types and error definitions.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provisioning::store::StoreError;

/// Opaque identity of an application user, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A confirmed or pending transaction touching an address, as reported by a provider.
///
/// Records are read-only: they are fetched, merged by hash and handed to callers,
/// never written anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction hash (txid), unique per chain.
    pub hash: String,
    /// Total value moved by the transaction, in satoshis.
    pub total_value: u64,
    /// When the transaction was received (block time, or first seen if unconfirmed).
    pub received_at: DateTime<Utc>,
}

/// Why a single provider attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider did not answer within the per-attempt deadline.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The provider answered with a non-2xx status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// Connection, TLS or body transfer error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// A provider failure tagged with the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ProviderError,
}

impl ProviderFailure {
    pub fn new(provider: impl Into<String>, error: ProviderError) -> Self {
        Self {
            provider: provider.into(),
            error,
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors surfaced by the wallet core.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Address creation or persistence failed. The wallet cannot be used until retried.
    #[error("Provisioning error: {0}")]
    Provisioning(String),

    /// The candidate string is not a recognised address for the configured network.
    #[error("Invalid address format: {0:?}")]
    InvalidAddressFormat(String),

    /// Every configured provider failed for this operation.
    #[error("All {operation} providers failed: {}", join_failures(.failures))]
    AllProvidersExhausted {
        operation: &'static str,
        failures: Vec<ProviderFailure>,
    },

    /// The one-time private key disclosure has already happened.
    #[error("Private key has already been revealed")]
    KeyAlreadyRevealed,

    /// No signed-in user is available.
    #[error("No authenticated user")]
    NoIdentity,

    /// The document store failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;
