//! Multi-source balance and transaction resolution.
//!
//! # Data Flow
//! ```text
//! BitcoinAddress (already validated)
//!     → FallbackChain over the configured provider list
//!         → provider 1 ✗ (logged, collected)
//!         → provider 2 ✓ → stop
//!     → normalize (satoshis → Balance / merged transaction history)
//!     → caller
//!
//! every provider failed → WalletError::AllProvidersExhausted { failures }
//! ```
//!
//! # Design Decisions
//! - Provider order is fixed at construction and never reordered at runtime
//! - Exhaustion is an error, never a zero balance or an empty list
//! - No automatic retry; calling again is the retry

pub mod balance;
pub mod transactions;

pub use balance::BalanceResolver;
pub use transactions::TransactionResolver;
