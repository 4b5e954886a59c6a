//! Bitcoin domain types shared by every subsystem.
//!
//! # Data Flow
//! ```text
//! raw user input
//!     → address.rs (pattern validation, BitcoinAddress newtype)
//!     → providers (satoshi amounts, transaction records)
//!     → units.rs (satoshi → BTC normalization)
//!     → callers (Balance, TransactionRecord)
//! ```
//!
//! # Design Decisions
//! - Addresses are validated once at the boundary; everything downstream takes `&BitcoinAddress`
//! - Amounts travel as integer satoshis and are converted to BTC only for display
//! - Errors are typed; provider-level failures never leak past the resolvers

pub mod address;
pub mod types;
pub mod units;

pub use address::{is_valid_address, AddressFormat, BitcoinAddress, Network};
pub use types::{
    ProviderError, ProviderFailure, TransactionRecord, UserId, WalletError, WalletResult,
};
pub use units::{btc_to_sats, sats_to_btc, Balance, SATS_PER_BTC};
