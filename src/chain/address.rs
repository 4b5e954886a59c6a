//! Address validation.
//!
//! # Responsibilities
//! - Reject syntactically invalid addresses before any network round-trip
//! - Classify accepted addresses by encoding
//!
//! # Design Decisions
//! - Fixed pattern match, no checksum verification and no I/O
//! - Patterns err on the side of accepting: a false positive costs one doomed
//!   provider request, a false negative locks a user out of their funds
//! - Bech32m (taproot, `bc1p…`) fits the segwit pattern and is accepted
//! - Bech32 strings must be single-case; they are stored lowercase

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

use crate::chain::types::{WalletError, WalletResult};

static MAINNET_LEGACY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[13][1-9A-HJ-NP-Za-km-z]{25,34}$").expect("valid regex"));
static MAINNET_SEGWIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^bc1[02-9ac-hj-np-z]{8,87}$").expect("valid regex"));
static TESTNET_LEGACY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[mn2][1-9A-HJ-NP-Za-km-z]{25,34}$").expect("valid regex"));
static TESTNET_SEGWIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^tb1[02-9ac-hj-np-z]{8,87}$").expect("valid regex"));

/// Bitcoin network the gateway operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    fn legacy_pattern(self) -> &'static Regex {
        match self {
            Network::Mainnet => &MAINNET_LEGACY,
            Network::Testnet => &TESTNET_LEGACY,
        }
    }

    fn segwit_pattern(self) -> &'static Regex {
        match self {
            Network::Mainnet => &MAINNET_SEGWIT,
            Network::Testnet => &TESTNET_SEGWIT,
        }
    }

    /// Human-readable part of native segwit addresses.
    pub const fn bech32_hrp(self) -> &'static str {
        match self {
            Network::Mainnet => "bc1",
            Network::Testnet => "tb1",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Testnet => f.write_str("testnet"),
        }
    }
}

/// Encoding family of an accepted address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressFormat {
    /// Base58 pay-to-pubkey-hash (`1…`, `m…`, `n…`).
    P2pkh,
    /// Base58 pay-to-script-hash (`3…`, `2…`).
    P2sh,
    /// Bech32 witness version 0 (`bc1q…`).
    SegwitV0,
    /// Bech32m witness version 1 (`bc1p…`).
    Taproot,
    /// Any other witness version.
    SegwitOther,
}

/// Returns true if `candidate` matches one of the known address patterns for `network`.
pub fn is_valid_address(candidate: &str, network: Network) -> bool {
    classify(candidate, network).is_some()
}

fn classify(candidate: &str, network: Network) -> Option<AddressFormat> {
    if network.legacy_pattern().is_match(candidate) {
        return match candidate.as_bytes()[0] {
            b'3' | b'2' => Some(AddressFormat::P2sh),
            _ => Some(AddressFormat::P2pkh),
        };
    }

    let is_lower = candidate == candidate.to_ascii_lowercase();
    let is_upper = candidate == candidate.to_ascii_uppercase();
    if !is_lower && !is_upper {
        return None;
    }
    let lowered = candidate.to_ascii_lowercase();
    if !network.segwit_pattern().is_match(&lowered) {
        return None;
    }
    match lowered.as_bytes()[network.bech32_hrp().len()] {
        b'q' => Some(AddressFormat::SegwitV0),
        b'p' => Some(AddressFormat::Taproot),
        _ => Some(AddressFormat::SegwitOther),
    }
}

/// An address that passed validation for a specific network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitcoinAddress {
    value: String,
    format: AddressFormat,
    network: Network,
}

impl BitcoinAddress {
    /// Validate and wrap a candidate address.
    ///
    /// Surrounding whitespace is ignored. Bech32 addresses are normalized to lowercase.
    pub fn parse(candidate: &str, network: Network) -> WalletResult<Self> {
        let trimmed = candidate.trim();
        let format = classify(trimmed, network)
            .ok_or_else(|| WalletError::InvalidAddressFormat(trimmed.to_string()))?;

        let value = match format {
            AddressFormat::P2pkh | AddressFormat::P2sh => trimmed.to_string(),
            _ => trimmed.to_ascii_lowercase(),
        };

        Ok(Self {
            value,
            format,
            network,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn format(&self) -> AddressFormat {
        self.format
    }

    pub fn network(&self) -> Network {
        self.network
    }
}

impl fmt::Display for BitcoinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl Serialize for BitcoinAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}
