//! Satoshi/BTC conversion.

use serde::Serialize;

/// Satoshis per bitcoin.
pub const SATS_PER_BTC: u64 = 100_000_000;

/// Convert a satoshi amount to BTC for display.
///
/// Precision is that of `f64`; amounts are never fed back into transfers.
pub fn sats_to_btc(sats: u64) -> f64 {
    sats as f64 / SATS_PER_BTC as f64
}

/// Convert a BTC amount back to satoshis, rounding to the nearest unit.
///
/// Negative and non-finite inputs map to zero.
pub fn btc_to_sats(btc: f64) -> u64 {
    if !btc.is_finite() || btc <= 0.0 {
        return 0;
    }
    (btc * SATS_PER_BTC as f64).round() as u64
}

/// Balance of an address as resolved from one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    /// Confirmed balance in satoshis.
    pub satoshis: u64,
    /// Name of the provider that answered.
    pub provider: String,
}

impl Balance {
    pub fn new(satoshis: u64, provider: impl Into<String>) -> Self {
        Self {
            satoshis,
            provider: provider.into(),
        }
    }

    /// Balance in BTC.
    pub fn btc(&self) -> f64 {
        sats_to_btc(self.satoshis)
    }
}
