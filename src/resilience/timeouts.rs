//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap every outbound provider call with a deadline
//! - Report an expired deadline as an ordinary provider failure
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped (cancelled) on expiry
//! - Timeout errors are distinct from transport errors

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::chain::ProviderError;

/// Run `fut` with a deadline, mapping expiry to `ProviderError::Timeout`.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(deadline)),
    }
}
