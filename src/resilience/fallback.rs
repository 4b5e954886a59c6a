//! First-success-wins provider fallback.
//!
//! # Strategies
//! - Sequential: attempts run one at a time in list order; the first success
//!   returns and later providers are never contacted
//! - Race: every attempt is polled at once; the first successful *response*
//!   wins regardless of list position and the rest are dropped
//!
//! In both strategies a failure (error or expired deadline) is logged and
//! collected, and only the exhaustion of every attempt is an error.

use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};

use crate::chain::{ProviderError, ProviderFailure};
use crate::config::ResolutionStrategy;
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;

/// One pending provider call. The future is lazy: nothing is sent until the
/// chain polls it.
pub struct Attempt<'a, T> {
    provider: &'a str,
    call: BoxFuture<'a, Result<T, ProviderError>>,
}

impl<'a, T> Attempt<'a, T> {
    pub fn new(provider: &'a str, call: BoxFuture<'a, Result<T, ProviderError>>) -> Self {
        Self { provider, call }
    }
}

/// A successful resolution and the failures that preceded it.
#[derive(Debug)]
pub struct Resolved<T> {
    pub provider: String,
    pub value: T,
    pub failures: Vec<ProviderFailure>,
}

/// Walks a list of attempts for one operation.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    operation: &'static str,
    timeout: Duration,
    strategy: ResolutionStrategy,
}

impl FallbackChain {
    pub fn new(operation: &'static str, timeout: Duration, strategy: ResolutionStrategy) -> Self {
        Self {
            operation,
            timeout,
            strategy,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Run the attempts and return the first success, or every failure.
    pub async fn run<'a, T>(&self, attempts: Vec<Attempt<'a, T>>) -> Result<Resolved<T>, Vec<ProviderFailure>>
    where
        T: Send + 'a,
    {
        match self.strategy {
            ResolutionStrategy::Sequential => self.run_sequential(attempts).await,
            ResolutionStrategy::Race => self.run_race(attempts).await,
        }
    }

    async fn run_sequential<'a, T>(&self, attempts: Vec<Attempt<'a, T>>) -> Result<Resolved<T>, Vec<ProviderFailure>> {
        let mut failures = Vec::new();

        for attempt in attempts {
            let start = Instant::now();
            let result = with_deadline(self.timeout, attempt.call).await;
            match self.observe(attempt.provider, result, start.elapsed(), &mut failures) {
                Some(value) => {
                    return Ok(Resolved {
                        provider: attempt.provider.to_string(),
                        value,
                        failures,
                    })
                }
                None => continue,
            }
        }

        Err(failures)
    }

    async fn run_race<'a, T>(&self, attempts: Vec<Attempt<'a, T>>) -> Result<Resolved<T>, Vec<ProviderFailure>>
    where
        T: Send + 'a,
    {
        let deadline = self.timeout;
        let mut pending: FuturesUnordered<_> = attempts
            .into_iter()
            .map(|attempt| async move {
                let start = Instant::now();
                let result = with_deadline(deadline, attempt.call).await;
                (attempt.provider, result, start.elapsed())
            })
            .collect();

        let mut failures = Vec::new();
        while let Some((provider, result, elapsed)) = pending.next().await {
            if let Some(value) = self.observe(provider, result, elapsed, &mut failures) {
                // dropping `pending` cancels the slower requests
                return Ok(Resolved {
                    provider: provider.to_string(),
                    value,
                    failures,
                });
            }
        }

        Err(failures)
    }

    fn observe<T>(
        &self,
        provider: &str,
        result: Result<T, ProviderError>,
        elapsed: Duration,
        failures: &mut Vec<ProviderFailure>,
    ) -> Option<T> {
        match result {
            Ok(value) => {
                metrics::record_provider_attempt(self.operation, provider, "success", elapsed);
                tracing::debug!(
                    operation = self.operation,
                    provider = %provider,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Provider answered"
                );
                Some(value)
            }
            Err(error) => {
                let outcome = match error {
                    ProviderError::Timeout(_) => "timeout",
                    _ => "error",
                };
                metrics::record_provider_attempt(self.operation, provider, outcome, elapsed);
                tracing::warn!(
                    operation = self.operation,
                    provider = %provider,
                    error = %error,
                    "Provider failed, trying next provider"
                );
                failures.push(ProviderFailure::new(provider, error));
                None
            }
        }
    }
}
