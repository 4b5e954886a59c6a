//! Metrics collection and exposition.
//!
//! # Metrics
//! - `wallet_provider_attempts_total` (counter): attempts by operation, provider, outcome
//! - `wallet_provider_attempt_duration_seconds` (histogram): per-attempt latency
//! - `wallet_resolutions_total` (counter): resolutions by operation, outcome
//! - `wallet_addresses_created_total` (counter): addresses generated and persisted
//!
//! # Design Decisions
//! - Outcome labels are a closed set (`success`, `error`, `timeout`, `exhausted`)
//! - Provider labels come from configuration, never from request input

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one provider attempt.
pub fn record_provider_attempt(operation: &'static str, provider: &str, outcome: &'static str, elapsed: Duration) {
    let provider = provider.to_string();
    counter!(
        "wallet_provider_attempts_total",
        "operation" => operation,
        "provider" => provider.clone(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!(
        "wallet_provider_attempt_duration_seconds",
        "operation" => operation,
        "provider" => provider
    )
    .record(elapsed.as_secs_f64());
}

/// Record the end result of a resolution (`success` or `exhausted`).
pub fn record_resolution(operation: &'static str, outcome: &'static str) {
    counter!("wallet_resolutions_total", "operation" => operation, "outcome" => outcome).increment(1);
}

pub fn record_address_created() {
    counter!("wallet_addresses_created_total").increment(1);
}
