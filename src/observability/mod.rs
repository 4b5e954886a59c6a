//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! resolver / provisioner / http handlers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty for development, JSON for log aggregation)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Provider failures are logged at `warn` with provider name and reason
//! - Private keys and API tokens never reach a log field
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
