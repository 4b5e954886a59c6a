//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Resolver request:
//!     → fallback.rs (walk the provider chain, first success wins)
//!     → timeouts.rs (enforce a deadline on each attempt)
//!     → On failure: log, record, move to the next provider
//!     → All failed: hand every failure back to the caller
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No automatic retries: a failed chain is retried only when the caller asks again
//! - Provider order is static; no reordering by latency or past success

pub mod fallback;
pub mod timeouts;

pub use fallback::{Attempt, FallbackChain, Resolved};
pub use timeouts::with_deadline;
