//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM / Ctrl+C → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscriber's `wait` resolves
//!             → HTTP server stops accepting, drains in-flight requests, exits
//! ```
//!
//! # Design Decisions
//! - One coordinator per process, cloned into whoever needs to observe it
//! - A trigger that fires before a task subscribes is still observed

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{spawn_signal_handler, wait_for_signal};
