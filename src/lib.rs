//! Bitcoin wallet gateway library.
//!
//! Provisions one address per user and resolves balances and transactions
//! from several independent explorers with first-success-wins fallback.

// Core types
pub mod chain;
pub mod config;

// Wallet subsystems
pub mod identity;
pub mod providers;
pub mod provisioning;
pub mod resilience;
pub mod resolver;
pub mod service;

// Surfaces and cross-cutting concerns
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::WalletConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use service::WalletService;
