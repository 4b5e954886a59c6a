//! HTTP surface of the gateway.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, request ID, timeout, trace layers)
//!     → handlers.rs (parse path or bearer session, call WalletService)
//!     → error.rs (WalletError → status code + JSON body)
//!     → Send to client
//! ```
//!
//! # Routes
//! - `GET  /health`
//! - `GET  /addresses/{address}`: format check only
//! - `GET  /addresses/{address}/balance`
//! - `GET  /addresses/{address}/transactions`
//! - `POST /wallet`: open (and on first call create) the session user's wallet

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, HttpServer, X_REQUEST_ID};
