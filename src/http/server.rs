//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request ID, timeout, tracing)
//! - Serve on a listener until the shutdown coordinator fires
//!
//! # Routes
//! ```text
//! GET  /health
//! GET  /addresses/{address}                 format check, no I/O
//! GET  /addresses/{address}/balance
//! GET  /addresses/{address}/transactions
//! POST /wallet                              bearer session required
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderName;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::http::handlers;
use crate::identity::SessionAuthenticator;
use crate::lifecycle::Shutdown;
use crate::service::WalletService;

/// Request ID header, set on the request if absent and echoed on the response.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WalletService>,
    pub sessions: Arc<dyn SessionAuthenticator>,
}

/// HTTP server for the wallet gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServerConfig, service: Arc<WalletService>, sessions: Arc<dyn SessionAuthenticator>) -> Self {
        let state = AppState { service, sessions };
        let router = Self::build_router(Duration::from_secs(config.request_timeout_secs), state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_timeout: Duration, state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/health", get(handlers::health))
            .route("/addresses/{address}", get(handlers::check_address))
            .route("/addresses/{address}/balance", get(handlers::balance))
            .route("/addresses/{address}/transactions", get(handlers::transactions))
            .route("/wallet", post(handlers::open_wallet))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(request_timeout))
                    .layer(PropagateRequestIdLayer::new(request_id)),
            )
    }

    /// The router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` is triggered, then drain.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
