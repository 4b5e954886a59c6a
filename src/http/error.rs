//! Mapping of wallet errors onto HTTP responses.
//!
//! # Design Decisions
//! - Exhaustion is a 503 that lists every provider and its reason
//! - Storage details stay in the logs; the client sees a generic 500
//! - A missing or unknown session is a 401 with a `Bearer` challenge

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::chain::WalletError;

/// A `WalletError` on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub WalletError);

impl From<WalletError> for ApiError {
    fn from(error: WalletError) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            WalletError::InvalidAddressFormat(_) => StatusCode::BAD_REQUEST,
            WalletError::AllProvidersExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            WalletError::Provisioning(_) => StatusCode::BAD_GATEWAY,
            WalletError::NoIdentity => StatusCode::UNAUTHORIZED,
            WalletError::KeyAlreadyRevealed => StatusCode::CONFLICT,
            WalletError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.0 {
            WalletError::AllProvidersExhausted { operation, failures } => json!({
                "error": "providers_unavailable",
                "message": self.0.to_string(),
                "operation": operation,
                "failures": failures
                    .iter()
                    .map(|f| json!({ "provider": f.provider, "reason": f.error.to_string() }))
                    .collect::<Vec<_>>(),
            }),
            WalletError::InvalidAddressFormat(_) => json!({
                "error": "invalid_address",
                "message": self.0.to_string(),
            }),
            WalletError::Store(e) => {
                tracing::error!(error = %e, "Storage failure while serving request");
                json!({ "error": "internal", "message": "storage failure" })
            }
            other => json!({
                "error": "wallet_error",
                "message": other.to_string(),
            }),
        };

        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], Json(body)).into_response();
        }
        (status, Json(body)).into_response()
    }
}
