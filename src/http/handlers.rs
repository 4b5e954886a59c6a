//! Request handlers.
//!
//! Address routes are public and stateless. The wallet route reads the user
//! from the bearer session and is the only response that can carry a
//! private key.

use std::sync::Mutex;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use zeroize::Zeroizing;

use crate::chain::{BitcoinAddress, WalletResult};
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::identity::BearerIdentity;
use crate::provisioning::{KeyDisclosure, PrivateKey};
use crate::service::WalletView;

/// Captures the private key so it can be returned once in the creation response.
#[derive(Default)]
struct ResponseDisclosure {
    key: Mutex<Option<Zeroizing<String>>>,
}

#[async_trait]
impl KeyDisclosure for ResponseDisclosure {
    async fn disclose(&self, _address: &BitcoinAddress, key: &PrivateKey) -> WalletResult<()> {
        if let Ok(mut slot) = self.key.lock() {
            *slot = Some(Zeroizing::new(key.expose().to_string()));
        }
        Ok(())
    }
}

impl ResponseDisclosure {
    fn into_key(self) -> Option<Zeroizing<String>> {
        self.key.into_inner().ok().flatten()
    }
}

#[derive(Serialize)]
struct WalletResponse<'a> {
    #[serde(flatten)]
    wallet: &'a WalletView,
    #[serde(skip_serializing_if = "Option::is_none")]
    private_key: Option<&'a str>,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "network": state.service.network(),
    }))
}

pub async fn check_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Response, ApiError> {
    let address = state.service.check_address(&address)?;
    Ok(Json(json!({
        "address": address,
        "valid": true,
        "format": address.format(),
        "network": address.network(),
    }))
    .into_response())
}

pub async fn balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Response, ApiError> {
    let balance = state.service.balance(&address).await?;
    Ok(Json(json!({
        "address": address.trim(),
        "satoshis": balance.satoshis,
        "btc": balance.btc(),
        "provider": balance.provider,
    }))
    .into_response())
}

pub async fn transactions(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Response, ApiError> {
    let transactions = state.service.transactions(&address).await?;
    Ok(Json(json!({
        "address": address.trim(),
        "count": transactions.len(),
        "transactions": transactions,
    }))
    .into_response())
}

/// Token of an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Open the session user's wallet, creating it on first call.
///
/// The creation response (201) is the only place the private key ever
/// appears; every later call answers 200 without it. The key is captured
/// before balances are resolved, and resolution is bounded so the response
/// is written before the request timeout.
pub async fn open_wallet(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let identity = BearerIdentity::new(state.sessions.as_ref(), bearer_token(&headers));
    let sink = ResponseDisclosure::default();
    let view = state.service.open_wallet(&identity, &sink).await?;
    let secret = sink.into_key();

    let status = if view.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(WalletResponse {
            wallet: &view,
            private_key: secret.as_deref().map(String::as_str),
        }),
    )
        .into_response())
}
