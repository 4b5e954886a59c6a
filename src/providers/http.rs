//! Shared HTTP plumbing for explorer providers.
//!
//! # Responsibilities
//! - Build the single `reqwest::Client` shared by every provider
//! - Compose endpoint URLs and attach API tokens
//! - Map transport, status and decoding failures onto `ProviderError`
//!
//! # Design Decisions
//! - No request timeout on the client itself; deadlines are enforced per attempt
//!   by the fallback runner so a timeout is always reported the same way
//! - URLs are stripped from transport errors, they may carry API tokens

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::chain::ProviderError;

const USER_AGENT: &str = concat!("btc-wallet-gateway/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by providers and the address generator.
pub fn build_client(connect_timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(connect_timeout)
        .build()
}

/// Join `path` onto `base` and append an optional `token` query parameter.
pub(crate) fn endpoint(base: &str, path: &str, token: Option<&str>) -> Result<Url, ProviderError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut url = Url::parse(&joined)
        .map_err(|e| ProviderError::Transport(format!("invalid endpoint URL: {}", e)))?;
    if let Some(token) = token {
        url.query_pairs_mut().append_pair("token", token);
    }
    Ok(url)
}

fn transport(e: reqwest::Error) -> ProviderError {
    ProviderError::Transport(e.without_url().to_string())
}

async fn read_body(response: Response) -> Result<String, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status(status.as_u16()));
    }
    response.text().await.map_err(transport)
}

/// GET a URL and return the body as text.
pub(crate) async fn get_text(client: &Client, url: Url) -> Result<String, ProviderError> {
    let response = client.get(url).send().await.map_err(transport)?;
    read_body(response).await
}

/// GET a URL and decode a JSON body.
pub(crate) async fn get_json<T: DeserializeOwned>(client: &Client, url: Url) -> Result<T, ProviderError> {
    let body = get_text(client, url).await?;
    decode(&body)
}

/// POST an empty body and decode a JSON response.
pub(crate) async fn post_json<T: DeserializeOwned>(client: &Client, url: Url) -> Result<T, ProviderError> {
    let response = client.post(url).send().await.map_err(transport)?;
    let body = read_body(response).await?;
    decode(&body)
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))
}
