//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every provider has a usable base URL on the chosen network
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WalletConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{ProviderConfig, StorageBackend, WalletConfig};

/// Seconds reserved after address generation for storing the address and
/// writing the wallet response.
pub const WALLET_RESPONSE_MARGIN_SECS: u64 = 1;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &WalletConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.providers.timeout_secs == 0 {
        errors.push(ValidationError::new("providers.timeout_secs", "must be greater than 0"));
    }
    if config.address_api.timeout_secs == 0 {
        errors.push(ValidationError::new("address_api.timeout_secs", "must be greater than 0"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be greater than 0"));
    } else if config.server.request_timeout_secs <= config.address_api.timeout_secs + WALLET_RESPONSE_MARGIN_SECS {
        // A created key travels in the response, which must beat the request timeout.
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            format!(
                "must exceed address_api.timeout_secs + {} ({})",
                WALLET_RESPONSE_MARGIN_SECS,
                config.address_api.timeout_secs + WALLET_RESPONSE_MARGIN_SECS
            ),
        ));
    }
    if config.providers.history_capacity == 0 {
        errors.push(ValidationError::new("providers.history_capacity", "must be greater than 0"));
    }

    validate_chain(config, "providers.balance", &config.providers.balance, &mut errors);
    validate_chain(config, "providers.transactions", &config.providers.transactions, &mut errors);

    match config.address_api.resolved_base_url(config.network) {
        Some(url) if url::Url::parse(&url).is_err() => {
            errors.push(ValidationError::new("address_api.base_url", format!("invalid URL '{}'", url)));
        }
        Some(_) => {}
        None => errors.push(ValidationError::new("address_api.base_url", "no URL available")),
    }

    if config.storage.backend == StorageBackend::File
        && config.storage.path.as_deref().map_or(true, |p| p.trim().is_empty())
    {
        errors.push(ValidationError::new("storage.path", "required for the file backend"));
    }

    for (token, user) in &config.auth.sessions {
        if token.trim().is_empty() {
            errors.push(ValidationError::new("auth.sessions", "session token must not be empty"));
        }
        if user.trim().is_empty() {
            errors.push(ValidationError::new("auth.sessions", "session user id must not be empty"));
        }
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("invalid socket address '{}'", config.server.bind_address),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_chain(
    config: &WalletConfig,
    field: &str,
    chain: &[ProviderConfig],
    errors: &mut Vec<ValidationError>,
) {
    if chain.is_empty() {
        errors.push(ValidationError::new(field, "at least one provider is required"));
        return;
    }

    let mut names = HashSet::new();
    for (i, provider) in chain.iter().enumerate() {
        let entry = format!("{}[{}]", field, i);
        let name = provider.display_name();
        if !names.insert(name.clone()) {
            errors.push(ValidationError::new(&entry, format!("duplicate provider name '{}'", name)));
        }

        match provider.resolved_base_url(config.network) {
            Some(url) => {
                if url::Url::parse(&url).is_err() {
                    errors.push(ValidationError::new(
                        format!("{}.base_url", entry),
                        format!("invalid URL '{}'", url),
                    ));
                }
            }
            None => errors.push(ValidationError::new(
                format!("{}.base_url", entry),
                format!("{} has no public endpoint on {}", provider.kind.as_str(), config.network),
            )),
        }
    }
}
