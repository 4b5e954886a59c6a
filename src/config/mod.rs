//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WalletConfig (validated, immutable)
//!     → consumed once at startup by WalletService / HttpServer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets (API tokens) may be pulled from the environment instead of the file

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AddressApiConfig, AuthConfig, LogFormat, ObservabilityConfig, ProviderConfig, ProviderKind,
    ProvidersConfig, ResolutionStrategy, ServerConfig, StorageBackend, StorageConfig,
    WalletConfig, DEFAULT_STORAGE_PATH,
};
