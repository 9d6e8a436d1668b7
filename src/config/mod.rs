//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + environment secrets
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DocLedgerConfig (validated, immutable)
//!     → handed to subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is loaded once per process; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_or_default, load_secrets, ConfigError};
pub use schema::{
    BackoffMode, BlobStoreConfig, ConfirmationConfig, ContractConfig, DocLedgerConfig,
    LedgerConfig, LogFormat, ObservabilityConfig, Secrets, ServerConfig,
};
