//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.
//! Secrets (signing key, pinning service credentials) are never part of the
//! file; see [`Secrets`].

use serde::{Deserialize, Serialize};

/// Environment variable holding the hex-encoded signing key.
pub const PRIVATE_KEY_ENV_VAR: &str = "DOCLEDGER_PRIVATE_KEY";

/// Environment variable holding the pinning service API key.
pub const PINATA_API_KEY_ENV_VAR: &str = "DOCLEDGER_PINATA_API_KEY";

/// Environment variable holding the pinning service API secret.
pub const PINATA_SECRET_ENV_VAR: &str = "DOCLEDGER_PINATA_SECRET";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DocLedgerConfig {
    /// Front-end HTTP adapter settings.
    pub server: ServerConfig,

    /// Ledger (JSON-RPC) connection and fee settings.
    pub ledger: LedgerConfig,

    /// Contract method and event names.
    pub contract: ContractConfig,

    /// Confirmation polling policy.
    pub confirmation: ConfirmationConfig,

    /// Blob store (pinning service) settings.
    pub blob_store: BlobStoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Front-end adapter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Whole-request timeout in seconds. Covers upload, submission and
    /// confirmation, so it should exceed the confirmation budget.
    pub request_timeout_secs: u64,

    /// Largest accepted file body in bytes.
    pub max_upload_bytes: usize,

    /// Sessions armed for an upload longer than this are forgotten.
    pub armed_session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 300,
            max_upload_bytes: 20 * 1024 * 1024, // 20MB
            armed_session_ttl_secs: 3600,
        }
    }
}

/// Ledger connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 421614 for Arbitrum Sepolia, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Address of the document registry contract.
    pub contract_address: String,

    /// Path to the contract's JSON ABI (plain array or build artifact).
    pub abi_path: String,

    /// Gas limit attached to every state-changing call.
    pub gas_limit: u64,

    /// Gas price multiplier (1.0 = node suggestion, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 421614,
            rpc_timeout_secs: 10,
            contract_address: String::new(),
            abi_path: "ABI.json".to_string(),
            gas_limit: 300_000,
            gas_price_multiplier: 1.0,
            max_gas_price_gwei: 500,
        }
    }
}

/// Names of the contract entry points the orchestrator drives.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// State-changing method taking `(string blobAddress, string displayName)`.
    pub register_method: String,

    /// View method taking `(uint256 id)` and returning
    /// `(string, string, uint256, address)`.
    pub lookup_method: String,

    /// State-changing method taking `(uint256 id)`.
    pub delete_method: String,

    /// Event emitted by the register method.
    pub registered_event: String,

    /// Event input holding the assigned id. When unset the first `uint`
    /// input of the event is used.
    pub document_id_param: Option<String>,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            register_method: "addDocument".to_string(),
            lookup_method: "getDocument".to_string(),
            delete_method: "deleteDocument".to_string(),
            registered_event: "DocumentAdded".to_string(),
            document_id_param: None,
        }
    }
}

/// Backoff mode between receipt polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffMode {
    Fixed,
    Exponential,
}

/// Confirmation polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Delay between receipt polls in milliseconds (base delay when
    /// exponential).
    pub poll_interval_ms: u64,

    /// Maximum number of receipt polls.
    pub max_attempts: u32,

    /// Optional wall-clock limit for the whole wait, in seconds.
    pub deadline_secs: Option<u64>,

    /// Fixed or exponential delay between polls.
    pub backoff: BackoffMode,

    /// Upper bound on a single exponential delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            max_attempts: 60,
            deadline_secs: Some(180),
            backoff: BackoffMode::Fixed,
            max_delay_ms: 10_000,
        }
    }
}

/// Pinning service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlobStoreConfig {
    /// Pinning API base URL.
    pub api_url: String,

    /// Gateway base URL used for downloads.
    pub gateway_url: String,

    /// Optional HTTP proxy for gateway downloads.
    pub proxy_url: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.pinata.cloud".to_string(),
            gateway_url: "https://gateway.pinata.cloud".to_string(),
            proxy_url: None,
            timeout_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Human readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Credentials read from the environment at startup.
///
/// Deliberately not `Serialize`/`Debug`-printing its contents.
#[derive(Clone)]
pub struct Secrets {
    pub private_key: String,
    pub pinata_api_key: String,
    pub pinata_secret: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}
