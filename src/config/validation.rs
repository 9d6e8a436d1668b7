//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, multipliers sane)
//! - Check that URLs and addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DocLedgerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;

use crate::config::schema::DocLedgerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. `ledger.rpc_url`).
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.is_empty() {
        errors.push(ValidationError::new(field, "must not be empty"));
    } else if let Err(e) = value.parse::<url::Url>() {
        errors.push(ValidationError::new(field, format!("invalid URL: {}", e)));
    }
}

fn check_non_empty(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::new(field, "must not be empty"));
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &DocLedgerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // server
    if config.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }
    if config.server.max_upload_bytes == 0 {
        errors.push(ValidationError::new("server.max_upload_bytes", "must be > 0"));
    }
    if config.server.armed_session_ttl_secs == 0 {
        errors.push(ValidationError::new("server.armed_session_ttl_secs", "must be > 0"));
    }

    // ledger
    let ledger = &config.ledger;
    check_url(&mut errors, "ledger.rpc_url", &ledger.rpc_url);
    for (i, url) in ledger.failover_urls.iter().enumerate() {
        check_url(&mut errors, &format!("ledger.failover_urls[{}]", i), url);
    }
    if ledger.chain_id == 0 {
        errors.push(ValidationError::new("ledger.chain_id", "must be > 0"));
    }
    if ledger.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("ledger.rpc_timeout_secs", "must be > 0"));
    }
    if let Err(e) = ledger.contract_address.parse::<Address>() {
        errors.push(ValidationError::new(
            "ledger.contract_address",
            format!("invalid address '{}': {}", ledger.contract_address, e),
        ));
    }
    check_non_empty(&mut errors, "ledger.abi_path", &ledger.abi_path);
    if ledger.gas_limit == 0 {
        errors.push(ValidationError::new("ledger.gas_limit", "must be > 0"));
    }
    if !(ledger.gas_price_multiplier >= 1.0 && ledger.gas_price_multiplier.is_finite()) {
        errors.push(ValidationError::new("ledger.gas_price_multiplier", "must be >= 1.0"));
    }

    // contract
    let contract = &config.contract;
    check_non_empty(&mut errors, "contract.register_method", &contract.register_method);
    check_non_empty(&mut errors, "contract.lookup_method", &contract.lookup_method);
    check_non_empty(&mut errors, "contract.delete_method", &contract.delete_method);
    check_non_empty(&mut errors, "contract.registered_event", &contract.registered_event);

    // confirmation
    let confirmation = &config.confirmation;
    if confirmation.max_attempts == 0 {
        errors.push(ValidationError::new("confirmation.max_attempts", "must be > 0"));
    }
    if confirmation.poll_interval_ms == 0 {
        errors.push(ValidationError::new("confirmation.poll_interval_ms", "must be > 0"));
    }
    if confirmation.deadline_secs == Some(0) {
        errors.push(ValidationError::new("confirmation.deadline_secs", "must be > 0 when set"));
    }
    if confirmation.max_delay_ms < confirmation.poll_interval_ms {
        errors.push(ValidationError::new(
            "confirmation.max_delay_ms",
            "must be >= poll_interval_ms",
        ));
    }

    // blob store
    check_url(&mut errors, "blob_store.api_url", &config.blob_store.api_url);
    check_url(&mut errors, "blob_store.gateway_url", &config.blob_store.gateway_url);
    if let Some(proxy) = &config.blob_store.proxy_url {
        check_url(&mut errors, "blob_store.proxy_url", proxy);
    }
    if config.blob_store.timeout_secs == 0 {
        errors.push(ValidationError::new("blob_store.timeout_secs", "must be > 0"));
    }

    // observability
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
