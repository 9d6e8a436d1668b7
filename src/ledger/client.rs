//! Ledger RPC client with timeout and failover handling.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoints (primary + failovers)
//! - Query chain state (chain id, nonces, gas price, receipts, view calls)
//! - Broadcast signed transactions exactly once
//! - Classify RPC failures into transient and permanent errors

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::{TransportError, TransportResult};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LedgerConfig;
use crate::ledger::types::{AcceptanceRecord, ChainId, LedgerError, LedgerResult, TxRef};

/// The operations the orchestrator needs from a ledger.
///
/// `send_raw` and `poll_receipt` are deliberately separate: a submission
/// yields a [`TxRef`] that stays valid even when the caller stops waiting.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Chain ID reported by the node.
    async fn chain_id(&self) -> LedgerResult<u64>;

    /// Next nonce for `address`, counting pending transactions.
    async fn pending_nonce(&self, address: Address) -> LedgerResult<u64>;

    /// Current gas price suggestion in wei.
    async fn gas_price(&self) -> LedgerResult<u128>;

    /// Read-only contract call against the latest state.
    async fn call(&self, to: Address, data: Bytes) -> LedgerResult<Bytes>;

    /// Broadcast a signed, EIP-2718 encoded transaction.
    async fn send_raw(&self, raw: Bytes) -> LedgerResult<TxRef>;

    /// Acceptance record for `tx_ref`, or `None` while it is still pending.
    async fn poll_receipt(&self, tx_ref: TxRef) -> LedgerResult<Option<AcceptanceRecord>>;
}

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// JSON-RPC ledger client with failover support.
#[derive(Clone)]
pub struct LedgerClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    /// Configuration.
    config: LedgerConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl LedgerClient {
    /// Create a new ledger client.
    ///
    /// Chain verification failures are logged, not fatal, so the process can
    /// start while the node is unreachable.
    pub async fn new(config: LedgerConfig) -> LedgerResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            LedgerError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            timeout_duration,
        };

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    rpc_url = %config.rpc_url,
                    chain_id = config.chain_id,
                    "Ledger client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Ledger client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> LedgerResult<()> {
        let chain_id = ChainId(self.chain_id().await?);
        if chain_id.0 != self.config.chain_id {
            return Err(LedgerError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Run a read-only query against each provider in turn.
    ///
    /// Transient failures move on to the next provider; a permanent failure
    /// (the node answered with an error) is returned at once.
    async fn with_failover<T, F, Fut>(&self, what: &str, f: F) -> LedgerResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_error = None;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, f(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    let err = classify_rpc_error(e);
                    if !err.is_transient() {
                        return Err(err);
                    }
                    tracing::warn!(provider_idx = i, error = %err, query = what, "RPC error, trying next provider");
                    last_error = Some(err);
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, query = what, "RPC timeout, trying next provider");
                    last_error = Some(LedgerError::Timeout(self.config.rpc_timeout_secs));
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            LedgerError::Rpc(format!("All providers failed to get {}", what))
        }))
    }
}

/// Split alloy transport errors into node-side answers and transport failures.
fn classify_rpc_error(e: TransportError) -> LedgerError {
    match e.as_error_resp() {
        Some(payload) => {
            let message = payload.message.to_string();
            // Code 3 is the conventional "execution reverted" error code.
            if payload.code == 3 || message.to_ascii_lowercase().contains("revert") {
                LedgerError::Reverted(message)
            } else {
                LedgerError::Rejected(message)
            }
        }
        None => LedgerError::Rpc(e.to_string()),
    }
}

fn to_acceptance(receipt: TransactionReceipt) -> AcceptanceRecord {
    AcceptanceRecord {
        tx_ref: TxRef(receipt.transaction_hash),
        success: receipt.status(),
        block_number: receipt.block_number,
        logs: receipt
            .inner
            .logs()
            .iter()
            .map(|log| log.inner.clone())
            .collect(),
    }
}

#[async_trait]
impl Ledger for LedgerClient {
    async fn chain_id(&self) -> LedgerResult<u64> {
        self.with_failover("chain id", |p| async move { p.get_chain_id().await })
            .await
    }

    async fn pending_nonce(&self, address: Address) -> LedgerResult<u64> {
        self.with_failover("transaction count", |p| async move {
            p.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn gas_price(&self) -> LedgerResult<u128> {
        self.with_failover("gas price", |p| async move { p.get_gas_price().await })
            .await
    }

    async fn call(&self, to: Address, data: Bytes) -> LedgerResult<Bytes> {
        self.with_failover("call result", |p| {
            let request = TransactionRequest::default().with_to(to).with_input(data.clone());
            async move { p.call(request).await }
        })
        .await
    }

    async fn send_raw(&self, raw: Bytes) -> LedgerResult<TxRef> {
        // Primary only: a signed transaction is broadcast exactly once.
        let provider = &self.providers[0];
        match timeout(self.timeout_duration, provider.send_raw_transaction(&raw)).await {
            Ok(Ok(pending)) => Ok(TxRef(*pending.tx_hash())),
            Ok(Err(e)) => Err(classify_rpc_error(e)),
            Err(_) => Err(LedgerError::Timeout(self.config.rpc_timeout_secs)),
        }
    }

    async fn poll_receipt(&self, tx_ref: TxRef) -> LedgerResult<Option<AcceptanceRecord>> {
        let hash: TxHash = tx_ref.0;
        let receipt = self
            .with_failover("receipt", |p| async move { p.get_transaction_receipt(hash).await })
            .await?;
        Ok(receipt.map(to_acceptance))
    }
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
