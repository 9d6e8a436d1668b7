//! Transaction building, signing and submission.
//!
//! # Responsibilities
//! - Encode a contract call against the loaded ABI
//! - Assign the next nonce under the credential's nonce gate
//! - Attach a live gas price bid
//! - Sign and broadcast exactly once
//!
//! Retries are the caller's decision; a retry goes through [`Submitter::submit`]
//! again and therefore gets a fresh nonce.

use alloy::dyn_abi::DynSolValue;
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use std::sync::Arc;
use thiserror::Error;

use crate::config::LedgerConfig;
use crate::ledger::client::Ledger;
use crate::ledger::contract::{ContractError, ContractInterface};
use crate::ledger::nonce::NonceGates;
use crate::ledger::types::TxRef;
use crate::ledger::wallet::Wallet;
use crate::observability::metrics;

/// Submission failures, one variant per failing step.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("nonce error: {0}")]
    Nonce(String),

    #[error("fee query error: {0}")]
    FeeQuery(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("network error: {0}")]
    Network(String),
}

impl From<ContractError> for SubmitError {
    fn from(e: ContractError) -> Self {
        SubmitError::Encoding(e.to_string())
    }
}

/// Result type for submissions.
pub type SubmitResult<T> = Result<T, SubmitError>;

/// Fee and gas settings applied to every submission.
#[derive(Debug, Clone)]
pub struct FeePolicy {
    pub gas_limit: u64,
    pub gas_price_multiplier: f64,
    pub max_gas_price_gwei: u64,
}

impl From<&LedgerConfig> for FeePolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            gas_limit: config.gas_limit,
            gas_price_multiplier: config.gas_price_multiplier,
            max_gas_price_gwei: config.max_gas_price_gwei,
        }
    }
}

/// Turns `(method, args, credential)` into a submitted transaction.
pub struct Submitter<L> {
    ledger: Arc<L>,
    contract: Arc<ContractInterface>,
    fees: FeePolicy,
    gates: NonceGates,
}

impl<L: Ledger> Submitter<L> {
    /// Create a new submitter.
    pub fn new(ledger: Arc<L>, contract: Arc<ContractInterface>, fees: FeePolicy) -> Self {
        Self {
            ledger,
            contract,
            fees,
            gates: NonceGates::new(),
        }
    }

    /// Encode, sign and broadcast a call to `method`.
    ///
    /// Returns as soon as the node accepts the broadcast; acceptance on the
    /// ledger is the confirmation waiter's job.
    pub async fn submit(
        &self,
        method: &str,
        args: &[DynSolValue],
        wallet: &Wallet,
    ) -> SubmitResult<TxRef> {
        let data = self.contract.encode_call(method, args)?;
        let from = wallet.address();

        let mut lease = self.gates.acquire(from).await;

        let chain_nonce = self
            .ledger
            .pending_nonce(from)
            .await
            .map_err(|e| {
                if e.is_transient() {
                    SubmitError::Network(format!("failed to get nonce: {}", e))
                } else {
                    SubmitError::Nonce(format!("failed to get nonce: {}", e))
                }
            })?;
        let nonce = lease.assign(chain_nonce);

        let gas_price = self.gas_bid().await?;

        let tx = TransactionRequest::default()
            .with_to(self.contract.address())
            .with_value(U256::ZERO)
            .with_input(data)
            .with_nonce(nonce)
            .with_gas_price(gas_price)
            .with_gas_limit(self.fees.gas_limit)
            .with_chain_id(wallet.chain_id());

        let envelope = wallet
            .sign_transaction(tx)
            .await
            .map_err(|e| SubmitError::Signing(e.to_string()))?;
        let raw = Bytes::from(envelope.encoded_2718());

        match self.ledger.send_raw(raw).await {
            Ok(tx_ref) => {
                lease.commit(nonce);
                metrics::record_submission(method);
                tracing::info!(
                    tx_ref = %tx_ref,
                    method = method,
                    nonce = nonce,
                    from = %from,
                    "Transaction sent"
                );
                Ok(tx_ref)
            }
            Err(e) if e.is_nonce_rejection() => {
                lease.reset();
                Err(SubmitError::Nonce(e.to_string()))
            }
            Err(e) => Err(SubmitError::Network(e.to_string())),
        }
    }

    /// Live gas price, bounded and scaled by the fee policy.
    async fn gas_bid(&self) -> SubmitResult<u128> {
        let gas_price = self
            .ledger
            .gas_price()
            .await
            .map_err(|e| SubmitError::FeeQuery(format!("failed to get gas price: {}", e)))?;

        let gas_price_gwei = gas_price / 1_000_000_000;
        if gas_price_gwei > self.fees.max_gas_price_gwei as u128 {
            return Err(SubmitError::FeeQuery(format!(
                "gas price {} gwei exceeds maximum {} gwei",
                gas_price_gwei, self.fees.max_gas_price_gwei
            )));
        }

        Ok((gas_price as f64 * self.fees.gas_price_multiplier) as u128)
    }
}
