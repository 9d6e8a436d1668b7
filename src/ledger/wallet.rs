//! Signing credential management.
//!
//! # Security
//! - Private keys come from the environment (see `config::load_secrets`)
//! - Keys are never logged or serialized

use alloy::consensus::TxEnvelope;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use thiserror::Error;

/// Errors raised while loading keys or signing.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid private key format: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// A signing credential bound to one chain.
#[derive(Clone)]
pub struct Wallet {
    /// The underlying signer (private key).
    signer: PrivateKeySigner,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for transaction signing
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> Result<Self, WalletError> {
        let key_hex = private_key_hex
            .trim()
            .strip_prefix("0x")
            .unwrap_or(private_key_hex.trim());

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| WalletError::InvalidKey(format!("{}", e)))?;

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Wallet initialized"
        );

        Ok(Self { signer, chain_id })
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the chain ID this wallet is configured for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign a fully populated transaction request.
    ///
    /// The request must carry nonce, gas price, gas limit, recipient and
    /// chain id; a missing field is reported as a signing failure.
    pub async fn sign_transaction(&self, tx: TransactionRequest) -> Result<TxEnvelope, WalletError> {
        let wallet = EthereumWallet::from(self.signer.clone());
        tx.build(&wallet)
            .await
            .map_err(|e| WalletError::Signing(e.to_string()))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}
