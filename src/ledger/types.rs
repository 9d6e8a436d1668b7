//! Ledger-facing types and error definitions.

use alloy::primitives::{Address, Log, TxHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Reference to a submitted transaction.
///
/// Created at submission and resolvable to an [`AcceptanceRecord`] only after
/// the ledger orders the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(pub TxHash);

impl TxRef {
    /// `0x`-prefixed lowercase hex form.
    pub fn hex(&self) -> String {
        format!("{:#x}", self.0)
    }
}

impl From<TxHash> for TxRef {
    fn from(hash: TxHash) -> Self {
        Self(hash)
    }
}

impl std::fmt::Display for TxRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// The ledger's durable confirmation that a transaction was ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceRecord {
    pub tx_ref: TxRef,
    /// False when the transaction was mined but reverted.
    pub success: bool,
    pub block_number: Option<u64>,
    /// Event logs emitted while applying the transaction.
    pub logs: Vec<Log>,
}

impl AcceptanceRecord {
    /// Logs emitted by `address`, in emission order.
    pub fn logs_from(&self, address: Address) -> impl Iterator<Item = &Log> {
        self.logs.iter().filter(move |log| log.address == address)
    }
}

/// Errors that can occur talking to the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node refused the request (bad nonce, underpriced, malformed).
    #[error("Rejected by node: {0}")]
    Rejected(String),

    /// Contract execution reverted during a call.
    #[error("Execution reverted: {0}")]
    Reverted(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

impl LedgerError {
    /// Whether repeating the same query may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Rpc(_) | LedgerError::Timeout(_))
    }

    /// Whether the node rejected a submission because of its nonce.
    pub fn is_nonce_rejection(&self) -> bool {
        match self {
            LedgerError::Rejected(msg) => {
                let msg = msg.to_ascii_lowercase();
                msg.contains("nonce") || msg.contains("replacement transaction")
            }
            _ => false,
        }
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
