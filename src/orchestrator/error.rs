//! Error taxonomy for document lifecycle operations.

use serde::Serialize;
use thiserror::Error;

use crate::blobstore::{BlobError, ContentAddress};
use crate::ledger::{ConfirmationError, ContractError, LedgerError, SubmitError, TxRef};
use crate::orchestrator::state::Stage;

/// Caller-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    StoreUnavailable,
    QuotaExceeded,
    NotFound,
    EncodingError,
    NonceError,
    FeeQueryError,
    SigningError,
    NetworkError,
    SubmissionError,
    ConfirmationTimeout,
    MalformedAcceptance,
    DecodeError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::StoreUnavailable => "StoreUnavailable",
            ErrorKind::QuotaExceeded => "QuotaExceeded",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::EncodingError => "EncodingError",
            ErrorKind::NonceError => "NonceError",
            ErrorKind::FeeQueryError => "FeeQueryError",
            ErrorKind::SigningError => "SigningError",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::SubmissionError => "SubmissionError",
            ErrorKind::ConfirmationTimeout => "ConfirmationTimeout",
            ErrorKind::MalformedAcceptance => "MalformedAcceptance",
            ErrorKind::DecodeError => "DecodeError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed failure of one orchestrator step.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("blob store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("blob store quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("not found: {0}")]
    NotFound(String),

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

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("transaction {tx_ref} not accepted after {attempts} polls")]
    ConfirmationTimeout { tx_ref: TxRef, attempts: u32 },

    #[error("acceptance record for {0} carries no document id")]
    MalformedAcceptance(TxRef),

    #[error("decode error: {0}")]
    Decode(String),
}

impl DocumentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            DocumentError::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            DocumentError::NotFound(_) => ErrorKind::NotFound,
            DocumentError::Encoding(_) => ErrorKind::EncodingError,
            DocumentError::Nonce(_) => ErrorKind::NonceError,
            DocumentError::FeeQuery(_) => ErrorKind::FeeQueryError,
            DocumentError::Signing(_) => ErrorKind::SigningError,
            DocumentError::Network(_) => ErrorKind::NetworkError,
            DocumentError::Submission(_) => ErrorKind::SubmissionError,
            DocumentError::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
            DocumentError::MalformedAcceptance(_) => ErrorKind::MalformedAcceptance,
            DocumentError::Decode(_) => ErrorKind::DecodeError,
        }
    }
}

impl From<BlobError> for DocumentError {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::StoreUnavailable(msg) => DocumentError::StoreUnavailable(msg),
            BlobError::QuotaExceeded(msg) => DocumentError::QuotaExceeded(msg),
            BlobError::NotFound(address) => DocumentError::NotFound(format!("blob {}", address)),
        }
    }
}

impl From<SubmitError> for DocumentError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Encoding(msg) => DocumentError::Encoding(msg),
            SubmitError::Nonce(msg) => DocumentError::Nonce(msg),
            SubmitError::FeeQuery(msg) => DocumentError::FeeQuery(msg),
            SubmitError::Signing(msg) => DocumentError::Signing(msg),
            SubmitError::Network(msg) => DocumentError::Network(msg),
        }
    }
}

impl From<ConfirmationError> for DocumentError {
    fn from(e: ConfirmationError) -> Self {
        match e {
            ConfirmationError::Timeout { tx_ref, attempts } => {
                DocumentError::ConfirmationTimeout { tx_ref, attempts }
            }
            ConfirmationError::Ledger { tx_ref, source } => {
                DocumentError::Submission(format!("receipt query for {} failed: {}", tx_ref, source))
            }
        }
    }
}

impl From<ContractError> for DocumentError {
    fn from(e: ContractError) -> Self {
        match e {
            ContractError::Decode { .. } => DocumentError::Decode(e.to_string()),
            other => DocumentError::Encoding(other.to_string()),
        }
    }
}

impl From<LedgerError> for DocumentError {
    fn from(e: LedgerError) -> Self {
        if e.is_transient() {
            DocumentError::Network(e.to_string())
        } else {
            DocumentError::Submission(e.to_string())
        }
    }
}

/// A failed lifecycle request, with enough context for manual cleanup.
#[derive(Debug, Error)]
#[error("{operation} failed while {stage}: {source}")]
pub struct LifecycleError {
    pub operation: &'static str,
    /// The stage that was executing when the failure happened.
    pub stage: Stage,
    /// Blob pinned by (or targeted by) this request, if any.
    pub blob_address: Option<ContentAddress>,
    /// Submitted transaction, if the request got that far.
    pub tx_ref: Option<TxRef>,
    #[source]
    pub source: DocumentError,
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    /// Whether the blob store holds a blob the ledger no longer (or never)
    /// references because of this failure.
    ///
    /// A register that fails while extracting was already accepted, so its
    /// blob is referenced by a live record.
    pub fn orphaned_blob(&self) -> Option<&ContentAddress> {
        let orphaning = match self.operation {
            "register" => matches!(self.stage, Stage::Submitted | Stage::Confirming),
            "revoke" => self.stage == Stage::Unpinning,
            _ => false,
        };
        if orphaning {
            self.blob_address.as_ref()
        } else {
            None
        }
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
