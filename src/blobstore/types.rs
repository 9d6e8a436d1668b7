//! Blob store types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content address of a stored blob (an IPFS CID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(pub String);

impl ContentAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContentAddress {
    fn from(cid: String) -> Self {
        Self(cid)
    }
}

impl From<&str> for ContentAddress {
    fn from(cid: &str) -> Self {
        Self(cid.to_string())
    }
}

impl std::fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Blob store failures.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The store rejected the request or could not be reached.
    #[error("blob store unavailable: {0}")]
    StoreUnavailable(String),

    /// The account's storage or request quota is used up.
    #[error("blob store quota exceeded: {0}")]
    QuotaExceeded(String),

    /// No blob under this address.
    #[error("blob not found: {0}")]
    NotFound(ContentAddress),
}

impl From<reqwest::Error> for BlobError {
    fn from(e: reqwest::Error) -> Self {
        BlobError::StoreUnavailable(e.to_string())
    }
}

/// Result type for blob store operations.
pub type BlobResult<T> = Result<T, BlobError>;
