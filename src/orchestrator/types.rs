//! Orchestrator result types.

use alloy::primitives::Address;
use serde::Serialize;

use crate::blobstore::ContentAddress;
use crate::ledger::{LookupOutput, TxRef};

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub document_id: u64,
    pub tx_ref: TxRef,
    pub blob_address: ContentAddress,
}

/// A registered document as recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    pub document_id: u64,
    pub blob_address: ContentAddress,
    pub display_name: String,
    /// Unix seconds.
    pub created_at: u64,
    pub owner: Address,
}

impl DocumentRecord {
    /// Build a record from a lookup result.
    ///
    /// Returns `None` for the contract's empty slot (no blob, zero owner).
    /// A timestamp wider than `u64` saturates.
    pub fn from_lookup(document_id: u64, output: LookupOutput) -> Option<Self> {
        if output.blob_address.is_empty() && output.owner == Address::ZERO {
            return None;
        }
        let created_at = u64::try_from(output.created_at).unwrap_or(u64::MAX);
        Some(Self {
            document_id,
            blob_address: ContentAddress(output.blob_address),
            display_name: output.display_name,
            created_at,
            owner: output.owner,
        })
    }
}
