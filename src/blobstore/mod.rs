//! Content-addressed blob storage.
//!
//! # Data Flow
//! ```text
//! orchestrator
//!     → BlobStore::upload(name, bytes)  → ContentAddress
//!     → BlobStore::download(address)    → bytes
//!     → BlobStore::delete(address)      → () (idempotent)
//!     → pinata.rs (HTTP pinning API + gateway)
//! ```

pub mod pinata;
pub mod types;

use async_trait::async_trait;
use bytes::Bytes;

pub use pinata::PinataClient;
pub use types::{BlobError, BlobResult, ContentAddress};

/// A content-addressed blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under the human readable `name`.
    async fn upload(&self, name: &str, bytes: Bytes) -> BlobResult<ContentAddress>;

    /// Fetch the bytes stored at `address`.
    async fn download(&self, address: &ContentAddress) -> BlobResult<Bytes>;

    /// Remove (unpin) `address`. Removing an absent address succeeds.
    async fn delete(&self, address: &ContentAddress) -> BlobResult<()>;
}
