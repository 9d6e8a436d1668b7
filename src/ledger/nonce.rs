//! Per-credential nonce gates.
//!
//! Nonce assignment is not atomic on the node side: two submissions that both
//! read the pending nonce before either lands would collide. Each signing
//! address therefore gets one async mutex holding the next nonce to use, and
//! a submission keeps the gate locked from nonce assignment until the node has
//! accepted (or refused) the broadcast.

use alloy::primitives::Address;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of nonce gates keyed by signing address.
#[derive(Debug, Clone, Default)]
pub struct NonceGates {
    gates: Arc<DashMap<Address, Arc<Mutex<NonceState>>>>,
}

/// Locally tracked nonce for one address.
#[derive(Debug, Default)]
pub struct NonceState {
    next: Option<u64>,
}

/// Exclusive access to one address's nonce sequence.
pub struct NonceLease {
    guard: OwnedMutexGuard<NonceState>,
}

impl NonceGates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `address`'s nonce sequence.
    pub async fn acquire(&self, address: Address) -> NonceLease {
        // Clone the Arc out so the map shard lock is released before awaiting.
        let gate = self.gates.entry(address).or_default().clone();
        NonceLease {
            guard: gate.lock_owned().await,
        }
    }
}

impl NonceLease {
    /// Pick the nonce for the next submission.
    ///
    /// Takes the larger of the node's pending count and the local sequence,
    /// so transactions still propagating to the node are not reused.
    pub fn assign(&self, chain_pending: u64) -> u64 {
        match self.guard.next {
            Some(local) if local > chain_pending => local,
            _ => chain_pending,
        }
    }

    /// Record that `nonce` was consumed by an accepted submission.
    pub fn commit(&mut self, nonce: u64) {
        self.guard.next = Some(nonce + 1);
    }

    /// Forget the local sequence after the node refused a nonce.
    pub fn reset(&mut self) {
        self.guard.next = None;
    }
}
