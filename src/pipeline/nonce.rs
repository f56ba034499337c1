//! Per-address nonce serialization.
//!
//! Concurrent swaps paying out of the same address must not reuse a nonce.
//! Each `(chain, address)` owns one async mutex; the holder of the lease is
//! the only task preparing, signing and submitting from that address.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::chain::{Chain, ChainAddress};

#[derive(Debug, Default)]
struct NonceSlot {
    /// Next nonce this process would use, if known.
    next: Option<u64>,
}

/// Hands out exclusive leases per source address.
#[derive(Debug, Clone, Default)]
pub struct NonceAllocator {
    slots: Arc<DashMap<(Chain, ChainAddress), Arc<Mutex<NonceSlot>>>>,
}

impl NonceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `address`.
    pub async fn lease(&self, address: ChainAddress) -> NonceLease {
        let slot = self
            .slots
            .entry((address.chain(), address))
            .or_default()
            .clone();
        let guard = slot.lock_owned().await;
        NonceLease { address, guard }
    }
}

/// Exclusive right to send from one address; released on drop.
#[derive(Debug)]
pub struct NonceLease {
    address: ChainAddress,
    guard: OwnedMutexGuard<NonceSlot>,
}

impl NonceLease {
    pub fn address(&self) -> &ChainAddress {
        &self.address
    }

    /// Pick the nonce to use given the node's pending count.
    ///
    /// Never lower than the node's view, never lower than what this process
    /// already handed out.
    pub fn reconcile(&mut self, node_pending: u64) -> u64 {
        let nonce = match self.guard.next {
            Some(cached) if cached > node_pending => {
                tracing::debug!(
                    address = %self.address,
                    node_pending,
                    cached,
                    "Node lags local nonce, using cached value"
                );
                cached
            }
            _ => node_pending,
        };
        nonce
    }

    /// Record that `used` was accepted by the node.
    pub fn commit(&mut self, used: u64) {
        self.guard.next = Some(used.saturating_add(1));
    }

    /// Forget the cached nonce; the next lease trusts the node again.
    pub fn invalidate(&mut self) {
        self.guard.next = None;
    }
}
