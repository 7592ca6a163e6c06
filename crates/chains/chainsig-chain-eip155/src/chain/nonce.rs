//! Per-address nonce cache for `eth_getTransactionCount`.
//!
//! Grounded on `PendingNonceManager` in the teacher project: the same
//! `.pending()`-seeded, locally-incremented cache, generalized from
//! Alloy's `NonceManager` filler trait (there's no local wallet/filler
//! stack here) to a plain helper the assembler calls before building a
//! transaction. Needed because two transactions signed for the same
//! derived address in quick succession would otherwise both see the
//! same `eth_getTransactionCount` result and collide on-chain.

use std::future::Future;
use std::sync::Arc;

use alloy_primitives::Address;
use dashmap::DashMap;
use tokio::sync::Mutex;

use chainsig_types::error::Error;

const NONE: u64 = u64::MAX;

/// Caches one nonce per address behind its own lock; first use fetches
/// the pending (mempool-inclusive) count, subsequent uses just increment.
#[derive(Debug, Default)]
pub struct PendingNonceManager {
    nonces: DashMap<Address, Arc<Mutex<u64>>>,
}

impl PendingNonceManager {
    /// Returns the next nonce for `address`, fetching via `fetch_pending`
    /// only on the first call for that address.
    pub async fn next_nonce<F, Fut>(&self, address: Address, fetch_pending: F) -> Result<u64, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<u64, Error>>,
    {
        let slot = {
            let entry = self.nonces.entry(address).or_insert_with(|| Arc::new(Mutex::new(NONE)));
            Arc::clone(entry.value())
        };

        let mut nonce = slot.lock().await;
        let next = if *nonce == NONE {
            fetch_pending().await?
        } else {
            *nonce + 1
        };
        *nonce = next;
        Ok(next)
    }

    /// Forces the next call to requery the RPC, since a failed broadcast
    /// leaves the on-chain state uncertain (the tx may or may not have
    /// reached the mempool).
    pub async fn reset(&self, address: Address) {
        if let Some(slot) = self.nonces.get(&address) {
            *slot.lock().await = NONE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_call_fetches_then_increments_locally() {
        let mgr = PendingNonceManager::default();
        let addr = Address::ZERO;

        let n1 = mgr.next_nonce(addr, async || Ok(5u64)).await.unwrap();
        assert_eq!(n1, 5);

        let n2 = mgr.next_nonce(addr, async || panic!("should not refetch")).await.unwrap();
        assert_eq!(n2, 6);
    }

    #[tokio::test]
    async fn reset_forces_a_requery() {
        let mgr = PendingNonceManager::default();
        let addr = Address::ZERO;
        mgr.next_nonce(addr, async || Ok(5u64)).await.unwrap();

        mgr.reset(addr).await;

        let n = mgr.next_nonce(addr, async || Ok(42u64)).await.unwrap();
        assert_eq!(n, 42);
    }

    #[tokio::test]
    async fn separate_addresses_do_not_share_a_counter() {
        let mgr = PendingNonceManager::default();
        let a = Address::ZERO;
        let b = Address::with_last_byte(1);

        assert_eq!(mgr.next_nonce(a, async || Ok(10u64)).await.unwrap(), 10);
        assert_eq!(mgr.next_nonce(b, async || Ok(0u64)).await.unwrap(), 0);
        assert_eq!(mgr.next_nonce(a, async || panic!("unused")).await.unwrap(), 11);
    }
}
