//! Injected storage for an unsigned transaction across a signing round-trip.
//!
//! The source this crate is descended from persists an unsigned transaction
//! in `window.localStorage` between "prepare" and "attach and broadcast".
//! Re-architected per design note §9: the core never assumes a specific
//! backing store, it only depends on this capability.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::tx::UnsignedTx;

/// Put/take storage for an [`UnsignedTx`] keyed by an opaque caller-chosen string.
pub trait TransactionStore: Send + Sync {
    fn put(&self, key: &str, tx: UnsignedTx);
    fn take(&self, key: &str) -> Option<UnsignedTx>;
}

/// Default, non-browser backing store: an in-memory map.
#[derive(Default)]
pub struct InMemoryTransactionStore(Mutex<HashMap<String, UnsignedTx>>);

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn put(&self, key: &str, tx: UnsignedTx) {
        self.0
            .lock()
            .expect("transaction store mutex poisoned")
            .insert(key.to_string(), tx);
    }

    fn take(&self, key: &str) -> Option<UnsignedTx> {
        self.0
            .lock()
            .expect("transaction store mutex poisoned")
            .remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_take_round_trips() {
        let store = InMemoryTransactionStore::new();
        store.put("k", UnsignedTx::Evm(vec![1, 2, 3]));
        let tx = store.take("k").unwrap();
        assert_eq!(tx.as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn take_is_destructive() {
        let store = InMemoryTransactionStore::new();
        store.put("k", UnsignedTx::Bitcoin(vec![9]));
        assert!(store.take("k").is_some());
        assert!(store.take("k").is_none());
    }
}
