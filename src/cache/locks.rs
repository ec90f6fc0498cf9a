//! Per-key async write locks.
//!
//! One `tokio::sync::Mutex` per key currently in use; the map entry is dropped
//! when the last holder or waiter releases it, so idle keys cost nothing and
//! unrelated keys never contend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

struct Slot {
    mutex: Arc<AsyncMutex<()>>,
    // Holders plus waiters, including waits that were later cancelled.
    users: usize,
}

#[derive(Default)]
pub(crate) struct KeyLocks {
    locks: Mutex<HashMap<String, Slot>>,
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    ///
    /// Cancel-safe: dropping the future while it waits releases its claim on
    /// the map entry.
    pub(crate) async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let mutex = {
            let mut locks = self.locks.lock();
            let slot = locks.entry(key.to_string()).or_insert_with(|| Slot {
                mutex: Arc::default(),
                users: 0,
            });
            slot.users += 1;
            Arc::clone(&slot.mutex)
        };

        let mut key_guard = KeyGuard {
            owner: self,
            key: key.to_string(),
            guard: None,
        };
        key_guard.guard = Some(mutex.lock_owned().await);
        key_guard
    }

    /// Number of keys with a live lock (held or awaited).
    pub(crate) fn active(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Holds `key` until dropped. Also exists, unlocked, while the lock is awaited.
pub(crate) struct KeyGuard<'a> {
    owner: &'a KeyLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.owner.locks.lock();
        drop(self.guard.take());
        if let Some(slot) = locks.get_mut(&self.key) {
            slot.users -= 1;
            if slot.users == 0 {
                locks.remove(&self.key);
            }
        }
    }
}
