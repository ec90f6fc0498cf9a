//! Memory tier: bounded, TTL-checked, insertion-order eviction.
//!
//! When full, the oldest *inserted* key is evicted. Reads do not refresh an
//! entry's position and neither does overwriting an existing key, so this is
//! FIFO rather than LRU.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::payload::Payload;

struct Slot {
    value: Payload,
    inserted_at: Instant,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Slot>,
    // (seq, key); entries whose seq no longer matches the map are stale.
    order: VecDeque<(u64, String)>,
    next_seq: u64,
}

impl Inner {
    fn evict_oldest(&mut self) -> Option<String> {
        while let Some((seq, key)) = self.order.pop_front() {
            let live = self.entries.get(&key).is_some_and(|slot| slot.seq == seq);
            if live {
                self.entries.remove(&key);
                return Some(key);
            }
        }
        None
    }

    fn compact(&mut self) {
        let entries = &self.entries;
        self.order
            .retain(|(seq, key)| entries.get(key).is_some_and(|slot| slot.seq == *seq));
    }
}

/// In-memory tier keyed by the caller's key.
pub struct MemoryTier {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
}

impl MemoryTier {
    /// Creates a tier holding at most `capacity` entries for `ttl` each.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the value if present and not expired. Expired entries are dropped.
    pub fn get(&self, key: &str) -> Option<Payload> {
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(key) {
            Some(slot) if slot.inserted_at.elapsed() <= self.ttl => {
                return Some(slot.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.entries.remove(key);
        }
        None
    }

    /// Inserts or overwrites `key`, returning the key evicted to make room.
    ///
    /// Overwriting keeps the key's original position in the eviction order but
    /// restarts its TTL.
    pub fn insert(&self, key: &str, value: Payload) -> Option<String> {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        if let Some(slot) = inner.entries.get_mut(key) {
            slot.value = value;
            slot.inserted_at = now;
            return None;
        }

        let evicted = if inner.entries.len() >= self.capacity {
            inner.evict_oldest()
        } else {
            None
        };

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key.to_string(),
            Slot {
                value,
                inserted_at: now,
                seq,
            },
        );
        inner.order.push_back((seq, key.to_string()));

        if inner.order.len() > self.capacity.saturating_mul(2) {
            inner.compact();
        }

        evicted
    }

    /// Removes `key`; returns `true` if it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.lock().entries.remove(key).is_some()
    }

    /// Returns `true` if `key` is present and not expired.
    pub fn contains(&self, key: &str) -> bool {
        let inner = self.inner.lock();
        inner
            .entries
            .get(key)
            .is_some_and(|slot| slot.inserted_at.elapsed() <= self.ttl)
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

impl std::fmt::Debug for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTier")
            .field("entries", &self.len())
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish()
    }
}
