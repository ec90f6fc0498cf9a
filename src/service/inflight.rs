//! Registry of acquisitions currently running, one per key.
//!
//! Each entry holds a weak handle to a `Shared` future, so the registry never
//! keeps an acquisition alive by itself: once every waiter has dropped its
//! handle the work is dropped too. The future carries an [`InFlightGuard`]
//! that removes the entry when the future completes or is dropped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared, WeakShared};
use parking_lot::Mutex;

use crate::acquisition::{Acquired, AcquisitionResult};

pub(crate) type SharedAcquisition = Shared<BoxFuture<'static, AcquisitionResult<Acquired>>>;

struct Entry {
    id: u64,
    handle: WeakShared<BoxFuture<'static, AcquisitionResult<Acquired>>>,
}

pub(crate) enum Registration<T> {
    /// Another caller is already acquiring this key.
    Joined(SharedAcquisition),
    /// This caller started the acquisition.
    Started(SharedAcquisition),
    /// The recheck found a value; nothing was registered.
    Ready(T),
}

#[derive(Default)]
pub(crate) struct InFlightRegistry {
    entries: Mutex<HashMap<String, Entry>>,
    next_id: AtomicU64,
}

impl InFlightRegistry {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Joins the live acquisition for `key`, or runs `recheck` and, if it
    /// finds nothing, registers the future built by `start`.
    ///
    /// `recheck` runs under the registry lock, which closes the window between
    /// a finished acquisition writing the cache and leaving the registry.
    pub(crate) fn join_or_start<T, R, S, F>(
        self: &Arc<Self>,
        key: &str,
        recheck: R,
        start: S,
    ) -> Registration<T>
    where
        R: FnOnce() -> Option<T>,
        S: FnOnce(InFlightGuard) -> F,
        F: Future<Output = AcquisitionResult<Acquired>> + Send + 'static,
    {
        let mut entries = self.entries.lock();

        if let Some(shared) = entries.get(key).and_then(|entry| entry.handle.upgrade()) {
            return Registration::Joined(shared);
        }

        if let Some(ready) = recheck() {
            return Registration::Ready(ready);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = InFlightGuard {
            registry: Arc::clone(self),
            key: key.to_string(),
            id,
        };
        let shared = start(guard).boxed().shared();
        if let Some(handle) = shared.downgrade() {
            entries.insert(key.to_string(), Entry { id, handle });
        }

        Registration::Started(shared)
    }

    /// Number of registered acquisitions.
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn remove(&self, key: &str, id: u64) {
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|entry| entry.id == id) {
            entries.remove(key);
        }
    }
}

/// Removes its registry entry when dropped, unless a newer one replaced it.
pub(crate) struct InFlightGuard {
    registry: Arc<InFlightRegistry>,
    key: String,
    id: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.key, self.id);
    }
}
