//! Tiered cache: memory, then file, then the optional persistent store.
//!
//! Reads fall through the tiers fastest-first and promote a hit into every
//! faster tier. Writes go to every tier; only the memory write is required to
//! succeed, file and persistent failures are logged and swallowed.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::locks::KeyLocks;
use super::memory::MemoryTier;
use super::types::{CacheEntry, SetOptions, Tier};
use crate::config::Config;
use crate::payload::Payload;
use crate::stats::StatsCollector;
use crate::storage::{FileRecord, FileTier, PersistentStore, SweepStats};

/// Called with the evicted key and the tier it left.
pub type EvictionListener = Arc<dyn Fn(&str, Tier) + Send + Sync>;

pub struct CacheTierManager {
    memory: MemoryTier,
    file: FileTier,
    persistent: Option<Arc<dyn PersistentStore>>,
    stats: Arc<StatsCollector>,
    locks: KeyLocks,
    eviction_listener: Option<EvictionListener>,
    file_retention: std::time::Duration,
}

impl std::fmt::Debug for CacheTierManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheTierManager")
            .field("memory", &self.memory)
            .field("file", &self.file)
            .field("persistent", &self.persistent.is_some())
            .finish_non_exhaustive()
    }
}

impl CacheTierManager {
    /// Builds the memory and file tiers from `config`. No persistent store is attached.
    pub fn new(config: &Config, stats: Arc<StatsCollector>) -> Self {
        Self {
            memory: MemoryTier::new(config.memory_capacity, config.memory_ttl),
            file: FileTier::new(config.cache_dir.clone(), config.file_ttl),
            persistent: None,
            stats,
            locks: KeyLocks::new(),
            eviction_listener: None,
            file_retention: config.file_retention,
        }
    }

    pub fn with_persistent(mut self, store: Arc<dyn PersistentStore>) -> Self {
        self.persistent = Some(store);
        self
    }

    pub fn with_eviction_listener(mut self, listener: EvictionListener) -> Self {
        self.eviction_listener = Some(listener);
        self
    }

    pub fn memory(&self) -> &MemoryTier {
        &self.memory
    }

    pub fn file(&self) -> &FileTier {
        &self.file
    }

    pub fn has_persistent(&self) -> bool {
        self.persistent.is_some()
    }

    pub fn stats(&self) -> &Arc<StatsCollector> {
        &self.stats
    }

    /// Removes file-tier entries older than the retention window.
    ///
    /// Failures are logged; a broken cache directory never stops startup.
    pub async fn sweep_files(&self) -> SweepStats {
        let file = self.file.clone();
        let retention = self.file_retention;
        let result = tokio::task::spawn_blocking(move || {
            file.ensure_root()?;
            file.sweep(retention)
        })
        .await;

        match result {
            Ok(Ok(swept)) => {
                if swept.removed > 0 || swept.failed > 0 {
                    info!(
                        removed = swept.removed,
                        kept = swept.kept,
                        failed = swept.failed,
                        "file tier retention sweep"
                    );
                }
                for _ in 0..swept.removed {
                    self.stats.record_eviction(Tier::File);
                }
                swept
            }
            Ok(Err(e)) => {
                warn!(root = %self.file.root().display(), error = %e, "file tier sweep failed");
                SweepStats::default()
            }
            Err(e) => {
                warn!(error = %e, "file tier sweep task failed");
                SweepStats::default()
            }
        }
    }

    /// Looks `key` up across the tiers.
    pub async fn get(&self, key: &str) -> Option<Payload> {
        self.get_with_tier(key).await.map(|(value, _)| value)
    }

    /// Like [`get`](Self::get), also reporting which tier answered.
    ///
    /// Counts a hit for that tier, or one miss when every tier missed.
    #[instrument(skip(self))]
    pub async fn get_with_tier(&self, key: &str) -> Option<(Payload, Tier)> {
        if let Some(value) = self.memory.get(key) {
            debug!("memory tier hit");
            self.stats.record_hit(Tier::Memory);
            return Some((value, Tier::Memory));
        }

        let _guard = self.locks.lock(key).await;

        // Filled by a concurrent promotion or set while we waited for the lock.
        if let Some(value) = self.memory.get(key) {
            debug!("memory tier hit after lock");
            self.stats.record_hit(Tier::Memory);
            return Some((value, Tier::Memory));
        }

        if let Some(record) = self.load_file(key).await {
            debug!("file tier hit, promoting to memory");
            let value = Payload::from(record.payload);
            self.write_memory(key, value.clone());
            self.stats.record_hit(Tier::File);
            return Some((value, Tier::File));
        }

        if let Some(bytes) = self.load_persistent(key).await {
            debug!("persistent tier hit, promoting to file and memory");
            let value = Payload::from(bytes);
            self.write_memory(key, value.clone());
            self.write_file(key, &value).await;
            self.stats.record_hit(Tier::Persistent);
            return Some((value, Tier::Persistent));
        }

        debug!("cache miss");
        self.stats.record_miss();
        None
    }

    /// Reads the file-tier entry for `key` without promoting it or counting a lookup.
    pub async fn file_entry(&self, key: &str) -> Option<CacheEntry> {
        let ttl = self.file.ttl();
        self.load_file(key)
            .await
            .map(|record| record.into_entry(ttl))
    }

    /// Writes `value` to every tier (persistent unless `options.skip_persistent`).
    #[instrument(skip(self, value), fields(size = value.len()))]
    pub async fn set(&self, key: &str, value: Payload, options: SetOptions) {
        let _guard = self.locks.lock(key).await;

        self.write_memory(key, value.clone());
        self.write_file(key, &value).await;
        if !options.skip_persistent {
            self.write_persistent(key, &value).await;
        }
    }

    /// Removes `key` from every tier.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, key: &str) {
        let _guard = self.locks.lock(key).await;

        self.memory.remove(key);

        let file = self.file.clone();
        let owned = key.to_string();
        match tokio::task::spawn_blocking(move || file.delete(&owned)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "file tier delete failed"),
            Err(e) => warn!(error = %e, "file tier delete task failed"),
        }

        if let Some(store) = &self.persistent
            && let Err(e) = store.delete_by_key(key).await
        {
            warn!(error = %e, "persistent tier delete failed");
        }
    }

    fn write_memory(&self, key: &str, value: Payload) {
        if let Some(evicted) = self.memory.insert(key, value) {
            debug!(evicted = %evicted, "memory tier eviction");
            self.stats.record_eviction(Tier::Memory);
            if let Some(listener) = &self.eviction_listener {
                listener(&evicted, Tier::Memory);
            }
        }
        self.stats.record_write(Tier::Memory);
    }

    async fn write_file(&self, key: &str, value: &Payload) {
        let record = FileRecord {
            key: key.to_string(),
            created_at: Utc::now().timestamp_millis(),
            payload: value.to_vec(),
        };
        let file = self.file.clone();

        match tokio::task::spawn_blocking(move || file.store(&record)).await {
            Ok(Ok(())) => self.stats.record_write(Tier::File),
            Ok(Err(e)) => warn!(error = %e, "file tier write failed"),
            Err(e) => warn!(error = %e, "file tier write task failed"),
        }
    }

    async fn write_persistent(&self, key: &str, value: &Payload) {
        let Some(store) = &self.persistent else {
            return;
        };
        match store.set_by_key(key, value.as_bytes()).await {
            Ok(()) => self.stats.record_write(Tier::Persistent),
            Err(e) => warn!(error = %e, "persistent tier write failed"),
        }
    }

    async fn load_file(&self, key: &str) -> Option<FileRecord> {
        let file = self.file.clone();
        let owned = key.to_string();

        match tokio::task::spawn_blocking(move || file.load(&owned)).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                warn!(error = %e, "file tier read failed, treating as miss");
                None
            }
            Err(e) => {
                warn!(error = %e, "file tier read task failed, treating as miss");
                None
            }
        }
    }

    async fn load_persistent(&self, key: &str) -> Option<Vec<u8>> {
        let store = self.persistent.as_ref()?;
        match store.get_by_key(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "persistent tier read failed, treating as miss");
                None
            }
        }
    }
}

#[cfg(test)]
impl CacheTierManager {
    pub(crate) fn active_key_locks(&self) -> usize {
        self.locks.active()
    }
}
