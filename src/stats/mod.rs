//! Cache counters and the health signal derived from them.
//!
//! A [`StatsCollector`] belongs to one service instance. There is no global
//! collector; two services never share counters.

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::cache::Tier;
use crate::constants::DEFAULT_HEALTH_THRESHOLD;

/// Per-tier counter triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub hits: u64,
    pub writes: u64,
    pub evictions: u64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub evictions: u64,
    pub memory: TierCounts,
    pub file: TierCounts,
    pub persistent: TierCounts,
}

impl CacheStats {
    /// `hits / (hits + misses)`, or `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn tier(&self, tier: Tier) -> TierCounts {
        match tier {
            Tier::Memory => self.memory,
            Tier::File => self.file,
            Tier::Persistent => self.persistent,
        }
    }
}

/// Result of [`StatsCollector::health_check`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthReport {
    pub hit_rate: f64,
    pub lookups: u64,
    pub threshold: f64,
    /// Set when at least one lookup happened and `hit_rate < threshold`.
    pub warning: bool,
}

#[derive(Debug, Default)]
struct TierCounters {
    hits: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
}

impl TierCounters {
    fn snapshot(&self) -> TierCounts {
        TierCounts {
            hits: self.hits.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Lock-free hit/miss/write/eviction counters.
#[derive(Debug)]
pub struct StatsCollector {
    misses: AtomicU64,
    tiers: [TierCounters; 3],
    health_threshold: f64,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_HEALTH_THRESHOLD)
    }
}

impl StatsCollector {
    /// Creates zeroed counters that warn below `health_threshold`.
    pub fn new(health_threshold: f64) -> Self {
        Self {
            misses: AtomicU64::new(0),
            tiers: Default::default(),
            health_threshold,
        }
    }

    pub fn health_threshold(&self) -> f64 {
        self.health_threshold
    }

    #[inline]
    pub fn record_hit(&self, tier: Tier) {
        self.tiers[tier.index()].hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write(&self, tier: Tier) {
        self.tiers[tier.index()].writes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_eviction(&self, tier: Tier) {
        self.tiers[tier.index()]
            .evictions
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        let memory = self.tiers[Tier::Memory.index()].snapshot();
        let file = self.tiers[Tier::File.index()].snapshot();
        let persistent = self.tiers[Tier::Persistent.index()].snapshot();

        CacheStats {
            hits: memory.hits + file.hits + persistent.hits,
            misses: self.misses.load(Ordering::Relaxed),
            writes: memory.writes + file.writes + persistent.writes,
            evictions: memory.evictions + file.evictions + persistent.evictions,
            memory,
            file,
            persistent,
        }
    }

    pub fn health_check(&self) -> HealthReport {
        let stats = self.snapshot();
        let hit_rate = stats.hit_rate();
        let lookups = stats.lookups();

        HealthReport {
            hit_rate,
            lookups,
            threshold: self.health_threshold,
            warning: lookups > 0 && hit_rate < self.health_threshold,
        }
    }
}
