//! The retrieval facade: cache first, then one deduplicated acquisition per key.

mod inflight;
mod types;


pub use types::{Lookup, RetrievalResult};

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::acquisition::{AcquisitionOrchestrator, OrchestratorBuilder, RetryPolicy, Strategy};
use crate::cache::{CacheTierManager, EvictionListener, SetOptions, Tier};
use crate::config::{Config, ConfigError};
use crate::payload::{Payload, PayloadValidator};
use crate::stats::{CacheStats, HealthReport, StatsCollector};
use crate::storage::PersistentStore;

use inflight::{InFlightRegistry, Registration};

struct Inner {
    cache: CacheTierManager,
    orchestrator: AcquisitionOrchestrator,
    stats: Arc<StatsCollector>,
    in_flight: Arc<InFlightRegistry>,
}

/// Resilient keyed retrieval over a tiered cache and a strategy chain.
///
/// Cloning is cheap; clones share caches, counters, cooldowns and in-flight
/// acquisitions.
#[derive(Clone)]
pub struct ResilientRetrievalService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ResilientRetrievalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientRetrievalService")
            .field("cache", &self.inner.cache)
            .field("orchestrator", &self.inner.orchestrator)
            .field("in_flight", &self.inner.in_flight.len())
            .finish()
    }
}

impl ResilientRetrievalService {
    pub fn builder(config: Config) -> ServiceBuilder {
        ServiceBuilder::new(config)
    }

    /// Returns the value for `key` from the fastest tier holding it, acquiring
    /// it through the strategy chain on a full miss.
    ///
    /// Concurrent calls for the same key share one acquisition. Failures are
    /// returned as [`Lookup::NotFound`] and are not cached.
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Lookup {
        let started = Instant::now();

        if let Some((value, tier)) = self.inner.cache.get_with_tier(key).await {
            return Lookup::Found(RetrievalResult {
                value,
                source_strategy: None,
                tier: Some(tier),
                latency: started.elapsed(),
            });
        }

        let registration = self.inner.in_flight.join_or_start(
            key,
            || self.recheck_memory(key),
            |guard| {
                let inner = Arc::clone(&self.inner);
                let key = key.to_string();
                async move {
                    let _guard = guard;
                    let outcome = inner.orchestrator.acquire(&key).await;
                    if let Ok(acquired) = &outcome {
                        inner
                            .cache
                            .set(&key, acquired.payload.clone(), SetOptions::default())
                            .await;
                    }
                    outcome
                }
            },
        );

        let shared = match registration {
            Registration::Ready(value) => {
                return Lookup::Found(RetrievalResult {
                    value,
                    source_strategy: None,
                    tier: Some(Tier::Memory),
                    latency: started.elapsed(),
                });
            }
            Registration::Joined(shared) => {
                debug!("joining in-flight acquisition");
                shared
            }
            Registration::Started(shared) => {
                debug!("starting acquisition");
                shared
            }
        };

        match shared.await {
            Ok(acquired) => Lookup::Found(RetrievalResult {
                value: acquired.payload,
                source_strategy: Some(acquired.strategy),
                tier: None,
                latency: started.elapsed(),
            }),
            Err(reason) => {
                info!(reason = %reason, "not found");
                Lookup::NotFound(reason)
            }
        }
    }

    // The tiered lookup already counted this call as a miss.
    fn recheck_memory(&self, key: &str) -> Option<Payload> {
        self.inner.cache.memory().get(key)
    }

    /// Writes `value` to every tier.
    pub async fn set(&self, key: &str, value: impl Into<Payload>) {
        self.inner
            .cache
            .set(key, value.into(), SetOptions::default())
            .await;
    }

    pub async fn set_with_options(&self, key: &str, value: impl Into<Payload>, options: SetOptions) {
        self.inner.cache.set(key, value.into(), options).await;
    }

    /// Removes `key` from every tier.
    pub async fn invalidate(&self, key: &str) {
        self.inner.cache.invalidate(key).await;
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot()
    }

    pub fn health_check(&self) -> HealthReport {
        self.inner.stats.health_check()
    }

    pub fn cache(&self) -> &CacheTierManager {
        &self.inner.cache
    }

    pub fn orchestrator(&self) -> &AcquisitionOrchestrator {
        &self.inner.orchestrator
    }

    /// Number of keys with an acquisition in progress.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.len()
    }
}

pub struct ServiceBuilder {
    config: Config,
    orchestrator: OrchestratorBuilder,
    persistent: Option<Arc<dyn PersistentStore>>,
    eviction_listener: Option<EvictionListener>,
}

impl ServiceBuilder {
    pub fn new(config: Config) -> Self {
        let orchestrator = OrchestratorBuilder::new(&config);
        Self {
            config,
            orchestrator,
            persistent: None,
            eviction_listener: None,
        }
    }

    /// Registers `strategy` at `priority` (lower runs first).
    pub fn strategy(mut self, priority: u32, strategy: Arc<dyn Strategy>) -> Self {
        self.orchestrator = self.orchestrator.strategy(priority, strategy);
        self
    }

    pub fn strategy_with_policy(
        mut self,
        priority: u32,
        strategy: Arc<dyn Strategy>,
        policy: RetryPolicy,
    ) -> Self {
        self.orchestrator = self
            .orchestrator
            .strategy_with_policy(priority, strategy, policy);
        self
    }

    pub fn validator(mut self, validator: Arc<dyn PayloadValidator>) -> Self {
        self.orchestrator = self.orchestrator.validator(validator);
        self
    }

    pub fn persistent_store(mut self, store: Arc<dyn PersistentStore>) -> Self {
        self.persistent = Some(store);
        self
    }

    pub fn eviction_listener(mut self, listener: EvictionListener) -> Self {
        self.eviction_listener = Some(listener);
        self
    }

    /// Validates the config, then sweeps stale files out of the file tier.
    pub async fn build(self) -> Result<ResilientRetrievalService, ConfigError> {
        self.config.validate()?;

        let stats = Arc::new(StatsCollector::new(self.config.health_threshold));
        let mut cache = CacheTierManager::new(&self.config, Arc::clone(&stats));
        if let Some(store) = self.persistent {
            cache = cache.with_persistent(store);
        }
        if let Some(listener) = self.eviction_listener {
            cache = cache.with_eviction_listener(listener);
        }
        cache.sweep_files().await;

        let orchestrator = self.orchestrator.build();
        info!(
            strategies = ?orchestrator.strategy_names(),
            cache_dir = %self.config.cache_dir.display(),
            persistent = cache.has_persistent(),
            "retrieval service ready"
        );

        Ok(ResilientRetrievalService {
            inner: Arc::new(Inner {
                cache,
                orchestrator,
                stats,
                in_flight: InFlightRegistry::new(),
            }),
        })
    }
}
