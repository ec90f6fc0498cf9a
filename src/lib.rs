//! Resilient keyed retrieval over a three-tier cache.
//!
//! A [`ResilientRetrievalService`] answers `get(key)` from the fastest cache
//! tier holding the key (memory, then file, then an optional persistent
//! store). On a full miss it runs a prioritized chain of [`Strategy`]s with
//! per-strategy retry, exponential backoff and rate-limit cooldowns, writes the
//! result through every tier and hands it to every concurrent caller of the
//! same key. Keys no strategy can produce come back as [`Lookup::NotFound`]
//! and are never cached.
//!
//! ```no_run
//! use std::sync::Arc;
//! use retrieval::{CommandStrategy, Config, HttpStrategy, ResilientRetrievalService};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let service = ResilientRetrievalService::builder(config)
//!     .strategy(1, Arc::new(HttpStrategy::new("api", "https://example.com/items/{key}")))
//!     .strategy(2, Arc::new(CommandStrategy::new("fetcher", "fetch-item").arg("{key}")))
//!     .build()
//!     .await?;
//!
//! if let Some(value) = service.get("item-42").await.value() {
//!     println!("{} bytes", value.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//! - [`service`]: the facade and in-flight deduplication
//! - [`cache`]: memory tier and the tier manager
//! - [`storage`]: file tier records and persistent stores
//! - [`acquisition`]: strategies, retry policy and the orchestrator
//! - [`stats`]: hit/miss counters and the health signal
//!
//! ## Test/Mock Support
//! `ScriptedStrategy` and `MemoryStore` are available behind
//! `#[cfg(any(test, feature = "mock"))]`.

pub mod acquisition;
pub mod cache;
pub mod config;
pub mod constants;
pub mod hashing;
pub mod payload;
pub mod service;
pub mod stats;
pub mod storage;
pub mod telemetry;

#[cfg(any(test, feature = "mock"))]
pub use acquisition::ScriptedStrategy;
pub use acquisition::{
    Acquired, AcquisitionError, AcquisitionOrchestrator, AcquisitionResult, CommandStrategy,
    ErrorScope, HttpStrategy, RetryPolicy, SourceError, SourceResult, Strategy,
};
pub use cache::{CacheEntry, CacheTierManager, EvictionListener, MemoryTier, SetOptions, Tier};
pub use config::{Config, ConfigError};
pub use hashing::{hash_key, key_file_stem};
pub use payload::{MinSizeValidator, Payload, PayloadValidator};
pub use service::{Lookup, ResilientRetrievalService, RetrievalResult, ServiceBuilder};
pub use stats::{CacheStats, HealthReport, StatsCollector, TierCounts};
#[cfg(any(test, feature = "mock"))]
pub use storage::MemoryStore;
pub use storage::{
    FileRecord, FileTier, FileTierError, PersistenceError, PersistentStore, SqliteStore,
};
pub use telemetry::init_tracing;
