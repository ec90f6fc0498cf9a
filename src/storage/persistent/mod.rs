//! Persistent tier: a key-based CRUD interface over any durable store.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod memory;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
#[cfg(any(test, feature = "mock"))]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

#[async_trait]
/// Durable key/value store backing the slowest cache tier.
///
/// The cache treats values as opaque bytes and never expires them here.
pub trait PersistentStore: Send + Sync {
    /// Reads the value stored under `key`.
    async fn get_by_key(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>>;
    /// Writes (or overwrites) the value under `key`.
    async fn set_by_key(&self, key: &str, value: &[u8]) -> PersistenceResult<()>;
    /// Deletes `key`; returns `true` if it existed.
    async fn delete_by_key(&self, key: &str) -> PersistenceResult<bool>;
}
