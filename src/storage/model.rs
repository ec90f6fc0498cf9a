//! Storage model types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rkyv::{Archive, Deserialize, Serialize};

use crate::cache::{CacheEntry, Tier};

/// File-tier record, stored as `rkyv` bytes.
///
/// The file name is derived from a hash of `key`, so the key is kept inside the
/// record to detect collisions and foreign files.
///
/// # Example
/// ```rust
/// use retrieval::storage::FileRecord;
///
/// let record = FileRecord {
///     key: "video-123".to_string(),
///     created_at: 1_702_500_000_000,
///     payload: b"hello".to_vec(),
/// };
/// assert_eq!(record.payload.len(), 5);
/// ```
#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
pub struct FileRecord {
    /// Caller key this record belongs to.
    pub key: String,
    /// Unix timestamp (milliseconds) when the value was first cached.
    pub created_at: i64,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

impl FileRecord {
    /// Converts into the tier-neutral entry view; `ttl` is the file tier TTL.
    pub fn into_entry(self, ttl: Duration) -> CacheEntry {
        CacheEntry {
            key: self.key,
            value: self.payload.into(),
            created_at: DateTime::<Utc>::from_timestamp_millis(self.created_at).unwrap_or_default(),
            ttl: Some(ttl),
            tier: Tier::File,
        }
    }
}
