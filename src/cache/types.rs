use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::payload::Payload;

/// One storage layer in the cache hierarchy, fastest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Memory,
    File,
    Persistent,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Memory, Tier::File, Tier::Persistent];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Memory => "memory",
            Tier::File => "file",
            Tier::Persistent => "persistent",
        }
    }

    #[inline]
    pub(crate) fn index(&self) -> usize {
        match self {
            Tier::Memory => 0,
            Tier::File => 1,
            Tier::Persistent => 2,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached value as seen by one tier.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub value: Payload,
    pub created_at: DateTime<Utc>,
    /// `None` for tiers without expiry (persistent).
    pub ttl: Option<Duration>,
    pub tier: Tier,
}

impl CacheEntry {
    /// Returns `true` if the entry outlived its TTL at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => match chrono::Duration::from_std(ttl) {
                Ok(ttl) => now - self.created_at > ttl,
                Err(_) => false,
            },
            None => false,
        }
    }
}

/// Options for [`crate::cache::CacheTierManager::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Write memory and file tiers only.
    pub skip_persistent: bool,
}

impl SetOptions {
    pub fn skip_persistent() -> Self {
        Self {
            skip_persistent: true,
        }
    }
}
