//! Memory, file and persistent tiers behind one read/write interface.

mod locks;
pub mod memory;
pub mod tiered;
pub mod types;


pub use memory::MemoryTier;
pub use tiered::{CacheTierManager, EvictionListener};
pub use types::{CacheEntry, SetOptions, Tier};
