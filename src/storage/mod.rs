//! Storage primitives backing the file and persistent tiers.

pub mod file;
mod model;
pub mod persistent;

pub use file::{FileTier, FileTierError, FileTierResult, SweepStats};
pub use model::{ArchivedFileRecord, FileRecord};
#[cfg(any(test, feature = "mock"))]
pub use persistent::MemoryStore;
pub use persistent::{
    PersistenceError, PersistenceResult, PersistentStore, SqliteStore,
};
