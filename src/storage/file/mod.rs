//! File tier: one rkyv record per key under a flat cache directory.

/// File tier error types.
pub mod error;


pub use error::{FileTierError, FileTierResult};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use rkyv::rancor::Error as RkyvError;
use rkyv::util::AlignedVec;
use rkyv::{from_bytes, to_bytes};

use crate::hashing::key_file_stem;
use crate::storage::FileRecord;

const RKYV_EXTENSION: &str = "rkyv";

const TEMP_EXTENSION: &str = "rkyv.tmp";

// Distinguishes temp files of overlapping writes to the same key.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
/// Stores and retrieves [`FileRecord`]s on disk, rejecting entries older than `ttl`.
///
/// All methods block; async callers run them on `spawn_blocking`.
pub struct FileTier {
    root: PathBuf,
    ttl: Duration,
}

impl FileTier {
    /// Creates a tier rooted at `root` whose entries live for `ttl`.
    pub fn new(root: PathBuf, ttl: Duration) -> Self {
        Self { root, ttl }
    }

    /// Returns the cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Ensures the cache directory exists.
    pub fn ensure_root(&self) -> FileTierResult<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|_| FileTierError::RootUnavailable {
                path: self.root.clone(),
            })?;
        }
        Ok(())
    }

    /// Path of the entry file for `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", key_file_stem(key), RKYV_EXTENSION))
    }

    fn temp_entry_path(&self, key: &str) -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(
            "{}.{}-{}.{}",
            key_file_stem(key),
            std::process::id(),
            seq,
            TEMP_EXTENSION
        ))
    }

    /// Writes `record` atomically (temp file, fsync, rename).
    pub fn store(&self, record: &FileRecord) -> FileTierResult<()> {
        self.ensure_root()?;

        let bytes = to_bytes::<RkyvError>(record)
            .map_err(|e| FileTierError::Serialization(format!("{:?}", e)))?;

        let temp_path = self.temp_entry_path(&record.key);
        let final_path = self.entry_path(&record.key);

        let written = File::create(&temp_path)
            .and_then(|mut file| {
                file.write_all(&bytes)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp_path, &final_path));

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    /// Loads the record for `key`.
    ///
    /// Returns `Ok(None)` when the file is absent, older than the TTL (the file
    /// is then removed), or belongs to a different key.
    pub fn load(&self, key: &str) -> FileTierResult<Option<FileRecord>> {
        let path = self.entry_path(key);

        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if file_age(&metadata) > self.ttl {
            tracing::debug!(path = %path.display(), "file tier entry expired");
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove expired entry");
            }
            return Ok(None);
        }

        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut aligned = AlignedVec::<16>::with_capacity(raw.len());
        aligned.extend_from_slice(&raw);

        let record = from_bytes::<FileRecord, RkyvError>(&aligned)
            .map_err(|e| FileTierError::Serialization(format!("{:?}", e)))?;

        if record.key != key {
            tracing::warn!(
                path = %path.display(),
                expected = key,
                found = %record.key,
                "file tier key mismatch"
            );
            return Ok(None);
        }

        Ok(Some(record))
    }

    /// Deletes the entry for `key`; returns `true` if a file was removed.
    pub fn delete(&self, key: &str) -> FileTierResult<bool> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns `true` if an entry file for `key` exists (regardless of age).
    pub fn exists(&self, key: &str) -> bool {
        self.entry_path(key).exists()
    }

    /// Deletes entry and temp files older than `retention`, read or not.
    pub fn sweep(&self, retention: Duration) -> FileTierResult<SweepStats> {
        let mut stats = SweepStats::default();

        if !self.root.exists() {
            return Ok(stats);
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let ours = name.ends_with(&format!(".{}", RKYV_EXTENSION))
                || name.ends_with(&format!(".{}", TEMP_EXTENSION));
            if !ours {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };

            if file_age(&metadata) > retention {
                match fs::remove_file(&path) {
                    Ok(()) => stats.removed += 1,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "sweep failed to remove file");
                        stats.failed += 1;
                    }
                }
            } else {
                stats.kept += 1;
            }
        }

        Ok(stats)
    }
}

fn file_age(metadata: &fs::Metadata) -> Duration {
    metadata
        .modified()
        .ok()
        .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
        .unwrap_or(Duration::ZERO)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Outcome of a retention sweep.
pub struct SweepStats {
    /// Files deleted for exceeding the retention window.
    pub removed: usize,
    /// Files still within the window.
    pub kept: usize,
    /// Files that could not be deleted.
    pub failed: usize,
}
