use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
/// Errors returned by the file tier.
pub enum FileTierError {
    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Cache root path is missing/unavailable.
    #[error("cache directory unavailable: {path}")]
    RootUnavailable {
        /// Path that was unavailable.
        path: PathBuf,
    },
}

/// Convenience result type for file tier operations.
pub type FileTierResult<T> = Result<T, FileTierError>;
