use thiserror::Error;

#[derive(Error, Debug)]
/// Errors returned by a [`super::PersistentStore`].
///
/// The tier manager logs and swallows these; they never fail a lookup.
pub enum PersistenceError {
    /// The backing store rejected or failed the operation.
    #[error("persistent store error: {0}")]
    Backend(String),

    /// The store could not be reached or opened.
    #[error("persistent store unavailable: {0}")]
    Unavailable(String),

    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(e: rusqlite::Error) -> Self {
        PersistenceError::Backend(e.to_string())
    }
}

/// Convenience result type for persistent store operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;
