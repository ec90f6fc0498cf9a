//! Opaque payload bytes and the acceptance checks applied to fresh acquisitions.

use std::fmt;
use std::sync::Arc;

/// Cheaply clonable, immutable payload.
///
/// The core never interprets the bytes; `as_str` is a convenience for the
/// common case of text payloads.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Payload(Arc<[u8]>);

impl Payload {
    /// Wraps raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the payload as UTF-8 text, if it is valid UTF-8.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(Arc::from(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::from_bytes(text.into_bytes())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::from(text.as_bytes())
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload").field("len", &self.len()).finish()
    }
}

/// Decides whether a freshly acquired payload is worth accepting.
///
/// Rejected payloads count as a retriable miss for the strategy that produced them.
pub trait PayloadValidator: Send + Sync {
    /// Returns `Err(reason)` to reject the payload.
    fn validate(&self, payload: &Payload) -> Result<(), String>;
}

/// Rejects empty payloads and payloads shorter than `min_len` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinSizeValidator {
    min_len: usize,
}

impl MinSizeValidator {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }
}

impl PayloadValidator for MinSizeValidator {
    fn validate(&self, payload: &Payload) -> Result<(), String> {
        if payload.is_empty() {
            return Err("payload is empty".to_string());
        }
        if payload.len() < self.min_len {
            return Err(format!(
                "payload is {} bytes, below the {} byte minimum",
                payload.len(),
                self.min_len
            ));
        }
        Ok(())
    }
}

impl<F> PayloadValidator for F
where
    F: Fn(&Payload) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, payload: &Payload) -> Result<(), String> {
        self(payload)
    }
}
