use std::time::Duration;

use crate::acquisition::AcquisitionError;
use crate::cache::Tier;
use crate::payload::Payload;

/// A successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub value: Payload,
    /// Strategy that produced the value; `None` when a cache tier answered.
    pub source_strategy: Option<String>,
    /// Tier that answered; `None` for a fresh acquisition.
    pub tier: Option<Tier>,
    pub latency: Duration,
}

impl RetrievalResult {
    pub fn from_cache(&self) -> bool {
        self.tier.is_some()
    }
}

/// Outcome of [`ResilientRetrievalService::get`](super::ResilientRetrievalService::get).
///
/// A key no strategy could produce is an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(RetrievalResult),
    NotFound(AcquisitionError),
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(&self) -> Option<&RetrievalResult> {
        match self {
            Lookup::Found(result) => Some(result),
            Lookup::NotFound(_) => None,
        }
    }

    pub fn value(&self) -> Option<&Payload> {
        self.found().map(|result| &result.value)
    }

    pub fn into_result(self) -> Result<RetrievalResult, AcquisitionError> {
        match self {
            Lookup::Found(result) => Ok(result),
            Lookup::NotFound(reason) => Err(reason),
        }
    }
}
