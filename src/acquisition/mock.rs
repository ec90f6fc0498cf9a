//! Scripted strategy for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{SourceError, SourceResult};
use super::strategy::Strategy;
use crate::payload::Payload;

/// Returns queued outcomes in order, then `otherwise` forever.
pub struct ScriptedStrategy {
    name: String,
    script: Mutex<VecDeque<SourceResult<Payload>>>,
    otherwise: SourceResult<Payload>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    keys: Mutex<Vec<String>>,
}

impl ScriptedStrategy {
    /// A strategy that fails retriably once its script runs out.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            otherwise: Err(SourceError::retriable("script exhausted")),
            delay: None,
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
        }
    }

    /// A strategy that always returns `payload`.
    pub fn succeeding(name: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self::new(name).otherwise(Ok(payload.into()))
    }

    /// A strategy that always fails with `error`.
    pub fn failing(name: impl Into<String>, error: SourceError) -> Self {
        Self::new(name).otherwise(Err(error))
    }

    pub fn then_ok(self, payload: impl Into<Payload>) -> Self {
        self.script.lock().push_back(Ok(payload.into()));
        self
    }

    pub fn then_err(self, error: SourceError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    pub fn otherwise(mut self, outcome: SourceResult<Payload>) -> Self {
        self.otherwise = outcome;
        self
    }

    /// Sleeps for `delay` (tokio time) before answering each attempt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Keys passed to `attempt`, in call order.
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().clone()
    }
}

#[async_trait]
impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, key: &str) -> SourceResult<Payload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys.lock().push(key.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.otherwise.clone())
    }
}

impl std::fmt::Debug for ScriptedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedStrategy")
            .field("name", &self.name)
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}
