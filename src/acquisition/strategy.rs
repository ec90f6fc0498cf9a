use async_trait::async_trait;

use super::error::SourceResult;
use crate::payload::Payload;

#[async_trait]
/// One way of fetching a payload for a key from an external source.
///
/// `attempt` makes a single try; retries, backoff and timeouts are applied by
/// the [`AcquisitionOrchestrator`](super::AcquisitionOrchestrator).
pub trait Strategy: Send + Sync {
    /// Stable name used in logs, cooldown tracking and `RetrievalResult::source_strategy`.
    fn name(&self) -> &str;

    async fn attempt(&self, key: &str) -> SourceResult<Payload>;
}
