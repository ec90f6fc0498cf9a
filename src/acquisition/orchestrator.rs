//! Prioritized fallback chain with per-strategy retry, backoff and cooldown.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::error::{AcquisitionError, AcquisitionResult, ErrorScope, SourceError};
use super::policy::RetryPolicy;
use super::strategy::Strategy;
use crate::config::Config;
use crate::payload::{MinSizeValidator, Payload, PayloadValidator};

/// A payload accepted from a strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquired {
    pub payload: Payload,
    pub strategy: String,
    /// Attempts made across the whole chain, including the successful one.
    pub attempts: u32,
}

struct Registration {
    strategy: Arc<dyn Strategy>,
    priority: u32,
    policy: RetryPolicy,
    // Shared by every caller of this orchestrator.
    cooldown_until: Mutex<Option<Instant>>,
}

impl Registration {
    fn cooling_down(&self, now: Instant) -> Option<Duration> {
        let mut until = self.cooldown_until.lock();
        match *until {
            Some(deadline) if deadline > now => Some(deadline - now),
            Some(_) => {
                *until = None;
                None
            }
            None => None,
        }
    }

    fn start_cooldown(&self, retry_after: Duration) {
        let deadline = Instant::now() + retry_after;
        let mut until = self.cooldown_until.lock();
        // Never shorten an existing gate.
        if until.is_none_or(|current| current < deadline) {
            *until = Some(deadline);
        }
    }
}

/// How one strategy's run ended.
enum StrategyOutcome {
    Done(Payload),
    Advance(String),
    Abort(String),
}

pub struct OrchestratorBuilder {
    default_policy: RetryPolicy,
    min_valid_payload_size: usize,
    timeout_slack: Duration,
    validator: Option<Arc<dyn PayloadValidator>>,
    entries: Vec<(u32, Arc<dyn Strategy>, Option<RetryPolicy>)>,
}

impl OrchestratorBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            default_policy: RetryPolicy::from_config(config),
            min_valid_payload_size: config.min_valid_payload_size,
            timeout_slack: config.timeout_slack,
            validator: None,
            entries: Vec::new(),
        }
    }

    /// Registers `strategy` at `priority` (lower runs first) with the default policy.
    pub fn strategy(mut self, priority: u32, strategy: Arc<dyn Strategy>) -> Self {
        self.entries.push((priority, strategy, None));
        self
    }

    /// Registers `strategy` with its own retry policy.
    pub fn strategy_with_policy(
        mut self,
        priority: u32,
        strategy: Arc<dyn Strategy>,
        policy: RetryPolicy,
    ) -> Self {
        self.entries.push((priority, strategy, Some(policy)));
        self
    }

    /// Adds a check run after the minimum-size check.
    pub fn validator(mut self, validator: Arc<dyn PayloadValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn build(self) -> AcquisitionOrchestrator {
        let default_policy = self.default_policy;
        let mut strategies: Vec<Registration> = self
            .entries
            .into_iter()
            .map(|(priority, strategy, policy)| Registration {
                strategy,
                priority,
                policy: policy.unwrap_or(default_policy),
                cooldown_until: Mutex::new(None),
            })
            .collect();
        // Stable: equal priorities keep registration order.
        strategies.sort_by_key(|r| r.priority);

        AcquisitionOrchestrator {
            strategies,
            min_size: MinSizeValidator::new(self.min_valid_payload_size),
            validator: self.validator,
            timeout_slack: self.timeout_slack,
        }
    }
}

/// Runs the strategy chain for a key until one yields a valid payload.
pub struct AcquisitionOrchestrator {
    strategies: Vec<Registration>,
    min_size: MinSizeValidator,
    validator: Option<Arc<dyn PayloadValidator>>,
    timeout_slack: Duration,
}

impl std::fmt::Debug for AcquisitionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionOrchestrator")
            .field("strategies", &self.strategy_names())
            .field("min_size", &self.min_size.min_len())
            .field("timeout_slack", &self.timeout_slack)
            .finish()
    }
}

impl AcquisitionOrchestrator {
    pub fn builder(config: &Config) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    /// Strategy names in the order they are tried.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|r| r.strategy.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Upper bound on one [`acquire`](Self::acquire) call.
    pub fn operation_budget(&self) -> Duration {
        self.strategies
            .iter()
            .map(|r| r.policy.worst_case())
            .fold(self.timeout_slack, Duration::saturating_add)
    }

    /// Time left on `name`'s rate-limit cooldown, if any.
    pub fn cooldown_remaining(&self, name: &str) -> Option<Duration> {
        let now = Instant::now();
        self.strategies
            .iter()
            .find(|r| r.strategy.name() == name)
            .and_then(|r| r.cooling_down(now))
    }

    /// Tries each strategy in priority order until one succeeds.
    #[instrument(skip(self))]
    pub async fn acquire(&self, key: &str) -> AcquisitionResult<Acquired> {
        if self.strategies.is_empty() {
            return Err(AcquisitionError::NoStrategies);
        }

        let budget = self.operation_budget();
        match tokio::time::timeout(budget, self.run_chain(key)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(budget_ms = budget.as_millis() as u64, "acquisition timed out");
                Err(AcquisitionError::TimedOut { budget })
            }
        }
    }

    async fn run_chain(&self, key: &str) -> AcquisitionResult<Acquired> {
        let mut attempts = 0u32;
        let mut last_error = String::from("every strategy was cooling down");

        for registration in &self.strategies {
            let name = registration.strategy.name();

            if let Some(remaining) = registration.cooling_down(Instant::now()) {
                debug!(
                    strategy = name,
                    remaining_ms = remaining.as_millis() as u64,
                    "strategy cooling down, skipping"
                );
                continue;
            }

            match self.run_strategy(registration, key, &mut attempts).await {
                StrategyOutcome::Done(payload) => {
                    info!(strategy = name, attempts, size = payload.len(), "acquired");
                    return Ok(Acquired {
                        payload,
                        strategy: name.to_string(),
                        attempts,
                    });
                }
                StrategyOutcome::Advance(reason) => {
                    debug!(strategy = name, reason = %reason, "advancing to next strategy");
                    last_error = format!("{name}: {reason}");
                }
                StrategyOutcome::Abort(reason) => {
                    warn!(strategy = name, reason = %reason, "content unavailable, aborting chain");
                    return Err(AcquisitionError::Aborted {
                        strategy: name.to_string(),
                        reason,
                    });
                }
            }
        }

        Err(AcquisitionError::Exhausted {
            attempts,
            last_error,
        })
    }

    async fn run_strategy(
        &self,
        registration: &Registration,
        key: &str,
        attempts: &mut u32,
    ) -> StrategyOutcome {
        let name = registration.strategy.name();
        let policy = registration.policy;
        let mut last_reason = String::from("no attempts made");

        for attempt_index in 0..policy.max_retries {
            // Another caller may have closed the gate while we backed off.
            if let Some(remaining) = registration.cooling_down(Instant::now()) {
                debug!(
                    strategy = name,
                    remaining_ms = remaining.as_millis() as u64,
                    "strategy started cooling down mid-retry"
                );
                return StrategyOutcome::Advance(format!("cooling down for {remaining:?}"));
            }

            *attempts += 1;
            debug!(strategy = name, attempt = attempt_index + 1, "attempting");

            let result =
                tokio::time::timeout(policy.attempt_timeout, registration.strategy.attempt(key))
                    .await;

            let reason = match result {
                Ok(Ok(payload)) => match self.check(&payload) {
                    Ok(()) => return StrategyOutcome::Done(payload),
                    Err(reason) => format!("invalid payload: {reason}"),
                },
                Ok(Err(SourceError::Retriable { reason })) => reason,
                Ok(Err(SourceError::Unrecoverable {
                    scope: ErrorScope::Strategy,
                    reason,
                })) => return StrategyOutcome::Advance(reason),
                Ok(Err(SourceError::Unrecoverable {
                    scope: ErrorScope::Content,
                    reason,
                })) => return StrategyOutcome::Abort(reason),
                Ok(Err(SourceError::RateLimited { retry_after })) => {
                    warn!(
                        strategy = name,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "rate limited, cooling down"
                    );
                    registration.start_cooldown(retry_after);
                    return StrategyOutcome::Advance(format!(
                        "rate limited for {retry_after:?}"
                    ));
                }
                Err(_) => format!("attempt timed out after {:?}", policy.attempt_timeout),
            };

            debug!(strategy = name, attempt = attempt_index + 1, reason = %reason, "attempt failed");
            last_reason = reason;

            if attempt_index + 1 < policy.max_retries {
                tokio::time::sleep(policy.delay_for(attempt_index)).await;
            }
        }

        StrategyOutcome::Advance(format!(
            "{} attempts failed, last: {}",
            policy.max_retries, last_reason
        ))
    }

    fn check(&self, payload: &Payload) -> Result<(), String> {
        self.min_size.validate(payload)?;
        match &self.validator {
            Some(validator) => validator.validate(payload),
            None => Ok(()),
        }
    }
}
