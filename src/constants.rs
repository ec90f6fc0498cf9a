//! Cross-cutting defaults shared by the config layer and the cache tiers.
//!
//! Durations are kept in the unit the environment variables use so the
//! `Config` defaults and the docs cannot drift apart.

/// Default memory-tier TTL in minutes.
pub const DEFAULT_MEMORY_TTL_MINUTES: u64 = 30;
/// Default file-tier TTL in hours.
pub const DEFAULT_FILE_TTL_HOURS: u64 = 24;
/// Default file-tier retention window in days (startup sweep).
pub const DEFAULT_FILE_RETENTION_DAYS: u64 = 7;
/// Default memory-tier capacity (entry count).
pub const DEFAULT_MEMORY_CAPACITY: usize = 1_000;

/// Default attempts per strategy.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default first backoff delay.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
/// Default backoff ceiling.
pub const DEFAULT_CAP_DELAY_MS: u64 = 30_000;
/// Default per-attempt timeout.
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 30_000;
/// Slack added on top of the summed retry budgets for the whole acquisition.
pub const DEFAULT_TIMEOUT_SLACK_MS: u64 = 5_000;

/// Smallest accepted payload, in bytes.
pub const DEFAULT_MIN_VALID_PAYLOAD_SIZE: usize = 1;

/// Hit rate below which `health_check` raises a warning.
pub const DEFAULT_HEALTH_THRESHOLD: f64 = 0.3;

/// Cooldown applied when a rate-limited source gives no usable `Retry-After`.
pub const DEFAULT_RATE_LIMIT_COOLDOWN_SECS: u64 = 60;

pub const SECS_PER_MINUTE: u64 = 60;
pub const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
pub const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;
