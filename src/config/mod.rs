//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `RETRIEVAL_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ATTEMPT_TIMEOUT_MS, DEFAULT_BASE_DELAY_MS, DEFAULT_CAP_DELAY_MS,
    DEFAULT_FILE_RETENTION_DAYS, DEFAULT_FILE_TTL_HOURS, DEFAULT_HEALTH_THRESHOLD,
    DEFAULT_MAX_RETRIES, DEFAULT_MEMORY_CAPACITY, DEFAULT_MEMORY_TTL_MINUTES,
    DEFAULT_MIN_VALID_PAYLOAD_SIZE, DEFAULT_TIMEOUT_SLACK_MS, SECS_PER_DAY, SECS_PER_HOUR,
    SECS_PER_MINUTE,
};

/// Retrieval configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `RETRIEVAL_*` overrides on top of defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the file tier. Default: `./.cache/retrieval`.
    pub cache_dir: PathBuf,

    /// Memory-tier entry lifetime. Default: 30 minutes.
    pub memory_ttl: Duration,

    /// File-tier entry lifetime. Default: 24 hours.
    pub file_ttl: Duration,

    /// Files older than this are deleted by the startup sweep. Default: 7 days.
    pub file_retention: Duration,

    /// Max entries in the memory tier. Default: `1000`.
    pub memory_capacity: usize,

    /// Attempts per strategy before advancing. Default: `3`.
    pub max_retries: u32,

    /// First backoff delay. Default: 1s.
    pub base_delay: Duration,

    /// Backoff ceiling. Default: 30s.
    pub cap_delay: Duration,

    /// Upper bound for a single strategy attempt. Default: 30s.
    pub attempt_timeout: Duration,

    /// Added to the summed retry budgets to bound one acquisition. Default: 5s.
    pub timeout_slack: Duration,

    /// Smallest accepted payload in bytes. Default: `1`.
    pub min_valid_payload_size: usize,

    /// Hit rate under which `health_check` warns. Default: `0.3`.
    pub health_threshold: f64,
}

/// Default file-tier directory used when `RETRIEVAL_CACHE_DIR` is not set.
pub const DEFAULT_CACHE_DIR: &str = "./.cache/retrieval";

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            memory_ttl: Duration::from_secs(DEFAULT_MEMORY_TTL_MINUTES * SECS_PER_MINUTE),
            file_ttl: Duration::from_secs(DEFAULT_FILE_TTL_HOURS * SECS_PER_HOUR),
            file_retention: Duration::from_secs(DEFAULT_FILE_RETENTION_DAYS * SECS_PER_DAY),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            cap_delay: Duration::from_millis(DEFAULT_CAP_DELAY_MS),
            attempt_timeout: Duration::from_millis(DEFAULT_ATTEMPT_TIMEOUT_MS),
            timeout_slack: Duration::from_millis(DEFAULT_TIMEOUT_SLACK_MS),
            min_valid_payload_size: DEFAULT_MIN_VALID_PAYLOAD_SIZE,
            health_threshold: DEFAULT_HEALTH_THRESHOLD,
        }
    }
}

impl Config {
    const ENV_CACHE_DIR: &'static str = "RETRIEVAL_CACHE_DIR";
    const ENV_MEMORY_TTL_MINUTES: &'static str = "RETRIEVAL_MEMORY_TTL_MINUTES";
    const ENV_FILE_TTL_HOURS: &'static str = "RETRIEVAL_FILE_TTL_HOURS";
    const ENV_FILE_RETENTION_DAYS: &'static str = "RETRIEVAL_FILE_RETENTION_DAYS";
    const ENV_MEMORY_CAPACITY: &'static str = "RETRIEVAL_MEMORY_CAPACITY";
    const ENV_MAX_RETRIES: &'static str = "RETRIEVAL_MAX_RETRIES";
    const ENV_BASE_DELAY_MS: &'static str = "RETRIEVAL_BASE_DELAY_MS";
    const ENV_CAP_DELAY_MS: &'static str = "RETRIEVAL_CAP_DELAY_MS";
    const ENV_ATTEMPT_TIMEOUT_MS: &'static str = "RETRIEVAL_ATTEMPT_TIMEOUT_MS";
    const ENV_TIMEOUT_SLACK_MS: &'static str = "RETRIEVAL_TIMEOUT_SLACK_MS";
    const ENV_MIN_VALID_PAYLOAD_SIZE: &'static str = "RETRIEVAL_MIN_VALID_PAYLOAD_SIZE";
    const ENV_HEALTH_THRESHOLD: &'static str = "RETRIEVAL_HEALTH_THRESHOLD";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cache_dir = Self::parse_path_from_env(Self::ENV_CACHE_DIR, defaults.cache_dir);
        let memory_ttl = Self::parse_duration_from_env(
            Self::ENV_MEMORY_TTL_MINUTES,
            SECS_PER_MINUTE,
            defaults.memory_ttl,
        )?;
        let file_ttl =
            Self::parse_duration_from_env(Self::ENV_FILE_TTL_HOURS, SECS_PER_HOUR, defaults.file_ttl)?;
        let file_retention = Self::parse_duration_from_env(
            Self::ENV_FILE_RETENTION_DAYS,
            SECS_PER_DAY,
            defaults.file_retention,
        )?;
        let memory_capacity =
            Self::parse_u64_from_env(Self::ENV_MEMORY_CAPACITY, defaults.memory_capacity as u64)?
                as usize;
        let max_retries =
            Self::parse_u64_from_env(Self::ENV_MAX_RETRIES, u64::from(defaults.max_retries))?;
        let max_retries = u32::try_from(max_retries).map_err(|_| ConfigError::OutOfRange {
            name: Self::ENV_MAX_RETRIES,
            reason: format!("{} does not fit in 32 bits", max_retries),
        })?;
        let base_delay = Self::parse_millis_from_env(Self::ENV_BASE_DELAY_MS, defaults.base_delay)?;
        let cap_delay = Self::parse_millis_from_env(Self::ENV_CAP_DELAY_MS, defaults.cap_delay)?;
        let attempt_timeout =
            Self::parse_millis_from_env(Self::ENV_ATTEMPT_TIMEOUT_MS, defaults.attempt_timeout)?;
        let timeout_slack =
            Self::parse_millis_from_env(Self::ENV_TIMEOUT_SLACK_MS, defaults.timeout_slack)?;
        let min_valid_payload_size = Self::parse_u64_from_env(
            Self::ENV_MIN_VALID_PAYLOAD_SIZE,
            defaults.min_valid_payload_size as u64,
        )? as usize;
        let health_threshold =
            Self::parse_f64_from_env(Self::ENV_HEALTH_THRESHOLD, defaults.health_threshold)?;

        Ok(Self {
            cache_dir,
            memory_ttl,
            file_ttl,
            file_retention,
            memory_capacity,
            max_retries,
            base_delay,
            cap_delay,
            attempt_timeout,
            timeout_slack,
            min_valid_payload_size,
            health_threshold,
        })
    }

    /// Validates basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_dir.exists() && !self.cache_dir.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.cache_dir.clone(),
            });
        }

        if self.memory_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_MEMORY_CAPACITY,
                reason: "memory tier needs room for at least one entry".to_string(),
            });
        }

        if self.max_retries == 0 {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_MAX_RETRIES,
                reason: "each strategy needs at least one attempt".to_string(),
            });
        }

        if self.base_delay > self.cap_delay {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_BASE_DELAY_MS,
                reason: format!(
                    "base delay {:?} exceeds cap delay {:?}",
                    self.base_delay, self.cap_delay
                ),
            });
        }

        if self.attempt_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_ATTEMPT_TIMEOUT_MS,
                reason: "attempt timeout must be positive".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.health_threshold) {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_HEALTH_THRESHOLD,
                reason: format!("{} is not within [0, 1]", self.health_threshold),
            });
        }

        Ok(())
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(default)
    }

    fn parse_u64_from_env(var_name: &'static str, default: u64) -> Result<u64, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| ConfigError::IntParseError {
                    name: var_name,
                    value,
                    source: e,
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_f64_from_env(var_name: &'static str, default: f64) -> Result<f64, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| ConfigError::FloatParseError {
                    name: var_name,
                    value,
                    source: e,
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_millis_from_env(
        var_name: &'static str,
        default: Duration,
    ) -> Result<Duration, ConfigError> {
        match env::var(var_name) {
            Ok(_) => Self::parse_u64_from_env(var_name, 0).map(Duration::from_millis),
            Err(_) => Ok(default),
        }
    }

    fn parse_duration_from_env(
        var_name: &'static str,
        secs_per_unit: u64,
        default: Duration,
    ) -> Result<Duration, ConfigError> {
        match env::var(var_name) {
            Ok(_) => {
                let units = Self::parse_u64_from_env(var_name, 0)?;
                let secs = units
                    .checked_mul(secs_per_unit)
                    .ok_or_else(|| ConfigError::OutOfRange {
                        name: var_name,
                        reason: format!("{} overflows a duration", units),
                    })?;
                Ok(Duration::from_secs(secs))
            }
            Err(_) => Ok(default),
        }
    }
}
