//! Shared fixtures for integration tests.

use std::sync::Arc;
use std::time::Duration;

use retrieval::{Config, ScriptedStrategy, Strategy};
use tempfile::TempDir;

pub const SAMPLE_KEY: &str = "dQw4w9WgXcQ";

pub const SAMPLE_TRANSCRIPT: &str = "WEBVTT\n\n00:00.000 --> 00:02.000\nnever gonna give you up\n";

/// Config rooted in `dir` with short backoffs so retry paths run quickly.
pub fn fast_config(dir: &TempDir) -> Config {
    Config {
        cache_dir: dir.path().join("cache"),
        memory_capacity: 8,
        max_retries: 3,
        base_delay: Duration::from_millis(5),
        cap_delay: Duration::from_millis(20),
        attempt_timeout: Duration::from_secs(5),
        timeout_slack: Duration::from_secs(1),
        ..Config::default()
    }
}

pub fn as_strategy(strategy: &Arc<ScriptedStrategy>) -> Arc<dyn Strategy> {
    Arc::clone(strategy) as Arc<dyn Strategy>
}
