use super::*;
use crate::config::Config;
use crate::payload::Payload;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn config() -> Config {
    Config {
        attempt_timeout: Duration::from_millis(500),
        ..Config::default()
    }
}

fn orchestrator(strategies: &[(u32, &Arc<ScriptedStrategy>)]) -> AcquisitionOrchestrator {
    strategies
        .iter()
        .fold(AcquisitionOrchestrator::builder(&config()), |b, (p, s)| {
            b.strategy(*p, Arc::clone(*s) as Arc<dyn Strategy>)
        })
        .build()
}

#[tokio::test(start_paused = true)]
async fn test_falls_back_within_strategy_before_next() {
    let a = Arc::new(
        ScriptedStrategy::new("a")
            .then_err(SourceError::retriable("flaky"))
            .then_err(SourceError::retriable("flaky"))
            .then_ok("payload-a"),
    );
    let b = Arc::new(ScriptedStrategy::succeeding("b", "payload-b"));
    let chain = orchestrator(&[(1, &a), (2, &b)]);
    let slack = config().timeout_slack;
    let started = Instant::now();

    let acquired = chain.acquire("k").await.expect("acquire");

    let elapsed = started.elapsed();
    assert_eq!(acquired.strategy, "a");
    assert_eq!(acquired.payload.as_str(), Some("payload-a"));
    assert_eq!(acquired.attempts, 3);
    assert_eq!(a.calls(), 3);
    assert_eq!(b.calls(), 0);
    // 1000ms + 2000ms of backoff before the third attempt.
    assert!(elapsed >= Duration::from_millis(3_000), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(3_000) + slack, "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_next_strategy_after_retries_exhausted() {
    let a = Arc::new(ScriptedStrategy::new("a"));
    let b = Arc::new(ScriptedStrategy::succeeding("b", "payload-b"));
    let chain = orchestrator(&[(1, &a), (2, &b)]);

    let acquired = chain.acquire("k").await.expect("acquire");

    assert_eq!(acquired.strategy, "b");
    assert_eq!(acquired.attempts, 4);
    assert_eq!(a.calls(), 3);
    assert_eq!(b.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_content_unavailable_aborts_chain() {
    let a = Arc::new(ScriptedStrategy::failing(
        "a",
        SourceError::content_unavailable("video removed"),
    ));
    let b = Arc::new(ScriptedStrategy::succeeding("b", "payload-b"));
    let chain = orchestrator(&[(1, &a), (2, &b)]);

    let err = chain.acquire("k").await.expect_err("should abort");

    assert_eq!(
        err,
        AcquisitionError::Aborted {
            strategy: "a".to_string(),
            reason: "video removed".to_string(),
        }
    );
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_strategy_unavailable_moves_on_without_retry() {
    let a = Arc::new(ScriptedStrategy::failing(
        "a",
        SourceError::strategy_unavailable("tool missing"),
    ));
    let b = Arc::new(ScriptedStrategy::succeeding("b", "payload-b"));
    let chain = orchestrator(&[(1, &a), (2, &b)]);
    let started = Instant::now();

    let acquired = chain.acquire("k").await.expect("acquire");

    assert_eq!(acquired.strategy, "b");
    assert_eq!(a.calls(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_cools_strategy_down() {
    let a = Arc::new(
        ScriptedStrategy::new("a")
            .then_err(SourceError::rate_limited(Duration::from_secs(5)))
            .otherwise(Ok(Payload::from("payload-a"))),
    );
    let b = Arc::new(ScriptedStrategy::succeeding("b", "payload-b"));
    let chain = orchestrator(&[(1, &a), (2, &b)]);

    let started = Instant::now();
    let first = chain.acquire("k1").await.expect("acquire");
    assert_eq!(first.strategy, "b");
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert!(chain.cooldown_remaining("a").is_some());

    let second = chain.acquire("k2").await.expect("acquire");
    assert_eq!(second.strategy, "b");
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 2);

    tokio::time::advance(Duration::from_millis(4_900)).await;
    chain.acquire("k3").await.expect("acquire");
    assert_eq!(a.calls(), 1);

    tokio::time::advance(Duration::from_millis(200)).await;
    let fourth = chain.acquire("k4").await.expect("acquire");
    assert_eq!(fourth.strategy, "a");
    assert_eq!(a.calls(), 2);
    assert!(chain.cooldown_remaining("a").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_stops_retries_of_concurrent_acquisition() {
    let a = Arc::new(
        ScriptedStrategy::new("a")
            .then_err(SourceError::retriable("flaky"))
            .then_err(SourceError::rate_limited(Duration::from_secs(5)))
            .otherwise(Ok(Payload::from("payload-a"))),
    );
    let b = Arc::new(ScriptedStrategy::succeeding("b", "payload-b"));
    let chain = orchestrator(&[(1, &a), (2, &b)]);
    let started = Instant::now();

    let (backing_off, limited) = tokio::join!(chain.acquire("k2"), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        chain.acquire("k1").await
    });

    assert_eq!(limited.expect("acquire").strategy, "b");
    // Woke from its 1s backoff inside the cooldown and skipped "a".
    let backing_off = backing_off.expect("acquire");
    assert_eq!(backing_off.strategy, "b");
    assert_eq!(backing_off.attempts, 2);
    assert_eq!(a.calls(), 2);
    assert_eq!(started.elapsed(), Duration::from_secs(1));
    assert!(chain.cooldown_remaining("a").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_every_strategy_cooling_down_is_exhausted() {
    let a = Arc::new(ScriptedStrategy::failing(
        "a",
        SourceError::rate_limited(Duration::from_secs(30)),
    ));
    let chain = orchestrator(&[(1, &a)]);

    chain.acquire("k1").await.expect_err("rate limited");
    let err = chain.acquire("k2").await.expect_err("cooling down");

    assert!(matches!(err, AcquisitionError::Exhausted { attempts: 0, .. }));
    assert_eq!(a.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_timing() {
    let a = Arc::new(ScriptedStrategy::new("a"));
    let chain = orchestrator(&[(1, &a)]);
    let slack = config().timeout_slack;
    let started = Instant::now();

    let err = chain.acquire("k").await.expect_err("exhausted");

    let elapsed = started.elapsed();
    assert!(matches!(err, AcquisitionError::Exhausted { attempts: 3, .. }));
    assert!(elapsed >= Duration::from_millis(3_000), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(3_000) + slack, "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_backoff_respects_cap() {
    let config = Config {
        max_retries: 4,
        base_delay: Duration::from_millis(1_000),
        cap_delay: Duration::from_millis(1_500),
        ..config()
    };
    let a: Arc<dyn Strategy> = Arc::new(ScriptedStrategy::new("a"));
    let chain = AcquisitionOrchestrator::builder(&config).strategy(1, a).build();
    let started = Instant::now();

    chain.acquire("k").await.expect_err("exhausted");

    // 1000 + 1500 + 1500
    assert_eq!(started.elapsed(), Duration::from_millis(4_000));
}

#[tokio::test(start_paused = true)]
async fn test_priority_order_is_stable() {
    let a = Arc::new(ScriptedStrategy::new("a"));
    let b = Arc::new(ScriptedStrategy::new("b"));
    let c = Arc::new(ScriptedStrategy::new("c"));
    let chain = orchestrator(&[(10, &b), (1, &a), (10, &c)]);

    assert_eq!(chain.strategy_names(), vec!["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_undersized_payload_is_retried() {
    let config = Config {
        min_valid_payload_size: 3,
        ..config()
    };
    let a = Arc::new(ScriptedStrategy::new("a").then_ok("").then_ok("ab").then_ok("abc"));
    let chain = AcquisitionOrchestrator::builder(&config)
        .strategy(1, Arc::clone(&a) as Arc<dyn Strategy>)
        .build();

    let acquired = chain.acquire("k").await.expect("acquire");

    assert_eq!(acquired.payload.as_str(), Some("abc"));
    assert_eq!(a.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_custom_validator_rejects_payload() {
    let a = Arc::new(ScriptedStrategy::succeeding("a", "<html>error page</html>"));
    let b = Arc::new(ScriptedStrategy::succeeding("b", "WEBVTT transcript"));
    let chain = AcquisitionOrchestrator::builder(&config())
        .strategy(1, Arc::clone(&a) as Arc<dyn Strategy>)
        .strategy(2, Arc::clone(&b) as Arc<dyn Strategy>)
        .validator(Arc::new(|payload: &Payload| {
            if payload.as_bytes().starts_with(b"<html>") {
                Err("got an html page".to_string())
            } else {
                Ok(())
            }
        }))
        .build();

    let acquired = chain.acquire("k").await.expect("acquire");

    assert_eq!(acquired.strategy, "b");
    assert_eq!(a.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_slow_attempt_times_out_and_counts_as_retriable() {
    let slow = Arc::new(ScriptedStrategy::succeeding("slow", "late").with_delay(Duration::from_secs(10)));
    let fast = Arc::new(ScriptedStrategy::succeeding("fast", "on time"));
    let chain = orchestrator(&[(1, &slow), (2, &fast)]);

    let acquired = chain.acquire("k").await.expect("acquire");

    assert_eq!(acquired.strategy, "fast");
    assert_eq!(slow.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_per_strategy_policy_override() {
    let a = Arc::new(ScriptedStrategy::new("a"));
    let b = Arc::new(ScriptedStrategy::succeeding("b", "payload-b"));
    let single_shot = RetryPolicy {
        max_retries: 1,
        ..RetryPolicy::from_config(&config())
    };
    let chain = AcquisitionOrchestrator::builder(&config())
        .strategy_with_policy(1, Arc::clone(&a) as Arc<dyn Strategy>, single_shot)
        .strategy(2, Arc::clone(&b) as Arc<dyn Strategy>)
        .build();
    let started = Instant::now();

    let acquired = chain.acquire("k").await.expect("acquire");

    assert_eq!(acquired.strategy, "b");
    assert_eq!(a.calls(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn test_no_strategies() {
    let chain = AcquisitionOrchestrator::builder(&config()).build();

    assert!(chain.is_empty());
    assert_eq!(
        chain.acquire("k").await.expect_err("empty chain"),
        AcquisitionError::NoStrategies
    );
}

#[test]
fn test_operation_budget() {
    let a: Arc<dyn Strategy> = Arc::new(ScriptedStrategy::new("a"));
    let b: Arc<dyn Strategy> = Arc::new(ScriptedStrategy::new("b"));
    let chain = AcquisitionOrchestrator::builder(&config())
        .strategy(1, a)
        .strategy(2, b)
        .build();

    // 2 * (3 * 500ms + 1000ms + 2000ms) + 5000ms slack
    assert_eq!(chain.operation_budget(), Duration::from_millis(14_000));
}

#[tokio::test(start_paused = true)]
async fn test_strategy_receives_key() {
    let a = Arc::new(ScriptedStrategy::succeeding("a", "v"));
    let chain = orchestrator(&[(1, &a)]);

    chain.acquire("dQw4w9WgXcQ").await.expect("acquire");

    assert_eq!(a.keys(), vec!["dQw4w9WgXcQ".to_string()]);
}
