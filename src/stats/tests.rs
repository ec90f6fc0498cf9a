use super::*;
use std::sync::Arc;

#[test]
fn test_new_collector_is_zeroed() {
    let stats = StatsCollector::default();
    let snapshot = stats.snapshot();

    assert_eq!(snapshot, CacheStats::default());
    assert_eq!(snapshot.hit_rate(), 0.0);
}

#[test]
fn test_hits_are_totalled_across_tiers() {
    let stats = StatsCollector::default();

    stats.record_hit(Tier::Memory);
    stats.record_hit(Tier::Memory);
    stats.record_hit(Tier::File);
    stats.record_hit(Tier::Persistent);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.hits, 4);
    assert_eq!(snapshot.memory.hits, 2);
    assert_eq!(snapshot.tier(Tier::File).hits, 1);
    assert_eq!(snapshot.persistent.hits, 1);
}

#[test]
fn test_writes_and_evictions_per_tier() {
    let stats = StatsCollector::default();

    stats.record_write(Tier::Memory);
    stats.record_write(Tier::File);
    stats.record_write(Tier::Persistent);
    stats.record_eviction(Tier::Memory);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.writes, 3);
    assert_eq!(snapshot.evictions, 1);
    assert_eq!(snapshot.memory.evictions, 1);
    assert_eq!(snapshot.file.evictions, 0);
}

#[test]
fn test_hit_rate() {
    let stats = StatsCollector::default();

    stats.record_hit(Tier::Memory);
    stats.record_hit(Tier::File);
    stats.record_hit(Tier::Memory);
    stats.record_miss();

    assert!((stats.snapshot().hit_rate() - 0.75).abs() < f64::EPSILON);
}

#[test]
fn test_health_check_no_warning_without_lookups() {
    let stats = StatsCollector::new(0.3);

    let report = stats.health_check();

    assert_eq!(report.lookups, 0);
    assert!(!report.warning);
}

#[test]
fn test_health_check_warns_below_threshold() {
    let stats = StatsCollector::new(0.3);

    stats.record_hit(Tier::Memory);
    for _ in 0..4 {
        stats.record_miss();
    }

    let report = stats.health_check();

    assert!((report.hit_rate - 0.2).abs() < f64::EPSILON);
    assert!(report.warning);
}

#[test]
fn test_health_check_healthy_at_threshold() {
    let stats = StatsCollector::new(0.5);

    stats.record_hit(Tier::Memory);
    stats.record_miss();

    assert!(!stats.health_check().warning);
}

#[test]
fn test_collectors_are_independent() {
    let a = StatsCollector::default();
    let b = StatsCollector::default();

    a.record_miss();

    assert_eq!(a.snapshot().misses, 1);
    assert_eq!(b.snapshot().misses, 0);
}

#[test]
fn test_concurrent_recording() {
    let stats = Arc::new(StatsCollector::default());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let stats = Arc::clone(&stats);
            std::thread::spawn(move || {
                for _ in 0..1_000 {
                    stats.record_hit(Tier::Memory);
                    stats.record_miss();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread");
    }

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.hits, 8_000);
    assert_eq!(snapshot.misses, 8_000);
}
