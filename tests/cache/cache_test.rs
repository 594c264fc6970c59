use chrono::NaiveDate;
use pi_engine::cache::{CompiledSql, CompiledSqlCache, SqlCacheKey};
use pi_engine::config::CacheSettings;
use pi_engine::ExpressionError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

fn key(expression: &str) -> SqlCacheKey {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
    SqlCacheKey::new(expression, "ProgrmIndA1", start, end)
}

#[test]
fn test_concurrent_callers_share_one_computation() {
    let cache = CompiledSqlCache::new();
    let calls = AtomicUsize::new(0);
    let barrier = Barrier::new(8);

    let results: Vec<String> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    cache
                        .get_or_compute(key("d2:count(#{ps.de})"), || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            Ok("(select count(\"de\") ...)".to_string())
                        })
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|sql| sql == &results[0]));
}

#[test]
fn test_concurrent_failures_compute_once() {
    let cache = CompiledSqlCache::new();
    let calls = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let result = cache.get_or_compute(key("A{missing}"), || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    Err(ExpressionError::UnknownAttribute("missing".into()))
                });
                assert!(result.is_err());
            });
        }
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(
        cache.get(&key("A{missing}")),
        Some(CompiledSql::Invalid(message)) if message.contains("missing")
    ));
}

#[test]
fn test_capacity_bounds_entries() {
    let cache = CompiledSqlCache::with_config(4, 4, Duration::from_secs(60));
    for i in 0..50 {
        let expression = format!("{} + 1", i);
        cache
            .get_or_compute(key(&expression), || Ok(expression.clone()))
            .unwrap();
    }
    assert!(cache.entry_count() <= 4);
}

#[test]
fn test_idle_entries_expire() {
    let cache = CompiledSqlCache::with_config(16, 16, Duration::from_millis(100));
    cache.get_or_compute(key("1"), || Ok("1".into())).unwrap();
    assert!(cache.get(&key("1")).is_some());

    thread::sleep(Duration::from_millis(300));
    assert!(cache.get(&key("1")).is_none());

    let calls = AtomicUsize::new(0);
    cache
        .get_or_compute(key("1"), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("1".into())
        })
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_clear_and_settings() {
    let cache = CompiledSqlCache::from_settings(&CacheSettings::default());
    assert!(cache.is_enabled());
    cache.get_or_compute(key("1"), || Ok("1".into())).unwrap();
    cache.clear();
    assert_eq!(cache.entry_count(), 0);

    let disabled = CompiledSqlCache::from_settings(&CacheSettings {
        enabled: false,
        ..CacheSettings::default()
    });
    assert!(!disabled.is_enabled());
}
