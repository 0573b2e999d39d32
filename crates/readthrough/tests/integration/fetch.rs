use std::sync::Arc;
use std::time::Duration;

use readthrough::{Cache, CacheConfig, FetchError};
use readthrough_test::{setup, TestSource};

fn config(ttl: Duration, capacity: usize) -> CacheConfig {
    CacheConfig { capacity, ttl }
}

/// Repeated lookups of one key within the TTL hit the cache; the source is
/// consulted exactly once.
#[tokio::test]
async fn test_repeated_fetch() {
    setup();
    let source = Arc::new(TestSource::constant("test"));
    let cache = Cache::new(
        Arc::clone(&source),
        config(Duration::from_millis(100), 1000),
    )
    .unwrap();

    for _ in 0..10 {
        assert_eq!(cache.fetch(0).await.unwrap(), "test");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(source.total_calls(), 1);
}

/// Distinct keys are fetched and cached independently.
#[tokio::test]
async fn test_distinct_ids() {
    setup();
    let source = Arc::new(TestSource::keyed());
    let cache = Cache::new(
        Arc::clone(&source),
        config(Duration::from_millis(100), 1000),
    )
    .unwrap();

    for id in 0..10 {
        assert_eq!(cache.fetch(id).await.unwrap(), format!("test{id}"));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    for id in 0..10 {
        assert_eq!(source.calls_for(id), 1);
    }
}

/// 100 concurrent lookups of the same key share a single source call; the
/// source never sees two fetches in flight at once.
#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_fetches_are_coalesced() {
    setup();
    let source = Arc::new(TestSource::constant("test").with_delay(Duration::from_millis(500)));
    let cache = Cache::new(Arc::clone(&source), config(Duration::from_secs(1), 1000)).unwrap();

    let tasks: Vec<_> = (0..100)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.fetch(0).await })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), "test");
    }

    assert_eq!(source.total_calls(), 1);
    assert_eq!(source.max_in_flight(), 1);
}

/// Admitting past capacity evicts the least recently used keys; evicted keys
/// are fetched from the source again.
#[tokio::test]
async fn test_capacity_eviction_and_readmit() {
    setup();
    let capacity = 1000;
    let refetched = 200;
    let source = Arc::new(TestSource::keyed());
    let cache = Cache::new(Arc::clone(&source), config(Duration::from_secs(1), capacity)).unwrap();

    for id in 0..(capacity + refetched) as u64 {
        assert_eq!(cache.fetch(id).await.unwrap(), format!("test{id}"));
        assert!(cache.len() <= capacity);
    }

    // Keys 0..200 were displaced by the later admits and must be re-fetched.
    for id in 0..refetched as u64 {
        assert_eq!(cache.fetch(id).await.unwrap(), format!("test{id}"));
        assert_eq!(source.calls_for(id), 2);
    }

    assert_eq!(source.total_calls(), capacity + 2 * refetched);
    assert!(cache.len() <= capacity);
}

/// Failed lookups are returned verbatim and never cached; the next call for
/// the same key drives the source again.
#[tokio::test]
async fn test_errors_are_not_cached() {
    setup();
    let capacity = 1000;
    let source = Arc::new(TestSource::new(|id, nth| {
        if nth == 0 {
            Err(FetchError::Unavailable(format!("no answer for {id}")))
        } else {
            Ok(format!("test{id}"))
        }
    }));
    let cache = Cache::new(Arc::clone(&source), config(Duration::from_secs(1), capacity)).unwrap();

    for id in 0..capacity as u64 {
        let err = cache.fetch(id).await.unwrap_err();
        assert_eq!(err, FetchError::Unavailable(format!("no answer for {id}")));
    }
    assert!(cache.is_empty());

    for id in 0..capacity as u64 {
        assert_eq!(cache.fetch(id).await.unwrap(), format!("test{id}"));
        assert_eq!(source.calls_for(id), 2);
    }
    assert_eq!(cache.len(), capacity);
}

/// Callers parked behind a failing load re-drive and succeed on the retry,
/// while the failure itself reaches only the caller that performed the load.
#[tokio::test(flavor = "multi_thread")]
async fn test_waiters_redrive_after_failed_load() {
    setup();
    let source = Arc::new(
        TestSource::new(|_, nth| {
            if nth == 0 {
                Err(FetchError::Timeout(Duration::from_millis(50)))
            } else {
                Ok("test".to_owned())
            }
        })
        .with_delay(Duration::from_millis(50)),
    );
    let cache = Cache::new(Arc::clone(&source), config(Duration::from_secs(1), 8)).unwrap();

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.fetch(0).await })
        })
        .collect();

    let mut failures = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(value) => assert_eq!(value, "test"),
            Err(err) => {
                assert_eq!(err, FetchError::Timeout(Duration::from_millis(50)));
                failures += 1;
            }
        }
    }

    // Exactly one caller performed the failing load; everyone else re-drove
    // into the successful retry.
    assert_eq!(failures, 1);
    assert_eq!(source.total_calls(), 2);
}

/// A hit moves the entry to the most recently used position, changing who is
/// evicted next.
#[tokio::test]
async fn test_hits_refresh_recency() {
    setup();
    let source = Arc::new(TestSource::keyed());
    let cache = Cache::new(Arc::clone(&source), config(Duration::from_secs(1), 3)).unwrap();

    for id in 0..3 {
        cache.fetch(id).await.unwrap();
    }
    // Recency is now 2, 1, 0. Touching 0 makes 1 the eviction candidate.
    cache.fetch(0).await.unwrap();
    cache.fetch(3).await.unwrap();

    assert_eq!(cache.fetch(0).await.unwrap(), "test0");
    assert_eq!(source.calls_for(0), 1);

    assert_eq!(cache.fetch(1).await.unwrap(), "test1");
    assert_eq!(source.calls_for(1), 2);
}

/// A capacity of one still serves alternating keys correctly, re-fetching on
/// every alternation.
#[tokio::test]
async fn test_capacity_of_one_thrashes_correctly() {
    setup();
    let source = Arc::new(TestSource::keyed());
    let cache = Cache::new(Arc::clone(&source), config(Duration::from_secs(1), 1)).unwrap();

    for round in 0..20 {
        let id = round % 2;
        assert_eq!(cache.fetch(id).await.unwrap(), format!("test{id}"));
        assert_eq!(cache.len(), 1);
    }
    assert_eq!(source.total_calls(), 20);
}

/// Keys that are never fetched never reach the source.
#[tokio::test]
async fn test_untouched_keys_are_never_fetched() {
    setup();
    let source = Arc::new(TestSource::keyed());
    let cache = Cache::new(Arc::clone(&source), config(Duration::from_secs(1), 16)).unwrap();

    cache.fetch(1).await.unwrap();
    cache.fetch(2).await.unwrap();

    assert_eq!(source.calls_for(0), 0);
    assert_eq!(source.calls_for(3), 0);
    assert_eq!(source.total_calls(), 2);
}
