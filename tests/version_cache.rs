// tests/version_cache.rs

mod common;
use crate::common::{init_tracing, with_timeout, TestResult};

use std::sync::Arc;
use std::time::Duration;

use stayopen::errors::StayOpenError;
use stayopen::version::{Version, VersionCache};
use stayopen_test_utils::{FakeExecutor, VersionReply};

#[tokio::test]
async fn concurrent_loads_query_once_and_agree() -> TestResult {
    init_tracing();

    let cache = Arc::new(VersionCache::new());
    let executor = Arc::new(
        FakeExecutor::new()
            .with_version("12.40")
            .with_delay(Duration::from_millis(100)),
    );
    let stats = executor.stats();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let cache = Arc::clone(&cache);
        let executor = Arc::clone(&executor);
        handles.push(tokio::spawn(async move {
            cache.load("exiftool", executor.as_ref()).await
        }));
    }

    for handle in handles {
        let version = with_timeout(handle).await??;
        assert_eq!(version, Some(Version::new(12, 40, 0)));
    }

    assert_eq!(stats.version_queries(), 1);
    assert_eq!(cache.size(), 1);
    Ok(())
}

#[tokio::test]
async fn different_paths_are_cached_separately() -> TestResult {
    let cache = VersionCache::new();
    let executor = FakeExecutor::new().with_version("11.0");

    cache.load("/usr/bin/exiftool", &executor).await?;
    cache.load("/opt/exiftool", &executor).await?;
    cache.load("/usr/bin/exiftool", &executor).await?;

    assert_eq!(executor.stats().version_queries(), 2);
    assert_eq!(cache.size(), 2);
    Ok(())
}

#[tokio::test]
async fn clear_forces_a_new_query() -> TestResult {
    let cache = VersionCache::new();
    let executor = FakeExecutor::new().with_version("12.40");

    cache.load("exiftool", &executor).await?;
    assert_eq!(cache.size(), 1);

    cache.clear();
    assert_eq!(cache.size(), 0);

    cache.load("exiftool", &executor).await?;
    assert_eq!(executor.stats().version_queries(), 2);
    Ok(())
}

#[tokio::test]
async fn missing_binary_is_reported_and_not_cached() -> TestResult {
    let cache = VersionCache::new();
    let executor = FakeExecutor::new().with_version_reply(VersionReply::NotFound);

    match cache.load("exiftool", &executor).await {
        Err(StayOpenError::ProcessNotFound { executable, .. }) => assert_eq!(executable, "exiftool"),
        other => panic!("expected ProcessNotFound, got {:?}", other),
    }
    assert_eq!(cache.size(), 0);

    // "Installing" the binary makes the next load succeed.
    executor.set_version_reply(VersionReply::Output("12.40".to_string()));
    assert_eq!(cache.load("exiftool", &executor).await?, Some(Version::new(12, 40, 0)));
    assert_eq!(executor.stats().version_queries(), 2);
    Ok(())
}

#[tokio::test]
async fn concurrent_callers_share_a_failed_lookup() -> TestResult {
    init_tracing();

    let cache = Arc::new(VersionCache::new());
    let executor = Arc::new(
        FakeExecutor::new()
            .with_version_reply(VersionReply::NotFound)
            .with_delay(Duration::from_millis(100)),
    );

    let mut handles = Vec::new();
    for _ in 0..5 {
        let cache = Arc::clone(&cache);
        let executor = Arc::clone(&executor);
        handles.push(tokio::spawn(async move {
            cache.load("exiftool", executor.as_ref()).await
        }));
    }

    for handle in handles {
        match with_timeout(handle).await? {
            Err(StayOpenError::ProcessNotFound { executable, source }) => {
                assert_eq!(executable, "exiftool");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected ProcessNotFound, got {:?}", other),
        }
    }

    assert_eq!(executor.stats().version_queries(), 1);
    assert_eq!(cache.size(), 0);
    Ok(())
}

#[tokio::test]
async fn failed_lookups_leave_no_entry_behind() -> TestResult {
    let cache = Arc::new(VersionCache::new());
    let executor = Arc::new(
        FakeExecutor::new()
            .with_version_reply(VersionReply::ExitCode(1))
            .with_delay(Duration::from_millis(100)),
    );

    let load = {
        let cache = Arc::clone(&cache);
        let executor = Arc::clone(&executor);
        tokio::spawn(async move { cache.load("/opt/exiftool", executor.as_ref()).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(cache.is_pending("/opt/exiftool"));

    assert_eq!(with_timeout(load).await??, None);
    assert!(!cache.is_pending("/opt/exiftool"));

    executor.set_version_reply(VersionReply::NotFound);
    assert!(cache.load("/usr/bin/exiftool", executor.as_ref()).await.is_err());
    assert!(!cache.is_pending("/usr/bin/exiftool"));
    assert_eq!(cache.size(), 0);
    Ok(())
}

#[tokio::test]
async fn failing_or_garbled_answer_yields_no_version() -> TestResult {
    let cache = VersionCache::new();

    let failing = FakeExecutor::new().with_version_reply(VersionReply::ExitCode(1));
    assert_eq!(cache.load("exiftool", &failing).await?, None);
    assert_eq!(cache.size(), 0);

    let garbled = FakeExecutor::new().with_version("not a version");
    assert_eq!(cache.load("exiftool", &garbled).await?, None);
    assert_eq!(cache.size(), 0);

    // Not cached, so a fixed tool is picked up.
    let fixed = FakeExecutor::new().with_version("12.40");
    assert_eq!(cache.load("exiftool", &fixed).await?, Some(Version::new(12, 40, 0)));
    Ok(())
}

#[tokio::test]
async fn cancelled_lookup_does_not_poison_the_key() -> TestResult {
    init_tracing();

    let cache = Arc::new(VersionCache::new());
    let executor = Arc::new(
        FakeExecutor::new()
            .with_version("12.40")
            .with_delay(Duration::from_millis(200)),
    );
    let stats = executor.stats();

    // First caller starts the lookup and is then cancelled.
    let first = {
        let cache = Arc::clone(&cache);
        let executor = Arc::clone(&executor);
        tokio::spawn(async move { cache.load("exiftool", executor.as_ref()).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Second caller is waiting on the same in-flight lookup.
    let second = {
        let cache = Arc::clone(&cache);
        let executor = Arc::clone(&executor);
        tokio::spawn(async move { cache.load("exiftool", executor.as_ref()).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    first.abort();
    assert!(first.await.unwrap_err().is_cancelled());

    let version = with_timeout(second).await??;
    assert_eq!(version, Some(Version::new(12, 40, 0)));
    assert_eq!(stats.version_queries(), 2);
    assert_eq!(cache.size(), 1);
    Ok(())
}

#[tokio::test]
async fn global_cache_is_shared() -> TestResult {
    let executor = FakeExecutor::new().with_version("10.1");
    let path = "/tmp/global-cache-test-exiftool";

    let a = VersionCache::global().load(path, &executor).await?;
    let b = VersionCache::global().load(path, &executor).await?;

    assert_eq!(a, b);
    assert_eq!(executor.stats().version_queries(), 1);
    Ok(())
}
