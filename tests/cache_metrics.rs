//! Verifies the cache paths emit the documented metric keys.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use metrics_util::debugging::DebuggingRecorder;
use time::{Duration, OffsetDateTime};

use rinnovo::{
    CacheConfig, CacheEntry, CacheError, CacheStore, CacheStrategy, MemoryStore, PageCache,
    RenderOutput,
};

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let store = Arc::new(MemoryStore::default());
    let cache = PageCache::with_store(
        CacheConfig::default(),
        Arc::clone(&store) as Arc<dyn CacheStore>,
    );

    // Miss, then hit.
    cache
        .get_or_create("/a", CacheStrategy::Static, || async {
            Ok(RenderOutput {
                html: "<a/>".to_string(),
                strategy: CacheStrategy::Static,
            })
        })
        .await
        .expect("miss");
    cache
        .get_or_create("/a", CacheStrategy::Static, || async {
            Err(CacheError::render("must be cached"))
        })
        .await
        .expect("hit");

    // Bypass via dynamic strategy.
    cache
        .get_or_create("/now", CacheStrategy::Dynamic, || async {
            Ok(RenderOutput {
                html: "<now/>".to_string(),
                strategy: CacheStrategy::Dynamic,
            })
        })
        .await
        .expect("bypass");

    // Stale hit with a failing background regeneration.
    let stale_entry = CacheEntry::new(
        "<old/>".to_string(),
        CacheStrategy::revalidate(30).expect("valid window"),
        OffsetDateTime::now_utc() - Duration::seconds(120),
    );
    store.set("/stale", stale_entry).await.expect("seed stale");
    cache
        .get_or_create("/stale", CacheStrategy::Static, || async {
            Err(CacheError::render("regeneration fails"))
        })
        .await
        .expect("stale");
    tokio::time::sleep(StdDuration::from_millis(100)).await;

    // Invalidation.
    cache
        .invalidate_by_paths(&["/a".to_string()])
        .await
        .expect("invalidate");

    // Capacity eviction on a one-entry store.
    let small = PageCache::new(CacheConfig {
        max_entries: 1,
        ..Default::default()
    });
    for key in ["/one", "/two"] {
        small
            .get_or_create(key, CacheStrategy::Static, move || async move {
                Ok(RenderOutput {
                    html: format!("<{key}/>"),
                    strategy: CacheStrategy::Static,
                })
            })
            .await
            .expect("populate small cache");
    }

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "rinnovo_cache_hit_total",
        "rinnovo_cache_miss_total",
        "rinnovo_cache_stale_total",
        "rinnovo_cache_bypass_total",
        "rinnovo_cache_evict_total",
        "rinnovo_cache_invalidate_total",
        "rinnovo_regen_failure_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
