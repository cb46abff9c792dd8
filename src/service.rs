//! Page cache service.
//!
//! The orchestrator over a `CacheStore`: decides hit, miss, or
//! stale-while-revalidate for every lookup, owns the single-flight
//! regeneration markers, and exposes invalidation and header derivation to
//! the HTTP layer.

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::headers::{self, CACHE_CONTROL_DISABLED};
use crate::inflight::InFlightRegenerations;
use crate::memory::MemoryStore;
use crate::store::{CacheStats, CacheStore};
use crate::strategy::{CacheEntry, CacheResult, CacheStatus, CacheStrategy, RenderOutput};

pub(crate) const METRIC_HIT: &str = "rinnovo_cache_hit_total";
pub(crate) const METRIC_MISS: &str = "rinnovo_cache_miss_total";
pub(crate) const METRIC_STALE: &str = "rinnovo_cache_stale_total";
pub(crate) const METRIC_BYPASS: &str = "rinnovo_cache_bypass_total";
pub(crate) const METRIC_INVALIDATE: &str = "rinnovo_cache_invalidate_total";
pub(crate) const METRIC_REGEN_FAILURE: &str = "rinnovo_regen_failure_total";

/// Page cache and revalidation engine.
///
/// One instance per process, injected into the HTTP layer; all entry state
/// lives in the store, never in the service.
pub struct PageCache {
    config: CacheConfig,
    store: Arc<dyn CacheStore>,
    in_flight: InFlightRegenerations,
}

impl PageCache {
    /// Create a service over a fresh memory store sized from `config`.
    pub fn new(config: CacheConfig) -> Self {
        let store = Arc::new(MemoryStore::from_config(&config));
        Self::with_store(config, store)
    }

    /// Create a service over an injected store backend.
    pub fn with_store(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        Self {
            config,
            store,
            in_flight: InFlightRegenerations::new(),
        }
    }

    /// Strategy applied to pages that declare none.
    pub fn default_strategy(&self) -> &CacheStrategy {
        &self.config.default_strategy
    }

    /// Look up `key`, rendering when the strategy or entry state requires it.
    ///
    /// The cache key is the full request path plus query string, verbatim;
    /// two URLs differing only in query string are distinct entries.
    ///
    /// Blocking behavior is strategy-dependent: dynamic and miss paths await
    /// `render`; the stale path returns the stored payload immediately and
    /// regenerates in the background, deduplicated per key.
    pub async fn get_or_create<F, Fut>(
        &self,
        key: &str,
        strategy: CacheStrategy,
        render: F,
    ) -> Result<CacheResult, CacheError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<RenderOutput, CacheError>> + Send + 'static,
    {
        if !self.config.enabled || strategy == CacheStrategy::Dynamic {
            let output = render().await?;
            counter!(METRIC_BYPASS).increment(1);
            debug!(key, outcome = "bypass", "rendered without cache");
            return Ok(CacheResult {
                html: output.html,
                status: CacheStatus::Miss,
                strategy: output.strategy,
            });
        }

        match self.store.get(key).await? {
            None => {
                let output = render().await?;
                let entry = CacheEntry::new(
                    output.html.clone(),
                    output.strategy.clone(),
                    OffsetDateTime::now_utc(),
                );
                self.store.set(key, entry).await?;
                counter!(METRIC_MISS).increment(1);
                debug!(key, outcome = "miss", "rendered and cached");
                Ok(CacheResult {
                    html: output.html,
                    status: CacheStatus::Miss,
                    strategy: output.strategy,
                })
            }
            Some(entry) if entry.is_stale(OffsetDateTime::now_utc()) => {
                self.spawn_regeneration(key, render);
                counter!(METRIC_STALE).increment(1);
                debug!(key, outcome = "stale", "serving stale while regenerating");
                Ok(CacheResult {
                    html: entry.html,
                    status: CacheStatus::Stale,
                    strategy: entry.strategy,
                })
            }
            Some(entry) => {
                counter!(METRIC_HIT).increment(1);
                debug!(key, outcome = "hit", "serving cached entry");
                Ok(CacheResult {
                    html: entry.html,
                    status: CacheStatus::Hit,
                    strategy: entry.strategy,
                })
            }
        }
    }

    /// `get_or_create` with the configured default strategy.
    pub async fn get_or_create_default<F, Fut>(
        &self,
        key: &str,
        render: F,
    ) -> Result<CacheResult, CacheError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<RenderOutput, CacheError>> + Send + 'static,
    {
        self.get_or_create(key, self.config.default_strategy.clone(), render)
            .await
    }

    /// Start one background regeneration for `key`, unless one is already
    /// in flight.
    ///
    /// A failed render keeps the stale entry in place; a regeneration whose
    /// key was invalidated mid-flight discards its result.
    fn spawn_regeneration<F, Fut>(&self, key: &str, render: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<RenderOutput, CacheError>> + Send + 'static,
    {
        let Some(guard) = self.in_flight.acquire(key) else {
            debug!(key, "regeneration already in flight");
            return;
        };

        let store = Arc::clone(&self.store);
        let key = key.to_string();
        tokio::spawn(async move {
            match render().await {
                Ok(output) => {
                    if !guard.is_current() {
                        debug!(key, "discarding regeneration result for invalidated key");
                        return;
                    }
                    let entry = CacheEntry::new(
                        output.html,
                        output.strategy,
                        OffsetDateTime::now_utc(),
                    );
                    if let Err(err) = store.set(&key, entry).await {
                        warn!(key, error = %err, "failed to store regenerated entry");
                        return;
                    }
                    // The marker map and the store are separate locks, so an
                    // invalidation can land between the check above and the
                    // write. Re-check after writing and withdraw the entry if
                    // the marker is gone.
                    if guard.is_current() {
                        debug!(key, "regenerated entry stored");
                    } else if let Err(err) = store.delete(&key).await {
                        warn!(
                            key,
                            error = %err,
                            "failed to withdraw entry written over an invalidation"
                        );
                    } else {
                        debug!(key, "withdrew regenerated entry written over an invalidation");
                    }
                }
                Err(err) => {
                    counter!(METRIC_REGEN_FAILURE).increment(1);
                    warn!(
                        key,
                        error = %err,
                        "background regeneration failed; stale entry retained"
                    );
                }
            }
        });
    }

    /// Remove every entry whose tags intersect `tags`; returns the count.
    pub async fn invalidate_by_tags(&self, tags: &[String]) -> Result<usize, CacheError> {
        let removed = self.store.invalidate_by_tags(tags).await?;
        for key in &removed {
            self.in_flight.invalidate(key);
        }
        // A regeneration may have re-written one of these keys before its
        // marker was cleared above; with the markers now gone, one more pass
        // removes any such write for good.
        if !removed.is_empty() {
            self.store.invalidate_by_paths(&removed).await?;
        }
        counter!(METRIC_INVALIDATE).increment(removed.len() as u64);
        info!(tags = ?tags, count = removed.len(), "invalidated entries by tag");
        Ok(removed.len())
    }

    /// Remove entries by exact key; returns the count of keys that existed.
    pub async fn invalidate_by_paths(&self, paths: &[String]) -> Result<usize, CacheError> {
        // Markers first: a marker can outlive its entry while a regeneration
        // is mid-flight, and a regeneration that writes after the removal
        // below re-checks its marker and withdraws the write itself.
        for path in paths {
            self.in_flight.invalidate(path);
        }
        let removed = self.store.invalidate_by_paths(paths).await?;
        counter!(METRIC_INVALIDATE).increment(removed.len() as u64);
        info!(paths = ?paths, count = removed.len(), "invalidated entries by path");
        Ok(removed.len())
    }

    /// Drop every entry and all in-flight markers.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.in_flight.clear();
        self.store.clear().await?;
        info!("page cache cleared");
        Ok(())
    }

    /// Storage snapshot for the admin surface.
    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        self.store.stats().await
    }

    /// Derive the `Cache-Control` header for a strategy, honoring the
    /// service-level enabled flag.
    pub fn cache_control_header(&self, strategy: &CacheStrategy) -> String {
        if !self.config.enabled {
            return CACHE_CONTROL_DISABLED.to_string();
        }
        headers::cache_control(strategy)
    }
}
