//! Default in-memory cache store.
//!
//! A capacity-bounded LRU map plus a tag → keys index, behind a single lock
//! so the two structures can never disagree. Every removal path, including
//! capacity eviction, goes through the same cleanup so the tag index holds
//! no dangling keys.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::RwLock;

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::lock::{rw_read, rw_write};
use crate::store::{CacheStats, CacheStore};
use crate::strategy::CacheEntry;

const SOURCE: &str = "rinnovo::memory";

pub(crate) const METRIC_EVICT: &str = "rinnovo_cache_evict_total";

struct MemoryStoreInner {
    /// Iteration order is recency order: front = least recently used.
    entries: LruCache<String, CacheEntry>,
    tag_index: HashMap<String, HashSet<String>>,
}

impl MemoryStoreInner {
    /// Remove `key` and deregister its tags, dropping empty tag buckets.
    ///
    /// The single removal path used by delete, overwrite, invalidation and
    /// capacity eviction.
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        for tag in &entry.tags {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        Some(entry)
    }
}

/// Bounded LRU store with a tag index; the default `CacheStore`.
///
/// Overwriting an existing key removes the old entry first (through the
/// delete path), so the rewrite refreshes recency and the tag index never
/// keeps associations from a previous version of the key.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
    max_entries: NonZeroUsize,
}

impl MemoryStore {
    /// Create a store holding at most `max_entries` entries.
    pub fn new(max_entries: NonZeroUsize) -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                entries: LruCache::new(max_entries),
                tag_index: HashMap::new(),
            }),
            max_entries,
        }
    }

    /// Create a store sized from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries_non_zero())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        // Write lock: a hit promotes the entry to most-recently-used.
        let mut inner = rw_write(&self.inner, SOURCE, "get");
        Ok(inner.entries.get(key).cloned())
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError> {
        let mut inner = rw_write(&self.inner, SOURCE, "set");

        inner.remove(key);

        if inner.entries.len() >= self.max_entries.get() {
            let evicted_key = inner.entries.peek_lru().map(|(k, _)| k.clone());
            if let Some(evicted_key) = evicted_key {
                inner.remove(&evicted_key);
                counter!(METRIC_EVICT).increment(1);
            }
        }

        for tag in &entry.tags {
            inner
                .tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        inner.entries.put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut inner = rw_write(&self.inner, SOURCE, "delete");
        Ok(inner.remove(key).is_some())
    }

    async fn invalidate_by_tags(&self, tags: &[String]) -> Result<Vec<String>, CacheError> {
        let mut inner = rw_write(&self.inner, SOURCE, "invalidate_by_tags");

        // Union first so a key matching several requested tags is removed
        // exactly once.
        let mut matched: HashSet<String> = HashSet::new();
        for tag in tags {
            if let Some(keys) = inner.tag_index.get(tag) {
                matched.extend(keys.iter().cloned());
            }
        }

        let mut removed = Vec::with_capacity(matched.len());
        for key in matched {
            if inner.remove(&key).is_some() {
                removed.push(key);
            }
        }
        Ok(removed)
    }

    async fn invalidate_by_paths(&self, paths: &[String]) -> Result<Vec<String>, CacheError> {
        let mut inner = rw_write(&self.inner, SOURCE, "invalidate_by_paths");

        let mut removed = Vec::new();
        for path in paths {
            if inner.remove(path).is_some() {
                removed.push(path.clone());
            }
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut inner = rw_write(&self.inner, SOURCE, "clear");
        inner.entries.clear();
        inner.tag_index.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let inner = rw_read(&self.inner, SOURCE, "stats");
        Ok(CacheStats {
            entries: inner.entries.len(),
            tags: inner.tag_index.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use time::OffsetDateTime;

    use super::*;
    use crate::strategy::CacheStrategy;

    fn store_with_limit(limit: usize) -> MemoryStore {
        MemoryStore::new(NonZeroUsize::new(limit).expect("non-zero limit"))
    }

    fn entry(html: &str, tags: &[&str]) -> CacheEntry {
        let strategy = if tags.is_empty() {
            CacheStrategy::Static
        } else {
            CacheStrategy::revalidate_with_tags(
                3600,
                tags.iter().map(|t| t.to_string()).collect(),
            )
            .expect("valid window")
        };
        CacheEntry::new(html.to_string(), strategy, OffsetDateTime::now_utc())
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn set_get_delete_roundtrip() {
        let store = MemoryStore::default();

        assert!(store.get("/a").await.unwrap().is_none());

        store.set("/a", entry("<a/>", &[])).await.unwrap();
        let cached = store.get("/a").await.unwrap().expect("cached entry");
        assert_eq!(cached.html, "<a/>");

        assert!(store.delete("/a").await.unwrap());
        assert!(!store.delete("/a").await.unwrap());
        assert!(store.get("/a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lru_eviction_removes_least_recently_used() {
        let store = store_with_limit(3);

        store.set("/a", entry("<a/>", &[])).await.unwrap();
        store.set("/b", entry("<b/>", &[])).await.unwrap();
        store.set("/c", entry("<c/>", &[])).await.unwrap();

        // Touch /a so /b becomes the eviction candidate.
        assert!(store.get("/a").await.unwrap().is_some());

        store.set("/d", entry("<d/>", &[])).await.unwrap();

        assert!(store.get("/b").await.unwrap().is_none());
        assert!(store.get("/a").await.unwrap().is_some());
        assert!(store.get("/c").await.unwrap().is_some());
        assert!(store.get("/d").await.unwrap().is_some());
        assert_eq!(store.stats().await.unwrap().entries, 3);
    }

    #[tokio::test]
    async fn eviction_cleans_tag_index() {
        let store = store_with_limit(1);

        store.set("/a", entry("<a/>", &["posts"])).await.unwrap();
        store.set("/b", entry("<b/>", &["pages"])).await.unwrap();

        // /a was evicted, so invalidating its tag removes nothing.
        let removed = store
            .invalidate_by_tags(&strings(&["posts"]))
            .await
            .unwrap();
        assert!(removed.is_empty());
        assert_eq!(store.stats().await.unwrap().tags, 1);
    }

    #[tokio::test]
    async fn tag_invalidation_counts_multi_tag_entry_once() {
        let store = MemoryStore::default();

        store.set("/a", entry("<a/>", &["x", "y"])).await.unwrap();
        store.set("/b", entry("<b/>", &["x"])).await.unwrap();

        let removed = store
            .invalidate_by_tags(&strings(&["x", "y"]))
            .await
            .unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(store.stats().await.unwrap().entries, 0);
        assert_eq!(store.stats().await.unwrap().tags, 0);
    }

    #[tokio::test]
    async fn tag_invalidation_leaves_no_residual_references() {
        let store = MemoryStore::default();

        store.set("/a", entry("<a/>", &["a", "b"])).await.unwrap();

        let removed = store.invalidate_by_tags(&strings(&["a"])).await.unwrap();
        assert_eq!(removed, vec!["/a".to_string()]);

        // The entry left through the delete path, so tag `b` holds no
        // reference to it either.
        let removed = store.invalidate_by_tags(&strings(&["b"])).await.unwrap();
        assert!(removed.is_empty());
        assert_eq!(store.stats().await.unwrap().tags, 0);
    }

    #[tokio::test]
    async fn path_invalidation_is_selective() {
        let store = MemoryStore::default();

        store.set("/a", entry("<a/>", &[])).await.unwrap();
        store.set("/b", entry("<b/>", &[])).await.unwrap();

        let removed = store
            .invalidate_by_paths(&strings(&["/a", "/missing"]))
            .await
            .unwrap();
        assert_eq!(removed, vec!["/a".to_string()]);
        assert!(store.get("/b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn set_overwrite_replaces_tags() {
        let store = MemoryStore::default();

        store.set("/a", entry("<v1/>", &["old"])).await.unwrap();
        store.set("/a", entry("<v2/>", &["new"])).await.unwrap();

        // The old association is gone, not just shadowed.
        let removed = store.invalidate_by_tags(&strings(&["old"])).await.unwrap();
        assert!(removed.is_empty());

        let removed = store.invalidate_by_tags(&strings(&["new"])).await.unwrap();
        assert_eq!(removed, vec!["/a".to_string()]);
    }

    #[tokio::test]
    async fn set_overwrite_refreshes_recency() {
        let store = store_with_limit(2);

        store.set("/a", entry("<a/>", &[])).await.unwrap();
        store.set("/b", entry("<b/>", &[])).await.unwrap();

        // Rewriting /a moves it to the most-recently-used end.
        store.set("/a", entry("<a2/>", &[])).await.unwrap();
        store.set("/c", entry("<c/>", &[])).await.unwrap();

        assert!(store.get("/b").await.unwrap().is_none());
        assert_eq!(store.get("/a").await.unwrap().expect("kept").html, "<a2/>");
    }

    #[tokio::test]
    async fn clear_drops_entries_and_tags() {
        let store = MemoryStore::default();

        store.set("/a", entry("<a/>", &["posts"])).await.unwrap();
        store.clear().await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.tags, 0);
    }

    #[tokio::test]
    async fn recovers_from_poisoned_lock() {
        let store = MemoryStore::default();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.inner.write().expect("inner lock should be acquired");
            panic!("poison inner lock");
        }));

        store.set("/a", entry("<a/>", &[])).await.unwrap();
        assert!(store.get("/a").await.unwrap().is_some());
    }
}
