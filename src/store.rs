//! Cache storage contract.
//!
//! The service talks to storage only through `CacheStore`, so a process-local
//! memory store and an I/O-backed distributed store are interchangeable. All
//! operations are idempotent on absent keys; none fails for a missing key.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CacheError;
use crate::strategy::CacheEntry;

/// Storage observability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of stored entries.
    pub entries: usize,
    /// Number of live tag buckets in the tag index.
    pub tags: usize,
}

/// Key → entry storage with a tag index.
///
/// Implementations must keep the tag index consistent with the stored keys:
/// every removal path deregisters the entry's tags, including dropping
/// now-empty tag buckets.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an entry. A hit may refresh recency bookkeeping; a miss has
    /// no side effect.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Store an entry, replacing any existing entry at `key` wholesale, and
    /// index its tags for later invalidation.
    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError>;

    /// Remove an entry. Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every entry whose tag set intersects `tags`.
    ///
    /// Returns the removed keys, each exactly once; the invalidation count
    /// is their length.
    async fn invalidate_by_tags(&self, tags: &[String]) -> Result<Vec<String>, CacheError>;

    /// Remove entries by exact key. Returns the keys that existed.
    async fn invalidate_by_paths(&self, paths: &[String]) -> Result<Vec<String>, CacheError>;

    /// Drop everything.
    async fn clear(&self) -> Result<(), CacheError>;

    /// Snapshot entry and tag-bucket counts.
    async fn stats(&self) -> Result<CacheStats, CacheError>;
}
