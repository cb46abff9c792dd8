//! Cache data model.
//!
//! Defines the caching policy a page declares (`CacheStrategy`), the stored
//! unit (`CacheEntry`), and the value returned to callers (`CacheResult`).

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::CacheError;

/// Caching policy declared by a page.
///
/// Deserialization runs the same zero-window validation as the
/// constructors, so a configured strategy is as constrained as a built one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(try_from = "CacheStrategyRepr")]
pub enum CacheStrategy {
    /// Cache forever once computed; only explicit invalidation removes it.
    Static,
    /// Never cached; every request re-renders.
    Dynamic,
    /// Cached with a time-to-stale of `seconds`; optional tags for grouped
    /// invalidation.
    Revalidate { seconds: u64, tags: Vec<String> },
}

/// Unvalidated wire shape of `CacheStrategy`.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CacheStrategyRepr {
    Static,
    Dynamic,
    Revalidate {
        seconds: u64,
        #[serde(default)]
        tags: Vec<String>,
    },
}

impl TryFrom<CacheStrategyRepr> for CacheStrategy {
    type Error = CacheError;

    fn try_from(repr: CacheStrategyRepr) -> Result<Self, Self::Error> {
        match repr {
            CacheStrategyRepr::Static => Ok(Self::Static),
            CacheStrategyRepr::Dynamic => Ok(Self::Dynamic),
            CacheStrategyRepr::Revalidate { seconds, tags } => {
                Self::revalidate_with_tags(seconds, tags)
            }
        }
    }
}

impl CacheStrategy {
    /// Create a `Revalidate` strategy without tags.
    ///
    /// A zero-second window is a configuration error, rejected here rather
    /// than at lookup time.
    pub fn revalidate(seconds: u64) -> Result<Self, CacheError> {
        Self::revalidate_with_tags(seconds, Vec::new())
    }

    /// Create a `Revalidate` strategy with invalidation tags.
    pub fn revalidate_with_tags(seconds: u64, tags: Vec<String>) -> Result<Self, CacheError> {
        if seconds == 0 {
            return Err(CacheError::InvalidRevalidateWindow { seconds });
        }
        Ok(Self::Revalidate { seconds, tags })
    }

    /// Tags declared by this strategy.
    pub fn tags(&self) -> &[String] {
        match self {
            Self::Revalidate { tags, .. } => tags,
            Self::Static | Self::Dynamic => &[],
        }
    }

    /// Seconds until a cached entry turns stale, if the strategy revalidates.
    pub fn revalidate_seconds(&self) -> Option<u64> {
        match self {
            Self::Revalidate { seconds, .. } => Some(*seconds),
            Self::Static | Self::Dynamic => None,
        }
    }
}

impl Default for CacheStrategy {
    fn default() -> Self {
        Self::Static
    }
}

/// The stored unit: rendered HTML plus the metadata needed to decide
/// freshness and to regenerate correct headers on a hit.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub html: String,
    pub created_at: OffsetDateTime,
    /// Absolute time after which the entry is stale; `None` means never.
    ///
    /// Invariant: `Some` if and only if `strategy` is `Revalidate`.
    pub revalidate_after: Option<OffsetDateTime>,
    /// Invariant: equals `strategy.tags()`.
    pub tags: Vec<String>,
    pub strategy: CacheStrategy,
}

impl CacheEntry {
    /// Build an entry from a render result, stamping `created_at = now`.
    pub fn new(html: String, strategy: CacheStrategy, now: OffsetDateTime) -> Self {
        let revalidate_after = strategy
            .revalidate_seconds()
            .map(|seconds| now + Duration::seconds(seconds as i64));
        Self {
            html,
            created_at: now,
            revalidate_after,
            tags: strategy.tags().to_vec(),
            strategy,
        }
    }

    /// Whether the entry should be served stale and regenerated.
    ///
    /// Entries without a `revalidate_after` never go stale.
    pub fn is_stale(&self, now: OffsetDateTime) -> bool {
        match self.revalidate_after {
            Some(after) => now > after,
            None => false,
        }
    }

    /// Age of the entry at `now`.
    pub fn age(&self, now: OffsetDateTime) -> Duration {
        now - self.created_at
    }
}

/// Outcome of a cache lookup, reported via the `X-Cache` response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Fresh cache hit.
    Hit,
    /// Not cached; the caller waited for the render.
    Miss,
    /// Served stale while a background regeneration runs.
    Stale,
    /// Reserved for store backends that hard-expire entries instead of
    /// serving stale. The default memory store never produces it.
    Expired,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Stale => write!(f, "STALE"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// What a render produces: the markup and the strategy to cache it under.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub html: String,
    pub strategy: CacheStrategy,
}

/// Value returned to the caller of a lookup.
///
/// Carries the strategy so the HTTP layer can derive `Cache-Control`
/// without re-resolving it from route metadata.
#[derive(Debug, Clone)]
pub struct CacheResult {
    pub html: String,
    pub status: CacheStatus,
    pub strategy: CacheStrategy,
}
