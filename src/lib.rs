//! Rinnovo Page Cache
//!
//! A page cache and revalidation engine for server-rendered sites: decide
//! per request whether to serve a cached page, serve stale while
//! regenerating in the background, or render fresh, with tag- and
//! path-based on-demand invalidation.
//!
//! - **Strategies**: `static` (cache forever), `dynamic` (never cache),
//!   `revalidate(seconds, tags)` (stale-while-revalidate).
//! - **Storage**: a `CacheStore` trait with a bounded in-memory LRU + tag
//!   index default; alternate backends plug in behind the same contract.
//! - **Single flight**: one background regeneration per key; concurrent
//!   stale hits share it.
//!
//! ## Usage
//!
//! ```ignore
//! let cache = Arc::new(PageCache::new(CacheConfig::default()));
//! let result = cache
//!     .get_or_create(key, strategy, || async { render_page().await })
//!     .await?;
//! // result.status → X-Cache; cache.cache_control_header(&result.strategy)
//! ```

mod admin;
mod config;
mod error;
mod headers;
mod inflight;
mod lock;
mod memory;
mod service;
mod store;
mod strategy;
pub mod telemetry;

pub use admin::{AdminState, InvalidatedCounts, RevalidateRequest, RevalidateResponse, admin_router};
pub use config::{CacheConfig, LogFormat, LoggingSettings};
pub use error::CacheError;
pub use headers::{CACHE_CONTROL_DISABLED, cache_control, header_names};
pub use memory::MemoryStore;
pub use service::PageCache;
pub use store::{CacheStats, CacheStore};
pub use strategy::{CacheEntry, CacheResult, CacheStatus, CacheStrategy, RenderOutput};
