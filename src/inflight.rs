//! Single-flight regeneration markers.
//!
//! At most one background regeneration may be in flight per cache key.
//! Callers observing the same stale entry serve it as-is instead of starting
//! a second render. Stale callers never await the regeneration, so the map
//! holds a generation token rather than a shared future; invalidation bumps
//! the key out of the map and the superseded regeneration discards its
//! result.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// In-flight regeneration markers keyed by cache key.
#[derive(Clone, Default)]
pub(crate) struct InFlightRegenerations {
    markers: Arc<DashMap<String, u64>>,
    token_counter: Arc<AtomicU64>,
}

impl InFlightRegenerations {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a marker for `key` unless one is already present.
    ///
    /// `DashMap::entry` makes check-and-set atomic: two callers racing on
    /// the same stale key cannot both acquire.
    pub(crate) fn acquire(&self, key: &str) -> Option<RegenGuard> {
        use dashmap::mapref::entry::Entry;

        let token = self.token_counter.fetch_add(1, Ordering::Relaxed);
        match self.markers.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(token);
                Some(RegenGuard {
                    key: key.to_string(),
                    token,
                    markers: Arc::clone(&self.markers),
                })
            }
            Entry::Occupied(_) => None,
        }
    }

    /// Drop the marker for an invalidated key, superseding any regeneration
    /// holding it.
    pub(crate) fn invalidate(&self, key: &str) {
        self.markers.remove(key);
    }

    /// Drop all markers, superseding every in-flight regeneration.
    pub(crate) fn clear(&self) {
        self.markers.clear();
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.markers.contains_key(key)
    }
}

/// Marker held for the duration of one background regeneration.
pub(crate) struct RegenGuard {
    key: String,
    token: u64,
    markers: Arc<DashMap<String, u64>>,
}

impl RegenGuard {
    /// Whether this regeneration still owns the marker.
    ///
    /// False once the key was invalidated; the result must then be
    /// discarded rather than written back.
    pub(crate) fn is_current(&self) -> bool {
        self.markers
            .get(&self.key)
            .is_some_and(|token| *token == self.token)
    }
}

impl Drop for RegenGuard {
    fn drop(&mut self) {
        // Remove only our own token: a marker cleared by invalidation and
        // re-acquired by a later regeneration must not be clobbered.
        self.markers
            .remove_if(&self.key, |_, token| *token == self.token);
    }
}
