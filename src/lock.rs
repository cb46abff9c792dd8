//! Poison-tolerant lock helpers for store internals.
//!
//! A panic while holding the store lock must not take the cache down with
//! it. The worst case after recovery is an entry or tag bucket left from a
//! half-finished write, which invalidation or eviction repairs.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    store: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                store,
                op,
                mode = "read",
                "continuing past poisoned store lock; state may carry a half-finished write"
            );
            poisoned.into_inner()
        }
    }
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    store: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                store,
                op,
                mode = "write",
                "continuing past poisoned store lock; state may carry a half-finished write"
            );
            poisoned.into_inner()
        }
    }
}
