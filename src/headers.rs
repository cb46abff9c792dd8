//! HTTP cache-semantics derivation.
//!
//! Pure functions mapping a strategy to `Cache-Control` values; the lookup
//! status maps to `X-Cache` via `CacheStatus`'s `Display`. No store access.

use crate::strategy::CacheStrategy;

/// Header names the HTTP layer sets from cache results.
pub mod header_names {
    /// Lookup outcome: HIT, MISS, STALE or EXPIRED.
    pub const X_CACHE: &str = "X-Cache";
    pub const CACHE_CONTROL: &str = "Cache-Control";
}

/// `Cache-Control` served when the page cache is disabled.
pub const CACHE_CONTROL_DISABLED: &str = "no-store, must-revalidate";

/// Derive the `Cache-Control` header for a strategy.
///
/// The stale-while-revalidate window is fixed at twice the revalidate
/// window, mirroring the service behavior of serving stale immediately
/// while one background regeneration runs.
pub fn cache_control(strategy: &CacheStrategy) -> String {
    match strategy {
        CacheStrategy::Static => "public, max-age=31536000, immutable".to_string(),
        CacheStrategy::Dynamic => CACHE_CONTROL_DISABLED.to_string(),
        CacheStrategy::Revalidate { seconds, .. } => format!(
            "public, max-age={seconds}, stale-while-revalidate={}",
            seconds * 2
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_header() {
        assert_eq!(
            cache_control(&CacheStrategy::Static),
            "public, max-age=31536000, immutable"
        );
    }

    #[test]
    fn dynamic_header() {
        assert_eq!(
            cache_control(&CacheStrategy::Dynamic),
            "no-store, must-revalidate"
        );
    }

    #[test]
    fn revalidate_header_doubles_window() {
        let strategy = CacheStrategy::revalidate(3600).expect("valid window");
        assert_eq!(
            cache_control(&strategy),
            "public, max-age=3600, stale-while-revalidate=7200"
        );
    }

    #[test]
    fn revalidate_header_ignores_tags() {
        let strategy =
            CacheStrategy::revalidate_with_tags(60, vec!["posts".to_string()]).expect("valid");
        assert_eq!(
            cache_control(&strategy),
            "public, max-age=60, stale-while-revalidate=120"
        );
    }
}
