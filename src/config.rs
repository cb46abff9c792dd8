//! Cache configuration.
//!
//! Plain deserializable settings with explicit defaults; hosts embed this in
//! their own configuration files.

use std::num::NonZeroUsize;

use serde::Deserialize;

use crate::strategy::CacheStrategy;

// Default values for cache configuration
const DEFAULT_MAX_ENTRIES: usize = 1000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Page cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the page cache. When disabled every request renders fresh.
    pub enabled: bool,
    /// Maximum entries held by the default memory store before LRU eviction.
    pub max_entries: usize,
    /// Strategy applied to pages that do not declare one.
    pub default_strategy: CacheStrategy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: DEFAULT_MAX_ENTRIES,
            default_strategy: CacheStrategy::Static,
        }
    }
}

impl CacheConfig {
    /// Returns the entry limit as `NonZeroUsize`, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

/// Logging settings consumed by `telemetry::init`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default tracing directive, overridable via `RUST_LOG`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_entries, 1000);
        assert_eq!(config.default_strategy, CacheStrategy::Static);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            max_entries: 0,
            ..Default::default()
        };
        assert_eq!(config.max_entries_non_zero().get(), 1);
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"max_entries": 50}"#).expect("parse config");
        assert!(config.enabled);
        assert_eq!(config.max_entries, 50);
    }

    #[test]
    fn deserializes_default_strategy() {
        let config: CacheConfig = serde_json::from_str(
            r#"{"default_strategy": {"type": "revalidate", "seconds": 60}}"#,
        )
        .expect("parse config");
        assert_eq!(config.default_strategy.revalidate_seconds(), Some(60));
    }

    #[test]
    fn rejects_zero_window_default_strategy() {
        let result = serde_json::from_str::<CacheConfig>(
            r#"{"default_strategy": {"type": "revalidate", "seconds": 0}}"#,
        );
        assert!(result.is_err());
    }
}
