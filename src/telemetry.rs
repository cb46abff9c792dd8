use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};
use crate::error::CacheError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), CacheError> {
    describe_metrics();

    let default_directive = logging.level.parse().map_err(|err| {
        CacheError::telemetry(format!("invalid log level {:?}: {err}", logging.level))
    })?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_directive)
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            CacheError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "rinnovo_cache_hit_total",
            Unit::Count,
            "Total number of fresh cache hits."
        );
        describe_counter!(
            "rinnovo_cache_miss_total",
            Unit::Count,
            "Total number of cache misses rendered synchronously."
        );
        describe_counter!(
            "rinnovo_cache_stale_total",
            Unit::Count,
            "Total number of stale hits served while regenerating."
        );
        describe_counter!(
            "rinnovo_cache_bypass_total",
            Unit::Count,
            "Total number of lookups bypassing the cache (dynamic or disabled)."
        );
        describe_counter!(
            "rinnovo_cache_evict_total",
            Unit::Count,
            "Total number of entries evicted due to capacity."
        );
        describe_counter!(
            "rinnovo_cache_invalidate_total",
            Unit::Count,
            "Total number of entries removed by tag or path invalidation."
        );
        describe_counter!(
            "rinnovo_regen_failure_total",
            Unit::Count,
            "Total number of failed background regenerations."
        );
    });
}
