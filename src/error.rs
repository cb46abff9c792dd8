use thiserror::Error;

/// Errors surfaced by the page cache.
///
/// Background regeneration failures are logged, never returned; a `Render`
/// error reaches the caller only on the miss and dynamic paths, where the
/// caller is directly awaiting the render.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("render failed: {0}")]
    Render(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("store error: {message}")]
    Store { message: String },
    #[error("invalid revalidate window: {seconds} seconds")]
    InvalidRevalidateWindow { seconds: u64 },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl CacheError {
    pub fn render(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Render(source.into())
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
