// Error taxonomy for resolution, persistence and live sync
use crate::domain::widget::WidgetId;
use thiserror::Error;

/// Failures raised by the backing store seam.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("backing store request failed: {0}")]
    Request(String),

    #[error("backing store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode backing store response: {0}")]
    Decode(String),
}

/// Failures raised by the live channel transport.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LiveError {
    #[error("live session rejected: {0}")]
    Unauthorized(String),

    #[error("live transport failed: {0}")]
    Transport(String),
}

/// Failures of the persistent cache area. Reads that fail are treated as
/// misses; writes that fail are logged.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("cache entry could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Widget configuration form rejected by its schema.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("unknown widget type: {0}")]
    UnknownType(String),

    #[error("Widget Title is required.")]
    MissingTitle,

    #[error("widget configuration must be an object")]
    NotAnObject,

    #[error("{label} is required.")]
    Required { label: &'static str },

    #[error("{label} must be valid structured data")]
    InvalidStructuredData { label: &'static str, reason: String },
}

/// Engine-level errors. Each variant is scoped to the smallest unit it affects:
/// one display load, one widget, one save attempt.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("failed to load display configuration: {0}")]
    ConfigurationRead(#[source] StoreError),

    #[error("failed to read widget record: {0}")]
    RecordRead(#[source] StoreError),

    #[error("live updates unavailable: {0}")]
    SubscribeAuth(#[source] LiveError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to save: {0}")]
    Persist(#[source] StoreError),

    #[error("widget {0} not found")]
    WidgetNotFound(WidgetId),
}
