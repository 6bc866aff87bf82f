//! Error types for the Atende gateway

use thiserror::Error;

/// Result type alias for Atende operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the message-processing pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed or empty webhook payload, missing required fields
    #[error("validation error: {0}")]
    Validation(String),

    /// Transient failure against an external service; safe to retry
    #[error("transient external error: {0}")]
    Transient(String),

    /// Media no longer available at the gateway (404/expired); retrying is pointless
    #[error("resource expired: {0}")]
    ResourceExpired(String),

    /// Chat gateway error
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Media processing error
    #[error("media error: {0}")]
    Media(String),

    /// Language model error
    #[error("model error: {0}")]
    Model(String),

    /// Model call exceeded its deadline
    #[error("model call timed out after {0}s")]
    ModelTimeout(u64),

    /// Tool execution error (fed back to the model, never raised to the pipeline)
    #[error("tool error: {0}")]
    Tool(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Whether a retry with backoff could plausibly succeed.
    ///
    /// Expired media is explicitly non-retryable: the gateway has already
    /// discarded the resource, so further attempts only add latency.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Http(_))
    }
}
