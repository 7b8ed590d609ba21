//! Typed errors for the litscout pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. The taxonomy mirrors how
//! failures propagate: fetch and oracle failures are recoverable per unit,
//! malformed oracle output gets one repair attempt before the sample is
//! discarded, and only missing configuration is fatal for the operation
//! that needs it.

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Errors that can occur during pipeline operations.
#[derive(Debug, Error)]
pub enum ScoutError {
    /// Page fetch failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Text-generation oracle unavailable or failed
    #[error("oracle error: {0}")]
    Oracle(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Oracle produced output that could not be parsed, even after repair
    #[error("malformed oracle output: {reason}")]
    MalformedResponse { reason: String },

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Durable registry storage failed
    #[error("registry storage error: {0}")]
    RegistryStorage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Term already exists in the registry partition
    #[error("registry already contains term: {name}")]
    DuplicateTerm { name: String },

    /// Required configuration is absent
    #[error("missing configuration: {what}")]
    MissingConfig { what: String },

    /// Every extraction sample for a page failed
    #[error("no usable extraction samples for: {url}")]
    NoSamples { url: String },

    /// Persistence sink rejected a record
    #[error("sink error: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Request exceeded its timeout
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_converts() {
        let fetch_err = FetchError::Timeout {
            url: "https://example.com".to_string(),
        };
        let err: ScoutError = fetch_err.into();
        assert!(matches!(err, ScoutError::Fetch(FetchError::Timeout { .. })));
    }

    #[test]
    fn test_error_display() {
        let err = ScoutError::MalformedResponse {
            reason: "no JSON object found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed oracle output: no JSON object found"
        );
    }
}
