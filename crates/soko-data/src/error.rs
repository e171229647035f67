//! Fetch error taxonomy.
//!
//! Errors are `Clone` because every awaiter of a deduplicated in-flight
//! request receives the same rejection.

use thiserror::Error;

/// Error type for fetch operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Non-success HTTP status.
    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    /// The request timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Connection-level failure (DNS, refused, reset).
    #[error("Connection error: {0}")]
    Connection(String),

    /// The resource does not exist. Single-item lookups convert this to
    /// `Ok(None)` instead of propagating it.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The response body could not be decoded.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Client-side validation rejected the payload before any network call.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Anything else that went wrong building or sending the request.
    #[error("Request error: {0}")]
    Request(String),
}

impl FetchError {
    /// Whether a retry has any chance of succeeding.
    ///
    /// Server errors, rate limiting, timeouts, and connection failures are
    /// transient; 4xx responses, missing resources, decode failures, and
    /// validation errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http { status, .. } => *status >= 500 || *status == 429,
            FetchError::Timeout(_) | FetchError::Connection(_) => true,
            FetchError::NotFound(_)
            | FetchError::Deserialization(_)
            | FetchError::Validation(_)
            | FetchError::Request(_) => false,
        }
    }

    /// Whether this error means "the resource does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FetchError::NotFound(_) | FetchError::Http { status: 404, .. }
        )
    }
}
