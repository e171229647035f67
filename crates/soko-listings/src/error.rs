//! Listing error types.

use thiserror::Error;

use soko_data::FetchError;

/// Errors surfaced to UI callers of the listing and reviews services.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ListingError {
    /// A backend fetch failed after retries were exhausted.
    #[error("Failed to load listings: {0}")]
    Fetch(#[from] FetchError),

    /// Client-side validation rejected the payload; raised before any
    /// network call, with every violated rule listed.
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl ListingError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ListingError::Fetch(e) if e.is_not_found())
    }
}
