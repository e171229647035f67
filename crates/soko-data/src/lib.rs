//! Data access layer for soko.
//!
//! Wraps arbitrary asynchronous fetches with the three primitives the
//! listing layer is built on:
//!
//! - **Retry** with a classified error taxonomy and a backoff schedule
//!   (transient failures retried, client errors surfaced immediately).
//! - **Request deduplication** (single-flight): overlapping fetches for
//!   one cache key share a single network round-trip.
//! - **Cached fetch coordination**: cache check, deduplicated fetch,
//!   store-on-success.
//!
//! Plus the REST plumbing shared by the backend API implementations: the
//! paginated `Page<T>` envelope and a reqwest-backed [`RestClient`].

pub mod client;
pub mod coordinator;
pub mod dedup;
pub mod envelope;
pub mod error;
pub mod retry;

pub use client::RestClient;
pub use coordinator::FetchCoordinator;
pub use dedup::RequestDeduplicator;
pub use envelope::Page;
pub use error::FetchError;
pub use retry::{run_with_retry, BackoffStrategy, RetryPolicy};
