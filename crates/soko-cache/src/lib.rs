//! Caching infrastructure for the soko data layer.
//!
//! Provides a bounded, TTL-based in-memory cache with priority-aware
//! eviction plus a canonical cache-key builder. The cache is a pure
//! in-memory structure with no I/O and no persistence; staleness tolerance
//! is tuned for a browsing UI, not for correctness-critical reads.

pub mod key;
pub mod store;

pub use key::{CacheKey, CacheKeyBuilder};
pub use store::{AdvancedCache, CacheStats};
