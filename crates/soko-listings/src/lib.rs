//! Unified marketplace listing retrieval for soko.
//!
//! The backend exposes two separate resource types, products and
//! services; UI callers want one. This crate provides:
//!
//! - **Transform**: total, pure normalization of raw backend records into
//!   [`UnifiedListing`](listing::UnifiedListing), with placeholder fills
//!   for every missing field.
//! - **Orchestration**: [`ListingService`](service::ListingService) fans
//!   out across both resource types with caching, request deduplication,
//!   and classified retry via `soko-data`.
//! - **Reviews**: sanitization, validation, aggregation, and slug-scoped
//!   CRUD in [`reviews`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use soko_data::RestClient;
//! use soko_listings::prelude::*;
//!
//! let client = RestClient::new("https://api.example.com/api/v1")?;
//! let backend = Arc::new(RestBackend::new(client));
//! let listings = ListingService::new(
//!     backend.clone(),
//!     backend.clone(),
//!     backend.clone(),
//!     backend,
//! );
//!
//! let trending = listings.get_trending_listings().await?;
//! for listing in trending.iter() {
//!     println!("{} ({})", listing.title, listing.location);
//! }
//! ```

pub mod backend;
pub mod error;
pub mod filters;
pub mod listing;
pub mod rank;
pub mod reviews;
pub mod service;
pub mod transform;

pub use error::ListingError;
pub use filters::{ItemType, ListingFilters, Ordering};
pub use listing::{ListingKind, ListingPrice, ListingSource, UnifiedListing, Vendor};
pub use service::{CachedPayload, ListingService};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::backend::rest::RestBackend;
    pub use crate::backend::{CatalogApi, ProductApi, RatingApi, SearchApi, ServiceApi};
    pub use crate::error::ListingError;
    pub use crate::filters::{ItemType, ListingFilters, Ordering};
    pub use crate::listing::{
        ListingKind, ListingPrice, ListingSource, UnifiedListing, Vendor,
    };
    pub use crate::rank::{sort_by_relevance, sort_listings};
    pub use crate::reviews::{
        average_rating, rating_distribution, RatingDraft, RatingSort, ReviewsService,
    };
    pub use crate::service::{
        AvailableFilters, CachedPayload, ListingService, PerformanceStats,
        RecommendationParams, VendorStats,
    };
    pub use crate::transform::{transform_product, transform_service};
}
