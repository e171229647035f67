//! Listing retrieval orchestration.
//!
//! Every public query runs through the shared [`FetchCoordinator`]: cache
//! check, single-flight dedup, classified retry, store-on-success. Fan-out
//! queries absorb per-branch failures so one backend resource type being
//! down never blanks the whole page; best-effort helpers degrade to
//! trending content instead of failing.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::join;
use tracing::warn;

use soko_cache::{AdvancedCache, CacheKey, CacheStats};
use soko_data::{FetchCoordinator, FetchError, RetryPolicy};

use crate::backend::types::{Category, City, Country, Rating, Region, SearchHit};
use crate::backend::{CatalogApi, ProductApi, SearchApi, ServiceApi};
use crate::error::ListingError;
use crate::filters::{ItemType, ListingFilters, Ordering};
use crate::listing::{ListingKind, UnifiedListing};
use crate::rank::{sort_by_relevance, sort_listings};
use crate::transform::{transform_product, transform_service};

/// General listing queries.
pub const TTL_LISTINGS: Duration = Duration::from_secs(300);
/// Search results churn faster.
pub const TTL_SEARCH: Duration = Duration::from_secs(180);
/// Trending/top-rated/promoted presets move slowly.
pub const TTL_PRESETS: Duration = Duration::from_secs(600);
/// Categories and locations barely change.
pub const TTL_TAXONOMY: Duration = Duration::from_secs(1800);

pub const MAX_CACHE_ENTRIES: usize = 200;
/// Item count for the trending/top-rated/promoted presets.
pub const PRESET_LIMIT: usize = 12;
/// Hard cap on recommendation output.
pub const RECOMMENDATION_LIMIT: usize = 20;
/// Related results below this trigger a trending backfill.
const RELATED_BACKFILL_THRESHOLD: usize = 6;

/// One value type for the shared cache; each key prefix maps to exactly
/// one variant.
#[derive(Debug, Clone)]
pub enum CachedPayload {
    Listings(Arc<Vec<UnifiedListing>>),
    Listing(Option<Arc<UnifiedListing>>),
    Categories(Arc<Vec<Category>>),
    Countries(Arc<Vec<Country>>),
    Regions(Arc<Vec<Region>>),
    Cities(Arc<Vec<City>>),
    Ratings(Arc<Vec<Rating>>),
}

fn payload_mismatch() -> FetchError {
    FetchError::Request("cached payload type mismatch".to_string())
}

impl CachedPayload {
    pub fn listings(self) -> Result<Arc<Vec<UnifiedListing>>, FetchError> {
        match self {
            CachedPayload::Listings(v) => Ok(v),
            _ => Err(payload_mismatch()),
        }
    }

    pub fn listing(self) -> Result<Option<Arc<UnifiedListing>>, FetchError> {
        match self {
            CachedPayload::Listing(v) => Ok(v),
            _ => Err(payload_mismatch()),
        }
    }

    pub fn categories(self) -> Result<Arc<Vec<Category>>, FetchError> {
        match self {
            CachedPayload::Categories(v) => Ok(v),
            _ => Err(payload_mismatch()),
        }
    }

    pub fn countries(self) -> Result<Arc<Vec<Country>>, FetchError> {
        match self {
            CachedPayload::Countries(v) => Ok(v),
            _ => Err(payload_mismatch()),
        }
    }

    pub fn regions(self) -> Result<Arc<Vec<Region>>, FetchError> {
        match self {
            CachedPayload::Regions(v) => Ok(v),
            _ => Err(payload_mismatch()),
        }
    }

    pub fn cities(self) -> Result<Arc<Vec<City>>, FetchError> {
        match self {
            CachedPayload::Cities(v) => Ok(v),
            _ => Err(payload_mismatch()),
        }
    }

    pub fn ratings(self) -> Result<Arc<Vec<Rating>>, FetchError> {
        match self {
            CachedPayload::Ratings(v) => Ok(v),
            _ => Err(payload_mismatch()),
        }
    }
}

/// Inputs to the recommendation union.
#[derive(Debug, Clone, Default)]
pub struct RecommendationParams {
    /// Most recent terms last.
    pub search_history: Vec<String>,
    pub category: Option<i64>,
    pub limit: Option<usize>,
}

/// Filter options surfaced to the search UI.
#[derive(Debug, Clone)]
pub struct AvailableFilters {
    pub categories: Arc<Vec<Category>>,
    pub countries: Arc<Vec<Country>>,
    pub orderings: Vec<Ordering>,
}

/// Aggregates over the caller's own listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorStats {
    pub total_listings: usize,
    pub active_listings: usize,
    pub promoted_listings: usize,
    pub total_views: u64,
    pub average_rating: f64,
}

/// Debug snapshot of the data layer.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceStats {
    pub cache: CacheStats,
    pub in_flight: usize,
}

/// Unified listing retrieval over the product and service backends.
///
/// Explicitly constructed with its collaborators; no module-level
/// singletons, so tests drop in fakes.
pub struct ListingService {
    products: Arc<dyn ProductApi>,
    services: Arc<dyn ServiceApi>,
    catalog: Arc<dyn CatalogApi>,
    search: Arc<dyn SearchApi>,
    coordinator: Arc<FetchCoordinator<CachedPayload>>,
}

impl ListingService {
    /// Build a service with its own cache and the default retry policy.
    pub fn new(
        products: Arc<dyn ProductApi>,
        services: Arc<dyn ServiceApi>,
        catalog: Arc<dyn CatalogApi>,
        search: Arc<dyn SearchApi>,
    ) -> Self {
        let cache = AdvancedCache::new(MAX_CACHE_ENTRIES, TTL_LISTINGS)
            .with_priority_prefixes(["trending", "promoted", "categories", "countries"]);
        let coordinator = Arc::new(FetchCoordinator::new(cache, RetryPolicy::default()));
        Self::with_coordinator(products, services, catalog, search, coordinator)
    }

    /// Build a service around an externally owned coordinator (shared with
    /// the reviews service).
    pub fn with_coordinator(
        products: Arc<dyn ProductApi>,
        services: Arc<dyn ServiceApi>,
        catalog: Arc<dyn CatalogApi>,
        search: Arc<dyn SearchApi>,
        coordinator: Arc<FetchCoordinator<CachedPayload>>,
    ) -> Self {
        Self {
            products,
            services,
            catalog,
            search,
            coordinator,
        }
    }

    /// Handle to the shared coordinator, for wiring up collaborators.
    pub fn coordinator(&self) -> Arc<FetchCoordinator<CachedPayload>> {
        Arc::clone(&self.coordinator)
    }

    /// Fetch listings for `filters`, combining both resource types when no
    /// `item_type` is set.
    pub async fn get_all_listings(
        &self,
        filters: &ListingFilters,
    ) -> Result<Arc<Vec<UnifiedListing>>, ListingError> {
        self.combined_query(filters.cache_key("listings"), TTL_LISTINGS, filters.clone())
            .await
    }

    /// Unified search, falling back to the combined listing query when the
    /// search endpoint is unavailable.
    pub async fn search_listings(
        &self,
        filters: &ListingFilters,
    ) -> Result<Arc<Vec<UnifiedListing>>, ListingError> {
        let key = filters.cache_key("search");
        let search = Arc::clone(&self.search);
        let fetch_filters = filters.clone();
        let attempt = self
            .coordinator
            .get_or_fetch(key, Some(TTL_SEARCH), move || {
                let search = search.clone();
                let filters = fetch_filters.clone();
                async move {
                    let hits = search.search(&filters).await?;
                    let mut listings: Vec<UnifiedListing> = hits
                        .into_iter()
                        .map(|hit| match hit {
                            SearchHit::Product(p) => transform_product(p),
                            SearchHit::Service(s) => transform_service(s),
                        })
                        .collect();
                    sort_listings(&mut listings, filters.effective_ordering());
                    Ok(CachedPayload::Listings(Arc::new(listings)))
                }
            })
            .await;

        match attempt {
            Ok(payload) => Ok(payload.listings()?),
            Err(error) => {
                warn!(error = %error, "unified search failed, falling back to listing query");
                self.get_all_listings(filters).await
            }
        }
    }

    /// Most-viewed preset.
    pub async fn get_trending_listings(&self) -> Result<Arc<Vec<UnifiedListing>>, ListingError> {
        let filters = ListingFilters::new()
            .with_ordering(Ordering::ViewsDesc)
            .with_limit(PRESET_LIMIT);
        self.combined_query(CacheKey::new("trending"), TTL_PRESETS, filters)
            .await
    }

    /// Best-rated preset.
    pub async fn get_top_rated_listings(&self) -> Result<Arc<Vec<UnifiedListing>>, ListingError> {
        let filters = ListingFilters::new()
            .with_ordering(Ordering::RatingDesc)
            .with_limit(PRESET_LIMIT);
        self.combined_query(CacheKey::new("top_rated"), TTL_PRESETS, filters)
            .await
    }

    /// Paid-placement preset.
    pub async fn get_promoted_listings(&self) -> Result<Arc<Vec<UnifiedListing>>, ListingError> {
        let filters = ListingFilters::new().promoted().with_limit(PRESET_LIMIT);
        self.combined_query(CacheKey::new("promoted"), TTL_PRESETS, filters)
            .await
    }

    /// Look up a listing by slug without knowing its type: both lookups run
    /// concurrently and whichever succeeds wins (product on a tie). Both
    /// failing means "no such listing", not an error.
    pub async fn get_listing_by_slug_smart(
        &self,
        slug: &str,
    ) -> Result<Option<Arc<UnifiedListing>>, ListingError> {
        let key = CacheKey::new(format!("slug:{}", slug));
        let products = Arc::clone(&self.products);
        let services = Arc::clone(&self.services);
        let slug_owned = slug.to_string();

        let payload = self
            .coordinator
            .get_or_fetch(key, Some(TTL_LISTINGS), move || {
                let products = products.clone();
                let services = services.clone();
                let slug = slug_owned.clone();
                async move {
                    let (product, service) = join!(
                        products.get_product_by_slug(&slug),
                        services.get_service_by_slug(&slug)
                    );
                    let listing = match (product, service) {
                        (Ok(p), _) => Some(transform_product(p)),
                        (_, Ok(s)) => Some(transform_service(s)),
                        (Err(pe), Err(se)) => {
                            if !pe.is_not_found() || !se.is_not_found() {
                                warn!(%slug, product = %pe, service = %se, "slug lookup failed on both paths");
                            }
                            None
                        }
                    };
                    Ok(CachedPayload::Listing(listing.map(Arc::new)))
                }
            })
            .await?;

        Ok(payload.listing()?)
    }

    /// Look up a listing by bare id: product path first, service path on
    /// failure. Not-found on both sides is `Ok(None)`; a genuine failure
    /// propagates so callers can distinguish the two.
    pub async fn get_listing(&self, id: i64) -> Result<Option<UnifiedListing>, ListingError> {
        let product_err = match self.products.get_product(id).await {
            Ok(product) => return Ok(Some(transform_product(product))),
            Err(e) => e,
        };
        match self.services.get_service(id).await {
            Ok(service) => Ok(Some(transform_service(service))),
            Err(service_err) => {
                if product_err.is_not_found() && service_err.is_not_found() {
                    Ok(None)
                } else if product_err.is_not_found() {
                    Err(service_err.into())
                } else {
                    Err(product_err.into())
                }
            }
        }
    }

    /// Same-category listings of the same kind, excluding the current item
    /// and backfilled from trending when the category runs sparse. Always
    /// best-effort: failures shrink the result, they never propagate.
    pub async fn get_related_listings(
        &self,
        listing: &UnifiedListing,
        limit: usize,
    ) -> Result<Vec<UnifiedListing>, ListingError> {
        let item_type = match listing.kind() {
            ListingKind::Product => ItemType::Products,
            ListingKind::Service => ItemType::Services,
        };
        let mut filters = ListingFilters::new()
            .with_item_type(item_type)
            .with_limit(limit + 1);
        filters.category = listing.source.category_id();

        let mut related: Vec<UnifiedListing> = match self.get_all_listings(&filters).await {
            Ok(results) => results
                .iter()
                .filter(|candidate| candidate.identity() != listing.identity())
                .take(limit)
                .cloned()
                .collect(),
            Err(error) => {
                warn!(error = %error, "related query failed, relying on trending backfill");
                Vec::new()
            }
        };

        if related.len() < limit.min(RELATED_BACKFILL_THRESHOLD) {
            match self.get_trending_listings().await {
                Ok(trending) => {
                    for candidate in trending.iter() {
                        if related.len() >= limit {
                            break;
                        }
                        if candidate.identity() == listing.identity() {
                            continue;
                        }
                        if related
                            .iter()
                            .any(|existing| existing.identity() == candidate.identity())
                        {
                            continue;
                        }
                        related.push(candidate.clone());
                    }
                }
                Err(error) => warn!(error = %error, "trending backfill failed"),
            }
        }

        related.truncate(limit);
        Ok(related)
    }

    /// Union of up to three interest signals (recent search, preferred
    /// category, featured), deduplicated and relevance-ordered. Falls back
    /// to trending when nothing comes back.
    pub async fn get_ai_recommendations(
        &self,
        params: &RecommendationParams,
    ) -> Result<Vec<UnifiedListing>, ListingError> {
        let limit = params
            .limit
            .unwrap_or(RECOMMENDATION_LIMIT)
            .min(RECOMMENDATION_LIMIT);

        let search_filters = params
            .search_history
            .last()
            .map(|term| ListingFilters::new().with_search(term.clone()).with_limit(limit));
        let category_filters = params
            .category
            .map(|category| ListingFilters::new().with_category(category).with_limit(limit));
        let featured_filters = Some(ListingFilters::new().featured().with_limit(limit));

        let (from_search, from_category, from_featured) = join!(
            self.best_effort_query(search_filters),
            self.best_effort_query(category_filters),
            self.best_effort_query(featured_filters)
        );

        let mut seen: HashSet<(ListingKind, String)> = HashSet::new();
        let mut merged: Vec<UnifiedListing> = Vec::new();
        for listing in from_search
            .into_iter()
            .chain(from_category)
            .chain(from_featured)
        {
            let identity = (listing.kind(), listing.id.clone());
            if seen.insert(identity) {
                merged.push(listing);
            }
        }

        if merged.is_empty() {
            let trending = self.get_trending_listings().await?;
            merged = trending.iter().take(limit).cloned().collect();
            return Ok(merged);
        }

        sort_by_relevance(&mut merged);
        merged.truncate(limit);
        Ok(merged)
    }

    /// The caller's own listings across both resource types, absorbed per
    /// branch.
    pub async fn get_my_listings(&self) -> Result<Vec<UnifiedListing>, ListingError> {
        let (products, services) = join!(self.products.my_products(), self.services.my_services());

        let mut listings: Vec<UnifiedListing> = Vec::new();
        match products {
            Ok(items) => listings.extend(items.into_iter().map(transform_product)),
            Err(error) => warn!(error = %error, "my-products query failed, continuing"),
        }
        match services {
            Ok(items) => listings.extend(items.into_iter().map(transform_service)),
            Err(error) => warn!(error = %error, "my-services query failed, continuing"),
        }

        sort_listings(&mut listings, Ordering::Newest);
        Ok(listings)
    }

    /// Delete by bare id: product path first, service path on product
    /// failure. Success on either path invalidates the entire cache.
    pub async fn delete_listing(&self, id: i64) -> Result<(), ListingError> {
        if let Err(product_err) = self.products.delete_product(id).await {
            if let Err(service_err) = self.services.delete_service(id).await {
                warn!(id, product = %product_err, service = %service_err, "delete failed on both paths");
                return Err(service_err.into());
            }
        }
        self.coordinator.invalidate_all();
        Ok(())
    }

    /// Status update with the same two-path resolution and coarse
    /// invalidation as [`delete_listing`](Self::delete_listing).
    pub async fn update_listing_status(&self, id: i64, status: &str) -> Result<(), ListingError> {
        if let Err(product_err) = self.products.update_product_status(id, status).await {
            if let Err(service_err) = self.services.update_service_status(id, status).await {
                warn!(id, product = %product_err, service = %service_err, "status update failed on both paths");
                return Err(service_err.into());
            }
        }
        self.coordinator.invalidate_all();
        Ok(())
    }

    pub async fn get_categories(&self) -> Result<Arc<Vec<Category>>, ListingError> {
        let catalog = Arc::clone(&self.catalog);
        let payload = self
            .coordinator
            .get_or_fetch(CacheKey::new("categories"), Some(TTL_TAXONOMY), move || {
                let catalog = catalog.clone();
                async move {
                    let categories = catalog.categories().await?;
                    Ok(CachedPayload::Categories(Arc::new(categories)))
                }
            })
            .await?;
        Ok(payload.categories()?)
    }

    pub async fn get_countries(&self) -> Result<Arc<Vec<Country>>, ListingError> {
        let catalog = Arc::clone(&self.catalog);
        let payload = self
            .coordinator
            .get_or_fetch(CacheKey::new("countries"), Some(TTL_TAXONOMY), move || {
                let catalog = catalog.clone();
                async move {
                    let countries = catalog.countries().await?;
                    Ok(CachedPayload::Countries(Arc::new(countries)))
                }
            })
            .await?;
        Ok(payload.countries()?)
    }

    pub async fn get_states(&self, country: i64) -> Result<Arc<Vec<Region>>, ListingError> {
        let catalog = Arc::clone(&self.catalog);
        let key = CacheKey::new(format!("states:{}", country));
        let payload = self
            .coordinator
            .get_or_fetch(key, Some(TTL_TAXONOMY), move || {
                let catalog = catalog.clone();
                async move {
                    let states = catalog.states(country).await?;
                    Ok(CachedPayload::Regions(Arc::new(states)))
                }
            })
            .await?;
        Ok(payload.regions()?)
    }

    pub async fn get_cities(&self, state: i64) -> Result<Arc<Vec<City>>, ListingError> {
        let catalog = Arc::clone(&self.catalog);
        let key = CacheKey::new(format!("cities:{}", state));
        let payload = self
            .coordinator
            .get_or_fetch(key, Some(TTL_TAXONOMY), move || {
                let catalog = catalog.clone();
                async move {
                    let cities = catalog.cities(state).await?;
                    Ok(CachedPayload::Cities(Arc::new(cities)))
                }
            })
            .await?;
        Ok(payload.cities()?)
    }

    /// Filter panel contents. Best-effort: a taxonomy failure yields empty
    /// option lists rather than a broken panel.
    pub async fn get_available_filters(&self) -> AvailableFilters {
        let (categories, countries) = join!(self.get_categories(), self.get_countries());
        AvailableFilters {
            categories: categories.unwrap_or_else(|error| {
                warn!(error = %error, "categories unavailable for filter panel");
                Arc::new(Vec::new())
            }),
            countries: countries.unwrap_or_else(|error| {
                warn!(error = %error, "countries unavailable for filter panel");
                Arc::new(Vec::new())
            }),
            orderings: vec![
                Ordering::Newest,
                Ordering::PriceAsc,
                Ordering::PriceDesc,
                Ordering::RatingDesc,
                Ordering::ViewsDesc,
            ],
        }
    }

    /// Dashboard aggregates over the caller's own listings.
    pub async fn get_vendor_stats(&self) -> Result<VendorStats, ListingError> {
        let listings = self.get_my_listings().await?;

        let rated: Vec<f64> = listings
            .iter()
            .map(|l| l.rating)
            .filter(|r| *r > 0.0)
            .collect();
        let average_rating = if rated.is_empty() {
            0.0
        } else {
            let mean = rated.iter().sum::<f64>() / rated.len() as f64;
            (mean * 10.0).round() / 10.0
        };

        Ok(VendorStats {
            total_listings: listings.len(),
            active_listings: listings
                .iter()
                .filter(|l| l.source.status() == Some("active"))
                .count(),
            promoted_listings: listings.iter().filter(|l| l.is_promoted).count(),
            total_views: listings.iter().map(|l| l.views_count).sum(),
            average_rating,
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.coordinator.cache_stats()
    }

    pub fn performance_stats(&self) -> PerformanceStats {
        PerformanceStats {
            cache: self.coordinator.cache_stats(),
            in_flight: self.coordinator.in_flight(),
        }
    }

    /// Shared path for every combined (product+service) query.
    async fn combined_query(
        &self,
        key: CacheKey,
        ttl: Duration,
        filters: ListingFilters,
    ) -> Result<Arc<Vec<UnifiedListing>>, ListingError> {
        let products = Arc::clone(&self.products);
        let services = Arc::clone(&self.services);
        let payload = self
            .coordinator
            .get_or_fetch(key, Some(ttl), move || {
                let products = products.clone();
                let services = services.clone();
                let filters = filters.clone();
                async move {
                    let listings = fetch_combined(products, services, filters).await?;
                    Ok(CachedPayload::Listings(Arc::new(listings)))
                }
            })
            .await?;
        Ok(payload.listings()?)
    }

    async fn best_effort_query(&self, filters: Option<ListingFilters>) -> Vec<UnifiedListing> {
        let Some(filters) = filters else {
            return Vec::new();
        };
        match self.get_all_listings(&filters).await {
            Ok(results) => results.iter().cloned().collect(),
            Err(error) => {
                warn!(error = %error, "recommendation branch failed, skipping");
                Vec::new()
            }
        }
    }
}

/// Fetch and transform per the `item_type` branch. The "both" fan-out
/// absorbs either side's failure as an empty contribution; single-type
/// queries propagate theirs.
async fn fetch_combined(
    products: Arc<dyn ProductApi>,
    services: Arc<dyn ServiceApi>,
    filters: ListingFilters,
) -> Result<Vec<UnifiedListing>, FetchError> {
    let mut listings: Vec<UnifiedListing> = match filters.item_type {
        Some(ItemType::Products) => products
            .list_products(&filters)
            .await?
            .into_iter()
            .map(transform_product)
            .collect(),
        Some(ItemType::Services) => services
            .list_services(&filters)
            .await?
            .into_iter()
            .map(transform_service)
            .collect(),
        None => {
            let (product_branch, service_branch) =
                join!(products.list_products(&filters), services.list_services(&filters));

            let mut merged: Vec<UnifiedListing> = Vec::new();
            match product_branch {
                Ok(items) => merged.extend(items.into_iter().map(transform_product)),
                Err(error) => {
                    warn!(error = %error, "product branch failed, continuing with services")
                }
            }
            match service_branch {
                Ok(items) => merged.extend(items.into_iter().map(transform_service)),
                Err(error) => {
                    warn!(error = %error, "service branch failed, continuing with products")
                }
            }
            merged
        }
    };

    sort_listings(&mut listings, filters.effective_ordering());
    if let Some(limit) = filters.limit {
        listings.truncate(limit);
    }
    Ok(listings)
}
