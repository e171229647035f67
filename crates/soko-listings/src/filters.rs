//! Listing query filters and ordering tokens.

use serde::{Deserialize, Serialize};

use soko_cache::CacheKey;

/// Which backend resource type a query targets. `None` on the filters
/// means "both".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Products,
    Services,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Products => "products",
            ItemType::Services => "services",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result ordering, expressed as the backend's Django-style tokens
/// (`-field` for descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Ordering {
    /// Newest first. This is also the canonical "relevance" order:
    /// promoted first, then featured, then strictly newer `created_at`.
    #[default]
    Newest,
    /// Price, low to high.
    PriceAsc,
    /// Price, high to low.
    PriceDesc,
    /// Highest rated first.
    RatingDesc,
    /// Most viewed first.
    ViewsDesc,
}

impl Ordering {
    /// The backend query token for this ordering.
    pub fn as_param(&self) -> &'static str {
        match self {
            Ordering::Newest => "-created_at",
            Ordering::PriceAsc => "product_price",
            Ordering::PriceDesc => "-product_price",
            Ordering::RatingDesc => "-average_rating",
            Ordering::ViewsDesc => "-views_count",
        }
    }

    pub fn from_param(token: &str) -> Option<Self> {
        match token {
            "-created_at" => Some(Ordering::Newest),
            "product_price" => Some(Ordering::PriceAsc),
            "-product_price" => Some(Ordering::PriceDesc),
            "-average_rating" => Some(Ordering::RatingDesc),
            "-views_count" => Some(Ordering::ViewsDesc),
            _ => None,
        }
    }
}

/// The filter shape UI callers pass into the listing service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilters {
    pub search: Option<String>,
    pub category: Option<i64>,
    pub country: Option<i64>,
    pub state: Option<i64>,
    pub city: Option<i64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub item_type: Option<ItemType>,
    pub verified_only: bool,
    pub featured_only: bool,
    pub promoted_only: bool,
    pub serves_remote: Option<bool>,
    pub ordering: Option<Ordering>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub my_listings: bool,
}

impl ListingFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        if !term.trim().is_empty() {
            self.search = Some(term);
        }
        self
    }

    pub fn with_category(mut self, category: i64) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_item_type(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    pub fn with_ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn featured(mut self) -> Self {
        self.featured_only = true;
        self
    }

    pub fn promoted(mut self) -> Self {
        self.promoted_only = true;
        self
    }

    /// Ordering to apply, defaulting to the relevance chain.
    pub fn effective_ordering(&self) -> Ordering {
        self.ordering.unwrap_or_default()
    }

    /// Canonical cache key for this query. Field set order and
    /// number-vs-string incidentals never change the key.
    pub fn cache_key(&self, prefix: &str) -> CacheKey {
        CacheKey::builder(prefix)
            .opt_param("search", self.search.as_deref())
            .opt_param("category", self.category)
            .opt_param("country", self.country)
            .opt_param("state", self.state)
            .opt_param("city", self.city)
            .opt_param("min_price", self.min_price)
            .opt_param("max_price", self.max_price)
            .opt_param("min_rating", self.min_rating)
            .opt_param("item_type", self.item_type)
            .flag("verified", self.verified_only)
            .flag("featured", self.featured_only)
            .flag("promoted", self.promoted_only)
            .opt_param("remote", self.serves_remote)
            .opt_param("ordering", self.ordering.map(|o| o.as_param()))
            .opt_param("limit", self.limit)
            .opt_param("offset", self.offset)
            .flag("mine", self.my_listings)
            .build()
    }

    /// Flat query parameters for the backend resource endpoints.
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        let mut push = |k: &str, v: String| params.push((k.to_string(), v));

        if let Some(search) = &self.search {
            push("search", search.clone());
        }
        if let Some(category) = self.category {
            push("category", category.to_string());
        }
        if let Some(country) = self.country {
            push("country", country.to_string());
        }
        if let Some(state) = self.state {
            push("state", state.to_string());
        }
        if let Some(city) = self.city {
            push("city", city.to_string());
        }
        if let Some(min_price) = self.min_price {
            push("min_price", min_price.to_string());
        }
        if let Some(max_price) = self.max_price {
            push("max_price", max_price.to_string());
        }
        if let Some(min_rating) = self.min_rating {
            push("min_rating", min_rating.to_string());
        }
        if self.verified_only {
            push("is_verified", "true".into());
        }
        if self.featured_only {
            push("is_featured", "true".into());
        }
        if self.promoted_only {
            push("is_promoted", "true".into());
        }
        if let Some(remote) = self.serves_remote {
            push("serves_remote", remote.to_string());
        }
        if let Some(ordering) = self.ordering {
            push("ordering", ordering.as_param().to_string());
        }
        if let Some(limit) = self.limit {
            push("page_size", limit.to_string());
        }
        if let Some(offset) = self.offset {
            push("offset", offset.to_string());
        }
        if self.my_listings {
            push("my_listings", "true".into());
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_ignores_construction_order() {
        let a = ListingFilters::new()
            .with_search("shoes")
            .with_category(3)
            .with_ordering(Ordering::PriceAsc);
        let b = ListingFilters {
            ordering: Some(Ordering::PriceAsc),
            category: Some(3),
            search: Some("shoes".into()),
            ..Default::default()
        };
        assert_eq!(a.cache_key("listings"), b.cache_key("listings"));
    }

    #[test]
    fn test_cache_key_distinguishes_item_type() {
        let products = ListingFilters::new().with_item_type(ItemType::Products);
        let services = ListingFilters::new().with_item_type(ItemType::Services);
        assert_ne!(
            products.cache_key("listings"),
            services.cache_key("listings")
        );
    }

    #[test]
    fn test_ordering_round_trips_through_param() {
        for ordering in [
            Ordering::Newest,
            Ordering::PriceAsc,
            Ordering::PriceDesc,
            Ordering::RatingDesc,
            Ordering::ViewsDesc,
        ] {
            assert_eq!(Ordering::from_param(ordering.as_param()), Some(ordering));
        }
        assert_eq!(Ordering::from_param("-bogus"), None);
    }

    #[test]
    fn test_query_params_skip_unset_fields() {
        let params = ListingFilters::new().with_search("drill").to_query_params();
        assert_eq!(params, vec![("search".to_string(), "drill".to_string())]);
    }
}
