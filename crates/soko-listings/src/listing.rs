//! The unified listing view model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::types::{Product, Service};

/// Which resource type a listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Product,
    Service,
}

/// The untransformed backend record, retained for type-specific UI
/// rendering. The tag is the single source of truth for product-vs-service
/// branching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ListingSource {
    Product(Box<Product>),
    Service(Box<Service>),
}

impl ListingSource {
    pub fn kind(&self) -> ListingKind {
        match self {
            ListingSource::Product(_) => ListingKind::Product,
            ListingSource::Service(_) => ListingKind::Service,
        }
    }

    /// Backend id of the category this listing belongs to, when known.
    pub fn category_id(&self) -> Option<i64> {
        match self {
            ListingSource::Product(p) => p.category_details.as_ref().and_then(|c| c.id),
            ListingSource::Service(s) => s.category_details.as_ref().and_then(|c| c.id),
        }
    }

    /// Raw listing status (`active`, `paused`, ...), when the backend
    /// sent one.
    pub fn status(&self) -> Option<&str> {
        match self {
            ListingSource::Product(p) => p.status.as_deref(),
            ListingSource::Service(s) => s.status.as_deref(),
        }
    }

    pub fn as_product(&self) -> Option<&Product> {
        match self {
            ListingSource::Product(p) => Some(p),
            ListingSource::Service(_) => None,
        }
    }

    pub fn as_service(&self) -> Option<&Service> {
        match self {
            ListingSource::Service(s) => Some(s),
            ListingSource::Product(_) => None,
        }
    }
}

/// A normalized price: fixed, or a min/max spread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListingPrice {
    Fixed(f64),
    Range { min: f64, max: f64 },
}

impl ListingPrice {
    /// Value used for price ordering: the fixed price, or the low end of a
    /// range.
    pub fn sort_value(&self) -> f64 {
        match self {
            ListingPrice::Fixed(v) => *v,
            ListingPrice::Range { min, .. } => *min,
        }
    }
}

/// The vendor block surfaced on listing cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub name: String,
    pub image: String,
}

/// The canonical output entity: one polymorphic view over products and
/// services.
///
/// Instances are created fresh on every transform call and never mutated
/// afterwards; any change invalidates the whole cache instead of patching
/// cached entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedListing {
    /// Stringified backend id. Not unique across kinds: two listings with
    /// the same id but different kinds are distinct entities.
    pub id: String,
    pub title: String,
    pub description: String,
    /// `None` means "price unavailable".
    pub price: Option<ListingPrice>,
    /// Always within [0, 5].
    pub rating: f64,
    pub rating_count: u64,
    /// Category display name, not id.
    pub category: String,
    /// Human-readable, never empty.
    pub location: String,
    /// Always a usable URL or the placeholder, never empty.
    pub image: String,
    /// Deduplicated; first element equals `image` when any image resolved.
    pub images: Vec<String>,
    /// At most 10 trimmed, non-empty entries.
    pub tags: Vec<String>,
    pub is_promoted: bool,
    pub is_featured: bool,
    pub is_verified: bool,
    pub provider_name: String,
    pub provider_phone: String,
    pub views_count: u64,
    pub created_at: DateTime<Utc>,
    pub slug: Option<String>,
    pub vendor: Vendor,
    pub source: ListingSource,
}

impl UnifiedListing {
    pub fn kind(&self) -> ListingKind {
        self.source.kind()
    }

    pub fn is_service(&self) -> bool {
        self.kind() == ListingKind::Service
    }

    /// The pair that actually identifies a listing; ids alone collide
    /// across kinds.
    pub fn identity(&self) -> (ListingKind, &str) {
        (self.kind(), self.id.as_str())
    }
}
