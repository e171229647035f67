//! Listing ordering.

use std::cmp::Ordering as CmpOrdering;

use crate::filters::Ordering;
use crate::listing::UnifiedListing;

fn price_sort_value(listing: &UnifiedListing) -> f64 {
    // Unpriced listings sort to the end of an ascending price order.
    listing
        .price
        .map(|p| p.sort_value())
        .unwrap_or(f64::INFINITY)
}

/// The canonical relevance order used whenever no explicit sort is
/// requested: promoted first, then featured, then strictly newer first.
fn relevance(a: &UnifiedListing, b: &UnifiedListing) -> CmpOrdering {
    b.is_promoted
        .cmp(&a.is_promoted)
        .then(b.is_featured.cmp(&a.is_featured))
        .then(b.created_at.cmp(&a.created_at))
}

/// Sort listings in place by the requested ordering.
pub fn sort_listings(listings: &mut [UnifiedListing], ordering: Ordering) {
    match ordering {
        Ordering::Newest => listings.sort_by(relevance),
        Ordering::PriceAsc => {
            listings.sort_by(|a, b| price_sort_value(a).total_cmp(&price_sort_value(b)))
        }
        Ordering::PriceDesc => {
            listings.sort_by(|a, b| price_sort_value(b).total_cmp(&price_sort_value(a)))
        }
        Ordering::RatingDesc => listings.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        Ordering::ViewsDesc => listings.sort_by(|a, b| b.views_count.cmp(&a.views_count)),
    }
}

/// Relevance-sort a pre-merged set (used by the recommendation union).
pub fn sort_by_relevance(listings: &mut [UnifiedListing]) {
    listings.sort_by(relevance);
}
