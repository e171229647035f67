//! Ratings and reviews: sanitization, validation, aggregation, and the
//! slug-scoped CRUD service.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use soko_cache::CacheKey;
use soko_data::FetchCoordinator;

use crate::backend::types::Rating;
use crate::backend::RatingApi;
use crate::error::ListingError;
use crate::service::CachedPayload;

/// Cached review lists go stale fast; keep the window short.
pub const TTL_RATINGS: Duration = Duration::from_secs(120);

const REVIEW_MIN_CHARS: usize = 10;
const REVIEW_MAX_CHARS: usize = 1000;
const TITLE_MAX_CHARS: usize = 100;

/// A review as the UI collects it, before sanitization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingDraft {
    pub rating: f64,
    pub review: String,
    pub title: Option<String>,
    pub would_recommend: bool,
}

/// The sanitized payload sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingPayload {
    pub rating: f64,
    pub review: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub would_recommend: bool,
}

/// Coerce a draft into its canonical shape: rating at one-decimal
/// precision, strings trimmed, empty title dropped.
pub fn sanitize_rating(draft: &RatingDraft) -> RatingPayload {
    RatingPayload {
        rating: (draft.rating * 10.0).round() / 10.0,
        review: draft.review.trim().to_string(),
        title: draft
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        would_recommend: draft.would_recommend,
    }
}

/// Validate a sanitized payload, aggregating every violated rule into one
/// message. Runs before any network call.
pub fn validate_rating(payload: &RatingPayload) -> Result<(), ListingError> {
    let mut violations: Vec<String> = Vec::new();

    if !(1.0..=5.0).contains(&payload.rating) {
        violations.push("rating must be between 1 and 5".to_string());
    } else {
        let tenths = (payload.rating * 10.0).round() as i64;
        if tenths % 5 != 0 {
            violations.push("rating must use 0.5 increments".to_string());
        }
    }

    let review_chars = payload.review.chars().count();
    if review_chars < REVIEW_MIN_CHARS {
        violations.push(format!(
            "review must be at least {} characters",
            REVIEW_MIN_CHARS
        ));
    } else if review_chars > REVIEW_MAX_CHARS {
        violations.push(format!(
            "review must be at most {} characters",
            REVIEW_MAX_CHARS
        ));
    }

    if let Some(title) = &payload.title {
        if title.chars().count() > TITLE_MAX_CHARS {
            violations.push(format!("title must be at most {} characters", TITLE_MAX_CHARS));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ListingError::Validation(violations.join("; ")))
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean rating at one-decimal precision; empty input yields 0.
pub fn average_rating(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: f64 = ratings.iter().map(|r| r.rating).sum();
    round_one_decimal(sum / ratings.len() as f64)
}

/// Star histogram: counts for 1..=5 stars, half-star values rounded to the
/// nearest whole star.
pub fn rating_distribution(ratings: &[Rating]) -> [u64; 5] {
    let mut buckets = [0u64; 5];
    for rating in ratings {
        let star = rating.rating.round().clamp(1.0, 5.0) as usize;
        buckets[star - 1] += 1;
    }
    buckets
}

/// Sort orders for review lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatingSort {
    #[default]
    Newest,
    Highest,
    Lowest,
}

pub fn sort_ratings(ratings: &mut [Rating], sort: RatingSort) {
    match sort {
        RatingSort::Newest => ratings.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        RatingSort::Highest => ratings.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        RatingSort::Lowest => ratings.sort_by(|a, b| a.rating.total_cmp(&b.rating)),
    }
}

pub fn filter_by_minimum(ratings: &[Rating], minimum: f64) -> Vec<Rating> {
    ratings
        .iter()
        .filter(|r| r.rating >= minimum)
        .cloned()
        .collect()
}

/// Slug-scoped review CRUD sharing the listing layer's cache.
pub struct ReviewsService {
    api: Arc<dyn RatingApi>,
    coordinator: Arc<FetchCoordinator<CachedPayload>>,
}

impl ReviewsService {
    pub fn new(api: Arc<dyn RatingApi>, coordinator: Arc<FetchCoordinator<CachedPayload>>) -> Self {
        Self { api, coordinator }
    }

    fn ratings_key(slug: &str) -> CacheKey {
        CacheKey::new(format!("ratings:{}", slug))
    }

    /// Reviews for a listing, cached briefly.
    pub async fn list_for_listing(&self, slug: &str) -> Result<Arc<Vec<Rating>>, ListingError> {
        let api = Arc::clone(&self.api);
        let slug_owned = slug.to_string();
        let payload = self
            .coordinator
            .get_or_fetch(Self::ratings_key(slug), Some(TTL_RATINGS), move || {
                let api = api.clone();
                let slug = slug_owned.clone();
                async move {
                    let ratings = api.list_ratings(&slug).await?;
                    Ok(CachedPayload::Ratings(Arc::new(ratings)))
                }
            })
            .await?;
        Ok(payload.ratings()?)
    }

    /// Sanitize, validate, then submit a new review. Mutations invalidate
    /// the whole cache.
    pub async fn create_rating(
        &self,
        slug: &str,
        draft: &RatingDraft,
    ) -> Result<Rating, ListingError> {
        let payload = sanitize_rating(draft);
        validate_rating(&payload)?;
        let created = self.api.create_rating(slug, &payload).await?;
        debug!(slug, rating = payload.rating, "review created");
        self.coordinator.invalidate_all();
        Ok(created)
    }

    pub async fn update_rating(
        &self,
        slug: &str,
        id: i64,
        draft: &RatingDraft,
    ) -> Result<Rating, ListingError> {
        let payload = sanitize_rating(draft);
        validate_rating(&payload)?;
        let updated = self.api.update_rating(slug, id, &payload).await?;
        self.coordinator.invalidate_all();
        Ok(updated)
    }

    pub async fn delete_rating(&self, slug: &str, id: i64) -> Result<(), ListingError> {
        self.api.delete_rating(slug, id).await?;
        self.coordinator.invalidate_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn draft(rating: f64, review: &str) -> RatingDraft {
        RatingDraft {
            rating,
            review: review.to_string(),
            title: None,
            would_recommend: true,
        }
    }

    fn rated(rating: f64, day: u32) -> Rating {
        Rating {
            id: day as i64,
            rating,
            review: "solid work overall".into(),
            created_at: Some(Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_non_half_step_rating() {
        let payload = sanitize_rating(&draft(4.3, "detailed and thoughtful review"));
        let err = validate_rating(&payload).unwrap_err();
        assert!(err.to_string().contains("0.5 increments"));
    }

    #[test]
    fn test_rejects_too_short_review() {
        let payload = sanitize_rating(&draft(4.5, "too short"));
        let err = validate_rating(&payload).unwrap_err();
        assert!(err.to_string().contains("at least 10 characters"));
    }

    #[test]
    fn test_aggregates_all_violations() {
        let payload = sanitize_rating(&RatingDraft {
            rating: 0.4,
            review: "short".into(),
            title: Some("t".repeat(150)),
            would_recommend: false,
        });
        let err = validate_rating(&payload).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("between 1 and 5"));
        assert!(message.contains("at least 10 characters"));
        assert!(message.contains("title must be at most"));
    }

    #[test]
    fn test_valid_payload_is_sanitized_to_one_decimal() {
        let payload = sanitize_rating(&RatingDraft {
            rating: 4.4999,
            review: "  really helpful, would hire again  ".into(),
            title: Some("   ".into()),
            would_recommend: true,
        });
        assert_eq!(payload.rating, 4.5);
        assert_eq!(payload.review, "really helpful, would hire again");
        assert_eq!(payload.title, None);
        assert!(validate_rating(&payload).is_ok());
    }

    #[test]
    fn test_average_rating_one_decimal() {
        let ratings = vec![rated(5.0, 1), rated(4.0, 2), rated(3.5, 3)];
        assert_eq!(average_rating(&ratings), 4.2);
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn test_rating_distribution_buckets() {
        let ratings = vec![rated(5.0, 1), rated(4.5, 2), rated(4.4, 3), rated(1.0, 4)];
        // 4.5 rounds up to 5 stars, 4.4 rounds down to 4.
        assert_eq!(rating_distribution(&ratings), [1, 0, 0, 1, 2]);
    }

    #[test]
    fn test_sort_and_filter() {
        let mut ratings = vec![rated(3.0, 1), rated(5.0, 2), rated(4.0, 3)];
        sort_ratings(&mut ratings, RatingSort::Highest);
        assert_eq!(ratings[0].rating, 5.0);

        sort_ratings(&mut ratings, RatingSort::Newest);
        assert_eq!(ratings[0].id, 3);

        let filtered = filter_by_minimum(&ratings, 4.0);
        assert_eq!(filtered.len(), 2);
    }
}
