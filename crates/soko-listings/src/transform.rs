//! Raw resource → `UnifiedListing` normalization.
//!
//! Total functions: malformed or partial backend records degrade to safe
//! defaults, they never fail. Whatever shape the backend sends, every
//! output field satisfies the `UnifiedListing` invariants.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::backend::types::{Product, RawPrice, RawTags, Service, UserDetails};
use crate::listing::{ListingKind, ListingPrice, ListingSource, UnifiedListing, Vendor};

pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";
pub const LOCATION_UNSPECIFIED: &str = "Location not specified";
pub const REMOTE_AVAILABLE: &str = "Remote Available";
pub const UNKNOWN_PROVIDER: &str = "Unknown Provider";
pub const UNCATEGORIZED: &str = "Uncategorized";

const MAX_TAGS: usize = 10;

/// Resolve one image reference to a usable URL.
///
/// Absolute URLs pass through; `/`-prefixed paths pass as-is (or get the
/// base URL prepended when one is supplied); empty input resolves to the
/// placeholder.
pub fn resolve_image_url(raw: Option<&str>, base_url: Option<&str>) -> String {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return PLACEHOLDER_IMAGE.to_string();
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    if raw.starts_with('/') {
        return match base_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), raw),
            None => raw.to_string(),
        };
    }
    raw.to_string()
}

/// Build the featured image plus the deduplicated gallery.
///
/// The featured image leads; gallery entries are deduplicated against it.
/// With no featured image the gallery fills the array; with neither, the
/// placeholder stands in.
pub fn collect_images(
    featured: Option<&str>,
    gallery: &[String],
    base_url: Option<&str>,
) -> (String, Vec<String>) {
    let mut images: Vec<String> = Vec::new();

    if featured.map(str::trim).is_some_and(|f| !f.is_empty()) {
        images.push(resolve_image_url(featured, base_url));
    }

    for entry in gallery {
        if entry.trim().is_empty() {
            continue;
        }
        let resolved = resolve_image_url(Some(entry), base_url);
        if !images.contains(&resolved) {
            images.push(resolved);
        }
    }

    if images.is_empty() {
        images.push(PLACEHOLDER_IMAGE.to_string());
    }

    (images[0].clone(), images)
}

fn parse_amount(raw: &RawPrice) -> Option<f64> {
    match raw {
        RawPrice::Number(n) => (n.is_finite() && *n >= 0.0).then_some(*n),
        RawPrice::Text(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            let value: f64 = cleaned.parse().ok()?;
            (value.is_finite() && value >= 0.0).then_some(value)
        }
        // A range nested where an amount belongs is malformed.
        RawPrice::Range { .. } => None,
    }
}

/// Normalize a raw backend price.
///
/// Numbers and noisy numeric strings become fixed prices; `{min, max}`
/// becomes a range only when both ends are valid non-negative amounts and
/// `max >= min`. Negative, NaN, and malformed input all yield `None`.
pub fn normalize_price(raw: Option<&RawPrice>) -> Option<ListingPrice> {
    match raw? {
        RawPrice::Range { min, max } => {
            let min = parse_amount(min.as_deref()?)?;
            let max = parse_amount(max.as_deref()?)?;
            (max >= min).then_some(ListingPrice::Range { min, max })
        }
        amount => parse_amount(amount).map(ListingPrice::Fixed),
    }
}

/// Parse tags into at most 10 trimmed, non-empty entries. Strings split on
/// `,`, `;`, or `|`.
pub fn parse_tags(raw: Option<&RawTags>) -> Vec<String> {
    match raw {
        None => Vec::new(),
        Some(RawTags::List(entries)) => entries
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .take(MAX_TAGS)
            .map(str::to_string)
            .collect(),
        Some(RawTags::Text(s)) => s
            .split(|c| c == ',' || c == ';' || c == '|')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .take(MAX_TAGS)
            .map(str::to_string)
            .collect(),
    }
}

fn join_location_parts(parts: &[Option<&str>]) -> Option<String> {
    let found: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.map(str::trim))
        .filter(|p| !p.is_empty())
        .collect();
    if found.is_empty() {
        None
    } else {
        Some(found.join(", "))
    }
}

fn derive_product_location(product: &Product) -> String {
    if let Some(full) = product.full_location.as_deref() {
        if !full.trim().is_empty() {
            return full.trim().to_string();
        }
    }
    if let Some(address) = &product.address_details {
        if let Some(joined) = join_location_parts(&[
            address.city.as_deref(),
            address.state.as_deref(),
            address.country.as_deref(),
        ]) {
            return joined;
        }
    }
    LOCATION_UNSPECIFIED.to_string()
}

fn derive_service_location(service: &Service) -> String {
    if service.serves_remote {
        return REMOTE_AVAILABLE.to_string();
    }
    join_location_parts(&[
        service.city_details.as_ref().map(|c| c.name.as_str()),
        service.state_details.as_ref().map(|s| s.name.as_str()),
        service.country_details.as_ref().map(|c| c.name.as_str()),
    ])
    .unwrap_or_else(|| LOCATION_UNSPECIFIED.to_string())
}

/// First+last name, falling back to username, falling back to
/// "Unknown Provider".
fn derive_provider_name(user: Option<&UserDetails>) -> String {
    if let Some(user) = user {
        let full = format!("{} {}", user.first_name.trim(), user.last_name.trim());
        let full = full.trim();
        if !full.is_empty() {
            return full.to_string();
        }
        let username = user.username.trim();
        if !username.is_empty() {
            return username.to_string();
        }
    }
    UNKNOWN_PROVIDER.to_string()
}

fn clamp_rating(raw: Option<f64>) -> f64 {
    let rating = raw.unwrap_or(0.0);
    if rating.is_nan() {
        return 0.0;
    }
    rating.clamp(0.0, 5.0)
}

fn non_negative_count(raw: Option<i64>) -> u64 {
    raw.unwrap_or(0).max(0) as u64
}

fn created_at_or_now(raw: Option<DateTime<Utc>>, id: i64, kind: ListingKind) -> DateTime<Utc> {
    raw.unwrap_or_else(|| {
        // Approximation the backend forces on us; logged so the data
        // quality gap stays visible.
        warn!(id, ?kind, "listing missing created_at, defaulting to now");
        Utc::now()
    })
}

fn category_name(details: Option<&crate::backend::types::CategoryDetails>) -> String {
    details
        .map(|c| c.name.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNCATEGORIZED.to_string())
}

/// Map a raw product into the unified view model.
pub fn transform_product(product: Product) -> UnifiedListing {
    let (image, images) =
        collect_images(product.featured_image_url.as_deref(), &product.image_urls, None);
    let provider_name = derive_provider_name(product.user_details.as_ref());
    let vendor_image = resolve_image_url(
        product
            .user_details
            .as_ref()
            .and_then(|u| u.profile_picture.as_deref()),
        None,
    );

    UnifiedListing {
        id: product.id.to_string(),
        title: product.title.trim().to_string(),
        description: product
            .description
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string(),
        price: normalize_price(product.price.as_ref()),
        rating: clamp_rating(product.average_rating),
        rating_count: non_negative_count(product.rating_count),
        category: category_name(product.category_details.as_ref()),
        location: derive_product_location(&product),
        image,
        images,
        tags: parse_tags(product.tags.as_ref()),
        is_promoted: product.is_promoted,
        is_featured: product.is_featured,
        is_verified: product.is_verified,
        provider_name: provider_name.clone(),
        provider_phone: product
            .user_details
            .as_ref()
            .and_then(|u| u.phone_number.clone())
            .unwrap_or_default(),
        views_count: non_negative_count(product.views_count),
        created_at: created_at_or_now(product.created_at, product.id, ListingKind::Product),
        slug: product.slug.clone(),
        vendor: Vendor {
            name: provider_name,
            image: vendor_image,
        },
        source: ListingSource::Product(Box::new(product)),
    }
}

/// Service price: a range when `max_price` exceeds `starting_price`,
/// otherwise the bare starting price.
fn derive_service_price(service: &Service) -> Option<ListingPrice> {
    let starting = service.starting_price.as_ref().and_then(parse_amount)?;
    match service.max_price.as_ref().and_then(parse_amount) {
        Some(max) if max > starting => Some(ListingPrice::Range {
            min: starting,
            max,
        }),
        _ => Some(ListingPrice::Fixed(starting)),
    }
}

/// Map a raw service into the unified view model.
pub fn transform_service(service: Service) -> UnifiedListing {
    let (image, images) = collect_images(
        service.featured_image_url.as_deref(),
        &service.gallery_images,
        None,
    );
    let provider_name = derive_provider_name(service.provider_details.as_ref());
    let vendor_image = resolve_image_url(
        service
            .provider_details
            .as_ref()
            .and_then(|u| u.profile_picture.as_deref()),
        None,
    );

    UnifiedListing {
        id: service.id.to_string(),
        title: service.title.trim().to_string(),
        description: service
            .description
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string(),
        price: derive_service_price(&service),
        rating: clamp_rating(service.average_rating),
        rating_count: non_negative_count(service.rating_count),
        category: category_name(service.category_details.as_ref()),
        location: derive_service_location(&service),
        image,
        images,
        tags: parse_tags(service.tags.as_ref()),
        is_promoted: service.is_promoted,
        is_featured: service.is_featured,
        is_verified: service.is_verified,
        provider_name: provider_name.clone(),
        provider_phone: service
            .provider_details
            .as_ref()
            .and_then(|u| u.phone_number.clone())
            .unwrap_or_default(),
        views_count: non_negative_count(service.views_count),
        created_at: created_at_or_now(service.created_at, service.id, ListingKind::Service),
        slug: service.slug.clone(),
        vendor: Vendor {
            name: provider_name,
            image: vendor_image,
        },
        source: ListingSource::Service(Box::new(service)),
    }
}
