//! Raw backend resource shapes.
//!
//! These mirror the REST API's JSON as-is: numeric ids, nested `*_details`
//! sub-objects, and fields whose types drift in practice (prices as numbers
//! or strings, tags as arrays or delimited strings, booleans as 0/1).
//! Every field the backend may omit is optional or defaulted, so any
//! partial record deserializes; the transform layer owns the cleanup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A price as the backend sends it: a number, a numeric string with
/// currency noise, or a `{min, max}` spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Number(f64),
    Text(String),
    Range {
        min: Option<Box<RawPrice>>,
        max: Option<Box<RawPrice>>,
    },
}

/// Tags arrive either as a JSON array or as one delimited string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTags {
    List(Vec<String>),
    Text(String),
}

/// Accept booleans that arrive as `true`/`false`, `0`/`1`, or strings.
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Bool(b)) => b,
        Some(Loose::Int(n)) => n != 0,
        Some(Loose::Text(s)) => matches!(s.as_str(), "true" | "True" | "1"),
        None => false,
    })
}

/// Nested category sub-object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryDetails {
    pub id: Option<i64>,
    pub name: String,
    pub slug: Option<String>,
}

/// Nested user sub-object shared by products (seller) and services
/// (provider).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDetails {
    pub id: Option<i64>,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub profile_picture: Option<String>,
}

/// Free-text address parts attached to products.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressDetails {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

/// A named location reference (city/state/country sub-object).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedRef {
    pub id: Option<i64>,
    pub name: String,
}

/// A physical product resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<RawPrice>,
    pub slug: Option<String>,
    pub status: Option<String>,
    pub category_details: Option<CategoryDetails>,
    pub user_details: Option<UserDetails>,
    pub featured_image_url: Option<String>,
    pub image_urls: Vec<String>,
    pub tags: Option<RawTags>,
    pub average_rating: Option<f64>,
    pub rating_count: Option<i64>,
    pub views_count: Option<i64>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_promoted: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_featured: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_verified: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub full_location: Option<String>,
    pub address_details: Option<AddressDetails>,
}

/// A service offering resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub starting_price: Option<RawPrice>,
    pub max_price: Option<RawPrice>,
    #[serde(deserialize_with = "lenient_bool")]
    pub serves_remote: bool,
    pub slug: Option<String>,
    pub status: Option<String>,
    pub category_details: Option<CategoryDetails>,
    pub provider_details: Option<UserDetails>,
    pub city_details: Option<NamedRef>,
    pub state_details: Option<NamedRef>,
    pub country_details: Option<NamedRef>,
    pub featured_image_url: Option<String>,
    pub gallery_images: Vec<String>,
    pub tags: Option<RawTags>,
    pub average_rating: Option<f64>,
    pub rating_count: Option<i64>,
    pub views_count: Option<i64>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_promoted: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_featured: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_verified: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub response_time: Option<String>,
}

/// A catalog category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
    pub icon: Option<String>,
    pub listing_count: Option<i64>,
}

/// A country in the location taxonomy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
}

/// A state/region within a country.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Region {
    pub id: i64,
    pub name: String,
    pub country: Option<i64>,
}

/// A city within a state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub state: Option<i64>,
}

/// A review/rating record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rating {
    pub id: i64,
    pub rating: f64,
    pub review: String,
    pub title: Option<String>,
    pub reviewer_details: Option<UserDetails>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_verified_purchase: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub would_recommend: bool,
    pub helpful_count: Option<i64>,
}

/// One record from the unified search endpoint, tagged with the resource
/// type it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "item_type", rename_all = "lowercase")]
pub enum SearchHit {
    Product(Product),
    Service(Service),
}
