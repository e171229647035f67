//! Backend API surface.
//!
//! The listing service talks to the REST backend only through these
//! traits, so tests substitute in-memory fakes and the HTTP stack stays at
//! the edge.

pub mod rest;
pub mod types;

use async_trait::async_trait;

use soko_data::FetchError;

use crate::filters::ListingFilters;
use crate::reviews::RatingPayload;
use types::{Category, City, Country, Product, Rating, Region, SearchHit, Service};

/// Product resource endpoints.
#[async_trait]
pub trait ProductApi: Send + Sync {
    async fn list_products(&self, filters: &ListingFilters) -> Result<Vec<Product>, FetchError>;
    async fn get_product(&self, id: i64) -> Result<Product, FetchError>;
    async fn get_product_by_slug(&self, slug: &str) -> Result<Product, FetchError>;
    async fn my_products(&self) -> Result<Vec<Product>, FetchError>;
    async fn delete_product(&self, id: i64) -> Result<(), FetchError>;
    async fn update_product_status(&self, id: i64, status: &str) -> Result<(), FetchError>;
}

/// Service resource endpoints.
#[async_trait]
pub trait ServiceApi: Send + Sync {
    async fn list_services(&self, filters: &ListingFilters) -> Result<Vec<Service>, FetchError>;
    async fn get_service(&self, id: i64) -> Result<Service, FetchError>;
    async fn get_service_by_slug(&self, slug: &str) -> Result<Service, FetchError>;
    async fn my_services(&self) -> Result<Vec<Service>, FetchError>;
    async fn delete_service(&self, id: i64) -> Result<(), FetchError>;
    async fn update_service_status(&self, id: i64, status: &str) -> Result<(), FetchError>;
}

/// The unified cross-resource search endpoint.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(&self, filters: &ListingFilters) -> Result<Vec<SearchHit>, FetchError>;
}

/// Category and location taxonomy endpoints.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn categories(&self) -> Result<Vec<Category>, FetchError>;
    async fn countries(&self) -> Result<Vec<Country>, FetchError>;
    async fn states(&self, country: i64) -> Result<Vec<Region>, FetchError>;
    async fn cities(&self, state: i64) -> Result<Vec<City>, FetchError>;
}

/// Slug-scoped rating endpoints.
#[async_trait]
pub trait RatingApi: Send + Sync {
    async fn list_ratings(&self, slug: &str) -> Result<Vec<Rating>, FetchError>;
    async fn create_rating(
        &self,
        slug: &str,
        payload: &RatingPayload,
    ) -> Result<Rating, FetchError>;
    async fn update_rating(
        &self,
        slug: &str,
        id: i64,
        payload: &RatingPayload,
    ) -> Result<Rating, FetchError>;
    async fn delete_rating(&self, slug: &str, id: i64) -> Result<(), FetchError>;
}
