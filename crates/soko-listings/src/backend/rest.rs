//! REST implementation of the backend API traits.

use async_trait::async_trait;
use serde::Serialize;

use soko_data::{FetchError, Page, RestClient};

use crate::backend::types::{
    Category, City, Country, Product, Rating, Region, SearchHit, Service,
};
use crate::backend::{CatalogApi, ProductApi, RatingApi, SearchApi, ServiceApi};
use crate::filters::ListingFilters;
use crate::reviews::RatingPayload;

#[derive(Serialize)]
struct StatusPatch<'a> {
    status: &'a str,
}

/// Backend client speaking the marketplace's paginated REST contract.
pub struct RestBackend {
    client: RestClient,
}

impl RestBackend {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    async fn list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Vec<T>, FetchError> {
        let page: Page<T> = self.client.get_json(path, query).await?;
        Ok(page.into_results())
    }
}

#[async_trait]
impl ProductApi for RestBackend {
    async fn list_products(&self, filters: &ListingFilters) -> Result<Vec<Product>, FetchError> {
        self.list("/products/", &filters.to_query_params()).await
    }

    async fn get_product(&self, id: i64) -> Result<Product, FetchError> {
        self.client.get_json(&format!("/products/{}/", id), &[]).await
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Product, FetchError> {
        self.client
            .get_json(&format!("/products/{}/", slug), &[])
            .await
    }

    async fn my_products(&self) -> Result<Vec<Product>, FetchError> {
        self.list("/products/my/", &[]).await
    }

    async fn delete_product(&self, id: i64) -> Result<(), FetchError> {
        self.client.delete(&format!("/products/{}/", id)).await
    }

    async fn update_product_status(&self, id: i64, status: &str) -> Result<(), FetchError> {
        let _: Product = self
            .client
            .patch_json(&format!("/products/{}/", id), &StatusPatch { status })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ServiceApi for RestBackend {
    async fn list_services(&self, filters: &ListingFilters) -> Result<Vec<Service>, FetchError> {
        self.list("/services/", &filters.to_query_params()).await
    }

    async fn get_service(&self, id: i64) -> Result<Service, FetchError> {
        self.client.get_json(&format!("/services/{}/", id), &[]).await
    }

    async fn get_service_by_slug(&self, slug: &str) -> Result<Service, FetchError> {
        self.client
            .get_json(&format!("/services/{}/", slug), &[])
            .await
    }

    async fn my_services(&self) -> Result<Vec<Service>, FetchError> {
        self.list("/services/my/", &[]).await
    }

    async fn delete_service(&self, id: i64) -> Result<(), FetchError> {
        self.client.delete(&format!("/services/{}/", id)).await
    }

    async fn update_service_status(&self, id: i64, status: &str) -> Result<(), FetchError> {
        let _: Service = self
            .client
            .patch_json(&format!("/services/{}/", id), &StatusPatch { status })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SearchApi for RestBackend {
    async fn search(&self, filters: &ListingFilters) -> Result<Vec<SearchHit>, FetchError> {
        self.list("/search/", &filters.to_query_params()).await
    }
}

#[async_trait]
impl CatalogApi for RestBackend {
    async fn categories(&self) -> Result<Vec<Category>, FetchError> {
        self.list("/categories/", &[]).await
    }

    async fn countries(&self) -> Result<Vec<Country>, FetchError> {
        self.list("/locations/countries/", &[]).await
    }

    async fn states(&self, country: i64) -> Result<Vec<Region>, FetchError> {
        self.list(
            "/locations/states/",
            &[("country".to_string(), country.to_string())],
        )
        .await
    }

    async fn cities(&self, state: i64) -> Result<Vec<City>, FetchError> {
        self.list(
            "/locations/cities/",
            &[("state".to_string(), state.to_string())],
        )
        .await
    }
}

#[async_trait]
impl RatingApi for RestBackend {
    async fn list_ratings(&self, slug: &str) -> Result<Vec<Rating>, FetchError> {
        self.list(&format!("/listings/{}/ratings/", slug), &[]).await
    }

    async fn create_rating(
        &self,
        slug: &str,
        payload: &RatingPayload,
    ) -> Result<Rating, FetchError> {
        self.client
            .post_json(&format!("/listings/{}/ratings/", slug), payload)
            .await
    }

    async fn update_rating(
        &self,
        slug: &str,
        id: i64,
        payload: &RatingPayload,
    ) -> Result<Rating, FetchError> {
        self.client
            .patch_json(&format!("/listings/{}/ratings/{}/", slug, id), payload)
            .await
    }

    async fn delete_rating(&self, slug: &str, id: i64) -> Result<(), FetchError> {
        self.client
            .delete(&format!("/listings/{}/ratings/{}/", slug, id))
            .await
    }
}
