//! Thin HTTP client over reqwest with base URL and error mapping.

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::FetchError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// JSON REST client bound to a single backend base URL.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    default_headers: HashMap<String, String>,
}

impl RestClient {
    /// Create a client for `base_url` with the default request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            default_headers: HashMap::new(),
        })
    }

    /// Add a header that will be included in all requests.
    pub fn with_default_header(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), path)
        }
    }

    fn apply_headers(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        for (key, value) in &self.default_headers {
            req = req.header(key, value);
        }
        req
    }

    /// GET `path` with query parameters, decoding the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, FetchError> {
        let url = self.url(path);
        let req = self.apply_headers(self.http.get(&url).query(query));
        Self::decode(url, req.send().await).await
    }

    /// POST a JSON body to `path`, decoding the JSON response.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, FetchError> {
        let url = self.url(path);
        let req = self.apply_headers(self.http.post(&url).json(body));
        Self::decode(url, req.send().await).await
    }

    /// PATCH a JSON body to `path`, decoding the JSON response.
    pub async fn patch_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, FetchError> {
        let url = self.url(path);
        let req = self.apply_headers(self.http.patch(&url).json(body));
        Self::decode(url, req.send().await).await
    }

    /// DELETE `path`, ignoring any response body.
    pub async fn delete(&self, path: &str) -> Result<(), FetchError> {
        let url = self.url(path);
        let req = self.apply_headers(self.http.delete(&url));
        Self::check(url, req.send().await)?;
        Ok(())
    }

    fn check(
        url: String,
        sent: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<reqwest::Response, FetchError> {
        let resp = sent.map_err(|e| map_transport_error(&url, e))?;
        let status = resp.status().as_u16();
        if status == 404 {
            return Err(FetchError::NotFound(url));
        }
        if status >= 400 {
            return Err(FetchError::Http { status, url });
        }
        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(
        url: String,
        sent: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T, FetchError> {
        let resp = Self::check(url, sent)?;
        resp.json::<T>()
            .await
            .map_err(|e| FetchError::Deserialization(e.to_string()))
    }
}

fn map_transport_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else if error.is_connect() {
        FetchError::Connection(error.to_string())
    } else {
        FetchError::Request(error.to_string())
    }
}
