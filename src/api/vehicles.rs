//! Vehicle search and detail client for the community wiki API

use reqwest::{Client, Url};
use serde_json::{json, Value};
use tracing::info;

use super::{http_client, ApiError, MIN_SEARCH_LEN};
use crate::cache::CacheStore;
use crate::config::{VEHICLE_DETAILS_TTL, VEHICLE_SEARCH_TTL};

/// Base URL of the wiki API
pub const VEHICLE_API_URL: &str = "https://api.star-citizen.wiki/api/";

/// Locale requested for vehicle details when none is given
pub const DEFAULT_LOCALE: &str = "en_EN";

/// Looks up vehicles through the response cache
#[derive(Debug, Clone)]
pub struct VehicleClient {
    http_client: Client,
    cache: CacheStore,
    base_url: String,
}

impl VehicleClient {
    pub fn new(cache: CacheStore) -> Self {
        Self::with_base_url(cache, VEHICLE_API_URL)
    }

    /// Creates a client against a different API root
    pub fn with_base_url(cache: CacheStore, base_url: impl Into<String>) -> Self {
        Self {
            http_client: http_client(),
            cache,
            base_url: base_url.into(),
        }
    }

    pub fn search_key(term: &str) -> String {
        format!("vehicle_search_{}", term)
    }

    pub fn details_key(name: &str, locale: &str) -> String {
        format!("vehicle_details_{}_{}", name, locale)
    }

    /// Searches vehicles by name. Results are cached for 30 days.
    ///
    /// Terms shorter than three characters are rejected before the cache or
    /// network is consulted.
    pub async fn search(&self, term: &str) -> Result<Value, ApiError> {
        let term = term.trim();
        if term.chars().count() < MIN_SEARCH_LEN {
            return Err(ApiError::QueryTooShort(term.to_string()));
        }

        self.cache
            .fetch_with_cache(&Self::search_key(term), VEHICLE_SEARCH_TTL, || {
                self.search_from_api(term)
            })
            .await
    }

    /// Fetches a vehicle's detail page including shop prices. Cached for 30 days.
    pub async fn details(&self, name: &str, locale: &str) -> Result<Value, ApiError> {
        self.cache
            .fetch_with_cache(
                &Self::details_key(name, locale),
                VEHICLE_DETAILS_TTL,
                || self.details_from_api(name, locale),
            )
            .await
    }

    async fn search_from_api(&self, term: &str) -> Result<Value, ApiError> {
        let url = self.endpoint(&["vehicles", "search"])?;
        let response = self
            .http_client
            .post(url)
            .json(&json!({ "query": term }))
            .send()
            .await?;

        let body = read_json(response).await?;
        info!(term, "Fetched vehicle search results");
        Ok(body)
    }

    async fn details_from_api(&self, name: &str, locale: &str) -> Result<Value, ApiError> {
        let url = self.details_url(name, locale)?;
        let response = self.http_client.get(url).send().await?;

        let body = read_json(response).await?;
        info!(name, locale, "Fetched vehicle details");
        Ok(body)
    }

    fn details_url(&self, name: &str, locale: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint(&["vehicles", name])?;
        url.query_pairs_mut()
            .append_pair("locale", locale)
            .append_pair("include", "shops.items");
        Ok(url)
    }

    /// Appends percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::from_status(status, &body));
    }
    Ok(response.json::<Value>().await?)
}
