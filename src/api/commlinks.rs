//! Comm-link news feed client
//!
//! The feed is a JSON document with an `items` array. Some items contain the
//! invalid escape `\&`, so the body is cleaned up before parsing.

use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use super::{http_client, ApiError};
use crate::cache::CacheStore;
use crate::config::NEWS_TTL;

/// Public comm-link feed
pub const COMM_LINK_FEED_URL: &str = "https://leonick.se/feeds/rsi/json";

/// Number of items shown when no limit is given
pub const DEFAULT_NEWS_LIMIT: usize = 10;

/// Fetches comm-link news items through the response cache
#[derive(Debug, Clone)]
pub struct CommLinkClient {
    http_client: Client,
    cache: CacheStore,
    feed_url: String,
}

impl CommLinkClient {
    pub fn new(cache: CacheStore) -> Self {
        Self::with_feed_url(cache, COMM_LINK_FEED_URL)
    }

    /// Creates a client reading from a different feed URL
    pub fn with_feed_url(cache: CacheStore, feed_url: impl Into<String>) -> Self {
        Self {
            http_client: http_client(),
            cache,
            feed_url: feed_url.into(),
        }
    }

    /// Cache key for a feed request of `limit` items
    pub fn cache_key(limit: usize) -> String {
        format!("commlinks_{}", limit)
    }

    /// Returns the newest `limit` comm-link items, served from cache for up to an hour
    pub async fn fetch_comm_links(&self, limit: usize) -> Result<Vec<Value>, ApiError> {
        self.cache
            .fetch_with_cache(&Self::cache_key(limit), NEWS_TTL, || {
                self.fetch_from_api(limit)
            })
            .await
    }

    async fn fetch_from_api(&self, limit: usize) -> Result<Vec<Value>, ApiError> {
        let response = self
            .http_client
            .get(&self.feed_url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }

        let items = parse_feed(&text, limit)?;
        info!(count = items.len(), "Loaded comm-link items");
        Ok(items)
    }
}

/// Parses a feed body and keeps the first `limit` items
pub fn parse_feed(text: &str, limit: usize) -> Result<Vec<Value>, ApiError> {
    let cleaned = text.replace("\\&", "&");
    let mut feed: Value = serde_json::from_str(&cleaned)
        .map_err(|e| ApiError::InvalidResponse(format!("Feed is not valid JSON: {}", e)))?;

    match feed.get_mut("items").map(Value::take) {
        Some(Value::Array(mut items)) => {
            items.truncate(limit);
            Ok(items)
        }
        _ => Err(ApiError::InvalidResponse("Invalid response format".to_string())),
    }
}
