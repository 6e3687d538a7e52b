//! Clients for the remote data the cache sits in front of
//!
//! - Comm-link news feed
//! - Vehicle search and vehicle detail lookups
//!
//! Responses are kept as raw JSON; callers decide what to render.

mod commlinks;
mod error;
mod vehicles;

pub use commlinks::{parse_feed, CommLinkClient, COMM_LINK_FEED_URL, DEFAULT_NEWS_LIMIT};
pub use error::ApiError;
pub use vehicles::{VehicleClient, DEFAULT_LOCALE, VEHICLE_API_URL};

use std::time::Duration;

use reqwest::Client;

/// Shortest vehicle search term sent to the API
pub const MIN_SEARCH_LEN: usize = 3;

/// User agent sent with every request
const USER_AGENT: &str = "BackersLittleHelper/1.0";

/// Per-request timeout; the cache itself never times out
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

fn http_client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}
