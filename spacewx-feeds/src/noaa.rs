//! NOAA SWPC client using the public products API.
//!
//! Both products are served as header-row JSON tables and are refreshed
//! upstream every minute or so. Every request asks intermediaries not to
//! serve a cached copy.
//!
//! ## Example
//!
//! ```rust,no_run
//! use spacewx_feeds::noaa::NoaaClient;
//! use spacewx_feeds::FeedSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = NoaaClient::builder().build()?;
//!
//!     let kp = client.fetch_kp().await?;
//!     println!("Kp {:?} at {}", kp.latest_kp, kp.latest_time);
//!
//!     let plasma = client.fetch_plasma().await?;
//!     println!("Wind {:?} km/s", plasma.latest.speed);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, PRAGMA};
use reqwest::Client;

use crate::{FeedError, FeedSource, KpFeed, PlasmaFeed};

/// Default planetary Kp index product.
pub const DEFAULT_KP_URL: &str =
    "https://services.swpc.noaa.gov/products/noaa-planetary-k-index.json";

/// Default real-time solar wind plasma product.
pub const DEFAULT_PLASMA_URL: &str =
    "https://services.swpc.noaa.gov/products/solar-wind/plasma-1-day.json";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the two SWPC feeds.
#[derive(Debug, Clone)]
pub struct NoaaClient {
    client: Client,
    kp_url: String,
    plasma_url: String,
    description: String,
}

impl NoaaClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> NoaaClientBuilder {
        NoaaClientBuilder::default()
    }

    /// URL of the Kp feed.
    pub fn kp_url(&self) -> &str {
        &self.kp_url
    }

    /// URL of the plasma feed.
    pub fn plasma_url(&self) -> &str {
        &self.plasma_url
    }

    async fn fetch_table(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FeedError::Http(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl FeedSource for NoaaClient {
    async fn fetch_kp(&self) -> Result<KpFeed, FeedError> {
        let body = self.fetch_table(&self.kp_url).await?;
        KpFeed::from_slice(&body)
    }

    async fn fetch_plasma(&self) -> Result<PlasmaFeed, FeedError> {
        let body = self.fetch_table(&self.plasma_url).await?;
        PlasmaFeed::from_slice(&body)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for NoaaClient.
#[derive(Debug, Default)]
pub struct NoaaClientBuilder {
    kp_url: Option<String>,
    plasma_url: Option<String>,
    timeout: Option<Duration>,
}

impl NoaaClientBuilder {
    /// Override the Kp feed URL.
    pub fn kp_url(mut self, url: impl Into<String>) -> Self {
        self.kp_url = Some(url.into());
        self
    }

    /// Override the plasma feed URL.
    pub fn plasma_url(mut self, url: impl Into<String>) -> Self {
        self.plasma_url = Some(url.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<NoaaClient, FeedError> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .default_headers(headers)
            .user_agent(concat!("spacewx/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::Connection(format!("failed to build HTTP client: {}", e)))?;

        let kp_url = self.kp_url.unwrap_or_else(|| DEFAULT_KP_URL.to_string());
        let plasma_url = self
            .plasma_url
            .unwrap_or_else(|| DEFAULT_PLASMA_URL.to_string());
        let description = format!("noaa: {}", host_of(&kp_url));

        Ok(NoaaClient {
            client,
            kp_url,
            plasma_url,
            description,
        })
    }
}

// Host portion of a URL, for display only
fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split('/').next().unwrap_or(rest)
}
