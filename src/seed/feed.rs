//! External catalog feed
//!
//! The feed is a paginated JSON listing:
//!
//! ```text
//! GET <listing-url>?limit=1000
//! { "results": [ { "name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon/1/" }, ... ] }
//! ```
//!
//! Only the first page is ever read.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::CatalogConfig;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("feed entry '{name}' has no numeric id in url {url}")]
    MalformedUrl { name: String, url: String },

    #[error("feed entry '{name}' at {url} is not a valid creature: {reason}")]
    InvalidEntry {
        name: String,
        url: String,
        reason: String,
    },
}

/// One entry of the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub name: String,
    pub url: String,
}

impl FeedEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// The sequence number encoded as the second-to-last path segment of
    /// the entry url (`.../pokemon/25/` -> 25).
    pub fn sequence_number(&self) -> Result<u32, FeedError> {
        self.url
            .rsplit('/')
            .nth(1)
            .and_then(|segment| segment.parse::<u32>().ok())
            .filter(|no| *no > 0)
            .ok_or_else(|| FeedError::MalformedUrl {
                name: self.name.clone(),
                url: self.url.clone(),
            })
    }
}

/// A page of the listing. Other fields (`count`, `next`, ...) are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedPage {
    pub results: Vec<FeedEntry>,
}

/// Source of catalog entries for the seeder.
#[async_trait]
pub trait CatalogFeed: Send + Sync {
    /// Fetch a single page of at most `limit` entries.
    async fn fetch_page(&self, limit: u32) -> Result<Vec<FeedEntry>, FeedError>;
}

/// Feed backed by an HTTP listing endpoint.
pub struct HttpCatalogFeed {
    client: Client,
    listing_url: Url,
}

impl HttpCatalogFeed {
    pub fn new(config: &CatalogConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.feed_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            listing_url: config.feed_url.clone(),
        })
    }
}

#[async_trait]
impl CatalogFeed for HttpCatalogFeed {
    async fn fetch_page(&self, limit: u32) -> Result<Vec<FeedEntry>, FeedError> {
        let page: FeedPage = self
            .client
            .get(self.listing_url.clone())
            .query(&[("limit", limit)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(
            url = %self.listing_url,
            limit,
            entries = page.results.len(),
            "fetched catalog feed page"
        );
        Ok(page.results)
    }
}
