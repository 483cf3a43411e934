//! Catalog configuration
//!
//! Built once at startup and handed to the components that need it.

use std::time::Duration;

use url::Url;

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const DEFAULT_FEED_URL: &str = "https://pokeapi.co/api/v2/pokemon";
pub const DEFAULT_FEED_LIMIT: u32 = 1000;
pub const DEFAULT_FEED_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Page size used by `list` when the caller does not give one
    pub default_limit: u32,
    /// Listing endpoint of the external catalog feed
    pub feed_url: Url,
    /// Entries requested from the feed in its single page
    pub feed_limit: u32,
    /// Request timeout for the feed client
    pub feed_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            feed_url: Url::parse(DEFAULT_FEED_URL).expect("default feed url is valid"),
            feed_limit: DEFAULT_FEED_LIMIT,
            feed_timeout: Duration::from_secs(DEFAULT_FEED_TIMEOUT_SECS),
        }
    }
}

impl CatalogConfig {
    pub fn with_default_limit(mut self, default_limit: u32) -> Self {
        self.default_limit = default_limit;
        self
    }

    pub fn with_feed_url(mut self, feed_url: Url) -> Self {
        self.feed_url = feed_url;
        self
    }

    pub fn with_feed_limit(mut self, feed_limit: u32) -> Self {
        self.feed_limit = feed_limit;
        self
    }

    pub fn with_feed_timeout(mut self, feed_timeout: Duration) -> Self {
        self.feed_timeout = feed_timeout;
        self
    }

    /// Reject values the components cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_limit == 0 {
            anyhow::bail!("default_limit must be at least 1");
        }
        if self.feed_limit == 0 {
            anyhow::bail!("feed_limit must be at least 1");
        }
        if !matches!(self.feed_url.scheme(), "http" | "https") {
            anyhow::bail!("feed_url must be http(s), got {}", self.feed_url);
        }
        Ok(())
    }
}
