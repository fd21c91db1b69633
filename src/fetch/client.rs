//! HTTP page fetcher with randomized User-Agent and bounded timeouts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{
    DISCLOSURE_CONNECT_TIMEOUT, DISCLOSURE_READ_TIMEOUT, STORE_CONNECT_TIMEOUT, STORE_READ_TIMEOUT,
};
use super::{FetchError, FetchedPage, PageSource};
use crate::user_agent;

/// Connect and read timeouts applied to every request of a fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTimeouts {
    /// Time allowed to establish the connection.
    pub connect: Duration,
    /// Time allowed between reads once connected.
    pub read: Duration,
}

impl FetchTimeouts {
    /// Creates explicit timeouts.
    #[must_use]
    pub fn new(connect: Duration, read: Duration) -> Self {
        Self { connect, read }
    }

    /// Defaults for disclosure-file fetches (2s connect, 5s read).
    #[must_use]
    pub fn disclosure() -> Self {
        Self::new(DISCLOSURE_CONNECT_TIMEOUT, DISCLOSURE_READ_TIMEOUT)
    }

    /// Defaults for store pages and store APIs (1s connect, 2s read).
    #[must_use]
    pub fn store() -> Self {
        Self::new(STORE_CONNECT_TIMEOUT, STORE_READ_TIMEOUT)
    }
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self::disclosure()
    }
}

/// Performs single HTTP GETs, following redirects.
///
/// Built once and shared; the inner reqwest client pools connections.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    timeouts: FetchTimeouts,
}

impl PageFetcher {
    /// Creates a fetcher with the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot initialise.
    pub fn new(timeouts: FetchTimeouts) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(timeouts.connect)
            .read_timeout(timeouts.read)
            .gzip(true)
            .build()?;
        Ok(Self { client, timeouts })
    }

    /// Returns the configured timeouts.
    #[must_use]
    pub fn timeouts(&self) -> FetchTimeouts {
        self.timeouts
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let ua = user_agent::random_user_agent();
        debug!(url, user_agent = ua, "fetching page");

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, ua)
            .send()
            .await
            .map_err(|e| FetchError::connection(url, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(url, status = status.as_u16(), "non-success status");
            return Err(FetchError::from_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.send(url).await?;
        response
            .text()
            .await
            .map_err(|e| FetchError::connection(url, e))
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self.send(url).await?;

        let final_url = response.url().to_string();
        let is_https = response.url().scheme() == "https";
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::connection(url, e))?;

        debug!(
            url,
            %final_url,
            is_https,
            content_type = content_type.as_deref().unwrap_or("-"),
            bytes = body.len(),
            "page fetched"
        );

        Ok(FetchedPage {
            is_https,
            content_type,
            final_url,
            body,
        })
    }
}
