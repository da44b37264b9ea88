//! Page loading over HTTP.
//!
//! [`PageLoader`] is the injected transport seam: the pipeline core only ever
//! sees `fetch(url) -> HTML text`. [`HttpPageLoader`] is the production
//! implementation over a shared reqwest client; tests substitute fakes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use courseatlas_shared::{CatalogError, Result};

/// User-Agent string for catalog requests.
const USER_AGENT: &str = concat!("CourseAtlas/", env!("CARGO_PKG_VERSION"));

/// Fetches a URL and returns the raw HTML body.
///
/// Failures (timeout, connection error, non-2xx status) surface as
/// [`CatalogError::Fetch`]. No retry policy lives at this seam.
#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String>;
}

/// Production [`PageLoader`] over a reqwest client.
pub struct HttpPageLoader {
    client: Client,
}

impl HttpPageLoader {
    /// Build a loader with its own HTTP client (explicit timeouts, redirect cap).
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                CatalogError::config(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client })
    }

    /// Wrap an externally-constructed client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageLoader for HttpPageLoader {
    async fn fetch(&self, url: &Url) -> Result<String> {
        tracing::debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| CatalogError::fetch(url.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::fetch(url.as_str(), format!("HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| CatalogError::fetch(url.as_str(), format!("body read failed: {e}")))
    }
}
