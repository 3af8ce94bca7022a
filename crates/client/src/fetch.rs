//! HTTP fetch of named resources from the content repository.
//!
//! Resources are flat JSON documents (`index.json`, `{editionId}.json`)
//! joined onto a fixed base URL. No caching and no retry logic here; the
//! content store decides when a fetch happens and what to do on failure.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};
use url::Url;

use gazette_core::{AppConfig, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base URL of the content repository. Must end with '/'.
    pub base_url: String,

    /// User agent string (default: "gazette/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let app = AppConfig::default();
        Self {
            base_url: app.base_url,
            user_agent: app.user_agent,
            max_bytes: app.max_bytes,
            timeout: app.timeout(),
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
        }
    }
}

/// Performs a named-resource fetch over HTTP.
///
/// The seam between the content store and the network; tests substitute a
/// scripted implementation.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Fetch a resource by name, returning the raw response body.
    async fn fetch(&self, resource: &str) -> Result<Bytes, Error>;
}

/// HTTP implementation of [`RemoteFetcher`] backed by reqwest.
pub struct HttpFetcher {
    http: Client,
    base_url: Url,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::Network(format!("invalid base URL: {}", e)))?;

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, base_url, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch(&self, resource: &str) -> Result<Bytes, Error> {
        let start = Instant::now();
        let url = self
            .base_url
            .join(resource)
            .map_err(|e| Error::Network(format!("invalid resource name {}: {}", resource, e)))?;

        let response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Network(format!("request timeout fetching {}", resource))
                } else {
                    Error::Network(format!("network error: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("status {} fetching {}", status.as_u16(), resource)));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::Network(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::Network(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!("fetched {} in {}ms ({} bytes)", url, start.elapsed().as_millis(), bytes.len());

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert!(config.base_url.ends_with('/'));
        assert_eq!(config.user_agent, "gazette/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
    }

    #[test]
    fn test_fetcher_new() {
        let fetcher = HttpFetcher::new(FetchConfig::default());
        assert!(fetcher.is_ok());
    }

    #[test]
    fn test_fetcher_rejects_bad_base_url() {
        let config = FetchConfig { base_url: "not a url".into(), ..Default::default() };
        assert!(matches!(HttpFetcher::new(config), Err(Error::Network(_))));
    }

    #[test]
    fn test_resource_joins_onto_base() {
        let fetcher = HttpFetcher::new(FetchConfig {
            base_url: "https://example.com/content/".into(),
            ..Default::default()
        })
        .unwrap();
        let joined = fetcher.base_url.join("2024-21.json").unwrap();
        assert_eq!(joined.as_str(), "https://example.com/content/2024-21.json");
    }
}
