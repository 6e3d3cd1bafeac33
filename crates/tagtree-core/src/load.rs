//! Fetching an index from disk or over HTTP and building a [`Registry`].
//!
//! Loading is the one asynchronous step; once the returned future resolves
//! the registry is complete and immutable.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};

use tagtree_config::{RegistryConfig, is_remote_source};

use crate::error::{RegistryError, Result};
use crate::index::RawIndex;
use crate::registry::{Registry, RegistryOptions};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Builds registries from local files or URLs.
#[derive(Debug, Clone)]
pub struct Loader {
    client: Client,
    options: RegistryOptions,
}

impl Loader {
    /// Create a loader with the given registry options and the default timeout.
    pub fn new(options: RegistryOptions) -> Result<Self> {
        Self::with_timeout(options, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Fails when the HTTP client cannot be initialised (e.g. no TLS backend).
    pub fn with_timeout(options: RegistryOptions, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RegistryError::Client)?;
        Ok(Self { client, options })
    }

    /// Create a loader from the `[registry]` config section.
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        Self::with_timeout(config.into(), Duration::from_secs(config.timeout_secs))
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Fetch `url` with an HTTP GET and build a registry from the JSON body.
    pub async fn load_url(&self, url: &str) -> Result<Registry> {
        info!(url, "loading registry");
        let http_err = |source| RegistryError::Http {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(http_err)?;
        debug!(url, bytes = body.len(), "fetched registry index");
        let index = RawIndex::from_json_slice(&body)?;
        Registry::with_options(index, self.options.clone())
    }

    /// Read a JSON index from `path` and build a registry from it.
    pub async fn load_path(&self, path: &Path) -> Result<Registry> {
        info!(path = %path.display(), "loading registry");
        let content = tokio::fs::read(path).await?;
        let index = RawIndex::from_json_slice(&content)?;
        Registry::with_options(index, self.options.clone())
    }

    /// Load from `source`, treating `http://` and `https://` prefixes as URLs
    /// and anything else as a file path.
    pub async fn open(&self, source: &str) -> Result<Registry> {
        if is_remote_source(source) {
            self.load_url(source).await
        } else {
            self.load_path(Path::new(source)).await
        }
    }
}

impl Registry {
    /// Fetch a JSON index over HTTP and build a registry with default options.
    pub async fn load(url: &str) -> Result<Self> {
        Loader::new(RegistryOptions::default())?.load_url(url).await
    }

    /// Read a JSON index file and build a registry with default options.
    pub async fn from_path(path: &Path) -> Result<Self> {
        Loader::new(RegistryOptions::default())?.load_path(path).await
    }

    /// Load from a file path or `http(s)://` URL with default options.
    pub async fn open(source: &str) -> Result<Self> {
        Loader::new(RegistryOptions::default())?.open(source).await
    }
}
