//! HTTP-backed [`OccurrenceSource`] for the GBIF occurrence search API.
//!
//! The [`OccurrenceSource`] trait is synchronous so the pipeline can stay
//! single-threaded and cooperative. This source bridges the async HTTP calls
//! to the sync interface by blocking on a Tokio runtime it owns.

use std::time::Duration;

use gbif_clip_core::{FetchError, OccurrencePage, OccurrenceSource, SpatialExtent};
use log::debug;
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

use super::query::QueryBuilder;
use super::response::SearchResponse;

/// Default occurrence search endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.gbif.org/v1/occurrence/search";

/// Default user agent for search requests.
pub const DEFAULT_USER_AGENT: &str = "gbif-clip/0.1";

/// Error type for [`HttpOccurrenceSource`] construction failures.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// The base URL does not parse.
    #[error("invalid base URL {url:?}: {source}")]
    BaseUrl {
        /// Rejected URL.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Configuration for [`HttpOccurrenceSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOccurrenceSourceConfig {
    /// Occurrence search endpoint.
    pub base_url: String,
    /// Per-request timeout. `None` lets a hung request block indefinitely.
    pub timeout: Option<Duration>,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpOccurrenceSourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpOccurrenceSourceConfig {
    /// Configuration for the given endpoint.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Occurrence source querying the GBIF search API over HTTP.
///
/// # Runtime behaviour
///
/// Outside any Tokio runtime the source blocks on its own current-thread
/// runtime. Inside a multi-threaded runtime it uses that runtime's handle
/// with [`tokio::task::block_in_place`]. Inside a `current_thread` runtime
/// it falls back to its own runtime, which may deadlock if the caller's
/// runtime drives IO this request depends on.
pub struct HttpOccurrenceSource {
    client: Client,
    config: HttpOccurrenceSourceConfig,
    base_url: Url,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpOccurrenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOccurrenceSource")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish_non_exhaustive()
    }
}

impl HttpOccurrenceSource {
    /// Source for `base_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(HttpOccurrenceSourceConfig::new(base_url))
    }

    /// Source with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn with_config(config: HttpOccurrenceSourceConfig) -> Result<Self, ProviderBuildError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|source| ProviderBuildError::BaseUrl {
                url: config.base_url.clone(),
                source,
            })?;
        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.connect_timeout(timeout).timeout(timeout);
        }
        let client = builder.build().map_err(ProviderBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ProviderBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            base_url,
            runtime,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &HttpOccurrenceSourceConfig {
        &self.config
    }

    fn query(&self, extent: &SpatialExtent) -> QueryBuilder {
        QueryBuilder::new(&self.base_url, extent)
    }

    async fn search(&self, url: Url) -> Result<SearchResponse, FetchError> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;

        response.json().await.map_err(|err| {
            if err.is_decode() {
                FetchError::Decode {
                    url: url.to_string(),
                    message: err.to_string(),
                }
            } else {
                self.convert_reqwest_error(&err, &url)
            }
        })
    }

    /// Convert a reqwest error to a [`FetchError`].
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &Url) -> FetchError {
        if error.is_timeout() {
            return FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.config.timeout.map_or(0, |timeout| timeout.as_secs()),
            };
        }

        if let Some(status) = error.status() {
            return FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}

impl OccurrenceSource for HttpOccurrenceSource {
    fn count(&self, extent: &SpatialExtent) -> Result<u64, FetchError> {
        let url = self.query(extent).count_probe();
        let response = self.block_on(self.search(url))?;
        Ok(response.total_count())
    }

    fn page(
        &self,
        extent: &SpatialExtent,
        offset: u64,
        limit: u64,
    ) -> Result<OccurrencePage, FetchError> {
        let url = self.query(extent).with_limit(limit).page(offset);
        let response = self.block_on(self.search(url))?;
        Ok(response.into_page())
    }
}
