//! HTTP client wrapper for downloading files.
//!
//! This module provides the `HttpClient` struct which owns the explicit
//! timeout and redirect policy every download request runs under.

use std::time::Duration;

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HeaderName};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, DEFAULT_MAX_REDIRECTS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// Timeout and redirect settings for [`HttpClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Deadline for establishing the TCP/TLS connection.
    pub connect_timeout_secs: u64,
    /// Deadline for each read of the response (headers or body chunk).
    pub read_timeout_secs: u64,
    /// Redirect hops to follow; 0 returns the 3xx response as-is.
    pub max_redirects: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// HTTP client for streaming downloads.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

/// Response headers the engine needs, captured before the body is streamed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ResponseMeta {
    pub(crate) content_length: Option<u64>,
    pub(crate) content_disposition: Option<String>,
    pub(crate) content_type: Option<String>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with the default timeouts and redirect policy.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_config(HttpClientConfig::default())
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client with explicit timeouts and redirect policy.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    #[instrument(level = "debug")]
    pub fn with_config(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        let client = base_client_builder(&config).build()?;
        Ok(Self { client, config })
    }

    /// Returns the settings this client was built with.
    #[must_use]
    pub fn config(&self) -> HttpClientConfig {
        self.config
    }

    /// Sends a GET and accepts only `200 OK`.
    ///
    /// # Errors
    ///
    /// `Timeout`/`Network` when no response is obtained, `HttpStatus` for
    /// any status other than 200.
    pub(crate) async fn get_ok(&self, url: &Url) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::from_transport(url.as_str(), e))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(status = status.as_u16(), final_url = %response.url(), "rejecting response status");
            return Err(DownloadError::http_status(url.as_str(), status.as_u16()));
        }

        if response.url() != url {
            debug!(final_url = %response.url(), "followed redirect");
        }
        Ok(response)
    }
}

impl ResponseMeta {
    pub(crate) fn from_response(response: &reqwest::Response) -> Self {
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            content_length: header(CONTENT_LENGTH).and_then(|v| v.trim().parse::<u64>().ok()),
            content_disposition: header(CONTENT_DISPOSITION),
            content_type: header(CONTENT_TYPE),
        }
    }
}

fn base_client_builder(config: &HttpClientConfig) -> ClientBuilder {
    let redirect = if config.max_redirects == 0 {
        Policy::none()
    } else {
        Policy::limited(config.max_redirects)
    };
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .read_timeout(Duration::from_secs(config.read_timeout_secs))
        .redirect(redirect)
        .user_agent(user_agent::default_download_user_agent())
}
