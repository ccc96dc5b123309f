//! HTTP transport client.
//!
//! Maps the three transport exchanges onto HTTP endpoints below a
//! configurable path prefix:
//!
//! | Operation | Request | Response |
//! |-----------|---------|----------|
//! | open | `POST {prefix}/connect` `{"url", "protocols"}` | `{"connectionId", "protocol"}` |
//! | submit | `POST {prefix}/send?id=..` frame envelope | any 2xx |
//! | poll | `GET {prefix}/poll?id=..` | `{"messages": [...]}` |
//!
//! The close notification is a `submit` carrying a close envelope.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::{InboundMessage, OpenRequest, OpenResponse, PollResponse, WireFrame};

use super::Transport;

// ============================================================================
// Constants
// ============================================================================

/// Default endpoint prefix.
const DEFAULT_PATH_PREFIX: &str = "/__socket";

/// Default timeout for open and submit requests.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for poll requests (long-poll friendly).
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// HttpTransportConfig
// ============================================================================

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// Origin the endpoints live on.
    pub base_url: Url,
    /// Path prefix of the endpoints.
    pub path_prefix: String,
    /// Timeout for open and submit requests.
    pub request_timeout: Duration,
    /// Timeout for poll requests.
    pub poll_timeout: Duration,
}

impl HttpTransportConfig {
    /// Creates a configuration rooted at `base_url` with default settings.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Sets the endpoint path prefix.
    #[inline]
    #[must_use]
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    /// Sets the open/submit request timeout.
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the poll request timeout.
    #[inline]
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Resolves the URL of one endpoint, optionally tagged with a connection id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the prefix does not form a valid path.
    pub fn endpoint(&self, name: &str, connection_id: Option<&ConnectionId>) -> Result<Url> {
        let prefix = self.path_prefix.trim_end_matches('/');
        let mut path = format!("{prefix}/{name}");
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        if let Some(id) = connection_id {
            path.push_str("?id=");
            path.push_str(&urlencoding::encode(id.as_str()));
        }
        Ok(self.base_url.join(&path)?)
    }
}

// ============================================================================
// HttpTransport
// ============================================================================

/// [`Transport`] speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Creates a transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL cannot host endpoints or the
    /// HTTP client cannot be built.
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        if config.base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "transport base URL {} cannot carry endpoint paths",
                config.base_url
            )));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| Error::config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }
}

/// Fails with `make_error` unless the response status is 2xx.
fn check_status(response: Response, make_error: fn(String) -> Error) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(make_error(format!("{} returned status {status}", response.url())))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, url: &Url, protocols: &[String]) -> Result<OpenResponse> {
        let endpoint = self.config.endpoint("connect", None)?;
        let body = OpenRequest {
            url: url.to_string(),
            protocols: protocols.to_vec(),
        };

        debug!(%endpoint, target = %url, "Opening connection");

        let response = self
            .client
            .post(endpoint)
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::connection(e.to_string()))?;

        check_status(response, |m| Error::Connection { message: m })?
            .json::<OpenResponse>()
            .await
            .map_err(|e| Error::connection(format!("invalid open response: {e}")))
    }

    async fn submit(&self, connection_id: &ConnectionId, frame: &WireFrame) -> Result<()> {
        let endpoint = self.config.endpoint("send", Some(connection_id))?;

        let response = self
            .client
            .post(endpoint)
            .timeout(self.config.request_timeout)
            .json(frame)
            .send()
            .await
            .map_err(|e| Error::send(e.to_string()))?;

        check_status(response, |m| Error::Send { message: m })?;
        trace!(%connection_id, "Frame acknowledged");
        Ok(())
    }

    async fn poll(&self, connection_id: &ConnectionId) -> Result<Vec<InboundMessage>> {
        let endpoint = self.config.endpoint("poll", Some(connection_id))?;

        let response = self
            .client
            .get(endpoint)
            .timeout(self.config.poll_timeout)
            .send()
            .await
            .map_err(|e| Error::poll(e.to_string()))?;

        let body = check_status(response, |m| Error::Poll { message: m })?
            .json::<PollResponse>()
            .await
            .map_err(|e| Error::poll(format!("invalid poll response: {e}")))?;

        trace!(%connection_id, count = body.messages.len(), "Poll returned");
        Ok(body.messages)
    }
}

// ============================================================================
// Tests
// ============================================================================
