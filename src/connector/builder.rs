//! Builder pattern for connector configuration.
//!
//! Provides a fluent API for configuring and creating [`Connector`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use polling_socket::{Connector, SocketOptions};
//!
//! # fn example() -> polling_socket::Result<()> {
//! let connector = Connector::builder()
//!     .origin("https://app.local")
//!     .options(SocketOptions::new().with_poll_idle_interval(Duration::ZERO))
//!     .native(false)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};
use crate::socket::SocketOptions;
use crate::transport::{HttpTransport, HttpTransportConfig, Transport};

use super::core::{Connector, ConnectorInner};

// ============================================================================
// ConnectorBuilder
// ============================================================================

/// Builder for configuring a [`Connector`] instance.
///
/// Use [`Connector::builder()`] to create a new builder.
#[derive(Clone)]
pub struct ConnectorBuilder {
    /// Execution-context origin, unparsed.
    origin: Option<String>,
    /// Custom transport.
    transport: Option<Arc<dyn Transport>>,
    /// Configuration for the default HTTP transport.
    http_config: Option<HttpTransportConfig>,
    /// Options applied to every socket.
    options: SocketOptions,
    /// Whether native sockets are available.
    native: bool,
}

impl Default for ConnectorBuilder {
    fn default() -> Self {
        Self {
            origin: None,
            transport: None,
            http_config: None,
            options: SocketOptions::default(),
            native: true,
        }
    }
}

impl fmt::Debug for ConnectorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorBuilder")
            .field("origin", &self.origin)
            .field("custom_transport", &self.transport.is_some())
            .field("http_config", &self.http_config)
            .field("options", &self.options)
            .field("native", &self.native)
            .finish()
    }
}

// ============================================================================
// ConnectorBuilder Implementation
// ============================================================================

impl ConnectorBuilder {
    /// Creates a new builder with no origin.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the execution-context origin.
    ///
    /// # Arguments
    ///
    /// * `origin` - e.g. "https://app.local:8443"
    #[inline]
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Uses a custom transport for emulated sockets.
    ///
    /// Takes precedence over [`Self::http_config`].
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Configures the default HTTP transport.
    ///
    /// Without this, the HTTP transport is rooted at the origin with
    /// default settings.
    #[inline]
    #[must_use]
    pub fn http_config(mut self, config: HttpTransportConfig) -> Self {
        self.http_config = Some(config);
        self
    }

    /// Sets the options applied to every socket.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: SocketOptions) -> Self {
        self.options = options;
        self
    }

    /// Enables or disables native sockets for cross-origin targets.
    #[inline]
    #[must_use]
    pub fn native(mut self, enabled: bool) -> Self {
        self.native = enabled;
        self
    }

    /// Builds the connector with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the origin is missing, malformed or opaque
    /// - [`Error::Config`] if the default HTTP transport cannot be built
    pub fn build(self) -> Result<Connector> {
        let origin = self.validate_origin()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let config = self
                    .http_config
                    .unwrap_or_else(|| HttpTransportConfig::new(origin.clone()));
                Arc::new(HttpTransport::new(config)?)
            }
        };

        Ok(Connector {
            inner: Arc::new(ConnectorInner {
                origin,
                transport,
                options: self.options,
                native: self.native,
            }),
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ConnectorBuilder {
    /// Validates the origin configuration.
    fn validate_origin(&self) -> Result<Url> {
        let raw = self.origin.as_deref().ok_or_else(|| {
            Error::config(
                "Origin is required. Use .origin() to set it.\n\
                 Example: Connector::builder().origin(\"https://app.local\")",
            )
        })?;

        let origin = Url::parse(raw).map_err(|e| Error::config(format!("Invalid origin {raw:?}: {e}")))?;

        if !origin.origin().is_tuple() {
            return Err(Error::config(format!(
                "Origin {raw:?} is opaque and cannot be compared with socket targets"
            )));
        }

        Ok(origin)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ConnectorBuilder::new();
        assert!(builder.origin.is_none());
        assert!(builder.transport.is_none());
        assert!(builder.native);
    }

    #[test]
    fn test_build_fails_without_origin() {
        let err = ConnectorBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("Origin"));
    }

    #[test]
    fn test_build_fails_with_malformed_origin() {
        let err = ConnectorBuilder::new().origin("not a url").build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_fails_with_opaque_origin() {
        let err = ConnectorBuilder::new().origin("data:text/plain,hi").build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_with_default_transport() {
        let connector = ConnectorBuilder::new()
            .origin("https://app.local")
            .build()
            .expect("connector");

        assert_eq!(connector.origin().as_str(), "https://app.local/");
        assert!(connector.inner.native);
    }

    #[test]
    fn test_options_carried() {
        let options = SocketOptions::new().with_close_timeout(std::time::Duration::from_secs(1));
        let connector = ConnectorBuilder::new()
            .origin("http://app.local")
            .options(options)
            .native(false)
            .build()
            .expect("connector");

        assert_eq!(connector.options(), options);
        assert!(!connector.inner.native);
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = ConnectorBuilder::new().origin("http://app.local");
        let cloned = builder.clone();
        assert_eq!(builder.origin, cloned.origin);
    }
}
