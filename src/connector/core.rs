//! Connector and per-socket builder.
//!
//! # Example
//!
//! ```no_run
//! use polling_socket::{Connector, EventType, Listener};
//!
//! # async fn example() -> polling_socket::Result<()> {
//! let connector = Connector::builder().origin("https://app.local").build()?;
//!
//! // Listeners registered here cannot miss the `open` event.
//! let socket = connector
//!     .socket("wss://app.local/feed")
//!     .protocol("chat")
//!     .listener(EventType::Open, Listener::new(|_| println!("open")))
//!     .connect()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::event::{EventType, Listener};
use crate::socket::address::{parse_address, validate_protocols};
use crate::socket::lifecycle::SocketCore;
use crate::socket::{EmulatedSocket, NativeSocket, Socket, SocketOptions};
use crate::transport::Transport;
use crate::transport::routing::{self, Route};

use super::builder::ConnectorBuilder;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the connector.
pub(crate) struct ConnectorInner {
    /// Origin of the execution context.
    pub origin: Url,

    /// Request/response transport for emulated sockets.
    pub transport: Arc<dyn Transport>,

    /// Options applied to every socket.
    pub options: SocketOptions,

    /// Whether a native duplex channel is available.
    pub native: bool,
}

// ============================================================================
// Connector
// ============================================================================

/// Socket factory bound to one execution-context origin.
///
/// Same-origin targets are emulated; anything else goes native, or fails
/// with [`Error::Config`] when native sockets are disabled.
#[derive(Clone)]
pub struct Connector {
    /// Shared inner state.
    pub(crate) inner: Arc<ConnectorInner>,
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("origin", &self.inner.origin.as_str())
            .field("options", &self.inner.options)
            .field("native", &self.inner.native)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Connector - Public API
// ============================================================================

impl Connector {
    /// Creates a configuration builder for the connector.
    #[inline]
    #[must_use]
    pub fn builder() -> ConnectorBuilder {
        ConnectorBuilder::new()
    }

    /// Returns the execution-context origin.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.inner.origin
    }

    /// Returns the options applied to every socket.
    #[inline]
    #[must_use]
    pub fn options(&self) -> SocketOptions {
        self.inner.options
    }

    /// Returns the route a target would take.
    #[inline]
    #[must_use]
    pub fn route(&self, target: &Url) -> Route {
        routing::route(target, &self.inner.origin)
    }

    /// Opens a socket to `address`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for a malformed address or protocol list
    /// - [`Error::Config`] for a cross-origin target with native sockets disabled
    pub fn connect<S: AsRef<str>>(&self, address: &str, protocols: &[S]) -> Result<Socket> {
        let mut builder = self.socket(address);
        for protocol in protocols {
            builder = builder.protocol(protocol.as_ref());
        }
        builder.connect()
    }

    /// Creates a socket builder for `address`.
    #[inline]
    #[must_use]
    pub fn socket(&self, address: impl Into<String>) -> SocketBuilder<'_> {
        SocketBuilder::new(self, address.into())
    }
}

// ============================================================================
// SocketBuilder
// ============================================================================

/// Builder for one socket.
///
/// Listeners and handlers given here are registered before any background
/// work starts.
pub struct SocketBuilder<'a> {
    /// Reference to the connector.
    connector: &'a Connector,
    /// Target address, unparsed.
    address: String,
    /// Requested sub-protocols, in preference order.
    protocols: Vec<String>,
    /// Options overriding the connector's.
    options: Option<SocketOptions>,
    /// Listeners to register up front.
    listeners: Vec<(EventType, Listener)>,
    /// Handler slots to assign up front.
    handlers: Vec<(EventType, Listener)>,
}

impl<'a> SocketBuilder<'a> {
    pub(crate) fn new(connector: &'a Connector, address: String) -> Self {
        Self {
            connector,
            address,
            protocols: Vec::new(),
            options: None,
            listeners: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Requests a sub-protocol. Call repeatedly for several, most preferred first.
    #[must_use]
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocols.push(protocol.into());
        self
    }

    /// Replaces the requested sub-protocol list.
    #[must_use]
    pub fn protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the connector's socket options.
    #[must_use]
    pub fn options(mut self, options: SocketOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Registers a listener before the socket starts.
    #[must_use]
    pub fn listener(mut self, event_type: EventType, listener: Listener) -> Self {
        self.listeners.push((event_type, listener));
        self
    }

    /// Assigns a handler slot before the socket starts.
    #[must_use]
    pub fn handler(mut self, event_type: EventType, handler: Listener) -> Self {
        self.handlers.push((event_type, handler));
        self
    }

    /// Validates the arguments, routes the target and starts the socket.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for a malformed address or protocol list
    /// - [`Error::Config`] for a cross-origin target with native sockets disabled
    pub fn connect(self) -> Result<Socket> {
        let inner = &self.connector.inner;

        let url = parse_address(&self.address)?;
        let protocols = validate_protocols(&self.protocols)?;
        let route = routing::route(&url, &inner.origin);

        if route == Route::Native && !inner.native {
            return Err(Error::config(format!(
                "{url} is not same-origin with {} and native sockets are disabled",
                inner.origin
            )));
        }

        let core = SocketCore::new(url, protocols, self.options.unwrap_or(inner.options));
        for (event_type, listener) in self.listeners {
            core.dispatcher.add_listener(event_type, listener);
        }
        for (event_type, handler) in self.handlers {
            core.dispatcher.set_handler(event_type, Some(handler));
        }

        debug!(socket = %core.id, url = %core.url, ?route, "Routing socket");

        let socket = match route {
            Route::Emulated => Socket::from(EmulatedSocket::start(core, Arc::clone(&inner.transport))),
            Route::Native => Socket::from(NativeSocket::start(core)),
        };
        Ok(socket)
    }
}

// ============================================================================
// Tests
// ============================================================================
