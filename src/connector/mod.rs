//! Socket factory.
//!
//! A [`Connector`] is bound to one execution-context origin. It decides per
//! target whether the connection is emulated over the request/response
//! [`Transport`](crate::transport::Transport) or carried natively, and hands
//! back a [`Socket`](crate::socket::Socket) either way.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Connector`] | Routes and creates sockets |
//! | [`ConnectorBuilder`] | Fluent configuration builder |
//! | [`SocketBuilder`] | Per-socket builder with pre-registered listeners |
//!
//! # Example
//!
//! ```no_run
//! use polling_socket::{Connector, DuplexSocket, Result};
//!
//! # async fn example() -> Result<()> {
//! let connector = Connector::builder()
//!     .origin("http://app.local:8080")
//!     .build()?;
//!
//! let socket = connector.connect("ws://app.local:8080/feed", &["chat"])?;
//! assert!(socket.is_emulated());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for connector configuration.
pub mod builder;

/// Core connector implementation.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ConnectorBuilder;
pub use core::{Connector, SocketBuilder};
