//! Polling Socket - full-duplex messaging over request/response exchanges.
//!
//! This library provides a WebSocket-shaped client whose traffic, for
//! same-origin targets, is carried by three discrete request/response
//! operations (open, submit, poll) instead of a real duplex connection.
//! Cross-origin targets use a native WebSocket through the same API.
//!
//! # Architecture
//!
//! - **Socket (local)**: ready-state machine, ordered send queue, poll loop
//! - **Transport (remote)**: holds the logical connection, buffers inbound
//!   messages until polled
//!
//! Key design principles:
//!
//! - One logical connection per [`EmulatedSocket`], identified by an opaque
//!   [`ConnectionId`] assigned at open
//! - At most one submission and one poll in flight per socket
//! - Outbound frames reach the remote side in `send` order
//! - The `close` event fires exactly once
//!
//! # Quick Start
//!
//! ```no_run
//! use polling_socket::{Connector, DuplexSocket, EventType, Listener, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connector = Connector::builder()
//!         .origin("http://app.local:8080")
//!         .build()?;
//!
//!     let socket = connector
//!         .socket("ws://app.local:8080/feed")
//!         .protocol("chat")
//!         .listener(EventType::Message, Listener::new(|event| println!("{event:?}")))
//!         .connect()?;
//!
//!     socket.set_onopen(Some(Listener::new(|_| println!("open"))));
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`connector`] | Socket factory and routing |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`event`] | Event types and dispatch |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire envelopes and frame codec |
//! | [`socket`] | Emulated and native sockets |
//! | [`transport`] | Request/response transport |

// ============================================================================
// Modules
// ============================================================================

/// Socket factory and routing.
///
/// Use [`Connector::builder()`] to create a configured connector.
pub mod connector;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Socket events and listener dispatch.
pub mod event;

/// Type-safe identifiers for sockets and connections.
pub mod identifiers;

/// Wire envelopes, payload types and the frame codec.
pub mod protocol;

/// Socket handles and their lifecycle.
pub mod socket;

/// Request/response transport.
///
/// Implement [`Transport`] to carry emulated sockets over a custom backend.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Connector types
pub use connector::{Connector, ConnectorBuilder, SocketBuilder};

// Error types
pub use error::{Error, Result};

// Event types
pub use event::{CloseEvent, ErrorEvent, EventType, Listener, MessageEvent, SocketEvent};

// Identifier types
pub use identifiers::{ConnectionId, SocketId};

// Protocol types
pub use protocol::{BinaryType, Blob, MessageData, Payload};

// Socket types
pub use socket::{DuplexSocket, EmulatedSocket, NativeSocket, ReadyState, Socket, SocketOptions};

// Transport types
pub use transport::{HttpTransport, HttpTransportConfig, Transport};
