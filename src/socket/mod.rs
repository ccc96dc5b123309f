//! Socket handles.
//!
//! Two implementations share one capability surface, [`DuplexSocket`]:
//!
//! - [`EmulatedSocket`] - duplex messaging over a request/response [`Transport`](crate::transport::Transport)
//! - [`NativeSocket`] - a real WebSocket connection
//!
//! [`Socket`] is the sum of both, as returned by [`Connector`](crate::Connector).
//!
//! # Ready State
//!
//! ```text
//! CONNECTING ──► OPEN ──► CLOSING ──► CLOSED
//!      │                                ▲
//!      └────────────────────────────────┘  (open failed)
//! ```
//!
//! Transitions only move forward. The `close` event fires exactly once,
//! when CLOSED is reached.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `address` | Address and sub-protocol validation |
//! | `emulated` | Emulated socket |
//! | `lifecycle` | Shared state machine and event emission |
//! | `native` | Native WebSocket socket |
//! | `options` | Per-socket options |
//! | `poll` | Inbound poll loop |
//! | `queue` | Outbound send queue and drain activity |

// ============================================================================
// Submodules
// ============================================================================

/// Address and sub-protocol validation.
pub mod address;

/// Emulated socket.
pub mod emulated;

/// Shared state machine.
pub(crate) mod lifecycle;

/// Native WebSocket socket.
pub mod native;

/// Per-socket options.
pub mod options;

/// Inbound poll loop.
pub(crate) mod poll;

/// Outbound send queue.
pub(crate) mod queue;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use url::Url;

use crate::error::Result;
use crate::event::{EventType, Listener};
use crate::protocol::close::NORMAL_CLOSURE;
use crate::protocol::{BinaryType, Payload};

// ============================================================================
// Re-exports
// ============================================================================

pub use emulated::EmulatedSocket;
pub use native::NativeSocket;
pub use options::SocketOptions;

// ============================================================================
// ReadyState
// ============================================================================

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadyState {
    /// Open in progress.
    Connecting = 0,
    /// Open; messages flow.
    Open = 1,
    /// Close requested, not yet finalized.
    Closing = 2,
    /// Terminal.
    Closed = 3,
}

impl ReadyState {
    /// Returns `true` if moving from `self` to `next` is a legal transition.
    #[inline]
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Open)
                | (Self::Connecting, Self::Closed)
                | (Self::Open, Self::Closing)
                | (Self::Closing, Self::Closed)
        )
    }

    /// Returns the upper-case state name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DuplexSocket
// ============================================================================

/// Capability surface shared by every socket flavor.
///
/// Methods that spawn background work (`send`, `close_with`) must be
/// called from within a tokio runtime.
pub trait DuplexSocket {
    /// Returns the target address.
    fn url(&self) -> &Url;

    /// Returns the current ready state.
    fn ready_state(&self) -> ReadyState;

    /// Returns the bytes accepted by `send` and not yet acknowledged.
    fn buffered_amount(&self) -> u64;

    /// Returns the negotiated sub-protocol, empty until open.
    fn protocol(&self) -> String;

    /// Returns the negotiated extensions. Always empty.
    fn extensions(&self) -> &str {
        ""
    }

    /// Returns the binary payload representation.
    fn binary_type(&self) -> BinaryType;

    /// Sets the binary payload representation.
    fn set_binary_type(&self, binary_type: BinaryType);

    /// Queues a payload for ordered delivery.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidState`] unless the socket is OPEN.
    fn send(&self, payload: Payload) -> Result<()>;

    /// Closes the connection with the given code and reason.
    ///
    /// No-op if the socket is already closing or closed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] for a code other than 1000
    /// or 3000-4999, or a reason longer than 123 bytes.
    fn close_with(&self, code: u16, reason: &str) -> Result<()>;

    /// Closes the connection normally.
    ///
    /// # Errors
    ///
    /// Never fails for the default arguments; see [`Self::close_with`].
    fn close(&self) -> Result<()> {
        self.close_with(NORMAL_CLOSURE, "")
    }

    /// Registers a listener. Returns `false` if already registered.
    fn add_event_listener(&self, event_type: EventType, listener: Listener) -> bool;

    /// Removes a listener. Returns `false` if it was not registered.
    fn remove_event_listener(&self, event_type: EventType, listener: &Listener) -> bool;

    /// Assigns the single handler slot for `event_type`.
    fn set_handler(&self, event_type: EventType, handler: Option<Listener>);

    /// Assigns the `open` handler.
    fn set_onopen(&self, handler: Option<Listener>) {
        self.set_handler(EventType::Open, handler);
    }

    /// Assigns the `message` handler.
    fn set_onmessage(&self, handler: Option<Listener>) {
        self.set_handler(EventType::Message, handler);
    }

    /// Assigns the `error` handler.
    fn set_onerror(&self, handler: Option<Listener>) {
        self.set_handler(EventType::Error, handler);
    }

    /// Assigns the `close` handler.
    fn set_onclose(&self, handler: Option<Listener>) {
        self.set_handler(EventType::Close, handler);
    }
}

// ============================================================================
// Socket
// ============================================================================

/// A socket carried either by emulation or natively.
#[derive(Clone, Debug)]
pub enum Socket {
    /// Emulated over the request/response transport.
    Emulated(EmulatedSocket),
    /// Native WebSocket.
    Native(NativeSocket),
}

impl Socket {
    /// Returns `true` if this socket is emulated.
    #[inline]
    #[must_use]
    pub fn is_emulated(&self) -> bool {
        matches!(self, Self::Emulated(_))
    }

    fn inner(&self) -> &dyn DuplexSocket {
        match self {
            Self::Emulated(socket) => socket,
            Self::Native(socket) => socket,
        }
    }
}

impl DuplexSocket for Socket {
    fn url(&self) -> &Url {
        self.inner().url()
    }

    fn ready_state(&self) -> ReadyState {
        self.inner().ready_state()
    }

    fn buffered_amount(&self) -> u64 {
        self.inner().buffered_amount()
    }

    fn protocol(&self) -> String {
        self.inner().protocol()
    }

    fn binary_type(&self) -> BinaryType {
        self.inner().binary_type()
    }

    fn set_binary_type(&self, binary_type: BinaryType) {
        self.inner().set_binary_type(binary_type);
    }

    fn send(&self, payload: Payload) -> Result<()> {
        self.inner().send(payload)
    }

    fn close_with(&self, code: u16, reason: &str) -> Result<()> {
        self.inner().close_with(code, reason)
    }

    fn add_event_listener(&self, event_type: EventType, listener: Listener) -> bool {
        self.inner().add_event_listener(event_type, listener)
    }

    fn remove_event_listener(&self, event_type: EventType, listener: &Listener) -> bool {
        self.inner().remove_event_listener(event_type, listener)
    }

    fn set_handler(&self, event_type: EventType, handler: Option<Listener>) {
        self.inner().set_handler(event_type, handler);
    }
}

impl From<EmulatedSocket> for Socket {
    fn from(socket: EmulatedSocket) -> Self {
        Self::Emulated(socket)
    }
}

impl From<NativeSocket> for Socket {
    fn from(socket: NativeSocket) -> Self {
        Self::Native(socket)
    }
}

// ============================================================================
// Tests
// ============================================================================
