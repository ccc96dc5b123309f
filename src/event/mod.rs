//! Socket events.
//!
//! Every observable lifecycle step of a socket is delivered as a
//! [`SocketEvent`] through its [`EventDispatcher`].
//!
//! | Type | Fired when |
//! |------|------------|
//! | `open` | The connection reached OPEN |
//! | `message` | An inbound text/binary message was decoded |
//! | `error` | A connection-fatal failure occurred (always followed by `close`) |
//! | `close` | The connection reached CLOSED (exactly once) |

// ============================================================================
// Submodules
// ============================================================================

/// Listener registry and dispatch.
pub mod dispatch;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::protocol::MessageData;

// ============================================================================
// Re-exports
// ============================================================================

pub use dispatch::{EventDispatcher, Listener};

// ============================================================================
// EventType
// ============================================================================

/// Event type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Connection opened.
    Open,
    /// Message received.
    Message,
    /// Fatal error.
    Error,
    /// Connection closed.
    Close,
}

impl EventType {
    /// Returns the event name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Message => "message",
            Self::Error => "error",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Event payloads
// ============================================================================

/// Data of a `message` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Decoded payload.
    pub data: MessageData,
    /// Origin of the socket address.
    pub origin: String,
}

/// Data of an `error` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Description of the failure.
    pub message: String,
}

/// Data of a `close` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// Close code.
    pub code: u16,
    /// Close reason.
    pub reason: String,
    /// Whether the connection closed cleanly.
    pub was_clean: bool,
}

// ============================================================================
// SocketEvent
// ============================================================================

/// An event delivered to listeners and handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Connection opened. Carries no data.
    Open,
    /// Message received.
    Message(MessageEvent),
    /// Fatal error.
    Error(ErrorEvent),
    /// Connection closed.
    Close(CloseEvent),
}

impl SocketEvent {
    /// Returns the event type tag.
    #[inline]
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Open => EventType::Open,
            Self::Message(_) => EventType::Message,
            Self::Error(_) => EventType::Error,
            Self::Close(_) => EventType::Close,
        }
    }

    /// Returns the close data, if this is a close event.
    #[inline]
    #[must_use]
    pub fn as_close(&self) -> Option<&CloseEvent> {
        match self {
            Self::Close(close) => Some(close),
            _ => None,
        }
    }

    /// Returns the message data, if this is a message event.
    #[inline]
    #[must_use]
    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
