//! Error types for the polling socket.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use polling_socket::{Result, Connector};
//!
//! fn example(connector: &Connector) -> Result<()> {
//!     let socket = connector.connect("ws://localhost:8080/feed", &[])?;
//!     socket.close()?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Caller misuse | [`Error::InvalidState`], [`Error::UnsupportedPayload`] |
//! | Connection-fatal | [`Error::Connection`], [`Error::Send`], [`Error::Poll`] |
//! | Local, non-fatal | [`Error::Decode`] |
//! | Execution | [`Error::Timeout`], [`Error::ConnectionClosed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;
use url::ParseError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connector or transport configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument.
    ///
    /// Returned for malformed addresses, sub-protocol lists and close
    /// arguments.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Caller Errors
    // ========================================================================
    /// Operation not permitted in the current ready state.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the state violation.
        message: String,
    },

    /// Payload type the frame codec cannot encode.
    #[error("Unsupported payload: {kind}")]
    UnsupportedPayload {
        /// Description of the rejected payload.
        kind: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Opening the connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Submitting an outbound frame failed.
    #[error("Send failed: {message}")]
    Send {
        /// Description of the send error.
        message: String,
    },

    /// Retrieving inbound frames failed.
    #[error("Poll failed: {message}")]
    Poll {
        /// Description of the poll error.
        message: String,
    },

    /// Malformed inbound wire payload.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection closed while an operation was pending.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates an unsupported payload error.
    #[inline]
    pub fn unsupported_payload(kind: impl Into<String>) -> Self {
        Self::UnsupportedPayload { kind: kind.into() }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a send error.
    #[inline]
    pub fn send(message: impl Into<String>) -> Self {
        Self::Send {
            message: message.into(),
        }
    }

    /// Creates a poll error.
    #[inline]
    pub fn poll(message: impl Into<String>) -> Self {
        Self::Poll {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this error terminates the connection it occurred on.
    ///
    /// Fatal errors surface as an error event followed by a close event.
    #[inline]
    #[must_use]
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::Send { .. }
                | Self::Poll { .. }
                | Self::Timeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is reported synchronously to the caller
    /// and leaves the connection untouched.
    #[inline]
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. }
                | Self::InvalidState { .. }
                | Self::UnsupportedPayload { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("status 502");
        assert_eq!(err.to_string(), "Connection failed: status 502");
    }

    #[test]
    fn test_poll_error_display() {
        let err = Error::poll("network unreachable");
        assert_eq!(err.to_string(), "Poll failed: network unreachable");
    }

    #[test]
    fn test_is_connection_fatal() {
        assert!(Error::connection("x").is_connection_fatal());
        assert!(Error::send("x").is_connection_fatal());
        assert!(Error::poll("x").is_connection_fatal());
        assert!(Error::ConnectionClosed.is_connection_fatal());
        assert!(!Error::decode("x").is_connection_fatal());
        assert!(!Error::unsupported_payload("object").is_connection_fatal());
    }

    #[test]
    fn test_is_caller_error() {
        assert!(Error::invalid_state("not open").is_caller_error());
        assert!(Error::unsupported_payload("null").is_caller_error());
        assert!(!Error::send("x").is_caller_error());
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::timeout("close notification", 5000).is_timeout());
        assert!(!Error::poll("x").is_timeout());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
