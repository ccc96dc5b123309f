//! Request/response transport layer.
//!
//! The emulated socket never touches the network directly. It drives a
//! [`Transport`], which exposes three discrete exchanges plus a
//! best-effort close notification.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  EmulatedSocket  │      open / submit / poll    │  Backend        │
//! │                  │─────────────────────────────►│  (one logical   │
//! │  Transport impl  │◄─────────────────────────────│   connection)   │
//! └──────────────────┘     request / response       └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `http` | reqwest-backed [`Transport`] |
//! | `routing` | Emulate-or-native routing predicate |

// ============================================================================
// Submodules
// ============================================================================

/// HTTP transport client.
pub mod http;

/// Routing predicate.
pub mod routing;

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::identifiers::ConnectionId;
use crate::protocol::{InboundMessage, OpenResponse, WireFrame};

// ============================================================================
// Re-exports
// ============================================================================

pub use http::{HttpTransport, HttpTransportConfig};
pub use routing::should_emulate;

// ============================================================================
// Transport
// ============================================================================

/// Request/response operations backing one emulated connection.
///
/// Implementations must be safe to call concurrently: the send queue and
/// the poll loop run independently, each with at most one request in
/// flight.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens a logical connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Connection`] on a non-success response.
    async fn open(&self, url: &Url, protocols: &[String]) -> Result<OpenResponse>;

    /// Submits one outbound frame and waits for its acknowledgment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Send`] on a non-success response.
    async fn submit(&self, connection_id: &ConnectionId, frame: &WireFrame) -> Result<()>;

    /// Retrieves pending inbound messages in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Poll`] on a non-success response.
    async fn poll(&self, connection_id: &ConnectionId) -> Result<Vec<InboundMessage>>;

    /// Notifies the remote side that the connection is closing.
    ///
    /// Callers treat this as best-effort. The default submits a close
    /// envelope.
    async fn close(&self, connection_id: &ConnectionId, code: u16, reason: &str) -> Result<()> {
        self.submit(connection_id, &WireFrame::close(code, reason))
            .await
    }
}
