//! Wire protocol between the socket and the request/response transport.
//!
//! # Protocol Overview
//!
//! | Exchange | Direction | Purpose |
//! |----------|-----------|---------|
//! | `open` | Local → Remote | Create a logical connection |
//! | `submit` | Local → Remote | Deliver one [`WireFrame`] |
//! | `poll` | Remote → Local | Retrieve pending [`InboundMessage`]s |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `close` | Close codes and argument rules |
//! | `codec` | Text/binary frame codec |
//! | `frame` | Payload and envelope types |

// ============================================================================
// Submodules
// ============================================================================

/// Close codes and argument rules.
pub mod close;

/// Frame codec.
pub mod codec;

/// Payload and envelope types.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{
    BinaryType, Blob, InboundKind, InboundMessage, MessageData, OpenRequest, OpenResponse,
    OutboundFrame, Payload, PollResponse, WireFrame,
};
