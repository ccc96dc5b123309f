//! Per-socket options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use polling_socket::{BinaryType, SocketOptions};
//!
//! let options = SocketOptions::new()
//!     .with_binary_type(BinaryType::ArrayBuffer)
//!     .with_poll_idle_interval(Duration::from_millis(250));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::protocol::BinaryType;

// ============================================================================
// Constants
// ============================================================================

/// Default delay before re-polling after an empty poll result.
const DEFAULT_POLL_IDLE_INTERVAL: Duration = Duration::from_millis(50);

/// Default bound on the close notification / closing handshake.
const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SocketOptions
// ============================================================================

/// Options applied to every socket a connector creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketOptions {
    /// Initial binary payload representation.
    pub binary_type: BinaryType,

    /// Delay before polling again after a poll returned nothing.
    ///
    /// Zero re-polls immediately, which suits long-polling backends.
    pub poll_idle_interval: Duration,

    /// Upper bound on the close notification before the socket finalizes
    /// anyway.
    pub close_timeout: Duration,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors & Builder Methods
// ============================================================================

impl SocketOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            binary_type: BinaryType::Blob,
            poll_idle_interval: DEFAULT_POLL_IDLE_INTERVAL,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Sets the initial binary payload representation.
    #[inline]
    #[must_use]
    pub const fn with_binary_type(mut self, binary_type: BinaryType) -> Self {
        self.binary_type = binary_type;
        self
    }

    /// Sets the idle re-poll delay.
    #[inline]
    #[must_use]
    pub const fn with_poll_idle_interval(mut self, interval: Duration) -> Self {
        self.poll_idle_interval = interval;
        self
    }

    /// Sets the close timeout.
    #[inline]
    #[must_use]
    pub const fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
