//! Inbound poll loop.
//!
//! While the socket is OPEN, repeatedly asks the transport for pending
//! inbound messages and processes each batch in arrival order. At most one
//! poll request is in flight. A poll failure ends the loop and fails the
//! connection; a malformed message is logged and skipped.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::identifiers::ConnectionId;
use crate::protocol::close::{self, NO_STATUS_RECEIVED};
use crate::protocol::codec;
use crate::protocol::{InboundKind, InboundMessage};
use crate::transport::Transport;

use super::ReadyState;
use super::lifecycle::SocketCore;

// ============================================================================
// Poll Loop
// ============================================================================

/// Runs until the socket leaves OPEN or a poll fails.
pub(crate) async fn run(core: Arc<SocketCore>, transport: Arc<dyn Transport>, connection_id: ConnectionId) {
    debug!(socket = %core.id, %connection_id, "Poll loop started");

    loop {
        if core.cancel.is_cancelled() || core.ready_state() != ReadyState::Open {
            break;
        }

        let messages = match transport.poll(&connection_id).await {
            Ok(messages) => messages,
            Err(e) => {
                core.fail(&e);
                break;
            }
        };

        trace!(socket = %core.id, count = messages.len(), "Poll returned");

        let idle = messages.is_empty();
        for message in messages {
            if core.is_closed() {
                break;
            }
            handle_message(&core, message);
        }

        let interval = core.options.poll_idle_interval;
        if idle && !interval.is_zero() {
            tokio::select! {
                () = core.cancel.cancelled() => break,
                () = sleep(interval) => {}
            }
        }
    }

    debug!(socket = %core.id, "Poll loop terminated");
}

/// Processes one inbound message.
pub(crate) fn handle_message(core: &SocketCore, message: InboundMessage) {
    match message.kind {
        InboundKind::Close => {
            let code = message.code.unwrap_or(NO_STATUS_RECEIVED);
            let reason = message.reason.unwrap_or_default();
            debug!(socket = %core.id, code, %reason, "Remote close received");
            core.finalize(code, &reason, close::is_clean(code));
        }

        InboundKind::Text | InboundKind::Binary => {
            match codec::decode_message(&message, core.binary_type()) {
                Ok(data) => {
                    core.deliver(data);
                }
                Err(e) => {
                    warn!(socket = %core.id, kind = ?message.kind, error = %e, "Dropping undecodable message");
                }
            }
        }

        InboundKind::Unknown => {
            warn!(socket = %core.id, "Skipping message of unknown type");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
