//! Socket emulated over a request/response transport.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use polling_socket::{DuplexSocket, EmulatedSocket, EventType, Listener};
//!
//! # fn example(transport: Arc<dyn polling_socket::Transport>) -> polling_socket::Result<()> {
//! let socket = EmulatedSocket::connect("ws://app.local/feed", &["chat"], transport)?;
//! socket.set_onmessage(Some(Listener::new(|event| {
//!     println!("{event:?}");
//! })));
//! # Ok(())
//! # }
//! ```
//!
//! # Tasks
//!
//! | Task | Lifetime |
//! |------|----------|
//! | open + poll loop | construction until the socket leaves OPEN |
//! | drain | while frames are queued |
//! | close notification | from `close_with` until CLOSED |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::event::{EventType, Listener};
use crate::identifiers::ConnectionId;
use crate::protocol::codec;
use crate::protocol::{BinaryType, OutboundFrame, Payload};
use crate::protocol::close;
use crate::transport::Transport;

use super::address::{parse_address, validate_protocols};
use super::lifecycle::{BeginClose, SocketCore};
use super::options::SocketOptions;
use super::queue::{self, FrameSink};
use super::{DuplexSocket, ReadyState, poll};

// ============================================================================
// TransportSink
// ============================================================================

/// Drain target submitting frames through the transport.
struct TransportSink {
    transport: Arc<dyn Transport>,
    connection_id: ConnectionId,
}

#[async_trait]
impl FrameSink for TransportSink {
    async fn submit(&self, frame: &OutboundFrame) -> Result<()> {
        let wire = codec::encode_frame(frame);
        self.transport.submit(&self.connection_id, &wire).await
    }
}

// ============================================================================
// EmulatedSocket
// ============================================================================

/// Duplex socket emulated over discrete request/response exchanges.
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct EmulatedSocket {
    core: Arc<SocketCore>,
    transport: Arc<dyn Transport>,
}

impl EmulatedSocket {
    /// Validates the address and protocols, then starts opening.
    ///
    /// Must be called from within a tokio runtime. Listeners added after
    /// this returns may miss an `open` that completes first; register them
    /// up front through [`crate::Connector::socket`] when that matters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a malformed address or
    /// sub-protocol list.
    pub fn connect<S: AsRef<str>>(
        address: &str,
        protocols: &[S],
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let url = parse_address(address)?;
        let protocols = validate_protocols(protocols)?;
        let core = SocketCore::new(url, protocols, SocketOptions::default());
        Ok(Self::start(core, transport))
    }

    /// Spawns the open task for a prepared core.
    pub(crate) fn start(core: Arc<SocketCore>, transport: Arc<dyn Transport>) -> Self {
        debug!(socket = %core.id, url = %core.url, "Starting emulated socket");

        tokio::spawn(run_open(Arc::clone(&core), Arc::clone(&transport)));
        Self { core, transport }
    }

    /// Returns the transport-assigned connection id, once open.
    #[inline]
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.core.connection_id()
    }
}

/// Opens the connection, then runs the poll loop on the same task.
async fn run_open(core: Arc<SocketCore>, transport: Arc<dyn Transport>) {
    let opened = match transport.open(&core.url, &core.requested_protocols).await {
        Ok(opened) => opened,
        Err(e) => {
            core.fail(&e);
            return;
        }
    };

    let connection_id = opened.connection_id;

    if !opened.protocol.is_empty() && !core.requested_protocols.contains(&opened.protocol) {
        core.fail(&Error::connection(format!(
            "server selected sub-protocol {:?} which was not requested",
            opened.protocol
        )));
        release(&core, &*transport, &connection_id).await;
        return;
    }

    let sink = Arc::new(TransportSink {
        transport: Arc::clone(&transport),
        connection_id: connection_id.clone(),
    });

    if !core.mark_open(opened.protocol, Some(connection_id.clone()), sink) {
        // Closed while the open was in flight; release the remote side.
        debug!(socket = %core.id, %connection_id, "Open completed after close");
        release(&core, &*transport, &connection_id).await;
        return;
    }

    poll::run(core, transport, connection_id).await;
}

/// Close notification, bounded by `limit`.
///
/// # Errors
///
/// Returns the transport's error, or [`Error::Timeout`] once `limit` elapses.
async fn notify_close(
    transport: &dyn Transport,
    connection_id: &ConnectionId,
    code: u16,
    reason: &str,
    limit: Duration,
) -> Result<()> {
    timeout(limit, transport.close(connection_id, code, reason))
        .await
        .map_err(|_| Error::timeout("close notification", limit.as_millis() as u64))??;

    debug!(%connection_id, code, "Close notification delivered");
    Ok(())
}

/// Best-effort normal-closure notification for a connection the socket will
/// not use.
async fn release(core: &SocketCore, transport: &dyn Transport, connection_id: &ConnectionId) {
    let limit = core.options.close_timeout;
    if let Err(e) = notify_close(transport, connection_id, close::NORMAL_CLOSURE, "", limit).await {
        debug!(socket = %core.id, %connection_id, error = %e, "Close notification failed");
    }
}

// ============================================================================
// DuplexSocket
// ============================================================================

impl DuplexSocket for EmulatedSocket {
    fn url(&self) -> &Url {
        &self.core.url
    }

    fn ready_state(&self) -> ReadyState {
        self.core.ready_state()
    }

    fn buffered_amount(&self) -> u64 {
        self.core.buffered_amount()
    }

    fn protocol(&self) -> String {
        self.core.protocol()
    }

    fn binary_type(&self) -> BinaryType {
        self.core.binary_type()
    }

    fn set_binary_type(&self, binary_type: BinaryType) {
        self.core.set_binary_type(binary_type);
    }

    fn send(&self, payload: Payload) -> Result<()> {
        queue::enqueue(&self.core, payload)
    }

    fn close_with(&self, code: u16, reason: &str) -> Result<()> {
        close::validate(code, reason)?;

        match self.core.begin_close() {
            BeginClose::Ignored => {}

            BeginClose::Connecting => {
                self.core
                    .fail(&Error::connection("closed before the connection was established"));
            }

            BeginClose::Closing(connection_id) => {
                let core = Arc::clone(&self.core);
                let transport = Arc::clone(&self.transport);
                let reason = reason.to_string();

                tokio::spawn(async move {
                    if let Some(id) = connection_id
                        && let Err(e) =
                            notify_close(&*transport, &id, code, &reason, core.options.close_timeout).await
                    {
                        debug!(socket = %core.id, connection_id = %id, error = %e, "Close notification failed");
                    }
                    core.finalize(code, &reason, true);
                });
            }
        }
        Ok(())
    }

    fn add_event_listener(&self, event_type: EventType, listener: Listener) -> bool {
        self.core.dispatcher.add_listener(event_type, listener)
    }

    fn remove_event_listener(&self, event_type: EventType, listener: &Listener) -> bool {
        self.core.dispatcher.remove_listener(event_type, listener)
    }

    fn set_handler(&self, event_type: EventType, handler: Option<Listener>) {
        self.core.dispatcher.set_handler(event_type, handler);
    }
}

impl fmt::Debug for EmulatedSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatedSocket")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::ConnectionId;
    use crate::protocol::{InboundMessage, OpenResponse, WireFrame};

    /// Transport whose open never completes.
    struct Pending;

    #[async_trait]
    impl Transport for Pending {
        async fn open(&self, _url: &Url, _protocols: &[String]) -> Result<OpenResponse> {
            std::future::pending().await
        }

        async fn submit(&self, _id: &ConnectionId, _frame: &WireFrame) -> Result<()> {
            Ok(())
        }

        async fn poll(&self, _id: &ConnectionId) -> Result<Vec<InboundMessage>> {
            std::future::pending().await
        }
    }

    /// Transport whose close notification never completes.
    struct Stalled;

    #[async_trait]
    impl Transport for Stalled {
        async fn open(&self, _url: &Url, _protocols: &[String]) -> Result<OpenResponse> {
            std::future::pending().await
        }

        async fn submit(&self, _id: &ConnectionId, _frame: &WireFrame) -> Result<()> {
            std::future::pending().await
        }

        async fn poll(&self, _id: &ConnectionId) -> Result<Vec<InboundMessage>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_close_notification_times_out() {
        let id = ConnectionId::new("c1");
        let err = notify_close(&Stalled, &id, 1000, "", Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(matches!(err, Error::Timeout { timeout_ms: 20, .. }));
    }

    #[tokio::test]
    async fn test_close_notification_delivered() {
        let id = ConnectionId::new("c1");
        assert!(notify_close(&Pending, &id, 1000, "", Duration::from_millis(250)).await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_validates_arguments() {
        let transport: Arc<dyn Transport> = Arc::new(Pending);

        assert!(matches!(
            EmulatedSocket::connect("ftp://x/", &["chat"], Arc::clone(&transport)),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            EmulatedSocket::connect("ws://x/", &["a", "a"], transport),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_initial_surface() {
        let socket = EmulatedSocket::connect::<&str>("http://app.local/feed", &[], Arc::new(Pending))
            .expect("connect");

        assert_eq!(socket.url().as_str(), "ws://app.local/feed");
        assert_eq!(socket.ready_state(), ReadyState::Connecting);
        assert_eq!(socket.buffered_amount(), 0);
        assert_eq!(socket.protocol(), "");
        assert_eq!(socket.extensions(), "");
        assert_eq!(socket.binary_type(), BinaryType::Blob);
        assert!(socket.connection_id().is_none());

        socket.set_binary_type(BinaryType::from("arraybuffer"));
        assert_eq!(socket.binary_type(), BinaryType::ArrayBuffer);
        socket.set_binary_type(BinaryType::from("bogus"));
        assert_eq!(socket.binary_type(), BinaryType::Blob);
    }

    #[tokio::test]
    async fn test_send_while_connecting_rejected() {
        let socket = EmulatedSocket::connect::<&str>("ws://app.local/", &[], Arc::new(Pending))
            .expect("connect");

        let err = socket.send("early".into()).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        assert_eq!(socket.buffered_amount(), 0);
    }

    #[tokio::test]
    async fn test_close_rejects_bad_code() {
        let socket = EmulatedSocket::connect::<&str>("ws://app.local/", &[], Arc::new(Pending))
            .expect("connect");

        assert!(matches!(
            socket.close_with(1006, ""),
            Err(Error::InvalidArgument { .. })
        ));
        assert_eq!(socket.ready_state(), ReadyState::Connecting);
    }

    #[tokio::test]
    async fn test_close_while_connecting_fails_connection() {
        let socket = EmulatedSocket::connect::<&str>("ws://app.local/", &[], Arc::new(Pending))
            .expect("connect");

        socket.close().expect("close");
        assert_eq!(socket.ready_state(), ReadyState::Closed);
    }
}
