//! Native WebSocket socket.
//!
//! Carries the same capability surface as [`EmulatedSocket`](super::EmulatedSocket)
//! over a real duplex WebSocket connection. Lifecycle, event dispatch and
//! the ordered send queue are shared; only the carrier differs.
//!
//! # Event Loop
//!
//! One spawned task connects, then reads until the stream ends:
//!
//! - Text / Binary → `message` event
//! - Close frame → clean close with the remote code and reason
//! - Stream error or end without close frame → abnormal close (1006)

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::event::{EventType, Listener};
use crate::protocol::close::{self, ABNORMAL_CLOSURE, NO_STATUS_RECEIVED};
use crate::protocol::codec;
use crate::protocol::{BinaryType, MessageData, OutboundFrame, Payload};

use super::address::{parse_address, validate_protocols};
use super::lifecycle::{BeginClose, SocketCore};
use super::options::SocketOptions;
use super::queue::{self, FrameSink};
use super::{DuplexSocket, ReadyState};

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WsSink
// ============================================================================

/// Write half of the WebSocket, shared by the drain and close paths.
struct WsSink {
    write: AsyncMutex<SplitSink<WsStream, Message>>,
}

impl WsSink {
    async fn send(&self, message: Message) -> Result<()> {
        self.write
            .lock()
            .await
            .send(message)
            .await
            .map_err(|e| Error::send(e.to_string()))
    }

    async fn send_close(&self, code: u16, reason: &str) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: Utf8Bytes::from(reason.to_string()),
        };
        self.send(Message::Close(Some(frame))).await
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn submit(&self, frame: &OutboundFrame) -> Result<()> {
        let message = match frame.payload() {
            Payload::Text(text) => Message::Text(text.clone().into()),
            Payload::Binary(bytes) => Message::Binary(bytes.clone().into()),
        };
        self.send(message).await
    }
}

// ============================================================================
// NativeSocket
// ============================================================================

/// Duplex socket over a real WebSocket connection.
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct NativeSocket {
    core: Arc<SocketCore>,
    sink: Arc<OnceLock<Arc<WsSink>>>,
}

impl NativeSocket {
    /// Validates the address and protocols, then starts connecting.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a malformed address or
    /// sub-protocol list.
    pub fn connect<S: AsRef<str>>(address: &str, protocols: &[S]) -> Result<Self> {
        let url = parse_address(address)?;
        let protocols = validate_protocols(protocols)?;
        let core = SocketCore::new(url, protocols, SocketOptions::default());
        Ok(Self::start(core))
    }

    /// Spawns the connection task for a prepared core.
    pub(crate) fn start(core: Arc<SocketCore>) -> Self {
        debug!(socket = %core.id, url = %core.url, "Starting native socket");

        let sink = Arc::new(OnceLock::new());
        tokio::spawn(run_connection(Arc::clone(&core), Arc::clone(&sink)));
        Self { core, sink }
    }
}

/// Builds the handshake request, offering the requested sub-protocols.
fn handshake_request(url: &Url, protocols: &[String]) -> Result<Request> {
    let mut request = url.as_str().into_client_request()?;

    if !protocols.is_empty() {
        let value = HeaderValue::from_str(&protocols.join(", "))
            .map_err(|e| Error::invalid_argument(format!("sub-protocol header: {e}")))?;
        request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
    }

    Ok(request)
}

/// Connects, then reads until the stream ends.
async fn run_connection(core: Arc<SocketCore>, slot: Arc<OnceLock<Arc<WsSink>>>) {
    let connected = match handshake_request(&core.url, &core.requested_protocols) {
        Ok(request) => connect_async(request)
            .await
            .map_err(|e| Error::connection(e.to_string())),
        Err(e) => Err(e),
    };

    let (stream, response) = match connected {
        Ok(connected) => connected,
        Err(e) => {
            core.fail(&e);
            return;
        }
    };

    let protocol = response
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let (write, mut read) = stream.split();
    let sink = Arc::new(WsSink {
        write: AsyncMutex::new(write),
    });
    if slot.set(Arc::clone(&sink)).is_err() {
        debug!(socket = %core.id, "Sink already installed");
    }

    if !core.mark_open(protocol, None, Arc::clone(&sink) as Arc<dyn FrameSink>) {
        debug!(socket = %core.id, "Handshake completed after close");
        if let Err(e) = sink.send_close(close::NORMAL_CLOSURE, "").await {
            debug!(socket = %core.id, error = %e, "Close frame not sent");
        }
        return;
    }

    loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    core.deliver(MessageData::Text(text.to_string()));
                }

                Some(Ok(Message::Binary(data))) => {
                    core.deliver(codec::wrap_binary(data.to_vec(), core.binary_type()));
                }

                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((NO_STATUS_RECEIVED, String::new()));
                    debug!(socket = %core.id, code, %reason, "Remote close received");
                    core.finalize(code, &reason, true);
                    break;
                }

                // Ping, Pong and raw frames are handled by tungstenite
                Some(Ok(_)) => {}

                Some(Err(e)) => {
                    core.fail(&Error::from(e));
                    core.finalize(ABNORMAL_CLOSURE, "", false);
                    break;
                }

                None => {
                    core.fail(&Error::ConnectionClosed);
                    core.finalize(ABNORMAL_CLOSURE, "", false);
                    break;
                }
            },

            () = core.cancel.cancelled() => break,
        }
    }

    // Flushes a pending close reply, if any
    if let Err(e) = sink.write.lock().await.close().await {
        debug!(socket = %core.id, error = %e, "Sink close failed");
    }
    trace!(socket = %core.id, "Native event loop terminated");
}

// ============================================================================
// DuplexSocket
// ============================================================================

impl DuplexSocket for NativeSocket {
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

            BeginClose::Closing(_) => {
                let core = Arc::clone(&self.core);
                let sink = self.sink.get().cloned();
                let reason = reason.to_string();

                // The reader finalizes on the close reply; the timer covers
                // a peer that never answers.
                tokio::spawn(async move {
                    if let Some(sink) = sink
                        && let Err(e) = sink.send_close(code, &reason).await
                    {
                        debug!(socket = %core.id, error = %e, "Close frame not sent");
                    }

                    tokio::select! {
                        () = core.cancel.cancelled() => {}
                        () = sleep(core.options.close_timeout) => {
                            let limit = core.options.close_timeout.as_millis() as u64;
                            let e = Error::timeout("closing handshake", limit);
                            debug!(socket = %core.id, error = %e, "Closing handshake abandoned");
                            core.finalize(ABNORMAL_CLOSURE, "", false);
                        }
                    }
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

impl fmt::Debug for NativeSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeSocket")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
