//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, Semaphore, mpsc};
use url::Url;

use polling_socket::protocol::{InboundMessage, OpenResponse, WireFrame};
use polling_socket::{
    ConnectionId, Connector, DuplexSocket, Error, EventType, Listener, Result, Socket,
    SocketEvent, SocketOptions, Transport,
};

// ============================================================================
// Tracing
// ============================================================================

/// Installs a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// ScriptedTransport
// ============================================================================

/// In-memory [`Transport`] driven by the test.
///
/// - `open` waits for [`Self::release_open`] unless created ready, then
///   returns the scripted result once.
/// - `submit` records the frame, then waits for an ack permit when gated.
/// - `poll` returns whatever batch the test pushes next.
pub struct ScriptedTransport {
    open_result: Mutex<Option<Result<OpenResponse>>>,
    open_gate: Semaphore,
    opened_with: Mutex<Vec<(Url, Vec<String>)>>,

    submitted: Mutex<Vec<(ConnectionId, WireFrame)>>,
    ack_gate: Option<Semaphore>,
    submit_error: Mutex<Option<Error>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,

    inbound_tx: mpsc::UnboundedSender<Result<Vec<InboundMessage>>>,
    inbound_rx: AsyncMutex<mpsc::UnboundedReceiver<Result<Vec<InboundMessage>>>>,

    closes: Mutex<Vec<(ConnectionId, u16, String)>>,
}

impl ScriptedTransport {
    fn with(open_result: Result<OpenResponse>, open_ready: bool, gated_acks: bool) -> Arc<Self> {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            open_result: Mutex::new(Some(open_result)),
            open_gate: Semaphore::new(usize::from(open_ready)),
            opened_with: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            ack_gate: gated_acks.then(|| Semaphore::new(0)),
            submit_error: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            inbound_tx,
            inbound_rx: AsyncMutex::new(inbound_rx),
            closes: Mutex::new(Vec::new()),
        })
    }

    /// Opens immediately as `connection_id` with no sub-protocol; acks immediately.
    pub fn opening(connection_id: &str) -> Arc<Self> {
        Self::with(Ok(OpenResponse::new(connection_id, "")), true, false)
    }

    /// Opens immediately with a negotiated sub-protocol.
    pub fn opening_with_protocol(connection_id: &str, protocol: &str) -> Arc<Self> {
        Self::with(Ok(OpenResponse::new(connection_id, protocol)), true, false)
    }

    /// Opens immediately; each submission waits for [`Self::ack`].
    pub fn gated(connection_id: &str) -> Arc<Self> {
        Self::with(Ok(OpenResponse::new(connection_id, "")), true, true)
    }

    /// Open waits for [`Self::release_open`].
    pub fn delayed(connection_id: &str) -> Arc<Self> {
        Self::with(Ok(OpenResponse::new(connection_id, "")), false, false)
    }

    /// Open fails with the given error.
    pub fn failing(error: Error) -> Arc<Self> {
        Self::with(Err(error), true, false)
    }

    /// Lets a delayed open complete.
    pub fn release_open(&self) {
        self.open_gate.add_permits(1);
    }

    /// Acknowledges `n` pending or future submissions.
    pub fn ack(&self, n: usize) {
        if let Some(gate) = &self.ack_gate {
            gate.add_permits(n);
        }
    }

    /// Makes the next submission fail.
    pub fn fail_next_submit(&self, error: Error) {
        *self.submit_error.lock() = Some(error);
    }

    /// Queues one poll result.
    pub fn push_inbound(&self, messages: Vec<InboundMessage>) {
        let _ = self.inbound_tx.send(Ok(messages));
    }

    /// Makes the next poll fail.
    pub fn push_poll_error(&self, error: Error) {
        let _ = self.inbound_tx.send(Err(error));
    }

    pub fn submitted(&self) -> Vec<WireFrame> {
        self.submitted.lock().iter().map(|(_, f)| f.clone()).collect()
    }

    pub fn submitted_ids(&self) -> Vec<ConnectionId> {
        self.submitted.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn opened_with(&self) -> Vec<(Url, Vec<String>)> {
        self.opened_with.lock().clone()
    }

    pub fn closes(&self) -> Vec<(ConnectionId, u16, String)> {
        self.closes.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, url: &Url, protocols: &[String]) -> Result<OpenResponse> {
        self.opened_with.lock().push((url.clone(), protocols.to_vec()));

        let permit = self
            .open_gate
            .acquire()
            .await
            .map_err(|e| Error::connection(e.to_string()))?;
        permit.forget();

        self.open_result
            .lock()
            .take()
            .unwrap_or_else(|| Err(Error::connection("open already consumed")))
    }

    async fn submit(&self, connection_id: &ConnectionId, frame: &WireFrame) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.submitted.lock().push((connection_id.clone(), frame.clone()));

        if let Some(gate) = &self.ack_gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.submit_error.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn poll(&self, _connection_id: &ConnectionId) -> Result<Vec<InboundMessage>> {
        let mut rx = self.inbound_rx.lock().await;
        match rx.recv().await {
            Some(batch) => batch,
            None => std::future::pending().await,
        }
    }

    async fn close(&self, connection_id: &ConnectionId, code: u16, reason: &str) -> Result<()> {
        self.closes
            .lock()
            .push((connection_id.clone(), code, reason.to_string()));
        Ok(())
    }
}

// ============================================================================
// Event log
// ============================================================================

/// Every event a socket emitted, in order.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<SocketEvent>>>);

impl EventLog {
    pub fn listener(&self) -> Listener {
        let log = Arc::clone(&self.0);
        Listener::new(move |event| log.lock().push(event.clone()))
    }

    pub fn events(&self) -> Vec<SocketEvent> {
        self.0.lock().clone()
    }

    pub fn types(&self) -> Vec<EventType> {
        self.0.lock().iter().map(SocketEvent::event_type).collect()
    }

    pub fn count(&self, event_type: EventType) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub const ORIGIN: &str = "http://app.local:8080";
pub const TARGET: &str = "ws://app.local:8080/feed";

/// Fast-polling options for tests.
pub fn test_options() -> SocketOptions {
    SocketOptions::new()
        .with_poll_idle_interval(Duration::from_millis(5))
        .with_close_timeout(Duration::from_millis(500))
}

/// Connects an emulated socket with every event recorded from the start.
pub fn connect(transport: &Arc<ScriptedTransport>, protocols: &[&str]) -> (Socket, EventLog) {
    let connector = Connector::builder()
        .origin(ORIGIN)
        .transport(Arc::clone(transport) as Arc<dyn Transport>)
        .options(test_options())
        .native(false)
        .build()
        .expect("connector");

    let log = EventLog::default();
    let mut builder = connector.socket(TARGET).protocols(protocols.iter().copied());
    for event_type in [EventType::Open, EventType::Message, EventType::Error, EventType::Close] {
        builder = builder.listener(event_type, log.listener());
    }
    (builder.connect().expect("socket"), log)
}

/// Waits until `condition` holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "condition not reached within 2s");
}

/// Lets spawned tasks make progress without waiting on any condition.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

/// Waits for the socket to open.
pub async fn opened(socket: &Socket) {
    wait_until(|| socket.ready_state() == polling_socket::ReadyState::Open).await;
}

/// Drives `future` to completion with a two-second ceiling.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("timed out")
}
