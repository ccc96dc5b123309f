//! Connection lifecycle shared by emulated and native sockets.
//!
//! [`SocketCore`] owns the ready state, the negotiated sub-protocol, the
//! transport-assigned connection id, the send queue and the event
//! dispatcher. Every path to CLOSED goes through [`SocketCore::finalize`],
//! which is idempotent, so the `close` event fires exactly once.
//!
//! The state lock is never held across an `.await` nor while listeners run.
//! Event delivery is serialized per socket by a separate reentrant guard, so
//! listeners never run concurrently and nothing is delivered after `close`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::event::{CloseEvent, ErrorEvent, EventDispatcher, MessageEvent, SocketEvent};
use crate::identifiers::{ConnectionId, SocketId};
use crate::protocol::close::ABNORMAL_CLOSURE;
use crate::protocol::{BinaryType, MessageData};

use super::ReadyState;
use super::address::origin_of;
use super::options::SocketOptions;
use super::queue::{FrameSink, SendQueue};

// ============================================================================
// CoreState
// ============================================================================

/// Mutable socket state, guarded by one lock.
pub(crate) struct CoreState {
    pub(crate) ready_state: ReadyState,
    pub(crate) protocol: String,
    pub(crate) connection_id: Option<ConnectionId>,
    pub(crate) binary_type: BinaryType,
    /// One-shot; set by `finalize` and never cleared.
    pub(crate) closed: bool,
    /// Set when a fatal failure claimed the error/close sequence.
    pub(crate) terminating: bool,
    pub(crate) queue: SendQueue,
    pub(crate) sink: Option<Arc<dyn FrameSink>>,
}

impl CoreState {
    fn transition(&mut self, socket: SocketId, next: ReadyState) -> bool {
        if !self.ready_state.can_transition_to(next) {
            warn!(%socket, from = %self.ready_state, to = %next, "Illegal state transition ignored");
            return false;
        }
        debug!(%socket, from = %self.ready_state, to = %next, "State transition");
        self.ready_state = next;
        true
    }

    fn discard_queue(&mut self, socket: SocketId) {
        let (count, bytes) = self.queue.discard();
        if count > 0 {
            warn!(%socket, count, bytes, "Discarded queued frames on close");
        }
    }
}

// ============================================================================
// BeginClose
// ============================================================================

/// Outcome of a close request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BeginClose {
    /// Already closing or closed; nothing to do.
    Ignored,
    /// Still connecting; the connection must be failed.
    Connecting,
    /// Moved to CLOSING; notify the remote side, then finalize.
    Closing(Option<ConnectionId>),
}

// ============================================================================
// SocketCore
// ============================================================================

/// State and event plumbing of one socket handle.
pub(crate) struct SocketCore {
    pub(crate) id: SocketId,
    pub(crate) url: Url,
    pub(crate) origin: String,
    pub(crate) requested_protocols: Vec<String>,
    pub(crate) options: SocketOptions,
    pub(crate) dispatcher: EventDispatcher,
    /// Cancelled on finalize; loops observe it at iteration boundaries.
    pub(crate) cancel: CancellationToken,
    state: Mutex<CoreState>,
    /// Held across every transition that emits an event. Always taken before
    /// `state`; reentrant so listeners may call back into the socket.
    events: ReentrantMutex<()>,
}

impl SocketCore {
    /// Creates a core in CONNECTING.
    pub(crate) fn new(url: Url, requested_protocols: Vec<String>, options: SocketOptions) -> Arc<Self> {
        let origin = origin_of(&url);

        Arc::new(Self {
            id: SocketId::generate(),
            url,
            origin,
            requested_protocols,
            options,
            dispatcher: EventDispatcher::new(),
            cancel: CancellationToken::new(),
            state: Mutex::new(CoreState {
                ready_state: ReadyState::Connecting,
                protocol: String::new(),
                connection_id: None,
                binary_type: options.binary_type,
                closed: false,
                terminating: false,
                queue: SendQueue::default(),
                sink: None,
            }),
            events: ReentrantMutex::new(()),
        })
    }

    /// Runs `f` with the state lock held.
    #[inline]
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut CoreState) -> R) -> R {
        f(&mut self.state.lock())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub(crate) fn ready_state(&self) -> ReadyState {
        self.state.lock().ready_state
    }

    pub(crate) fn protocol(&self) -> String {
        self.state.lock().protocol.clone()
    }

    pub(crate) fn connection_id(&self) -> Option<ConnectionId> {
        self.state.lock().connection_id.clone()
    }

    pub(crate) fn buffered_amount(&self) -> u64 {
        self.state.lock().queue.buffered()
    }

    pub(crate) fn binary_type(&self) -> BinaryType {
        self.state.lock().binary_type
    }

    pub(crate) fn set_binary_type(&self, binary_type: BinaryType) {
        self.state.lock().binary_type = binary_type;
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Completes the open: CONNECTING → OPEN, then emits `open`.
    ///
    /// The connection id is stored only here, only once, and only while
    /// CONNECTING. Returns `false` if the socket was closed or failed while
    /// the open was in flight; nothing is stored in that case.
    pub(crate) fn mark_open(
        &self,
        protocol: String,
        connection_id: Option<ConnectionId>,
        sink: Arc<dyn FrameSink>,
    ) -> bool {
        let _events = self.events.lock();
        let opened = self.with_state(|state| {
            if state.closed || state.terminating || state.ready_state != ReadyState::Connecting {
                return false;
            }
            debug_assert!(state.connection_id.is_none(), "connection id assigned twice");

            state.connection_id = connection_id;
            state.protocol = protocol;
            state.sink = Some(sink);
            state.transition(self.id, ReadyState::Open)
        });

        if opened {
            info!(socket = %self.id, url = %self.url, protocol = %self.protocol(), "Socket open");
            self.dispatcher.dispatch(&SocketEvent::Open);
        }
        opened
    }

    /// Handles a close request.
    ///
    /// OPEN moves to CLOSING and drops frames not yet in flight.
    pub(crate) fn begin_close(&self) -> BeginClose {
        self.with_state(|state| {
            if state.closed || state.terminating {
                return BeginClose::Ignored;
            }

            match state.ready_state {
                ReadyState::Connecting => BeginClose::Connecting,
                ReadyState::Open => {
                    state.transition(self.id, ReadyState::Closing);
                    state.discard_queue(self.id);
                    BeginClose::Closing(state.connection_id.clone())
                }
                ReadyState::Closing | ReadyState::Closed => BeginClose::Ignored,
            }
        })
    }

    /// Routes a connection-fatal failure: `error` event, then abnormal close.
    ///
    /// Suppressed if the socket is already closing, closed, or failing.
    pub(crate) fn fail(&self, cause: &Error) {
        let _events = self.events.lock();
        let claimed = self.with_state(|state| {
            if state.closed || state.terminating || state.ready_state == ReadyState::Closing {
                return false;
            }
            state.terminating = true;
            true
        });

        if !claimed {
            debug!(socket = %self.id, error = %cause, "Failure suppressed, socket already closing");
            return;
        }

        error!(socket = %self.id, url = %self.url, error = %cause, "Socket failed");
        self.dispatcher.dispatch(&SocketEvent::Error(ErrorEvent {
            message: cause.to_string(),
        }));
        self.finalize(ABNORMAL_CLOSURE, "", false);
    }

    /// Moves to CLOSED and emits `close`. Idempotent.
    ///
    /// Returns `false` if the socket was already closed.
    pub(crate) fn finalize(&self, code: u16, reason: &str, was_clean: bool) -> bool {
        let _events = self.events.lock();
        let finalized = self.with_state(|state| {
            if state.closed {
                return false;
            }
            state.closed = true;

            if state.ready_state == ReadyState::Open {
                state.transition(self.id, ReadyState::Closing);
            }
            state.transition(self.id, ReadyState::Closed);
            state.discard_queue(self.id);
            state.sink = None;
            true
        });

        if !finalized {
            return false;
        }

        self.cancel.cancel();
        info!(socket = %self.id, code, reason, was_clean, "Socket closed");
        self.dispatcher.dispatch(&SocketEvent::Close(CloseEvent {
            code,
            reason: reason.to_string(),
            was_clean,
        }));
        true
    }

    /// Emits a `message` event tagged with this socket's origin.
    ///
    /// Returns `false` without dispatching once the socket is closed.
    pub(crate) fn deliver(&self, data: MessageData) -> bool {
        let _events = self.events.lock();
        if self.is_closed() {
            trace!(socket = %self.id, "Message after close dropped");
            return false;
        }

        self.dispatcher.dispatch(&SocketEvent::Message(MessageEvent {
            data,
            origin: self.origin.clone(),
        }));
        true
    }
}

impl fmt::Debug for SocketCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketCore")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("ready_state", &self.ready_state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::error::Result;
    use crate::event::{EventType, Listener};
    use crate::protocol::OutboundFrame;

    struct NullSink;

    #[async_trait]
    impl FrameSink for NullSink {
        async fn submit(&self, _frame: &OutboundFrame) -> Result<()> {
            Ok(())
        }
    }

    fn core() -> Arc<SocketCore> {
        let url = Url::parse("ws://app.local/feed").expect("url");
        SocketCore::new(url, Vec::new(), SocketOptions::default())
    }

    fn record(core: &SocketCore) -> Arc<Mutex<Vec<SocketEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for event_type in [EventType::Open, EventType::Error, EventType::Close] {
            let log = Arc::clone(&log);
            core.dispatcher.add_listener(
                event_type,
                Listener::new(move |e| log.lock().push(e.clone())),
            );
        }
        log
    }

    #[test]
    fn test_mark_open_once() {
        let core = core();
        let log = record(&core);

        assert!(core.mark_open("chat".into(), Some("c1".into()), Arc::new(NullSink)));
        assert_eq!(core.ready_state(), ReadyState::Open);
        assert_eq!(core.protocol(), "chat");
        assert_eq!(core.connection_id(), Some(ConnectionId::new("c1")));
        assert_eq!(*log.lock(), vec![SocketEvent::Open]);
    }

    #[test]
    fn test_mark_open_after_close_is_rejected() {
        let core = core();
        core.finalize(ABNORMAL_CLOSURE, "", false);

        assert!(!core.mark_open(String::new(), Some("c1".into()), Arc::new(NullSink)));
        assert_eq!(core.connection_id(), None);
        assert_eq!(core.ready_state(), ReadyState::Closed);
    }

    #[test]
    fn test_finalize_idempotent() {
        let core = core();
        let log = record(&core);
        core.mark_open(String::new(), None, Arc::new(NullSink));

        assert!(core.finalize(1000, "bye", true));
        assert!(!core.finalize(1000, "bye", true));
        assert!(!core.finalize(ABNORMAL_CLOSURE, "", false));

        let closes = log.lock().iter().filter(|e| e.as_close().is_some()).count();
        assert_eq!(closes, 1);
        assert!(core.cancel.is_cancelled());
    }

    #[test]
    fn test_fail_emits_error_then_close() {
        let core = core();
        let log = record(&core);

        core.fail(&Error::connection("refused"));

        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert!(matches!(log[0], SocketEvent::Error(_)));
        let close = log[1].as_close().expect("close");
        assert_eq!(close.code, ABNORMAL_CLOSURE);
        assert!(!close.was_clean);
        assert_eq!(core.ready_state(), ReadyState::Closed);
    }

    #[test]
    fn test_fail_suppressed_while_closing() {
        let core = core();
        core.mark_open(String::new(), None, Arc::new(NullSink));
        let log = record(&core);

        assert_eq!(core.begin_close(), BeginClose::Closing(None));
        core.fail(&Error::poll("gone"));

        assert!(log.lock().is_empty());
        assert_eq!(core.ready_state(), ReadyState::Closing);
    }

    #[test]
    fn test_begin_close_twice() {
        let core = core();
        core.mark_open(String::new(), Some("c1".into()), Arc::new(NullSink));

        assert_eq!(
            core.begin_close(),
            BeginClose::Closing(Some(ConnectionId::new("c1")))
        );
        assert_eq!(core.begin_close(), BeginClose::Ignored);
    }

    #[test]
    fn test_begin_close_connecting() {
        let core = core();
        assert_eq!(core.begin_close(), BeginClose::Connecting);
        assert_eq!(core.ready_state(), ReadyState::Connecting);
    }

    #[test]
    fn test_deliver_after_close_dropped() {
        let core = core();
        core.mark_open(String::new(), None, Arc::new(NullSink));
        core.finalize(1000, "", true);

        assert!(!core.deliver(MessageData::Text("late".into())));
    }

    #[test]
    fn test_listener_may_close_from_inside_dispatch() {
        let core = core();
        let log = record(&core);
        let inner = Arc::clone(&core);
        core.dispatcher.add_listener(
            EventType::Open,
            Listener::new(move |_| {
                inner.finalize(1000, "", true);
            }),
        );

        core.mark_open(String::new(), None, Arc::new(NullSink));

        assert_eq!(core.ready_state(), ReadyState::Closed);
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn test_concurrent_delivery_never_follows_close() {
        use std::sync::atomic::{AtomicBool, Ordering};

        for _ in 0..50 {
            let core = core();
            core.mark_open(String::new(), None, Arc::new(NullSink));

            let log = Arc::new(Mutex::new(Vec::new()));
            let busy = Arc::new(AtomicBool::new(false));
            let overlapped = Arc::new(AtomicBool::new(false));
            for event_type in [EventType::Message, EventType::Error, EventType::Close] {
                let log = Arc::clone(&log);
                let busy = Arc::clone(&busy);
                let overlapped = Arc::clone(&overlapped);
                core.dispatcher.add_listener(
                    event_type,
                    Listener::new(move |e| {
                        if busy.swap(true, Ordering::SeqCst) {
                            overlapped.store(true, Ordering::SeqCst);
                        }
                        log.lock().push(e.event_type());
                        std::thread::yield_now();
                        busy.store(false, Ordering::SeqCst);
                    }),
                );
            }

            let receiver = {
                let core = Arc::clone(&core);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        core.deliver(MessageData::Text(i.to_string()));
                    }
                })
            };
            core.fail(&Error::send("rejected"));
            receiver.join().expect("receiver thread");

            assert!(!overlapped.load(Ordering::SeqCst), "listeners overlapped");
            let log = log.lock();
            assert_eq!(log.last(), Some(&EventType::Close));
            assert_eq!(log.iter().filter(|t| **t == EventType::Close).count(), 1);
        }
    }

    #[test]
    fn test_finalize_from_open_passes_closing() {
        let core = core();
        core.mark_open(String::new(), None, Arc::new(NullSink));
        core.finalize(1000, "", true);
        assert_eq!(core.ready_state(), ReadyState::Closed);
    }
}
