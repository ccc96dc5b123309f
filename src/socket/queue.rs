//! Outbound send queue and drain activity.
//!
//! `send()` appends to the tail of the queue. One drain task per socket
//! takes frames from the head, hands each to the [`FrameSink`] and waits
//! for the acknowledgment before touching the next one, so the remote side
//! sees frames in exactly the order they were sent.
//!
//! The buffered amount counts every accepted frame until its
//! acknowledgment arrives, or until the frame is discarded because the
//! socket left OPEN.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::{OutboundFrame, Payload};

use super::ReadyState;
use super::lifecycle::SocketCore;

// ============================================================================
// FrameSink
// ============================================================================

/// Destination the drain activity submits frames to.
#[async_trait]
pub(crate) trait FrameSink: Send + Sync {
    /// Submits one frame and resolves once it is acknowledged.
    async fn submit(&self, frame: &OutboundFrame) -> Result<()>;
}

// ============================================================================
// SendQueue
// ============================================================================

/// Queue contents and byte accounting. Guarded by the socket state lock.
#[derive(Debug, Default)]
pub(crate) struct SendQueue {
    frames: VecDeque<OutboundFrame>,
    in_flight: Option<usize>,
    buffered: u64,
    draining: bool,
}

impl SendQueue {
    /// Appends a frame and counts its bytes.
    pub(crate) fn push(&mut self, frame: OutboundFrame) {
        self.buffered += frame.size() as u64;
        self.frames.push_back(frame);
    }

    /// Takes the head frame and marks it in flight.
    pub(crate) fn take_next(&mut self) -> Option<OutboundFrame> {
        let frame = self.frames.pop_front()?;
        self.in_flight = Some(frame.size());
        Some(frame)
    }

    /// Settles the in-flight frame, acknowledged or not.
    pub(crate) fn settle(&mut self) {
        if let Some(size) = self.in_flight.take() {
            self.buffered = self.buffered.saturating_sub(size as u64);
        }
    }

    /// Drops every queued frame that is not in flight.
    ///
    /// Returns the number of frames and bytes dropped.
    pub(crate) fn discard(&mut self) -> (usize, u64) {
        let count = self.frames.len();
        let bytes: u64 = self.frames.drain(..).map(|f| f.size() as u64).sum();
        self.buffered = self.buffered.saturating_sub(bytes);
        (count, bytes)
    }

    /// Returns the buffered byte count.
    #[inline]
    pub(crate) fn buffered(&self) -> u64 {
        self.buffered
    }

    /// Returns the number of frames waiting (excluding the one in flight).
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.frames.len()
    }
}

// ============================================================================
// Enqueue / Drain
// ============================================================================

/// Accepts a payload for ordered delivery.
///
/// Starts a drain task if none is running.
///
/// # Errors
///
/// Returns [`Error::InvalidState`] unless the socket is OPEN. Nothing is
/// queued in that case.
pub(crate) fn enqueue(core: &Arc<SocketCore>, payload: Payload) -> Result<()> {
    let frame = OutboundFrame::new(payload);
    let size = frame.size();

    let sink = core.with_state(|state| {
        if state.closed || state.ready_state != ReadyState::Open {
            return Err(Error::invalid_state(format!(
                "send() requires OPEN, socket is {}",
                state.ready_state
            )));
        }

        state.queue.push(frame);
        if state.queue.draining {
            return Ok(None);
        }

        let sink = state.sink.clone();
        state.queue.draining = sink.is_some();
        Ok(sink)
    })?;

    trace!(socket = %core.id, size, "Frame queued");

    if let Some(sink) = sink {
        tokio::spawn(drain(Arc::clone(core), sink));
    }
    Ok(())
}

/// Drain activity: submits queued frames one at a time, head first.
async fn drain(core: Arc<SocketCore>, sink: Arc<dyn FrameSink>) {
    trace!(socket = %core.id, "Drain started");

    loop {
        let next = core.with_state(|state| {
            if state.closed || state.ready_state != ReadyState::Open {
                state.queue.draining = false;
                return None;
            }

            let frame = state.queue.take_next();
            if frame.is_none() {
                state.queue.draining = false;
            }
            frame
        });

        let Some(frame) = next else {
            break;
        };

        let result = sink.submit(&frame).await;
        core.with_state(|state| state.queue.settle());

        if let Err(e) = result {
            debug!(socket = %core.id, error = %e, "Submission failed, drain stopped");
            core.fail(&e);
            core.with_state(|state| state.queue.draining = false);
            break;
        }

        trace!(socket = %core.id, size = frame.size(), "Frame acknowledged");
    }

    trace!(socket = %core.id, "Drain finished");
}

// ============================================================================
// Tests
// ============================================================================
