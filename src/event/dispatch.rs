//! Listener registry and event delivery.
//!
//! Each event type owns one ordered list of entries. Registered listeners
//! occupy the list in insertion order; the single handler slot, when set,
//! is a distinguished entry kept at the tail. Delivery walks the list once,
//! so listeners always run before the handler.
//!
//! A panicking callback is caught and logged; delivery continues with the
//! next entry.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{error, trace};

use super::{EventType, SocketEvent};

// ============================================================================
// Listener
// ============================================================================

/// Callback signature shared by listeners and handlers.
type Callback = dyn Fn(&SocketEvent) + Send + Sync;

/// An event callback.
///
/// Cheap to clone. Two `Listener`s are equal only if one is a clone of the
/// other, which gives registration its set semantics.
#[derive(Clone)]
pub struct Listener(Arc<Callback>);

impl Listener {
    /// Wraps a closure.
    #[inline]
    #[must_use]
    pub fn new(callback: impl Fn(&SocketEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    #[inline]
    fn call(&self, event: &SocketEvent) {
        (self.0)(event);
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

// ============================================================================
// Entry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Listener,
    Handler,
}

#[derive(Debug, Clone)]
struct Entry {
    slot: Slot,
    listener: Listener,
}

// ============================================================================
// EventDispatcher
// ============================================================================

/// Ordered multicast registry with one handler slot per event type.
#[derive(Default)]
pub struct EventDispatcher {
    registry: Mutex<FxHashMap<EventType, Vec<Entry>>>,
}

impl EventDispatcher {
    /// Creates an empty dispatcher.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    ///
    /// Returns `false` if the same listener was already registered for
    /// `event_type`; it is stored only once.
    pub fn add_listener(&self, event_type: EventType, listener: Listener) -> bool {
        let mut registry = self.registry.lock();
        let entries = registry.entry(event_type).or_default();

        let exists = entries
            .iter()
            .any(|e| e.slot == Slot::Listener && e.listener == listener);
        if exists {
            return false;
        }

        let handler_pos = entries
            .iter()
            .position(|e| e.slot == Slot::Handler)
            .unwrap_or(entries.len());
        entries.insert(
            handler_pos,
            Entry {
                slot: Slot::Listener,
                listener,
            },
        );
        true
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, event_type: EventType, listener: &Listener) -> bool {
        let mut registry = self.registry.lock();
        let Some(entries) = registry.get_mut(&event_type) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|e| !(e.slot == Slot::Listener && e.listener == *listener));
        entries.len() != before
    }

    /// Assigns the handler slot. Last write wins; `None` clears it.
    pub fn set_handler(&self, event_type: EventType, handler: Option<Listener>) {
        let mut registry = self.registry.lock();
        let entries = registry.entry(event_type).or_default();

        entries.retain(|e| e.slot != Slot::Handler);
        if let Some(listener) = handler {
            entries.push(Entry {
                slot: Slot::Handler,
                listener,
            });
        }
    }

    /// Returns the current handler for `event_type`.
    #[must_use]
    pub fn handler(&self, event_type: EventType) -> Option<Listener> {
        self.registry.lock().get(&event_type).and_then(|entries| {
            entries
                .iter()
                .find(|e| e.slot == Slot::Handler)
                .map(|e| e.listener.clone())
        })
    }

    /// Returns the number of registered listeners, excluding the handler.
    #[must_use]
    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.registry.lock().get(&event_type).map_or(0, |entries| {
            entries.iter().filter(|e| e.slot == Slot::Listener).count()
        })
    }

    /// Delivers `event` to every listener, then to the handler.
    ///
    /// The registry lock is released before any callback runs, so callbacks
    /// may register listeners or operate on the socket. Returns the number
    /// of callbacks that completed without panicking.
    pub fn dispatch(&self, event: &SocketEvent) -> usize {
        let event_type = event.event_type();
        let snapshot: Vec<Entry> = self
            .registry
            .lock()
            .get(&event_type)
            .cloned()
            .unwrap_or_default();

        trace!(event = %event_type, targets = snapshot.len(), "Dispatching event");

        let mut delivered = 0;
        for entry in snapshot {
            match catch_unwind(AssertUnwindSafe(|| entry.listener.call(event))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    error!(
                        event = %event_type,
                        slot = ?entry.slot,
                        panic = %panic_message(panic.as_ref()),
                        "Event callback panicked"
                    );
                }
            }
        }
        delivered
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("EventDispatcher")
            .field("types", &registry.len())
            .finish()
    }
}

/// Extracts a printable message from a panic payload.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
