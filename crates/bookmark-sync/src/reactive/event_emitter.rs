//! EventEmitter<T> — typed synchronous pub/sub for store observers.
//!
//! Emission works on a snapshot of the listener list:
//!   - a listener removed during emission still runs in that round;
//!   - a listener added during emission first runs on the next emit.
//!
//! The listener lock is a `parking_lot::Mutex` that is released before any
//! callback runs, so callbacks may register or remove listeners. A panicking
//! listener is caught and logged; the remaining listeners still run and the
//! emitter stays usable.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Handle returned by [`EventEmitter::on`], accepted by [`EventEmitter::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Closure type for event listeners.
pub type ListenerFn<T> = dyn Fn(&T) + Send + Sync;

struct Listener<T> {
    id: ListenerId,
    callback: Arc<ListenerFn<T>>,
}

/// Typed synchronous event emitter. All methods take `&self`.
pub struct EventEmitter<T> {
    listeners: Mutex<Vec<Listener<T>>>,
    next_id: AtomicU64,
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback`; it is called with every subsequently emitted event.
    pub fn on(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push(Listener {
            id,
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Deliver `event` to every listener registered at the time of the call.
    ///
    /// Returns the number of listeners that completed without panicking.
    pub fn emit(&self, event: &T) -> usize {
        let snapshot: Vec<Arc<ListenerFn<T>>> = self
            .listeners
            .lock()
            .iter()
            .map(|l| Arc::clone(&l.callback))
            .collect();

        let mut delivered = 0;
        for callback in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::error!("store listener panicked; continuing with the rest"),
            }
        }
        delivered
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}
