//! Reactive layer — synchronous change notification for the record store.
//!
//! - [`event`] — [`StoreEvent`] enum.
//! - [`event_emitter`] — typed pub/sub ([`EventEmitter<T>`]).

pub mod event;
pub mod event_emitter;

pub use event::StoreEvent;
pub use event_emitter::{EventEmitter, ListenerId};
