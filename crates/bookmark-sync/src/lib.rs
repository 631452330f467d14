//! Client-side synchronized bookmark collection.
//!
//! A local cache of one user's bookmarks kept consistent under optimistic
//! local mutations, the authoritative answers to those mutations, and an
//! unordered, at-least-once change feed.
//!
//! - [`store`] — id-keyed record store with a pending-set.
//! - [`reactive`] — change notification for store observers.
//! - [`feed`] — decoding and owner-scoping of change-feed payloads.
//! - [`sync`] — reconciliation, optimistic mutations, and the session actor.
//! - [`view`] — search/sort projection for display.

pub mod error;
pub mod types;

pub mod feed;
pub mod reactive;
pub mod store;
pub mod sync;
pub mod view;
