//! StoreEvent — describes a mutation that actually changed the record store.
//!
//! No-op upserts and removes of absent ids never produce an event.

use crate::types::UpsertOutcome;

/// A change notification emitted by `RecordStore` after a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A record was inserted, or replaced by a different value.
    Upserted { id: String, outcome: UpsertOutcome },
    /// A record was removed.
    Removed { id: String },
    /// The whole collection was replaced from a snapshot.
    Restored { ids: Vec<String> },
    /// The collection was emptied (session teardown or owner switch).
    Cleared,
}

impl StoreEvent {
    /// IDs of the records that were affected. Empty for `Cleared`.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Self::Upserted { id, .. } => vec![id.as_str()],
            Self::Removed { id } => vec![id.as_str()],
            Self::Restored { ids } => ids.iter().map(|s| s.as_str()).collect(),
            Self::Cleared => Vec::new(),
        }
    }
}
