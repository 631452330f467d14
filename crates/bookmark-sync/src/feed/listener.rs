//! FeedListener — the owner-scoped entry point for change-feed payloads.
//!
//! Each payload is decoded, checked against the active owner and applied to
//! the reconciler. A payload that fails any step is dropped; the listener
//! itself never fails, so the next payload is processed as usual.

use serde_json::Value;

use crate::{
    error::FeedDecodeError,
    sync::reconciler::{Reconciler, Reconciliation},
};

use super::{decode::decode_change, event::FeedEvent};

/// What happened to one feed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    Applied(Reconciliation),
    /// The payload could not be decoded.
    Rejected(FeedDecodeError),
    /// The row belongs to another user and never reached the store.
    ForeignOwner { id: String, owner_id: String },
}

#[derive(Debug, Clone)]
pub struct FeedListener {
    owner_id: String,
}

impl FeedListener {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Decode `payload` and apply it.
    pub fn handle(&self, reconciler: &mut Reconciler, payload: &Value) -> FeedOutcome {
        match decode_change(payload) {
            Ok(event) => self.dispatch(reconciler, event),
            Err(error) => {
                tracing::warn!(owner_id = %self.owner_id, error = %error, "dropping undecodable feed event");
                FeedOutcome::Rejected(error)
            }
        }
    }

    /// Apply an already-typed event, enforcing the owner scope.
    pub fn dispatch(&self, reconciler: &mut Reconciler, event: FeedEvent) -> FeedOutcome {
        if let Some(record) = event.record() {
            if record.owner_id != self.owner_id {
                tracing::warn!(
                    owner_id = %self.owner_id,
                    id = %record.id,
                    row_owner = %record.owner_id,
                    "dropping feed event for another owner"
                );
                return FeedOutcome::ForeignOwner {
                    id: record.id.clone(),
                    owner_id: record.owner_id.clone(),
                };
            }
        }

        let id = event.id().to_string();
        let applied = reconciler.apply(event.into());
        tracing::debug!(id = %id, result = ?applied, "feed event applied");
        FeedOutcome::Applied(applied)
    }
}
