//! Reconciler — merges optimistic local state with authoritative events.
//!
//! Every mutation of the collection goes through [`Reconciler::apply`] (or the
//! optimistic entry points used by the mutation gateway), one event at a
//! time. The rules are order-insensitive and duplicate-tolerant:
//!
//! | event                    | effect                                              |
//! |--------------------------|-----------------------------------------------------|
//! | `Created` / `Updated`    | upsert; clears pending; deferred if delete in flight |
//! | `Deleted`                | remove (idempotent); marks a delete ticket gone     |
//! | `CreateConfirmed`        | same as `Created`                                   |
//! | `CreateFailed`           | nothing (creates are never shown early)             |
//! | `DeleteConfirmed`        | drop the ticket                                     |
//! | `DeleteFailed`           | roll back per [`RollbackPolicy`]                    |

use std::collections::HashMap;

use crate::{
    error::{BookmarkError, Result},
    store::{RecordStore, Snapshot},
    types::{BookmarkRecord, RollbackPolicy, UpsertOutcome},
};

use super::types::SyncEvent;

// ============================================================================
// Result of applying an event
// ============================================================================

/// What applying one [`SyncEvent`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// An authoritative row was merged into the store.
    Upserted(UpsertOutcome),
    /// A row was removed.
    Removed,
    /// A delete for an id that was already gone.
    AlreadyAbsent,
    /// The row belongs to an in-flight optimistic delete; it was parked on
    /// the delete ticket instead of reappearing in the store.
    Deferred,
    /// An optimistic delete was confirmed by the store of record.
    Confirmed,
    /// An optimistic delete failed. `restored` is false when there was
    /// nothing to bring back (unknown id, or the feed reported it deleted
    /// while the call was in flight).
    RolledBack { restored: bool },
    /// Nothing to do.
    Ignored,
}

// ============================================================================
// Delete tickets
// ============================================================================

/// Rollback state for one in-flight delete.
#[derive(Debug)]
struct DeleteTicket {
    /// The record as it was when the delete started.
    prior: Option<BookmarkRecord>,
    was_pending: bool,
    /// Newest authoritative value seen on the feed during the window.
    latest: Option<BookmarkRecord>,
    /// The feed reported the row deleted during the window.
    gone_remotely: bool,
    /// Whole-collection state before the delete (full-snapshot policy only).
    snapshot: Option<Snapshot>,
}

// ============================================================================
// Reconciler
// ============================================================================

pub struct Reconciler {
    store: RecordStore,
    policy: RollbackPolicy,
    deletes: HashMap<String, DeleteTicket>,
}

impl Reconciler {
    pub fn new(store: RecordStore, policy: RollbackPolicy) -> Self {
        Self {
            store,
            policy,
            deletes: HashMap::new(),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn policy(&self) -> RollbackPolicy {
        self.policy
    }

    /// Ids whose optimistic delete has not been answered yet, sorted.
    pub fn deletes_in_flight(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.deletes.keys().cloned().collect();
        ids.sort();
        ids
    }

    // -----------------------------------------------------------------------
    // Event application
    // -----------------------------------------------------------------------

    pub fn apply(&mut self, event: SyncEvent) -> Reconciliation {
        match event {
            SyncEvent::Created(record)
            | SyncEvent::Updated(record)
            | SyncEvent::CreateConfirmed(record) => self.apply_authoritative(record),
            SyncEvent::Deleted(id) => self.apply_deleted(&id),
            SyncEvent::CreateFailed { error } => {
                tracing::debug!(error = %error, "create failed; store untouched");
                Reconciliation::Ignored
            }
            SyncEvent::DeleteConfirmed { id } => match self.deletes.remove(&id) {
                Some(_) => {
                    tracing::debug!(id = %id, "delete confirmed");
                    Reconciliation::Confirmed
                }
                None => Reconciliation::Ignored,
            },
            SyncEvent::DeleteFailed { id, error } => self.roll_back_delete(&id, &error.to_string()),
        }
    }

    /// Seed the store with an authoritative listing. Returns the number of
    /// rows that changed the store.
    pub fn load(&mut self, records: Vec<BookmarkRecord>) -> usize {
        records
            .into_iter()
            .map(|record| self.apply_authoritative(record))
            .filter(|r| matches!(r, Reconciliation::Upserted(o) if o.changed()))
            .count()
    }

    /// Show a record before the store of record has confirmed it.
    ///
    /// For hosts that assign ids client-side. The entry stays pending until
    /// an authoritative event for the same id arrives.
    pub fn apply_optimistic(&mut self, record: BookmarkRecord) -> UpsertOutcome {
        let id = record.id.clone();
        let outcome = self.store.upsert(record);
        self.store.mark_pending(&id);
        outcome
    }

    /// Optimistically remove `id` and open a delete ticket for it.
    ///
    /// Returns the removed record, if the store had it. Fails when a delete
    /// for the same id is already in flight.
    pub fn begin_delete(&mut self, id: &str) -> Result<Option<BookmarkRecord>> {
        if self.deletes.contains_key(id) {
            return Err(BookmarkError::DeleteInFlight(id.to_string()));
        }

        let snapshot = match self.policy {
            RollbackPolicy::FullSnapshot => Some(self.store.snapshot()),
            RollbackPolicy::Precise => None,
        };
        let was_pending = self.store.is_pending(id);
        let prior = self.store.remove(id);

        self.deletes.insert(
            id.to_string(),
            DeleteTicket {
                prior: prior.clone(),
                was_pending,
                latest: None,
                gone_remotely: false,
                snapshot,
            },
        );
        Ok(prior)
    }

    /// Drop all state: records, pending flags, and open delete tickets.
    pub fn reset(&mut self) {
        self.store.clear();
        self.deletes.clear();
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn apply_authoritative(&mut self, record: BookmarkRecord) -> Reconciliation {
        if let Some(ticket) = self.deletes.get_mut(&record.id) {
            tracing::debug!(id = %record.id, "row update parked on in-flight delete");
            ticket.latest = Some(record);
            ticket.gone_remotely = false;
            return Reconciliation::Deferred;
        }

        let id = record.id.clone();
        let outcome = self.store.upsert(record);
        if self.store.clear_pending(&id) {
            tracing::debug!(id = %id, ?outcome, "optimistic entry reconciled");
        }
        Reconciliation::Upserted(outcome)
    }

    fn apply_deleted(&mut self, id: &str) -> Reconciliation {
        if let Some(ticket) = self.deletes.get_mut(id) {
            ticket.gone_remotely = true;
            ticket.latest = None;
        }
        match self.store.remove(id) {
            Some(_) => Reconciliation::Removed,
            None => Reconciliation::AlreadyAbsent,
        }
    }

    fn roll_back_delete(&mut self, id: &str, error: &str) -> Reconciliation {
        let Some(ticket) = self.deletes.remove(id) else {
            return Reconciliation::Ignored;
        };

        match (self.policy, ticket.snapshot) {
            (RollbackPolicy::FullSnapshot, Some(snapshot)) => {
                tracing::warn!(id = %id, error = %error, "delete failed; restoring full snapshot");
                self.store.restore(&snapshot);
                // Rows with their own delete still in flight stay hidden.
                let in_flight: Vec<String> = self.deletes.keys().cloned().collect();
                for other in &in_flight {
                    self.store.remove(other);
                }
                if ticket.gone_remotely {
                    self.store.remove(id);
                    return Reconciliation::RolledBack { restored: false };
                }
                // A feed value seen during the window replaces the snapshot copy.
                match ticket.latest {
                    Some(latest) => {
                        self.store.upsert(latest);
                    }
                    None if ticket.was_pending => {
                        self.store.mark_pending(id);
                    }
                    None => {}
                }
                Reconciliation::RolledBack {
                    restored: self.store.contains(id),
                }
            }
            _ => {
                if ticket.gone_remotely {
                    tracing::warn!(id = %id, error = %error, "delete failed but row is gone remotely");
                    return Reconciliation::RolledBack { restored: false };
                }
                let from_feed = ticket.latest.is_some();
                let Some(record) = ticket.latest.or(ticket.prior) else {
                    return Reconciliation::RolledBack { restored: false };
                };
                tracing::warn!(id = %id, error = %error, "delete failed; restoring record");
                self.store.upsert(record);
                if ticket.was_pending && !from_feed {
                    self.store.mark_pending(id);
                }
                Reconciliation::RolledBack { restored: true }
            }
        }
    }
}
