//! RecordStore — id-keyed bookmark cache with a pending-set and change
//! notification.
//!
//! The store knows nothing about the network. It is owned by exactly one
//! task (the session actor), so it carries no lock of its own; only the
//! shared [`EventEmitter`] is synchronized.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::{
    reactive::{EventEmitter, ListenerId, StoreEvent},
    types::{BookmarkRecord, UpsertOutcome},
};

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable, insertion-ordered view of the store's records.
///
/// Cloning is a reference-count bump.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    records: Arc<[BookmarkRecord]>,
}

impl Snapshot {
    pub fn records(&self) -> &[BookmarkRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&BookmarkRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BookmarkRecord> {
        self.records.iter()
    }
}

impl From<Vec<BookmarkRecord>> for Snapshot {
    fn from(records: Vec<BookmarkRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a BookmarkRecord;
    type IntoIter = std::slice::Iter<'a, BookmarkRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// RecordStore
// ============================================================================

struct Entry {
    /// Position in insertion order; kept across replacements.
    seq: u64,
    record: BookmarkRecord,
}

pub struct RecordStore {
    entries: HashMap<String, Entry>,
    order: BTreeMap<u64, String>,
    pending: HashSet<String>,
    next_seq: u64,
    emitter: Arc<EventEmitter<StoreEvent>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::with_emitter(Arc::new(EventEmitter::new()))
    }

    /// Build a store that notifies through an emitter shared with other
    /// owners (e.g. a session handle that lets callers register observers).
    pub fn with_emitter(emitter: Arc<EventEmitter<StoreEvent>>) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            pending: HashSet::new(),
            next_seq: 0,
            emitter,
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Insert or replace by id. Full value equality decides `Unchanged`, in
    /// which case observers are not notified.
    pub fn upsert(&mut self, record: BookmarkRecord) -> UpsertOutcome {
        let outcome = match self.entries.get_mut(&record.id) {
            Some(entry) if entry.record == record => UpsertOutcome::Unchanged,
            Some(entry) => {
                entry.record = record.clone();
                UpsertOutcome::Updated
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.order.insert(seq, record.id.clone());
                self.entries.insert(
                    record.id.clone(),
                    Entry {
                        seq,
                        record: record.clone(),
                    },
                );
                UpsertOutcome::Inserted
            }
        };

        if outcome.changed() {
            self.emitter.emit(&StoreEvent::Upserted {
                id: record.id,
                outcome,
            });
        }
        outcome
    }

    /// Remove `id` if present. Idempotent; removing an absent id is a silent
    /// no-op. Also drops the pending flag so the pending-set never refers to
    /// a missing record.
    pub fn remove(&mut self, id: &str) -> Option<BookmarkRecord> {
        let entry = self.entries.remove(id)?;
        self.order.remove(&entry.seq);
        self.pending.remove(id);
        self.emitter.emit(&StoreEvent::Removed { id: id.to_string() });
        Some(entry.record)
    }

    /// Flag `id` as optimistic. Returns `false` (and does nothing) when the id
    /// is not in the store.
    pub fn mark_pending(&mut self, id: &str) -> bool {
        if !self.entries.contains_key(id) {
            return false;
        }
        self.pending.insert(id.to_string());
        true
    }

    /// Clear the optimistic flag. Returns whether it was set.
    pub fn clear_pending(&mut self, id: &str) -> bool {
        self.pending.remove(id)
    }

    /// Replace the whole contents with `snapshot`, in snapshot order.
    ///
    /// Pending flags survive only for ids the snapshot still contains.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.entries.clear();
        self.order.clear();
        for record in snapshot {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.order.insert(seq, record.id.clone());
            self.entries.insert(
                record.id.clone(),
                Entry {
                    seq,
                    record: record.clone(),
                },
            );
        }
        let entries = &self.entries;
        self.pending.retain(|id| entries.contains_key(id));

        self.emitter.emit(&StoreEvent::Restored {
            ids: snapshot.ids().into_iter().map(str::to_string).collect(),
        });
    }

    /// Drop every record and pending flag.
    pub fn clear(&mut self) {
        let was_empty = self.entries.is_empty();
        self.entries.clear();
        self.order.clear();
        self.pending.clear();
        if !was_empty {
            self.emitter.emit(&StoreEvent::Cleared);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> Snapshot {
        let records: Vec<BookmarkRecord> = self
            .order
            .values()
            .filter_map(|id| self.entries.get(id))
            .map(|entry| entry.record.clone())
            .collect();
        Snapshot::from(records)
    }

    pub fn get(&self, id: &str) -> Option<&BookmarkRecord> {
        self.entries.get(id).map(|entry| &entry.record)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }

    /// Pending ids, sorted for stable output.
    pub fn pending_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.pending.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    pub fn on_change(&self, callback: impl Fn(&StoreEvent) + Send + Sync + 'static) -> ListenerId {
        self.emitter.on(callback)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.emitter.off(id)
    }

    pub fn emitter(&self) -> &Arc<EventEmitter<StoreEvent>> {
        &self.emitter
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}
