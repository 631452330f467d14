use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookmark as known to the client.
///
/// Records are replaced whole, never patched field by field. The external
/// shape is `{id, ownerId, title, url, createdAt}`; the store-of-record column
/// names (`user_id`, `created_at`) are accepted on input as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    /// Server-assigned, stable, unique within the collection
    pub id: String,
    #[serde(alias = "owner_id", alias = "user_id")]
    pub owner_id: String,
    pub title: String,
    /// Absolute URL, always carries a scheme
    pub url: String,
    /// Default sort key. Not monotonic in arrival order.
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

/// Validated, normalized input for a remote create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
}

/// What an upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The id was not present before.
    Inserted,
    /// The id was present with a different value.
    Updated,
    /// The id was present with an identical value; nothing changed.
    Unchanged,
}

impl UpsertOutcome {
    /// Whether the store's contents changed.
    pub fn changed(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// How a failed optimistic delete is undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackPolicy {
    /// Re-insert only the deleted record. Concurrent feed changes to other
    /// records survive the rollback.
    #[default]
    Precise,
    /// Restore the whole collection as it was before the delete. Concurrent
    /// feed changes that landed during the failed window are undone.
    FullSnapshot,
}
