//! Sync-specific types: collaborator traits, the reconciler's event set, and
//! session configuration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    error::RemoteError,
    feed::FeedEvent,
    types::{BookmarkRecord, NewBookmark, RollbackPolicy},
};

// ============================================================================
// BookmarkRemote — store-of-record collaborator
// ============================================================================

/// Request/response access to the store of record.
///
/// Implementations are scoped by row-level ownership: a session only sees
/// and mutates its own rows.
#[async_trait]
pub trait BookmarkRemote: Send + Sync {
    /// Persist a new bookmark. Returns the authoritative row with its
    /// server-assigned id and timestamp.
    async fn create(
        &self,
        bookmark: &NewBookmark,
        owner_id: &str,
    ) -> Result<BookmarkRecord, RemoteError>;

    async fn delete(&self, id: &str) -> Result<(), RemoteError>;

    /// All rows for `owner_id`, newest first.
    async fn list(&self, owner_id: &str) -> Result<Vec<BookmarkRecord>, RemoteError>;
}

// ============================================================================
// ChangeFeed — push notification collaborator
// ============================================================================

/// Opaque handle identifying one feed subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub String);

/// A live subscription: its handle plus the stream of raw payloads.
///
/// Delivery is at-least-once and unordered, and includes notifications for
/// the client's own mutations.
#[derive(Debug)]
pub struct FeedSubscription {
    pub handle: SubscriptionHandle,
    pub events: mpsc::UnboundedReceiver<Value>,
}

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Subscribe to row changes filtered to `owner_id`.
    async fn subscribe(&self, owner_id: &str) -> Result<FeedSubscription, RemoteError>;

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), RemoteError>;
}

// ============================================================================
// SyncEvent — everything the reconciler reacts to
// ============================================================================

/// The closed set of events applied to the collection, one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Feed: a row was inserted.
    Created(BookmarkRecord),
    /// Feed: a row was replaced.
    Updated(BookmarkRecord),
    /// Feed: a row was deleted.
    Deleted(String),
    /// Remote create answered with the authoritative row.
    CreateConfirmed(BookmarkRecord),
    /// Remote create failed or timed out. Nothing was added locally.
    CreateFailed { error: RemoteError },
    /// Remote delete succeeded; the optimistic removal stands.
    DeleteConfirmed { id: String },
    /// Remote delete failed or timed out; the optimistic removal is undone.
    DeleteFailed { id: String, error: RemoteError },
}

impl From<FeedEvent> for SyncEvent {
    fn from(event: FeedEvent) -> Self {
        match event {
            FeedEvent::Created(record) => Self::Created(record),
            FeedEvent::Updated(record) => Self::Updated(record),
            FeedEvent::Deleted(id) => Self::Deleted(id),
        }
    }
}

// ============================================================================
// Session errors
// ============================================================================

/// Where a session-level error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    /// Initial `list` failed; the session started empty.
    Load,
    Create,
    Delete,
    /// A feed payload was dropped.
    Feed,
    /// Unsubscribing from the feed failed during teardown.
    Unsubscribe,
}

/// A session error, reported through `on_error` and never fatal.
#[derive(Debug, Clone)]
pub struct SessionErrorEvent {
    pub kind: SessionErrorKind,
    pub id: Option<String>,
    pub error: String,
}

/// Callback type for session error events.
pub type SessionErrorCallback = dyn Fn(&SessionErrorEvent) + Send + Sync;

// ============================================================================
// SessionOptions
// ============================================================================

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_COMMAND_BUFFER: usize = 64;

/// Configuration for `SyncSession::start`.
pub struct SessionOptions {
    pub remote: Arc<dyn BookmarkRemote>,
    pub feed: Arc<dyn ChangeFeed>,
    /// Active user; scopes the feed subscription and every create.
    pub owner_id: String,
    /// Bound on each remote call (`None` = 10s)
    pub call_timeout: Option<Duration>,
    /// How failed deletes are undone (`None` = precise)
    pub rollback: Option<RollbackPolicy>,
    /// Capacity of the command queue (`None` = 64, minimum 1)
    pub command_buffer: Option<usize>,
    /// Called for each session error
    pub on_error: Option<Arc<SessionErrorCallback>>,
}

impl SessionOptions {
    pub fn new(
        remote: Arc<dyn BookmarkRemote>,
        feed: Arc<dyn ChangeFeed>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            feed,
            owner_id: owner_id.into(),
            call_timeout: None,
            rollback: None,
            command_buffer: None,
            on_error: None,
        }
    }
}
