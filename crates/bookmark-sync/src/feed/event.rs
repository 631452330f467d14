//! FeedEvent — a typed change notification from the store of record.

use crate::types::BookmarkRecord;

/// One decoded change-feed notification.
///
/// `Created` and `Updated` carry the full post-mutation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Created(BookmarkRecord),
    Updated(BookmarkRecord),
    Deleted(String),
}

impl FeedEvent {
    /// The id this event is about.
    pub fn id(&self) -> &str {
        match self {
            Self::Created(record) | Self::Updated(record) => &record.id,
            Self::Deleted(id) => id,
        }
    }

    /// The record carried by the event, if any.
    pub fn record(&self) -> Option<&BookmarkRecord> {
        match self {
            Self::Created(record) | Self::Updated(record) => Some(record),
            Self::Deleted(_) => None,
        }
    }
}
