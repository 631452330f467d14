use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Create input rejected before any store or remote effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Validation failed: title must not be empty")]
    EmptyTitle,

    #[error("Validation failed: url must not be empty")]
    EmptyUrl,
}

// ---------------------------------------------------------------------------
// RemoteError
// ---------------------------------------------------------------------------

/// Classification of remote call failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Retriable (network, temporary failures)
    Transient,
    /// Not retriable (constraint violation, bad request, etc.)
    Permanent,
    /// Session rejected by the store of record
    Auth,
    /// The per-call timeout elapsed before the collaborator answered
    Timeout,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::Auth => "auth",
            Self::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// A create/delete/list/subscribe call against an external collaborator failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Remote error ({kind}): {message}")]
pub struct RemoteError {
    pub message: String,
    pub kind: RemoteErrorKind,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: RemoteErrorKind::Transient,
        }
    }

    pub fn with_kind(message: impl Into<String>, kind: RemoteErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn timeout(operation: &str, after: std::time::Duration) -> Self {
        Self {
            message: format!("{operation} timed out after {}ms", after.as_millis()),
            kind: RemoteErrorKind::Timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// FeedDecodeError
// ---------------------------------------------------------------------------

/// A change-feed payload could not be turned into a typed event.
///
/// Always recoverable: the offending payload is dropped and the listener
/// moves on to the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedDecodeError {
    #[error("Malformed feed payload: {0}")]
    Malformed(String),

    #[error("Unknown feed event type \"{0}\"")]
    UnknownEventType(String),

    #[error("Feed event {event_type} is missing its \"{field}\" payload")]
    MissingPayload { event_type: String, field: String },

    #[error("Invalid bookmark record in feed payload: {0}")]
    InvalidRecord(String),
}

// ---------------------------------------------------------------------------
// BookmarkError — top-level rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum BookmarkError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    FeedDecode(#[from] FeedDecodeError),

    #[error("A delete for bookmark \"{0}\" is already in flight")]
    DeleteInFlight(String),

    #[error("Session is closed")]
    SessionClosed,
}

/// Convenience alias; the default error type is `BookmarkError`.
pub type Result<T, E = BookmarkError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
