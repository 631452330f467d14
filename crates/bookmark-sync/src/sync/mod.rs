pub mod gateway;
pub mod reconciler;
pub mod session;
pub mod types;

pub use gateway::{normalize_url, prepare_create, MutationGateway, RemoteCall};
pub use reconciler::{Reconciler, Reconciliation};
pub use session::{SessionHandle, SyncSession};
pub use types::{
    BookmarkRemote, ChangeFeed, FeedSubscription, SessionErrorCallback, SessionErrorEvent,
    SessionErrorKind, SessionOptions, SubscriptionHandle, SyncEvent, DEFAULT_CALL_TIMEOUT,
    DEFAULT_COMMAND_BUFFER,
};
