//! MutationGateway — create/delete orchestration against the store of record.
//!
//! The gateway does the synchronous part of each mutation (validation, URL
//! normalization, the optimistic delete) immediately and hands back the
//! remote part as a [`RemoteCall`]: a `'static` future that performs the
//! call under a timeout and resolves to the [`SyncEvent`] the reconciler
//! must apply next. The caller decides where the future runs.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::{
    error::{RemoteError, Result, ValidationError},
    types::{BookmarkRecord, NewBookmark},
};

use super::reconciler::Reconciler;
use super::types::{BookmarkRemote, SyncEvent};

// ============================================================================
// URL normalization
// ============================================================================

static SCHEME_REGEX: OnceLock<regex::Regex> = OnceLock::new();

fn scheme_regex() -> &'static regex::Regex {
    SCHEME_REGEX
        .get_or_init(|| regex::Regex::new(r"(?i)^https?://").expect("scheme regex is valid"))
}

/// Trim `url` and prepend `https://` unless it already starts with an
/// `http://` or `https://` scheme (any case).
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if scheme_regex().is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Validate and normalize create input.
pub fn prepare_create(title: &str, url: &str) -> std::result::Result<NewBookmark, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if url.trim().is_empty() {
        return Err(ValidationError::EmptyUrl);
    }
    Ok(NewBookmark {
        title: title.to_string(),
        url: normalize_url(url),
    })
}

// ============================================================================
// MutationGateway
// ============================================================================

/// The remote half of a mutation, resolving to the event that settles it.
pub type RemoteCall = Pin<Box<dyn Future<Output = SyncEvent> + Send + 'static>>;

#[derive(Clone)]
pub struct MutationGateway {
    remote: Arc<dyn BookmarkRemote>,
    timeout: Duration,
}

impl MutationGateway {
    pub fn new(remote: Arc<dyn BookmarkRemote>, timeout: Duration) -> Self {
        Self { remote, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validate the input and build the remote create.
    ///
    /// Nothing is shown locally until the call resolves to
    /// `CreateConfirmed`; a rejected input produces no call at all.
    pub fn create(
        &self,
        title: &str,
        url: &str,
        owner_id: &str,
    ) -> std::result::Result<RemoteCall, ValidationError> {
        let bookmark = prepare_create(title, url)?;
        let remote = Arc::clone(&self.remote);
        let owner_id = owner_id.to_string();
        let timeout = self.timeout;

        Ok(Box::pin(async move {
            let call = remote.create(&bookmark, &owner_id);
            match bounded("create", timeout, call).await {
                Ok(record) => SyncEvent::CreateConfirmed(record),
                Err(error) => SyncEvent::CreateFailed { error },
            }
        }))
    }

    /// Remove `id` from the collection now and build the remote delete.
    ///
    /// The removal is visible as soon as this returns. The call resolves to
    /// `DeleteConfirmed` or `DeleteFailed`; applying the latter rolls back.
    pub fn delete(&self, reconciler: &mut Reconciler, id: &str) -> Result<RemoteCall> {
        reconciler.begin_delete(id)?;

        let remote = Arc::clone(&self.remote);
        let id = id.to_string();
        let timeout = self.timeout;

        Ok(Box::pin(async move {
            match bounded("delete", timeout, remote.delete(&id)).await {
                Ok(()) => SyncEvent::DeleteConfirmed { id },
                Err(error) => SyncEvent::DeleteFailed { id, error },
            }
        }))
    }

    /// Authoritative listing for `owner_id`, bounded by the call timeout.
    pub async fn list(&self, owner_id: &str) -> std::result::Result<Vec<BookmarkRecord>, RemoteError> {
        bounded("list", self.timeout, self.remote.list(owner_id)).await
    }
}

/// Run `call` under `timeout`; an elapsed timer becomes a `Timeout` error.
pub(crate) async fn bounded<T>(
    operation: &str,
    timeout: Duration,
    call: impl Future<Output = std::result::Result<T, RemoteError>>,
) -> std::result::Result<T, RemoteError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::timeout(operation, timeout)),
    }
}
