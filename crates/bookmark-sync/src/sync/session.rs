//! SyncSession — the per-login context that owns the collection.
//!
//! `SyncSession::start` subscribes to the owner's change feed, loads the
//! initial listing and spawns an actor task that owns the [`Reconciler`].
//! User commands, remote-call completions and feed payloads all funnel into
//! that one task and are processed one at a time, so no two store mutations
//! ever overlap. Remote calls themselves run on their own tasks and post a
//! completion back when they settle.
//!
//! Teardown (logout, owner switch) unsubscribes, clears the store and bumps
//! a generation counter; completions from an older generation are answered
//! but never applied. Feed subscribe and unsubscribe calls are bounded by
//! the same per-call timeout as mutations.

use std::ops::ControlFlow;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::{
    error::{BookmarkError, RemoteError, Result},
    feed::{FeedListener, FeedOutcome},
    reactive::{EventEmitter, ListenerId, StoreEvent},
    store::{RecordStore, Snapshot},
    types::{BookmarkRecord, UpsertOutcome},
    view::project,
};

use super::gateway::{bounded, MutationGateway, RemoteCall};
use super::reconciler::Reconciler;
use super::types::*;

/// Feed payloads handled back to back before a waiting command gets a turn.
const FEED_BURST: usize = 32;

// ============================================================================
// Messages
// ============================================================================

enum Command {
    Create {
        title: String,
        url: String,
        reply: oneshot::Sender<Result<BookmarkRecord>>,
    },
    Delete {
        id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    InsertOptimistic {
        record: BookmarkRecord,
        reply: oneshot::Sender<UpsertOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    Pending {
        reply: oneshot::Sender<Vec<String>>,
    },
    OwnerId {
        reply: oneshot::Sender<String>,
    },
    SwitchOwner {
        owner_id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Logout {
        reply: oneshot::Sender<()>,
    },
}

enum Reply {
    Create(oneshot::Sender<Result<BookmarkRecord>>),
    Delete(oneshot::Sender<Result<()>>),
}

struct Completion {
    generation: u64,
    event: SyncEvent,
    reply: Reply,
}

struct ActiveSubscription {
    handle: SubscriptionHandle,
    events: mpsc::UnboundedReceiver<Value>,
    closed: bool,
}

// ============================================================================
// SyncSession
// ============================================================================

pub struct SyncSession;

impl SyncSession {
    /// Log in: subscribe, load, and start the actor.
    ///
    /// Fails only when the feed subscription cannot be established. A failed
    /// initial load is reported through `on_error` and the session starts
    /// with an empty collection that the feed keeps filling.
    pub async fn start(options: SessionOptions) -> Result<SessionHandle> {
        let emitter = Arc::new(EventEmitter::new());
        let buffer = options
            .command_buffer
            .unwrap_or(DEFAULT_COMMAND_BUFFER)
            .max(1);

        let mut actor = SessionActor::new(options, Arc::clone(&emitter));
        actor.connect().await?;

        let (commands, rx) = mpsc::channel(buffer);
        tokio::spawn(actor.run(rx));

        Ok(SessionHandle { commands, emitter })
    }
}

// ============================================================================
// SessionHandle
// ============================================================================

/// Cheap, clonable access to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    emitter: Arc<EventEmitter<StoreEvent>>,
}

impl SessionHandle {
    /// Validate, normalize and persist a new bookmark. Resolves once the
    /// store of record has answered; the row is in the store by then.
    pub async fn create(&self, title: &str, url: &str) -> Result<BookmarkRecord> {
        let (title, url) = (title.to_string(), url.to_string());
        self.request(|reply| Command::Create { title, url, reply })
            .await?
    }

    /// Delete a bookmark. The row disappears immediately; if the store of
    /// record refuses, it is restored and the error returned.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.request(|reply| Command::Delete { id, reply }).await?
    }

    /// Show `record` right away as a pending entry until the feed confirms it.
    pub async fn insert_optimistic(&self, record: BookmarkRecord) -> Result<UpsertOutcome> {
        self.request(|reply| Command::InsertOptimistic { record, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Records to display for `search`, newest first.
    pub async fn view(&self, search: &str) -> Result<Vec<BookmarkRecord>> {
        let snapshot = self.snapshot().await?;
        Ok(project(snapshot.records(), search).to_vec())
    }

    pub async fn pending(&self) -> Result<Vec<String>> {
        self.request(|reply| Command::Pending { reply }).await
    }

    pub async fn owner_id(&self) -> Result<String> {
        self.request(|reply| Command::OwnerId { reply }).await
    }

    /// Clear the collection and resubscribe for another user.
    pub async fn switch_owner(&self, owner_id: &str) -> Result<()> {
        let owner_id = owner_id.to_string();
        self.request(|reply| Command::SwitchOwner { owner_id, reply })
            .await?
    }

    /// Unsubscribe, clear the collection and stop the session. Later calls
    /// fail with `SessionClosed`.
    pub async fn logout(&self) -> Result<()> {
        self.request(|reply| Command::Logout { reply }).await
    }

    /// Observe store changes. Listeners run on the session task.
    pub fn on_change(&self, callback: impl Fn(&StoreEvent) + Send + Sync + 'static) -> ListenerId {
        self.emitter.on(callback)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.emitter.off(id)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| BookmarkError::SessionClosed)?;
        rx.await.map_err(|_| BookmarkError::SessionClosed)
    }
}

// ============================================================================
// SessionActor
// ============================================================================

struct SessionActor {
    reconciler: Reconciler,
    gateway: MutationGateway,
    feed: Arc<dyn ChangeFeed>,
    listener: FeedListener,
    subscription: Option<ActiveSubscription>,
    generation: u64,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    on_error: Option<Arc<SessionErrorCallback>>,
}

impl SessionActor {
    fn new(options: SessionOptions, emitter: Arc<EventEmitter<StoreEvent>>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let timeout = options.call_timeout.unwrap_or(DEFAULT_CALL_TIMEOUT);

        Self {
            reconciler: Reconciler::new(
                RecordStore::with_emitter(emitter),
                options.rollback.unwrap_or_default(),
            ),
            gateway: MutationGateway::new(options.remote, timeout),
            feed: options.feed,
            listener: FeedListener::new(options.owner_id),
            subscription: None,
            generation: 0,
            completions_tx,
            completions_rx,
            on_error: options.on_error,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        // Consecutive feed payloads handled since the last command turn.
        let mut feed_streak = 0usize;

        loop {
            let feed_open = self.subscription.as_ref().is_some_and(|s| !s.closed);

            tokio::select! {
                biased;

                Some(done) = self.completions_rx.recv() => self.handle_completion(done),

                payload = next_payload(&mut self.subscription), if feed_open && feed_streak < FEED_BURST => {
                    feed_streak += 1;
                    match payload {
                        Some(payload) => self.handle_payload(&payload),
                        None => {
                            tracing::warn!(owner_id = %self.listener.owner_id(), "change feed closed");
                            if let Some(sub) = self.subscription.as_mut() {
                                sub.closed = true;
                            }
                        }
                    }
                }

                command = commands.recv() => {
                    feed_streak = 0;
                    match command {
                        Some(command) => {
                            if self.handle_command(command).await.is_break() {
                                break;
                            }
                        }
                        None => {
                            self.teardown().await;
                            break;
                        }
                    }
                }

                // A full burst with no command waiting: give the feed its turn back.
                _ = std::future::ready(()), if feed_streak >= FEED_BURST => feed_streak = 0,
            }
        }
        tracing::info!(owner_id = %self.listener.owner_id(), "session stopped");
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Subscribe first, then load, so no change between the listing and the
    /// subscription is missed. Feed payloads that raced the listing are
    /// applied afterwards; upserts are idempotent.
    async fn connect(&mut self) -> Result<()> {
        let subscription = self.subscribe(self.listener.owner_id()).await?;
        self.subscription = Some(subscription);
        self.load().await;
        Ok(())
    }

    async fn subscribe(&self, owner_id: &str) -> Result<ActiveSubscription> {
        let sub = bounded("subscribe", self.gateway.timeout(), self.feed.subscribe(owner_id)).await?;
        Ok(ActiveSubscription {
            handle: sub.handle,
            events: sub.events,
            closed: false,
        })
    }

    async fn load(&mut self) {
        let owner_id = self.listener.owner_id().to_string();
        match self.gateway.list(&owner_id).await {
            Ok(records) => {
                let loaded = self.reconciler.load(records);
                tracing::info!(owner_id = %owner_id, records = loaded, "session started");
            }
            Err(error) => {
                tracing::warn!(owner_id = %owner_id, error = %error, "initial load failed; starting empty");
                self.report(SessionErrorKind::Load, None, &error);
            }
        }
    }

    /// Unsubscribe and drop all local state. A stalled or failed unsubscribe
    /// is reported and the teardown completes regardless.
    async fn teardown(&mut self) {
        if let Some(sub) = self.subscription.take() {
            let call = self.feed.unsubscribe(sub.handle);
            if let Err(error) = bounded("unsubscribe", self.gateway.timeout(), call).await {
                tracing::warn!(owner_id = %self.listener.owner_id(), error = %error, "unsubscribe failed");
                self.report(SessionErrorKind::Unsubscribe, None, &error);
            }
        }
        self.reconciler.reset();
        self.generation += 1;
        tracing::info!(owner_id = %self.listener.owner_id(), "session torn down");
    }

    /// Subscribe for `owner_id` before touching the current session. If that
    /// fails, the current owner, subscription and collection stay as they are.
    async fn switch_owner(&mut self, owner_id: String) -> Result<()> {
        let subscription = match self.subscribe(&owner_id).await {
            Ok(subscription) => subscription,
            Err(error) => {
                tracing::warn!(
                    owner_id = %self.listener.owner_id(),
                    next_owner = %owner_id,
                    error = %error,
                    "owner switch failed; keeping current session"
                );
                return Err(error);
            }
        };

        self.teardown().await;
        self.listener = FeedListener::new(owner_id);
        self.subscription = Some(subscription);
        self.load().await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Event handling
    // -----------------------------------------------------------------------

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Create { title, url, reply } => {
                match self.gateway.create(&title, &url, self.listener.owner_id()) {
                    Ok(call) => self.spawn_call(call, Reply::Create(reply)),
                    Err(error) => {
                        let _ = reply.send(Err(error.into()));
                    }
                }
            }
            Command::Delete { id, reply } => match self.gateway.delete(&mut self.reconciler, &id) {
                Ok(call) => self.spawn_call(call, Reply::Delete(reply)),
                Err(error) => {
                    let _ = reply.send(Err(error));
                }
            },
            Command::InsertOptimistic { record, reply } => {
                let _ = reply.send(self.reconciler.apply_optimistic(record));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.reconciler.store().snapshot());
            }
            Command::Pending { reply } => {
                let _ = reply.send(self.reconciler.store().pending_ids());
            }
            Command::OwnerId { reply } => {
                let _ = reply.send(self.listener.owner_id().to_string());
            }
            Command::SwitchOwner { owner_id, reply } => {
                let result = self.switch_owner(owner_id).await;
                let _ = reply.send(result);
            }
            Command::Logout { reply } => {
                self.teardown().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_payload(&mut self, payload: &Value) {
        match self.listener.handle(&mut self.reconciler, payload) {
            FeedOutcome::Rejected(error) => {
                self.report(SessionErrorKind::Feed, None, &error);
            }
            FeedOutcome::Applied(_) | FeedOutcome::ForeignOwner { .. } => {}
        }
    }

    fn handle_completion(&mut self, done: Completion) {
        let Completion {
            generation,
            event,
            reply,
        } = done;

        let settled: std::result::Result<Option<BookmarkRecord>, RemoteError> = match &event {
            SyncEvent::CreateConfirmed(record) => Ok(Some(record.clone())),
            SyncEvent::DeleteConfirmed { .. } => Ok(None),
            SyncEvent::CreateFailed { error } => {
                self.report(SessionErrorKind::Create, None, error);
                Err(error.clone())
            }
            SyncEvent::DeleteFailed { id, error } => {
                self.report(SessionErrorKind::Delete, Some(id.as_str()), error);
                Err(error.clone())
            }
            other => {
                tracing::error!(event = ?other, "remote call settled with a feed event");
                return;
            }
        };

        if generation == self.generation {
            self.reconciler.apply(event);
        } else {
            tracing::debug!(event = ?event, "discarding completion from an earlier session");
        }

        match (reply, settled) {
            (Reply::Create(tx), Ok(Some(record))) => {
                let _ = tx.send(Ok(record));
            }
            (Reply::Create(_), Ok(None)) => {
                tracing::error!("create settled without a record");
            }
            (Reply::Delete(tx), Ok(_)) => {
                let _ = tx.send(Ok(()));
            }
            (Reply::Create(tx), Err(error)) => {
                let _ = tx.send(Err(error.into()));
            }
            (Reply::Delete(tx), Err(error)) => {
                let _ = tx.send(Err(error.into()));
            }
        }
    }

    fn spawn_call(&self, call: RemoteCall, reply: Reply) {
        let tx = self.completions_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let event = call.await;
            // The actor may already be gone; nothing left to settle then.
            let _ = tx.send(Completion {
                generation,
                event,
                reply,
            });
        });
    }

    fn report(&self, kind: SessionErrorKind, id: Option<&str>, error: &dyn std::fmt::Display) {
        if let Some(ref on_error) = self.on_error {
            let event = SessionErrorEvent {
                kind,
                id: id.map(|s| s.to_string()),
                error: error.to_string(),
            };
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                on_error(&event);
            }));
        }
    }
}

async fn next_payload(subscription: &mut Option<ActiveSubscription>) -> Option<Value> {
    match subscription {
        Some(sub) => sub.events.recv().await,
        None => std::future::pending().await,
    }
}
