//! Change feed: mirrors the remote collection into the store.
//!
//! Every snapshot replaces the whole local list through `SetAll`. The remote
//! is authoritative, so a snapshot also repairs any optimistic echo that raced
//! with it.

use crate::actions::TodoAction;
use crate::sync::writes::{COMPLETED_FIELD, TEXT_FIELD};
use crate::types::{Todo, TodoId};
use futures::StreamExt;
use std::sync::Arc;
use todo_sync_core::reducer::Reducer;
use todo_sync_core::remote::{Document, RemoteCollection, RemoteError, Snapshot, SnapshotStream};
use todo_sync_runtime::Store;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Decodes one remote document into a to-do
///
/// A missing or mistyped `text` decodes as `""`, a missing or mistyped
/// `completed` as `false`.
#[must_use]
pub fn decode_document(document: &Document) -> Todo {
    let text = document.str_field(TEXT_FIELD).unwrap_or_else(|| {
        tracing::warn!(id = %document.id, field = TEXT_FIELD, "Malformed todo document");
        ""
    });
    let completed = document.bool_field(COMPLETED_FIELD).unwrap_or_else(|| {
        tracing::warn!(id = %document.id, field = COMPLETED_FIELD, "Malformed todo document");
        false
    });

    Todo::new(TodoId::from(document.id.clone()), text).with_completed(completed)
}

/// Decodes every document of a snapshot, in feed order
#[must_use]
pub fn decode_snapshot(snapshot: &Snapshot) -> Vec<Todo> {
    snapshot.documents.iter().map(decode_document).collect()
}

/// Subscribes stores to the change feed of one collection
#[derive(Clone)]
pub struct SyncAdapter {
    remote: Arc<dyn RemoteCollection>,
    collection: String,
}

impl SyncAdapter {
    /// Creates an adapter for `collection`
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteCollection>, collection: impl Into<String>) -> Self {
        Self {
            remote,
            collection: collection.into(),
        }
    }

    /// Name of the mirrored collection
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Subscribes to the collection and starts dispatching `SetAll` into `store`
    ///
    /// The first snapshot is the current content of the collection.
    ///
    /// # Errors
    ///
    /// Returns the [`RemoteError`] of a failed subscription. Nothing is spawned
    /// in that case.
    pub async fn activate<S, A, E, R>(&self, store: &Store<S, A, E, R>) -> Result<SyncSubscription, RemoteError>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: From<TodoAction> + Send + Clone + std::fmt::Debug + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        let snapshots = self.remote.subscribe(&self.collection).await.map_err(|error| {
            tracing::error!(collection = %self.collection, %error, "Subscription failed");
            error
        })?;

        tracing::info!(collection = %self.collection, "Change feed activated");

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_feed(
            snapshots,
            store.clone(),
            self.collection.clone(),
            shutdown_rx,
        ));

        Ok(SyncSubscription {
            collection: self.collection.clone(),
            shutdown,
            task: Some(task),
        })
    }
}

impl std::fmt::Debug for SyncAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncAdapter")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

async fn run_feed<S, A, E, R>(
    mut snapshots: SnapshotStream,
    store: Store<S, A, E, R>,
    collection: String,
    mut shutdown: watch::Receiver<bool>,
) where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: From<TodoAction> + Send + Clone + std::fmt::Debug + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    loop {
        tokio::select! {
            biased;

            // A dropped handle counts as deactivation
            _ = shutdown.changed() => {
                tracing::info!(%collection, "Change feed deactivated");
                break;
            }

            next = snapshots.next() => {
                let Some(snapshot) = next else {
                    tracing::warn!(%collection, "Change feed ended");
                    break;
                };

                let todos = decode_snapshot(&snapshot);
                tracing::debug!(%collection, count = todos.len(), "Applying snapshot");
                metrics::counter!("sync.snapshots.applied").increment(1);

                if let Err(error) = store.send(A::from(TodoAction::SetAll { todos })).await {
                    tracing::debug!(%collection, %error, "Store no longer accepts snapshots");
                    break;
                }
            }
        }
    }
}

/// Handle of an active change feed subscription
///
/// Dropping the handle also stops the feed.
pub struct SyncSubscription {
    collection: String,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SyncSubscription {
    /// Name of the mirrored collection
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Whether the feed task is still running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Closes the subscription and waits for the feed task to stop
    ///
    /// Writes already issued are not affected.
    pub async fn deactivate(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::error!(collection = %self.collection, %error, "Change feed task failed");
            }
        }
    }
}

impl std::fmt::Debug for SyncSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSubscription")
            .field("collection", &self.collection)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
