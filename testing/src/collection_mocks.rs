//! In-memory remote collection for tests and demos
//!
//! [`InMemoryCollection`] behaves like a hosted document collection:
//! - every write is acknowledged individually and assigns ids on `add`
//! - every subscriber receives the current snapshot on subscribe, then a full
//!   snapshot after each change, in order
//! - failures can be injected for writes and subscriptions
//!
//! Changes made by "other clients" are simulated with [`InMemoryCollection::insert`]
//! and [`InMemoryCollection::remove`].

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only happens after a test already panicked

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use todo_sync_core::remote::{
    Document, DocumentId, Fields, RemoteCollection, RemoteError, RemoteFuture, Snapshot,
    SnapshotStream,
};
use tokio::sync::mpsc;

/// A write received by [`InMemoryCollection`], recorded for assertions
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRecord {
    /// `add` call
    Add {
        /// Target collection
        collection: String,
        /// Submitted fields
        fields: Fields,
    },
    /// `update` call
    Update {
        /// Target collection
        collection: String,
        /// Target document
        id: DocumentId,
        /// Submitted fields
        fields: Fields,
    },
    /// `delete` call
    Delete {
        /// Target collection
        collection: String,
        /// Target document
        id: DocumentId,
    },
}

#[derive(Default)]
struct Inner {
    documents: RwLock<HashMap<String, Vec<Document>>>,
    subscribers: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<Snapshot>>>>,
    writes: Mutex<Vec<WriteRecord>>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
    fail_next_writes: AtomicUsize,
    fail_subscribe: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
}

/// In-memory [`RemoteCollection`] with a live change feed.
///
/// Ids are assigned sequentially (`doc-1`, `doc-2`, ...). Clones share the
/// same documents and subscribers.
///
/// # Example
///
/// ```
/// use futures::StreamExt;
/// use todo_sync_core::remote::{Fields, RemoteCollection};
/// use todo_sync_testing::mocks::InMemoryCollection;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let remote = InMemoryCollection::new();
/// let mut feed = remote.subscribe("todos").await?;
///
/// let initial = feed.next().await.unwrap_or_default();
/// assert!(initial.is_empty());
///
/// let id = remote.add("todos", Fields::new()).await?;
/// let after_add = feed.next().await.unwrap_or_default();
/// assert_eq!(after_add.documents[0].id, id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryCollection {
    inner: Arc<Inner>,
}

impl InMemoryCollection {
    /// Create an empty collection set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` writes fail, then succeed again
    pub fn fail_next_writes(&self, count: usize) {
        self.inner.fail_next_writes.store(count, Ordering::SeqCst);
    }

    /// Make subsequent `subscribe` calls fail
    pub fn fail_subscribe(&self, fail: bool) {
        self.inner.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// Delay every write acknowledgment by `delay`
    pub fn set_write_delay(&self, delay: Duration) {
        *self.inner.write_delay.lock().unwrap() = Some(delay);
    }

    /// Create a document as another client would, notifying subscribers
    pub fn insert(&self, collection: &str, fields: Fields) -> DocumentId {
        let id = self.next_id();
        self.mutate(collection, |docs| docs.push(Document::new(id.clone(), fields)));
        id
    }

    /// Delete a document as another client would, notifying subscribers
    ///
    /// Returns `false` if the document did not exist.
    pub fn remove(&self, collection: &str, id: &DocumentId) -> bool {
        let mut removed = false;
        self.mutate(collection, |docs| {
            let before = docs.len();
            docs.retain(|doc| &doc.id != id);
            removed = docs.len() != before;
        });
        removed
    }

    /// Current documents of a collection
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.inner
            .documents
            .read()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Look up one document
    #[must_use]
    pub fn document(&self, collection: &str, id: &DocumentId) -> Option<Document> {
        self.documents(collection).into_iter().find(|doc| &doc.id == id)
    }

    /// Every write received so far, including rejected ones
    #[must_use]
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.inner.writes.lock().unwrap().clone()
    }

    /// Number of open subscriptions to a collection
    #[must_use]
    pub fn subscriber_count(&self, collection: &str) -> usize {
        let mut subscribers = self.inner.subscribers.lock().unwrap();
        subscribers.get_mut(collection).map_or(0, |senders| {
            senders.retain(|tx| !tx.is_closed());
            senders.len()
        })
    }

    /// Push an arbitrary snapshot to every subscriber without touching documents
    ///
    /// Lets tests deliver malformed or out-of-order snapshots.
    pub fn emit(&self, collection: &str, snapshot: Snapshot) {
        self.broadcast(collection, &snapshot);
    }

    fn next_id(&self) -> DocumentId {
        let n = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        DocumentId::new(format!("doc-{n}"))
    }

    fn mutate<F>(&self, collection: &str, f: F)
    where
        F: FnOnce(&mut Vec<Document>),
    {
        // Broadcast under the write lock so subscribers see changes in order.
        let mut documents = self.inner.documents.write().unwrap();
        let docs = documents.entry(collection.to_string()).or_default();
        f(docs);
        let snapshot = Snapshot::new(docs.clone());
        self.broadcast(collection, &snapshot);
    }

    fn broadcast(&self, collection: &str, snapshot: &Snapshot) {
        let mut subscribers = self.inner.subscribers.lock().unwrap();
        if let Some(senders) = subscribers.get_mut(collection) {
            senders.retain(|tx| tx.send(snapshot.clone()).is_ok());
        }
    }

    async fn acknowledge(&self, record: WriteRecord) -> Result<(), RemoteError> {
        self.inner.writes.lock().unwrap().push(record);

        let delay = *self.inner.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::WriteRejected("permission denied".to_string()));
        }
        let consumed = self
            .inner
            .fail_next_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            return Err(RemoteError::ConnectionFailed("network unreachable".to_string()));
        }
        Ok(())
    }
}

impl RemoteCollection for InMemoryCollection {
    fn subscribe(&self, collection: &str) -> RemoteFuture<'_, SnapshotStream> {
        let collection = collection.to_string();
        Box::pin(async move {
            if self.inner.fail_subscribe.load(Ordering::SeqCst) {
                return Err(RemoteError::SubscriptionFailed {
                    collection,
                    reason: "permission denied".to_string(),
                });
            }

            let (tx, mut rx) = mpsc::unbounded_channel();
            let initial = {
                let documents = self.inner.documents.read().unwrap();
                self.inner
                    .subscribers
                    .lock()
                    .unwrap()
                    .entry(collection.clone())
                    .or_default()
                    .push(tx);
                Snapshot::new(documents.get(&collection).cloned().unwrap_or_default())
            };

            let stream = async_stream::stream! {
                yield initial;
                while let Some(snapshot) = rx.recv().await {
                    yield snapshot;
                }
            };

            Ok(Box::pin(stream) as SnapshotStream)
        })
    }

    fn add(&self, collection: &str, fields: Fields) -> RemoteFuture<'_, DocumentId> {
        let collection = collection.to_string();
        Box::pin(async move {
            self.acknowledge(WriteRecord::Add {
                collection: collection.clone(),
                fields: fields.clone(),
            })
            .await?;
            Ok(self.insert(&collection, fields))
        })
    }

    fn update(&self, collection: &str, id: &DocumentId, fields: Fields) -> RemoteFuture<'_, ()> {
        let collection = collection.to_string();
        let id = id.clone();
        Box::pin(async move {
            self.acknowledge(WriteRecord::Update {
                collection: collection.clone(),
                id: id.clone(),
                fields: fields.clone(),
            })
            .await?;

            let mut found = false;
            self.mutate(&collection, |docs| {
                if let Some(doc) = docs.iter_mut().find(|doc| doc.id == id) {
                    doc.fields.extend(fields);
                    found = true;
                }
            });
            if found { Ok(()) } else { Err(RemoteError::NotFound(id)) }
        })
    }

    fn delete(&self, collection: &str, id: &DocumentId) -> RemoteFuture<'_, ()> {
        let collection = collection.to_string();
        let id = id.clone();
        Box::pin(async move {
            self.acknowledge(WriteRecord::Delete {
                collection: collection.clone(),
                id: id.clone(),
            })
            .await?;
            self.remove(&collection, &id);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    fn todo_fields(text: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert("text".into(), json!(text));
        fields.insert("completed".into(), json!(false));
        fields
    }

    #[tokio::test]
    async fn subscribe_delivers_current_then_changes() {
        let remote = InMemoryCollection::new();
        remote.insert("todos", todo_fields("first"));

        let mut feed = remote.subscribe("todos").await.unwrap();
        assert_eq!(feed.next().await.unwrap().len(), 1);

        remote.add("todos", todo_fields("second")).await.unwrap();
        let snapshot = feed.next().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.documents[1].str_field("text"), Some("second"));
    }

    #[tokio::test]
    async fn update_merges_fields_and_reports_missing() {
        let remote = InMemoryCollection::new();
        let id = remote.insert("todos", todo_fields("milk"));

        let mut patch = Fields::new();
        patch.insert("completed".into(), json!(true));
        remote.update("todos", &id, patch.clone()).await.unwrap();

        let doc = remote.document("todos", &id).unwrap();
        assert_eq!(doc.str_field("text"), Some("milk"));
        assert_eq!(doc.bool_field("completed"), Some(true));

        let missing = DocumentId::new("nope");
        let result = remote.update("todos", &missing, patch).await;
        assert_eq!(result, Err(RemoteError::NotFound(missing)));
    }

    #[tokio::test]
    async fn injected_failures_reject_writes_without_changes() {
        let remote = InMemoryCollection::new();
        remote.fail_next_writes(1);

        assert!(remote.add("todos", todo_fields("a")).await.is_err());
        assert!(remote.documents("todos").is_empty());

        assert!(remote.add("todos", todo_fields("b")).await.is_ok());
        assert_eq!(remote.documents("todos").len(), 1);
        assert_eq!(remote.writes().len(), 2);
    }

    #[tokio::test]
    async fn dropped_stream_closes_subscription() {
        let remote = InMemoryCollection::new();
        let feed = remote.subscribe("todos").await.unwrap();
        assert_eq!(remote.subscriber_count("todos"), 1);

        drop(feed);
        assert_eq!(remote.subscriber_count("todos"), 0);
    }

    #[tokio::test]
    async fn failing_subscribe_returns_error() {
        let remote = InMemoryCollection::new();
        remote.fail_subscribe(true);
        assert!(matches!(
            remote.subscribe("todos").await,
            Err(RemoteError::SubscriptionFailed { .. })
        ));
    }
}
