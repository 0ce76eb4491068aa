//! Remote document collection abstraction.
//!
//! A remote collection is a managed, cloud-hosted set of JSON documents with a
//! real-time change feed. The system consumes exactly four operations:
//!
//! - `subscribe(collection)`: a long-lived stream of full [`Snapshot`]s, one per change
//! - `add(collection, fields)`: create a document, the remote assigns its id
//! - `update(collection, id, fields)`: merge fields into an existing document
//! - `delete(collection, id)`: remove a document
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::StreamExt;
//!
//! let mut snapshots = remote.subscribe("todos").await?;
//! while let Some(snapshot) = snapshots.next().await {
//!     for document in &snapshot.documents {
//!         println!("{} => {:?}", document.id, document.fields);
//!     }
//! }
//! ```

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use thiserror::Error;

/// Field map of a document (a JSON object).
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Error type for `DocumentId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid document ID: {0}")]
pub struct ParseDocumentIdError(String);

/// Identifier assigned to a document by the remote collection.
///
/// Ids are opaque strings chosen by the remote service; clients never mint them.
///
/// # Validation
///
/// - `FromStr::from_str()`: Validates input (rejects empty strings)
/// - `From::from()` and `new()`: No validation (for ids received from the remote)
///
/// # Examples
///
/// ```
/// use todo_sync_core::remote::DocumentId;
///
/// let id = DocumentId::new("Xk29fa");
/// assert_eq!(id.as_str(), "Xk29fa");
///
/// assert!("".parse::<DocumentId>().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a new `DocumentId` from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl FromStr for DocumentId {
    type Err = ParseDocumentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ParseDocumentIdError("document id cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

/// One document inside a [`Snapshot`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Remote-assigned id
    pub id: DocumentId,
    /// Document body
    pub fields: Fields,
}

impl Document {
    /// Create a document from an id and its fields.
    #[must_use]
    pub fn new(id: impl Into<DocumentId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Read a string field.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(serde_json::Value::as_str)
    }

    /// Read a boolean field.
    #[must_use]
    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(serde_json::Value::as_bool)
    }
}

/// Full point-in-time listing of every document in a collection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// All documents, in the order the remote reports them
    pub documents: Vec<Document>,
}

impl Snapshot {
    /// Create a snapshot from its documents.
    #[must_use]
    pub const fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Number of documents in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the collection was empty at this point in time.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Errors that can occur during remote collection operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The remote service could not be reached
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The remote refused a write (permissions, quota, validation)
    #[error("Write rejected: {0}")]
    WriteRejected(String),

    /// The addressed document does not exist
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    /// Opening the change feed failed
    #[error("Subscription failed for collection '{collection}': {reason}")]
    SubscriptionFailed {
        /// The collection that failed
        collection: String,
        /// The reason for failure
        reason: String,
    },
}

/// Stream of snapshots delivered by a subscription.
///
/// Dropping the stream closes the subscription.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Snapshot> + Send>>;

/// Boxed future returned by [`RemoteCollection`] operations.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// Trait for remote document collections.
///
/// # Delivery
///
/// - Snapshots are delivered in the order the remote emits them
/// - Each snapshot is complete: it replaces, never patches, what came before
/// - Writes are acknowledged individually; the snapshot reflecting a write may
///   arrive before or after its acknowledgment
///
/// # Dyn Compatibility
///
/// Methods return boxed futures so that `Arc<dyn RemoteCollection>` can be
/// captured by effects.
pub trait RemoteCollection: Send + Sync {
    /// Open the change feed of a collection.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::SubscriptionFailed`] if the feed cannot be opened.
    fn subscribe(&self, collection: &str) -> RemoteFuture<'_, SnapshotStream>;

    /// Create a document and return the id the remote assigned to it.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the write is not acknowledged.
    fn add(&self, collection: &str, fields: Fields) -> RemoteFuture<'_, DocumentId>;

    /// Merge fields into an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::NotFound`] if the document does not exist, or
    /// another [`RemoteError`] if the write is not acknowledged.
    fn update(&self, collection: &str, id: &DocumentId, fields: Fields) -> RemoteFuture<'_, ()>;

    /// Delete a document.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the write is not acknowledged.
    fn delete(&self, collection: &str, id: &DocumentId) -> RemoteFuture<'_, ()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_id_parse_rejects_blank() {
        assert!("  ".parse::<DocumentId>().is_err());
        assert_eq!("abc".parse::<DocumentId>(), Ok(DocumentId::new("abc")));
    }

    #[test]
    fn document_field_accessors() {
        let mut fields = Fields::new();
        fields.insert("text".into(), json!("milk"));
        fields.insert("completed".into(), json!(true));
        fields.insert("count".into(), json!(3));
        let document = Document::new("d1", fields);

        assert_eq!(document.str_field("text"), Some("milk"));
        assert_eq!(document.bool_field("completed"), Some(true));
        assert_eq!(document.str_field("count"), None);
        assert_eq!(document.bool_field("missing"), None);
    }

    #[test]
    fn document_id_serializes_as_plain_string() {
        let encoded = serde_json::to_string(&DocumentId::new("d9")).unwrap_or_default();
        assert_eq!(encoded, "\"d9\"");
    }
}
