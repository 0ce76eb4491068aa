//! Local durable key/value storage abstraction.
//!
//! Used to rehydrate state across process restarts. Values are opaque bytes;
//! callers choose the encoding.

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Reading a key failed
    #[error("Failed to load '{key}': {reason}")]
    LoadFailed {
        /// The key being read
        key: String,
        /// The reason for failure
        reason: String,
    },

    /// Writing a key failed
    #[error("Failed to save '{key}': {reason}")]
    SaveFailed {
        /// The key being written
        key: String,
        /// The reason for failure
        reason: String,
    },

    /// The key is not usable by this backend
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Boxed future returned by [`KeyValueStorage`] operations.
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

/// Trait for durable key/value stores.
///
/// Implementations must be `Send + Sync`: the persistence writer runs on its
/// own task.
pub trait KeyValueStorage: Send + Sync {
    /// Load the value stored under `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::LoadFailed`] if the backend cannot be read.
    fn load(&self, key: &str) -> StorageFuture<'_, Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SaveFailed`] if the backend cannot be written.
    fn save(&self, key: &str, value: Vec<u8>) -> StorageFuture<'_, ()>;

    /// Remove `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SaveFailed`] if the backend cannot be written.
    fn remove(&self, key: &str) -> StorageFuture<'_, ()>;
}
