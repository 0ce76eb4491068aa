//! State persistence.
//!
//! The root state is written to a [`KeyValueStorage`] under a single key
//! (`"root"` by default) after every reduction, and read back once at startup.
//!
//! - [`Persistor::rehydrate`] loads the last persisted state
//! - [`Persistor::writer`] spawns the background writer, a [`StateListener`]
//!   that only ever keeps the newest state pending, so writes are serialized
//!   and the last state always wins
//! - [`PersistWriter::close`] flushes the pending state and stops the writer
//!
//! Values are stored as a JSON envelope carrying a format version. An envelope
//! with another version is discarded at rehydration.

use crate::StateListener;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use todo_sync_core::storage::{KeyValueStorage, StorageError, StorageFuture};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default storage key of the root state
pub const DEFAULT_PERSIST_KEY: &str = "root";

/// Version written into every persisted envelope
pub const PERSIST_FORMAT_VERSION: u32 = 1;

/// Errors that can occur while persisting or rehydrating state
#[derive(Error, Debug)]
pub enum PersistError {
    /// The storage backend failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// State could not be encoded
    #[error("Failed to encode state: {0}")]
    Encode(String),

    /// Persisted bytes could not be decoded into state
    #[error("Failed to decode persisted state: {0}")]
    Decode(String),

    /// The persisted envelope was written by another format version
    #[error("Persisted state has version {found}, expected {expected}")]
    VersionMismatch {
        /// Version found in storage
        found: u32,
        /// Version this build writes
        expected: u32,
    },

    /// The writer task ended abnormally
    #[error("Persist writer failed: {0}")]
    WriterFailed(String),
}

#[derive(Serialize)]
struct EnvelopeRef<'a, S> {
    version: u32,
    state: &'a S,
}

#[derive(Deserialize)]
struct Envelope<S> {
    version: u32,
    state: S,
}

fn encode<S: Serialize>(state: &S) -> Result<Vec<u8>, PersistError> {
    serde_json::to_vec(&EnvelopeRef {
        version: PERSIST_FORMAT_VERSION,
        state,
    })
    .map_err(|e| PersistError::Encode(e.to_string()))
}

fn decode<S: DeserializeOwned>(bytes: &[u8]) -> Result<S, PersistError> {
    let envelope: Envelope<S> =
        serde_json::from_slice(bytes).map_err(|e| PersistError::Decode(e.to_string()))?;
    if envelope.version != PERSIST_FORMAT_VERSION {
        return Err(PersistError::VersionMismatch {
            found: envelope.version,
            expected: PERSIST_FORMAT_VERSION,
        });
    }
    Ok(envelope.state)
}

/// Reads and writes the root state under one storage key
#[derive(Clone)]
pub struct Persistor {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl Persistor {
    /// Create a persistor for `key` in `storage`
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// The storage key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the last persisted state, `None` when nothing was persisted yet
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if storage fails or the stored bytes are not
    /// a state envelope of the current version.
    pub async fn rehydrate<S: DeserializeOwned>(&self) -> Result<Option<S>, PersistError> {
        let Some(bytes) = self.storage.load(&self.key).await? else {
            tracing::debug!(key = %self.key, "No persisted state");
            return Ok(None);
        };
        let state = decode(&bytes)?;
        tracing::info!(key = %self.key, bytes = bytes.len(), "Rehydrated persisted state");
        Ok(Some(state))
    }

    /// Load the last persisted state, falling back to `initial`
    ///
    /// Unreadable persisted state is logged and replaced by `initial`; the
    /// next write overwrites it.
    pub async fn rehydrate_or<S: DeserializeOwned>(&self, initial: S) -> S {
        match self.rehydrate().await {
            Ok(Some(state)) => state,
            Ok(None) => initial,
            Err(PersistError::Storage(error)) => {
                tracing::error!(key = %self.key, %error, "Failed to load persisted state");
                initial
            },
            Err(error) => {
                tracing::warn!(key = %self.key, %error, "Discarding unreadable persisted state");
                initial
            },
        }
    }

    /// Write `state` immediately, bypassing any writer
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if encoding or storage fails.
    pub async fn save<S: Serialize>(&self, state: &S) -> Result<(), PersistError> {
        let bytes = encode(state)?;
        self.storage.save(&self.key, bytes).await?;
        Ok(())
    }

    /// Remove the persisted state
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Storage`] if storage fails.
    pub async fn purge(&self) -> Result<(), PersistError> {
        self.storage.remove(&self.key).await?;
        tracing::info!(key = %self.key, "Purged persisted state");
        Ok(())
    }

    /// Spawn the background writer for this key
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn writer<S: Serialize>(&self) -> PersistWriter<S> {
        let (tx, mut rx) = watch::channel::<Option<Vec<u8>>>(None);
        let storage = Arc::clone(&self.storage);
        let key = self.key.clone();

        let task = tokio::spawn(async move {
            // `changed` still reports a value sent just before the sender was
            // dropped, so the final state is flushed before the loop ends.
            while rx.changed().await.is_ok() {
                let pending = rx.borrow_and_update().clone();
                let Some(bytes) = pending else { continue };
                match storage.save(&key, bytes).await {
                    Ok(()) => {
                        metrics::counter!("persist.writes.total").increment(1);
                        tracing::trace!(%key, "Persisted state");
                    },
                    Err(error) => {
                        metrics::counter!("persist.writes.failed").increment(1);
                        tracing::error!(%key, %error, "Failed to persist state");
                    },
                }
            }
            tracing::debug!(%key, "Persist writer stopped");
        });

        PersistWriter {
            sender: Mutex::new(Some(tx)),
            task: Mutex::new(Some(task)),
            _state: PhantomData,
        }
    }
}

/// Background writer persisting every state it is handed
///
/// Register it on the store with `Store::with_listener`. Encoding happens on
/// the caller's thread; storage I/O happens on the writer task.
pub struct PersistWriter<S> {
    sender: Mutex<Option<watch::Sender<Option<Vec<u8>>>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    _state: PhantomData<fn(&S)>,
}

impl<S: Serialize> PersistWriter<S> {
    /// Queue `state` for writing, replacing any state not yet written
    pub fn submit(&self, state: &S) {
        let bytes = match encode(state) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(%error, "Skipping persist of unencodable state");
                return;
            },
        };
        if let Ok(guard) = self.sender.lock() {
            if let Some(sender) = guard.as_ref() {
                sender.send_replace(Some(bytes));
            }
        }
    }
}

impl<S> PersistWriter<S> {
    /// Flush the pending state and stop the writer
    ///
    /// States submitted after `close` are ignored. Calling `close` twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::WriterFailed`] if the writer task panicked.
    pub async fn close(&self) -> Result<(), PersistError> {
        drop(self.sender.lock().ok().and_then(|mut guard| guard.take()));
        let task = self.task.lock().ok().and_then(|mut guard| guard.take());
        if let Some(task) = task {
            task.await.map_err(|e| PersistError::WriterFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl<S: Serialize> StateListener<S> for PersistWriter<S> {
    fn state_changed(&self, state: &S) {
        self.submit(state);
    }
}

/// File-backed [`KeyValueStorage`]: one file per key inside a directory
///
/// Writes go to a temporary file first and are renamed into place, so a crash
/// mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `dir`; the directory is created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    fn load(&self, key: &str) -> StorageFuture<'_, Option<Vec<u8>>> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.path_for(&key)?;
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(StorageError::LoadFailed {
                    key,
                    reason: e.to_string(),
                }),
            }
        })
    }

    fn save(&self, key: &str, value: Vec<u8>) -> StorageFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.path_for(&key)?;
            let tmp = path.with_extension("json.tmp");
            let save_failed = |e: std::io::Error| StorageError::SaveFailed {
                key: key.clone(),
                reason: e.to_string(),
            };

            tokio::fs::create_dir_all(&self.dir).await.map_err(save_failed)?;
            tokio::fs::write(&tmp, &value).await.map_err(save_failed)?;
            tokio::fs::rename(&tmp, &path).await.map_err(save_failed)?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> StorageFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.path_for(&key)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StorageError::SaveFailed {
                    key,
                    reason: e.to_string(),
                }),
            }
        })
    }
}
