//! In-memory key/value storage for persistence tests
//!
//! [`InMemoryStorage`] keeps values in a `HashMap` and can simulate slow or
//! failing backends.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use todo_sync_core::storage::{KeyValueStorage, StorageError, StorageFuture};

/// In-memory [`KeyValueStorage`] for fast, deterministic tests.
///
/// Clones share the same data.
///
/// # Example
///
/// ```
/// use todo_sync_core::storage::KeyValueStorage;
/// use todo_sync_testing::mocks::InMemoryStorage;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = InMemoryStorage::new();
///
/// storage.save("root", b"state".to_vec()).await?;
/// assert_eq!(storage.load("root").await?, Some(b"state".to_vec()));
/// assert_eq!(storage.save_count(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryStorage {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    saves: Arc<AtomicUsize>,
    fail_saves: Arc<AtomicBool>,
    fail_loads: Arc<AtomicBool>,
    save_delay: Arc<Mutex<Option<Duration>>>,
}

impl InMemoryStorage {
    /// Create a new empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value under `key`, bypassing failure injection
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.data.read().unwrap().get(key).cloned()
    }

    /// Check if a key exists
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().unwrap().contains_key(key)
    }

    /// Number of successful saves so far
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent loads fail (or succeed again)
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Delay every save by `delay`, simulating a slow disk
    pub fn set_save_delay(&self, delay: Duration) {
        *self.save_delay.lock().unwrap() = Some(delay);
    }
}

impl KeyValueStorage for InMemoryStorage {
    fn load(&self, key: &str) -> StorageFuture<'_, Option<Vec<u8>>> {
        let key = key.to_string();
        Box::pin(async move {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(StorageError::LoadFailed {
                    key,
                    reason: "simulated read failure".to_string(),
                });
            }
            Ok(self.get(&key))
        })
    }

    fn save(&self, key: &str, value: Vec<u8>) -> StorageFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            let delay = *self.save_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(StorageError::SaveFailed {
                    key,
                    reason: "simulated write failure".to_string(),
                });
            }
            self.data.write().unwrap().insert(key, value);
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> StorageFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            self.data.write().unwrap().remove(&key);
            Ok(())
        })
    }
}
