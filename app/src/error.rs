//! Top-level error of the app.

use crate::config::ConfigError;
use crate::validation::ValidationError;
use thiserror::Error;
use todo_sync_core::remote::RemoteError;
use todo_sync_core::storage::StorageError;
use todo_sync_runtime::persist::PersistError;
use todo_sync_runtime::StoreError;

/// Any error surfaced by [`App`](crate::App) or the demo binary
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A form did not validate
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The remote collection failed
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The key/value store failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// State could not be persisted or rehydrated
    #[error(transparent)]
    Persist(#[from] PersistError),

    /// The store rejected an action or timed out
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for app operations
pub type Result<T> = std::result::Result<T, AppError>;
