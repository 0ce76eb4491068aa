//! # Todo Sync App
//!
//! A to-do list and authentication client core built on the reducer/effect
//! store of `todo-sync-runtime`.
//!
//! ## Data flow
//!
//! ```text
//! UI ──RequestAdd──▶ Store ──▶ SyncReducer ──remote write──▶ RemoteCollection
//!                      ▲                         │ ack                │
//!                      └────────── Add (echo) ◀──┘                    │
//!                      ▲                                              │
//!                      └──── SetAll ◀── SyncAdapter ◀── snapshot ─────┘
//! ```
//!
//! The remote collection is authoritative: every snapshot replaces the local
//! list. The user slice (login, registration, profile) is local only and is
//! persisted together with the to-do list through a key/value store.
//!
//! ## Example
//!
//! ```ignore
//! use todo_sync_app::{App, AppConfig, TodoAction};
//!
//! let app = App::builder(AppConfig::default(), remote, storage).start().await?;
//! app.send(TodoAction::RequestAdd { text: "milk".into() }).await?;
//! app.shutdown().await?;
//! ```

pub mod actions;
pub mod bootstrap;
pub mod config;
pub mod environment;
pub mod error;
pub mod reducers;
pub mod sync;
pub mod types;
pub mod validation;

pub use actions::{AppAction, TodoAction, UserAction, WriteOp};
pub use bootstrap::{App, AppBuilder, AppStore};
pub use config::{AppConfig, ConfigError};
pub use environment::{AppEnvironment, LogAlerter};
pub use error::AppError;
pub use reducers::{app_reducer, AppReducer, TodoReducer, UserReducer};
pub use sync::{SyncAdapter, SyncReducer, SyncSubscription};
pub use types::{
    AppState, AuthMethod, Credentials, RosterEntry, SocialProvider, Todo, TodoId, TodoState, UserState,
};
pub use validation::{FieldErrors, FormField, LoginForm, SignUpForm, ValidationError};
