//! Write path: one remote write per to-do request, echoed locally on success.
//!
//! The reducer never mutates the list itself. The echo arrives as a separate
//! action once the remote acknowledges; a failure arrives as
//! [`TodoAction::WriteFailed`], which is logged and alerted. Nothing is
//! retried or rolled back.

use crate::actions::{TodoAction, WriteOp};
use crate::environment::AppEnvironment;
use crate::types::{TodoId, TodoState};
use serde_json::json;
use todo_sync_core::remote::{Fields, RemoteError};
use todo_sync_core::{alert, remote_write, effect::Effect, reducer::Reducer, smallvec, SmallVec};

/// Document field holding the description
pub const TEXT_FIELD: &str = "text";
/// Document field holding the completion flag
pub const COMPLETED_FIELD: &str = "completed";

const WRITE_FAILED_TITLE: &str = "Error";

/// Fields of a freshly created to-do document
#[must_use]
pub fn new_todo_fields(text: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert(TEXT_FIELD.to_string(), json!(text));
    fields.insert(COMPLETED_FIELD.to_string(), json!(false));
    fields
}

fn single_field(name: &str, value: serde_json::Value) -> Fields {
    let mut fields = Fields::new();
    fields.insert(name.to_string(), value);
    fields
}

#[allow(clippy::unnecessary_wraps)]
fn write_failed(operation: WriteOp, error: &RemoteError) -> Option<TodoAction> {
    Some(TodoAction::WriteFailed {
        operation,
        error: error.to_string(),
    })
}

/// Reducer turning to-do requests into remote writes
///
/// A toggle echo is `Toggle { id }`, a flip relative to the local value. If
/// the remote delivers the snapshot carrying the write before the
/// acknowledgment, the echo flips the item back, and the local flag stays
/// inverted until the next remote change produces another snapshot. No
/// timer repairs it.
#[derive(Clone, Debug, Default)]
pub struct SyncReducer;

impl SyncReducer {
    /// Creates a new `SyncReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn request_add(text: String, env: &AppEnvironment) -> Effect<TodoAction> {
        let collection = env.collection.clone();
        let fields = new_todo_fields(&text);
        remote_write! {
            remote: env.remote,
            write: |remote| remote.add(&collection, fields),
            on_success: |id| Some(TodoAction::Add { id: TodoId::from(id), text }),
            on_error: |error| write_failed(WriteOp::Add, &error)
        }
    }

    fn request_toggle(state: &TodoState, id: TodoId, env: &AppEnvironment) -> Option<Effect<TodoAction>> {
        let Some(current) = state.get(&id).map(|todo| todo.completed) else {
            tracing::debug!(%id, "Toggle requested for unknown todo");
            return None;
        };
        let collection = env.collection.clone();
        let document = id.as_document_id().clone();
        let fields = single_field(COMPLETED_FIELD, json!(!current));
        Some(remote_write! {
            remote: env.remote,
            write: |remote| remote.update(&collection, &document, fields),
            on_success: |()| Some(TodoAction::Toggle { id }),
            on_error: |error| write_failed(WriteOp::Toggle, &error)
        })
    }

    fn request_update(id: TodoId, text: String, env: &AppEnvironment) -> Effect<TodoAction> {
        let collection = env.collection.clone();
        let document = id.as_document_id().clone();
        let fields = single_field(TEXT_FIELD, json!(text));
        remote_write! {
            remote: env.remote,
            write: |remote| remote.update(&collection, &document, fields),
            on_success: |()| Some(TodoAction::Update { id, text }),
            on_error: |error| write_failed(WriteOp::Update, &error)
        }
    }

    fn request_delete(id: TodoId, env: &AppEnvironment) -> Effect<TodoAction> {
        let collection = env.collection.clone();
        let document = id.as_document_id().clone();
        remote_write! {
            remote: env.remote,
            write: |remote| remote.delete(&collection, &document),
            on_success: |()| Some(TodoAction::Delete { id }),
            on_error: |error| write_failed(WriteOp::Delete, &error)
        }
    }
}

impl Reducer for SyncReducer {
    type State = TodoState;
    type Action = TodoAction;
    type Environment = AppEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TodoAction::RequestAdd { text } => smallvec![Self::request_add(text, env)],
            TodoAction::RequestToggle { id } => {
                Self::request_toggle(state, id, env).into_iter().collect()
            },
            TodoAction::RequestUpdate { id, text } => smallvec![Self::request_update(id, text, env)],
            TodoAction::RequestDelete { id } => smallvec![Self::request_delete(id, env)],

            TodoAction::WriteFailed { operation, error } => {
                tracing::warn!(%operation, %error, "Remote write failed");
                metrics::counter!("sync.writes.failed", "operation" => operation.to_string())
                    .increment(1);
                smallvec![alert! {
                    alerter: env.alerter,
                    title: WRITE_FAILED_TITLE,
                    message: format!("Failed to {operation} todo: {error}")
                }]
            },

            TodoAction::Add { .. }
            | TodoAction::Toggle { .. }
            | TodoAction::Update { .. }
            | TodoAction::Delete { .. }
            | TodoAction::SetAll { .. } => SmallVec::new(),
        }
    }
}
