//! Reducer for the local to-do list.
//!
//! Applies echoes and snapshots. Requests and write outcomes belong to the
//! sync reducer and are ignored here.

use crate::actions::TodoAction;
use crate::environment::AppEnvironment;
use crate::types::{Todo, TodoId, TodoState};
use todo_sync_core::{effect::Effect, reducer::Reducer, SmallVec};

/// Reducer for the to-do slice
#[derive(Clone, Debug, Default)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn add(state: &mut TodoState, id: TodoId, text: String) {
        // The snapshot carrying this document may have been applied already.
        if state.contains(&id) {
            tracing::debug!(%id, "Add for existing todo ignored");
            return;
        }
        state.todos.push(Todo::new(id, text));
    }
}

impl Reducer for TodoReducer {
    type State = TodoState;
    type Action = TodoAction;
    type Environment = AppEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TodoAction::Add { id, text } => Self::add(state, id, text),
            TodoAction::Toggle { id } => {
                if let Some(todo) = state.get_mut(&id) {
                    todo.completed = !todo.completed;
                }
            },
            TodoAction::Update { id, text } => {
                if let Some(todo) = state.get_mut(&id) {
                    todo.text = text;
                }
            },
            TodoAction::Delete { id } => state.todos.retain(|todo| todo.id != id),
            TodoAction::SetAll { todos } => *state = TodoState::from_unique_last(todos),

            TodoAction::RequestAdd { .. }
            | TodoAction::RequestToggle { .. }
            | TodoAction::RequestUpdate { .. }
            | TodoAction::RequestDelete { .. }
            | TodoAction::WriteFailed { .. } => {},
        }

        SmallVec::new()
    }
}
