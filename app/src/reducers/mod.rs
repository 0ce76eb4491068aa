//! Reducers of the app and their composition into the root reducer.
//!
//! The root state has two slices. `user` is owned by [`UserReducer`]; `todos`
//! is shared by [`TodoReducer`] (local mutations) and [`SyncReducer`] (remote
//! writes), which see every to-do action in that order.

pub mod todos;
pub mod user;

use crate::actions::AppAction;
use crate::environment::AppEnvironment;
use crate::sync::SyncReducer;
use crate::types::{AppState, TodoState, UserState};
use todo_sync_core::composition::{combine_reducers, scope_reducer, CombinedReducer};

pub use todos::TodoReducer;
pub use user::UserReducer;

/// Root reducer type
pub type AppReducer = CombinedReducer<AppState, AppAction, AppEnvironment>;

fn user_slice(state: &mut AppState) -> &mut UserState {
    &mut state.user
}

fn todo_slice(state: &mut AppState) -> &mut TodoState {
    &mut state.todos
}

/// Builds the root reducer
#[must_use]
pub fn app_reducer() -> AppReducer {
    let todos = combine_reducers(vec![Box::new(TodoReducer::new()), Box::new(SyncReducer::new())]);

    combine_reducers(vec![
        Box::new(scope_reducer(
            UserReducer::new(),
            user_slice,
            AppAction::into_user,
            AppAction::User,
        )),
        Box::new(scope_reducer(todos, todo_slice, AppAction::into_todo, AppAction::Todo)),
    ])
}
