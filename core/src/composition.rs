//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers in various ways:
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//! - **`scope_reducer`**: Focus a child reducer on a slice of parent state and
//!   the subset of parent actions addressed to it
//!
//! Together they build a root reducer out of per-domain reducers, each owning
//! one slice of the root state.

use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in sequence, and all effects are collected and concatenated.
///
/// # Examples
///
/// ```
/// use todo_sync_core::composition::combine_reducers;
/// use todo_sync_core::{effect::Effect, reducer::Reducer, SmallVec};
///
/// #[derive(Clone, Default)]
/// struct AppState {
///     counter: i32,
///     logged: bool,
/// }
///
/// #[derive(Clone)]
/// enum AppAction {
///     Increment,
///     Log,
/// }
///
/// struct CounterReducer;
/// struct LoggingReducer;
///
/// impl Reducer for CounterReducer {
///     type State = AppState;
///     type Action = AppAction;
///     type Environment = ();
///
///     fn reduce(&self, state: &mut AppState, action: AppAction, _env: &()) -> SmallVec<[Effect<AppAction>; 4]> {
///         if matches!(action, AppAction::Increment) {
///             state.counter += 1;
///         }
///         SmallVec::new()
///     }
/// }
///
/// impl Reducer for LoggingReducer {
///     type State = AppState;
///     type Action = AppAction;
///     type Environment = ();
///
///     fn reduce(&self, state: &mut AppState, action: AppAction, _env: &()) -> SmallVec<[Effect<AppAction>; 4]> {
///         if matches!(action, AppAction::Log) {
///             state.logged = true;
///         }
///         SmallVec::new()
///     }
/// }
///
/// let combined = combine_reducers(vec![Box::new(CounterReducer), Box::new(LoggingReducer)]);
///
/// let mut state = AppState::default();
/// let _ = combined.reduce(&mut state, AppAction::Increment, &());
/// assert_eq!(state.counter, 1);
/// ```
#[must_use]
pub fn combine_reducers<S, A, E>(
    reducers: Vec<Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>>,
) -> CombinedReducer<S, A, E>
where
    A: Clone,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E> {
    reducers: Vec<Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>>,
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    A: Clone,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut all_effects = SmallVec::new();

        for reducer in &self.reducers {
            let effects = reducer.reduce(state, action.clone(), env);
            all_effects.extend(effects);
        }

        all_effects
    }
}

/// Scopes a child reducer to a slice of a larger state and action type.
///
/// - `state`: borrows the child slice mutably out of the parent state
/// - `extract`: picks the child action out of a parent action, `None` when the
///   action is addressed to another slice (the child is then skipped)
/// - `embed`: wraps child actions produced by effects back into parent actions
///
/// The child reducer receives the same environment as the parent.
///
/// # Examples
///
/// ```
/// use todo_sync_core::composition::scope_reducer;
/// use todo_sync_core::{effect::Effect, reducer::Reducer, SmallVec};
///
/// #[derive(Clone, Default)]
/// struct CounterState {
///     count: i32,
/// }
///
/// #[derive(Clone)]
/// enum CounterAction {
///     Increment,
/// }
///
/// struct CounterReducer;
///
/// impl Reducer for CounterReducer {
///     type State = CounterState;
///     type Action = CounterAction;
///     type Environment = ();
///
///     fn reduce(&self, state: &mut CounterState, action: CounterAction, _env: &()) -> SmallVec<[Effect<CounterAction>; 4]> {
///         match action {
///             CounterAction::Increment => state.count += 1,
///         }
///         SmallVec::new()
///     }
/// }
///
/// #[derive(Clone, Default)]
/// struct AppState {
///     counter: CounterState,
///     title: String,
/// }
///
/// #[derive(Clone)]
/// enum AppAction {
///     Counter(CounterAction),
///     Rename(String),
/// }
///
/// let scoped = scope_reducer(
///     CounterReducer,
///     |app: &mut AppState| &mut app.counter,
///     |action: AppAction| match action {
///         AppAction::Counter(inner) => Some(inner),
///         AppAction::Rename(_) => None,
///     },
///     AppAction::Counter,
/// );
///
/// let mut state = AppState::default();
/// let _ = scoped.reduce(&mut state, AppAction::Counter(CounterAction::Increment), &());
/// let _ = scoped.reduce(&mut state, AppAction::Rename("ignored".into()), &());
/// assert_eq!(state.counter.count, 1);
/// ```
pub fn scope_reducer<S, SubS, A, SubA, E, R>(
    reducer: R,
    state: fn(&mut S) -> &mut SubS,
    extract: fn(A) -> Option<SubA>,
    embed: fn(SubA) -> A,
) -> ScopedReducer<S, SubS, A, SubA, E, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = E>,
{
    ScopedReducer {
        reducer,
        state,
        extract,
        embed,
    }
}

/// A scoped reducer that operates on a slice of state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, A, SubA, E, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = E>,
{
    reducer: R,
    state: fn(&mut S) -> &mut SubS,
    extract: fn(A) -> Option<SubA>,
    embed: fn(SubA) -> A,
}

impl<S, SubS, A, SubA, E, R> Reducer for ScopedReducer<S, SubS, A, SubA, E, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = E>,
    A: Send + 'static,
    SubA: Send + 'static,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let Some(child_action) = (self.extract)(action) else {
            return SmallVec::new();
        };

        let child_state = (self.state)(state);
        self.reducer
            .reduce(child_state, child_action, env)
            .into_iter()
            .map(|effect| effect.map(self.embed))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smallvec;

    #[derive(Clone, Default)]
    struct SubState {
        value: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum SubAction {
        Add(i32),
        Announce,
        Announced(i32),
    }

    struct SubReducer;

    impl Reducer for SubReducer {
        type State = SubState;
        type Action = SubAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                SubAction::Add(n) => {
                    state.value += n;
                    SmallVec::new()
                },
                SubAction::Announce => {
                    let value = state.value;
                    smallvec![Effect::future(async move { Some(SubAction::Announced(value)) })]
                },
                SubAction::Announced(_) => SmallVec::new(),
            }
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    enum LabelAction {
        Rename(String),
        Renamed,
    }

    struct LabelReducer;

    impl Reducer for LabelReducer {
        type State = String;
        type Action = LabelAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                LabelAction::Rename(label) => {
                    *state = label;
                    smallvec![Effect::future(async { Some(LabelAction::Renamed) })]
                },
                LabelAction::Renamed => SmallVec::new(),
            }
        }
    }

    #[derive(Clone, Default)]
    struct ParentState {
        sub: SubState,
        label: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum ParentAction {
        Sub(SubAction),
        Label(LabelAction),
    }

    impl ParentAction {
        fn into_sub(self) -> Option<SubAction> {
            match self {
                Self::Sub(inner) => Some(inner),
                Self::Label(_) => None,
            }
        }

        fn into_label(self) -> Option<LabelAction> {
            match self {
                Self::Label(inner) => Some(inner),
                Self::Sub(_) => None,
            }
        }
    }

    fn scoped() -> ScopedReducer<ParentState, SubState, ParentAction, SubAction, (), SubReducer> {
        scope_reducer(
            SubReducer,
            |parent: &mut ParentState| &mut parent.sub,
            ParentAction::into_sub,
            ParentAction::Sub,
        )
    }

    fn both_slices() -> CombinedReducer<ParentState, ParentAction, ()> {
        combine_reducers(vec![
            Box::new(scoped()),
            Box::new(scope_reducer(
                LabelReducer,
                |parent: &mut ParentState| &mut parent.label,
                ParentAction::into_label,
                ParentAction::Label,
            )),
        ])
    }

    #[tokio::test]
    async fn test_combined_slices_route_each_action_to_its_owner() {
        let reducer = both_slices();
        let mut state = ParentState::default();

        let effects = reducer.reduce(&mut state, ParentAction::Sub(SubAction::Add(4)), &());
        assert!(effects.is_empty());
        assert_eq!(state.sub.value, 4);
        assert!(state.label.is_empty());

        let mut effects = reducer.reduce(
            &mut state,
            ParentAction::Label(LabelAction::Rename("groceries".to_string())),
            &(),
        );
        assert_eq!(state.label, "groceries");
        assert_eq!(state.sub.value, 4);
        assert_eq!(effects.len(), 1);
        let Some(Effect::Future(fut)) = effects.pop() else {
            unreachable!("rename produces a future effect");
        };
        assert_eq!(fut.await, Some(ParentAction::Label(LabelAction::Renamed)));
    }

    #[test]
    fn test_scope_reducer_updates_slice_only() {
        let reducer = scoped();
        let mut state = ParentState {
            sub: SubState { value: 5 },
            label: "test".to_string(),
        };

        let _ = reducer.reduce(&mut state, ParentAction::Sub(SubAction::Add(3)), &());
        assert_eq!(state.sub.value, 8);
        assert_eq!(state.label, "test");

        let effects = reducer.reduce(&mut state, ParentAction::Label(LabelAction::Renamed), &());
        assert!(effects.is_empty());
        assert_eq!(state.sub.value, 8);
    }

    #[tokio::test]
    async fn test_scope_reducer_embeds_effect_actions() {
        let reducer = scoped();
        let mut state = ParentState::default();
        let _ = reducer.reduce(&mut state, ParentAction::Sub(SubAction::Add(2)), &());

        let mut effects = reducer.reduce(&mut state, ParentAction::Sub(SubAction::Announce), &());
        assert_eq!(effects.len(), 1);
        let Some(Effect::Future(fut)) = effects.pop() else {
            unreachable!("announce produces a future effect");
        };
        assert_eq!(fut.await, Some(ParentAction::Sub(SubAction::Announced(2))));
    }
}
