//! # Todo Sync Testing
//!
//! Testing utilities and helpers for the todo sync state store.
//!
//! This crate provides:
//! - Mock implementations of environment traits and storage seams
//! - Test helpers for driving effects and awaiting store state
//! - Property-based testing strategies
//! - Assertion helpers for reducers
//!
//! ## Example
//!
//! ```ignore
//! use todo_sync_testing::{helpers::wait_for_state, mocks::InMemoryCollection};
//!
//! #[tokio::test]
//! async fn feed_reaches_store() {
//!     let remote = Arc::new(InMemoryCollection::new());
//!     let store = app_store(remote.clone());
//!     let subscription = SyncAdapter::new(remote.clone(), "todos").activate(&store).await?;
//!
//!     remote.insert("todos", fields("milk"));
//!     wait_for_state(&store, |s| s.todos.len() == 1, Duration::from_secs(1)).await?;
//! }
//! ```

use chrono::{DateTime, Utc};
use todo_sync_core::environment::{Alerter, Clock};

mod collection_mocks;
mod storage_mocks;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Alerter, Clock, DateTime, Utc};
    use std::sync::Mutex;

    pub use crate::collection_mocks::{InMemoryCollection, WriteRecord};
    pub use crate::storage_mocks::InMemoryStorage;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use todo_sync_testing::mocks::FixedClock;
    /// use todo_sync_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .map_or(DateTime::<Utc>::UNIX_EPOCH, |t| t.with_timezone(&Utc)),
        )
    }

    /// One alert captured by [`RecordingAlerter`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedAlert {
        /// Alert title
        pub title: String,
        /// Alert body
        pub message: String,
    }

    /// Alerter that records every alert instead of showing it
    #[derive(Debug, Default)]
    pub struct RecordingAlerter {
        alerts: Mutex<Vec<RecordedAlert>>,
    }

    impl RecordingAlerter {
        /// Create an alerter with no recorded alerts
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// All alerts raised so far, oldest first
        #[must_use]
        pub fn alerts(&self) -> Vec<RecordedAlert> {
            self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
        }

        /// Messages of all alerts raised so far
        #[must_use]
        pub fn messages(&self) -> Vec<String> {
            self.alerts().into_iter().map(|a| a.message).collect()
        }
    }

    impl Alerter for RecordingAlerter {
        fn alert(&self, title: &str, message: &str) {
            if let Ok(mut alerts) = self.alerts.lock() {
                alerts.push(RecordedAlert {
                    title: title.to_string(),
                    message: message.to_string(),
                });
            }
        }
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use futures::future::{join_all, BoxFuture};
    use std::time::Duration;
    use todo_sync_core::{effect::Effect, reducer::Reducer};
    use todo_sync_runtime::{Store, StoreError};

    /// Execute effects outside a store and collect the actions they produce
    ///
    /// `Parallel` children run concurrently and their actions are returned in
    /// declaration order; `Sequential` children run one after another.
    pub async fn run_effects<A, I>(effects: I) -> Vec<A>
    where
        A: Send + 'static,
        I: IntoIterator<Item = Effect<A>>,
    {
        let mut actions = Vec::new();
        for effect in effects {
            actions.extend(run_effect(effect).await);
        }
        actions
    }

    fn run_effect<A: Send + 'static>(effect: Effect<A>) -> BoxFuture<'static, Vec<A>> {
        Box::pin(async move {
            match effect {
                Effect::None => Vec::new(),
                Effect::Future(fut) => fut.await.into_iter().collect(),
                Effect::Parallel(effects) => join_all(effects.into_iter().map(run_effect))
                    .await
                    .into_iter()
                    .flatten()
                    .collect(),
                Effect::Sequential(effects) => {
                    let mut actions = Vec::new();
                    for effect in effects {
                        actions.extend(run_effect(effect).await);
                    }
                    actions
                },
            }
        })
    }

    /// Poll store state until `predicate` holds
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the predicate does not hold within `timeout`.
    pub async fn wait_for_state<S, A, E, R, F>(
        store: &Store<S, A, E, R>,
        predicate: F,
        timeout: Duration,
    ) -> Result<(), StoreError>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + std::fmt::Debug + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
        F: Fn(&S) -> bool,
    {
        tokio::time::timeout(timeout, async {
            while !store.state(&predicate).await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)
    }
}

/// Property-based testing strategies using proptest.
pub mod properties {
    use proptest::prelude::*;
    use serde_json::json;
    use todo_sync_core::remote::{Document, DocumentId, Fields, Snapshot};

    /// Remote-style document ids drawn from a small pool, so collisions happen
    pub fn document_id() -> impl Strategy<Value = DocumentId> {
        (0u8..12).prop_map(|n| DocumentId::new(format!("doc-{n}")))
    }

    /// Non-empty todo text
    pub fn todo_text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 ]{1,24}"
    }

    /// Well-formed todo document fields
    pub fn todo_fields() -> impl Strategy<Value = Fields> {
        (todo_text(), any::<bool>()).prop_map(|(text, completed)| {
            let mut fields = Fields::new();
            fields.insert("text".into(), json!(text));
            fields.insert("completed".into(), json!(completed));
            fields
        })
    }

    /// Snapshot of up to `max_documents` documents; ids may repeat
    pub fn snapshot(max_documents: usize) -> impl Strategy<Value = Snapshot> {
        prop::collection::vec((document_id(), todo_fields()), 0..=max_documents).prop_map(
            |docs| Snapshot::new(docs.into_iter().map(|(id, f)| Document::new(id, f)).collect()),
        )
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock, InMemoryCollection, InMemoryStorage, RecordingAlerter};
pub use reducer_test::{assertions, ReducerTest};

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::helpers::run_effects;
    use super::*;
    use todo_sync_core::effect::Effect;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn recording_alerter_keeps_order() {
        let alerter = RecordingAlerter::new();
        alerter.alert("A", "first");
        alerter.alert("B", "second");
        assert_eq!(alerter.messages(), vec!["first", "second"]);
        assert_eq!(alerter.alerts()[1].title, "B");
    }

    #[tokio::test]
    async fn run_effects_flattens_in_order() {
        let effects = vec![
            Effect::future(async { Some(1) }),
            Effect::merge(vec![
                Effect::future(async { Some(2) }),
                Effect::None,
                Effect::future(async { None }),
            ]),
            Effect::chain(vec![
                Effect::future(async { Some(3) }),
                Effect::future(async { Some(4) }),
            ]),
        ];

        assert_eq!(run_effects(effects).await, vec![1, 2, 3, 4]);
    }
}
