//! Integration tests for state persistence
//!
//! Covers rehydration, the background writer registered as a store listener,
//! and the file-backed storage.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use todo_sync_core::storage::KeyValueStorage;
use todo_sync_core::{effect::Effect, reducer::Reducer, SmallVec};
use todo_sync_runtime::persist::{FileStorage, PersistError, Persistor, DEFAULT_PERSIST_KEY};
use todo_sync_runtime::Store;
use todo_sync_testing::mocks::InMemoryStorage;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct NotesState {
    notes: Vec<String>,
}

#[derive(Debug, Clone)]
enum NotesAction {
    Push(String),
    Clear,
}

struct NotesReducer;

impl Reducer for NotesReducer {
    type State = NotesState;
    type Action = NotesAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            NotesAction::Push(note) => state.notes.push(note),
            NotesAction::Clear => state.notes.clear(),
        }
        SmallVec::new()
    }
}

fn notes(items: &[&str]) -> NotesState {
    NotesState {
        notes: items.iter().map(|s| (*s).to_string()).collect(),
    }
}

#[tokio::test]
async fn rehydrate_without_persisted_state_is_none() {
    let storage = Arc::new(InMemoryStorage::new());
    let persistor = Persistor::new(storage, DEFAULT_PERSIST_KEY);

    let state: Option<NotesState> = persistor.rehydrate().await.unwrap();
    assert_eq!(state, None);
    assert_eq!(persistor.rehydrate_or(notes(&["fresh"])).await, notes(&["fresh"]));
}

#[tokio::test]
async fn save_then_rehydrate_returns_same_state() {
    let storage = Arc::new(InMemoryStorage::new());
    let persistor = Persistor::new(storage.clone(), "root");

    persistor.save(&notes(&["a", "b"])).await.unwrap();

    let restored: Option<NotesState> = persistor.rehydrate().await.unwrap();
    assert_eq!(restored, Some(notes(&["a", "b"])));
    assert!(storage.get("root").is_some());
}

#[tokio::test]
async fn corrupt_state_falls_back_to_initial() {
    let storage = Arc::new(InMemoryStorage::new());
    storage.save("root", b"{ definitely not state".to_vec()).await.unwrap();
    let persistor = Persistor::new(storage, "root");

    let result: Result<Option<NotesState>, _> = persistor.rehydrate().await;
    assert!(matches!(result, Err(PersistError::Decode(_))));
    assert_eq!(persistor.rehydrate_or(NotesState::default()).await, NotesState::default());
}

#[tokio::test]
async fn unreadable_storage_falls_back_to_initial() {
    let storage = Arc::new(InMemoryStorage::new());
    storage.save("root", b"{}".to_vec()).await.unwrap();
    storage.fail_loads(true);
    let persistor = Persistor::new(storage, "root");

    let result: Result<Option<NotesState>, _> = persistor.rehydrate().await;
    assert!(matches!(result, Err(PersistError::Storage(_))));
    assert_eq!(persistor.rehydrate_or(notes(&["fresh"])).await, notes(&["fresh"]));
}

#[tokio::test]
async fn writer_persists_latest_state_on_close() {
    let storage = Arc::new(InMemoryStorage::new());
    let persistor = Persistor::new(storage.clone(), "root");
    let writer = Arc::new(persistor.writer::<NotesState>());

    let store = Store::new(NotesState::default(), NotesReducer, ()).with_listener(writer.clone());
    store.send(NotesAction::Push("one".into())).await.unwrap();
    store.send(NotesAction::Push("two".into())).await.unwrap();
    store.send(NotesAction::Push("three".into())).await.unwrap();

    writer.close().await.unwrap();

    let restored: Option<NotesState> = persistor.rehydrate().await.unwrap();
    assert_eq!(restored, Some(notes(&["one", "two", "three"])));
}

#[tokio::test]
async fn slow_storage_coalesces_to_last_state() {
    let storage = Arc::new(InMemoryStorage::new());
    storage.set_save_delay(Duration::from_millis(20));
    let persistor = Persistor::new(storage.clone(), "root");
    let writer = persistor.writer::<NotesState>();

    for i in 0..10 {
        writer.submit(&notes(&[&i.to_string()]));
    }
    writer.close().await.unwrap();

    let restored: Option<NotesState> = persistor.rehydrate().await.unwrap();
    assert_eq!(restored, Some(notes(&["9"])));
    assert!(storage.save_count() < 10, "writes should coalesce, got {}", storage.save_count());
}

#[tokio::test]
async fn failed_writes_do_not_stop_the_writer() {
    let storage = Arc::new(InMemoryStorage::new());
    let persistor = Persistor::new(storage.clone(), "root");
    let writer = persistor.writer::<NotesState>();

    storage.fail_saves(true);
    writer.submit(&notes(&["lost"]));
    tokio::time::sleep(Duration::from_millis(20)).await;

    storage.fail_saves(false);
    writer.submit(&notes(&["kept"]));
    writer.close().await.unwrap();

    let restored: Option<NotesState> = persistor.rehydrate().await.unwrap();
    assert_eq!(restored, Some(notes(&["kept"])));
}

#[tokio::test]
async fn close_twice_is_a_no_op() {
    let storage = Arc::new(InMemoryStorage::new());
    let writer = Persistor::new(storage, "root").writer::<NotesState>();

    writer.close().await.unwrap();
    writer.close().await.unwrap();
    writer.submit(&notes(&["after close"]));
}

#[tokio::test]
async fn purge_removes_persisted_state() {
    let storage = Arc::new(InMemoryStorage::new());
    let persistor = Persistor::new(storage, "root");

    persistor.save(&notes(&["x"])).await.unwrap();
    persistor.purge().await.unwrap();

    let restored: Option<NotesState> = persistor.rehydrate().await.unwrap();
    assert_eq!(restored, None);
}

#[tokio::test]
async fn file_storage_survives_reopen() {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let dir = std::env::temp_dir().join(format!("todo-sync-persist-{}-{nanos}", std::process::id()));

    {
        let persistor = Persistor::new(Arc::new(FileStorage::new(&dir)), "root");
        let writer = Arc::new(persistor.writer::<NotesState>());
        let store = Store::new(NotesState::default(), NotesReducer, ()).with_listener(writer.clone());
        store.send(NotesAction::Push("milk".into())).await.unwrap();
        store.send(NotesAction::Push("eggs".into())).await.unwrap();
        writer.close().await.unwrap();
    }

    let reopened = Persistor::new(Arc::new(FileStorage::new(&dir)), "root");
    let restored: Option<NotesState> = reopened.rehydrate().await.unwrap();
    assert_eq!(restored, Some(notes(&["milk", "eggs"])));

    reopened.purge().await.unwrap();
    let storage = FileStorage::new(&dir);
    assert_eq!(storage.load("root").await.unwrap(), None);
    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn clear_action_is_persisted_too() {
    let storage = Arc::new(InMemoryStorage::new());
    let persistor = Persistor::new(storage, "root");
    let writer = Arc::new(persistor.writer::<NotesState>());
    let store = Store::new(notes(&["stale"]), NotesReducer, ()).with_listener(writer.clone());

    store.send(NotesAction::Clear).await.unwrap();
    writer.close().await.unwrap();

    let restored: Option<NotesState> = persistor.rehydrate().await.unwrap();
    assert_eq!(restored, Some(NotesState::default()));
}
