//! Reducer and store benchmarks for the to-do client
//!
//! - `SetAll` cost as snapshots grow (dedup included)
//! - Local mutations on a populated list
//! - Store round trip with the persist writer attached
//!
//! Run with: `cargo bench -p todo-sync-app`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use todo_sync_app::{
    app_reducer, AppAction, AppEnvironment, AppState, Todo, TodoAction, TodoReducer, TodoState,
};
use todo_sync_core::reducer::Reducer;
use todo_sync_runtime::persist::Persistor;
use todo_sync_runtime::Store;
use todo_sync_testing::mocks::{InMemoryCollection, InMemoryStorage, RecordingAlerter};

fn env() -> AppEnvironment {
    AppEnvironment::new(
        Arc::new(InMemoryCollection::new()),
        "todos",
        Arc::new(RecordingAlerter::new()),
    )
}

fn todos(count: usize) -> Vec<Todo> {
    (0..count)
        .map(|i| Todo::new(format!("doc-{i}"), format!("item {i}")).with_completed(i % 3 == 0))
        .collect()
}

fn benchmark_set_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_all");
    let env = env();

    for size in [10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(size as u64));
        let snapshot = todos(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &snapshot, |b, snapshot| {
            let mut state = TodoState::new();
            b.iter(|| {
                let _effects = TodoReducer.reduce(
                    &mut state,
                    black_box(TodoAction::SetAll { todos: snapshot.clone() }),
                    &env,
                );
            });
        });
    }

    group.finish();
}

fn benchmark_local_mutations(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_mutations");
    group.throughput(Throughput::Elements(1));
    let env = env();

    group.bench_function("toggle_last_of_1000", |b| {
        let mut state = TodoState { todos: todos(1_000) };
        b.iter(|| {
            let _effects = TodoReducer.reduce(
                &mut state,
                black_box(TodoAction::Toggle { id: "doc-999".into() }),
                &env,
            );
        });
    });

    group.bench_function("update_first_of_1000", |b| {
        let mut state = TodoState { todos: todos(1_000) };
        b.iter(|| {
            let _effects = TodoReducer.reduce(
                &mut state,
                black_box(TodoAction::Update {
                    id: "doc-0".into(),
                    text: "bread".into(),
                }),
                &env,
            );
        });
    });

    group.finish();
}

fn benchmark_store_with_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_persist");
    group.throughput(Throughput::Elements(1));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    group.bench_function("set_all_100_with_writer", |b| {
        let store = runtime.block_on(async {
            let persistor = Persistor::new(Arc::new(InMemoryStorage::new()), "root");
            let writer = Arc::new(persistor.writer::<AppState>());
            Store::new(AppState::default(), app_reducer(), env()).with_listener(writer)
        });
        let snapshot = todos(100);

        b.to_async(&runtime).iter(|| async {
            let _ = store
                .send(black_box(AppAction::Todo(TodoAction::SetAll {
                    todos: snapshot.clone(),
                })))
                .await;
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_set_all,
    benchmark_local_mutations,
    benchmark_store_with_persistence
);
criterion_main!(benches);
