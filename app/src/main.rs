//! Todo sync demo.
//!
//! Runs a full session against an in-memory remote collection and a
//! file-backed state store: sign up, add and edit a few to-dos, log out and
//! shut down. Run it twice to see the session rehydrated from disk.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin todo-sync
//! TODO_SYNC_DATA_DIR=/tmp/todo-sync RUST_LOG=debug cargo run --bin todo-sync
//! ```

use anyhow::Context;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use todo_sync_app::sync::decode_snapshot;
use todo_sync_app::{App, AppConfig, AppState, LoginForm, SignUpForm, TodoAction, TodoId, UserAction};
use todo_sync_core::remote::Snapshot;
use todo_sync_runtime::persist::FileStorage;
use todo_sync_testing::helpers::wait_for_state;
use todo_sync_testing::mocks::InMemoryCollection;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("todo_sync_app=debug,todo_sync_runtime=info")),
        )
        .init();

    info!("=== Todo Sync Demo ===");

    let config = AppConfig::from_env().context("loading configuration")?;
    let remote = Arc::new(InMemoryCollection::new());
    let storage = Arc::new(FileStorage::new(&config.data_dir));

    let app = App::builder(config, remote.clone(), storage)
        .start()
        .await
        .context("starting app")?;

    let returning = app.state(|s| s.user.find_account("demo@example.com").is_some()).await;
    if returning {
        info!("Known account found in persisted state, logging in");
        app.log_in(LoginForm::new("demo@example.com", "secret1")).await?;
    } else {
        app.sign_up(SignUpForm::new(
            "demo@example.com",
            "secret1",
            NaiveDate::from_ymd_opt(1990, 5, 17),
        ))
        .await?;
    }

    for text in ["milk", "eggs", "bread"] {
        app.send(TodoAction::RequestAdd { text: text.to_string() }).await?;
    }
    wait_for_state(app.store(), |s: &AppState| s.todos.len() >= 3, SETTLE_TIMEOUT).await?;

    let ids: Vec<TodoId> = app.state(|s| s.todos.todos.iter().map(|t| t.id.clone()).collect()).await;
    if let [first, second, third, ..] = ids.as_slice() {
        let requests = [
            TodoAction::RequestToggle { id: first.clone() },
            TodoAction::RequestUpdate {
                id: second.clone(),
                text: "free-range eggs".to_string(),
            },
            TodoAction::RequestDelete { id: third.clone() },
        ];
        for request in requests {
            let mut handle = app.send(request).await?;
            handle.wait_with_timeout(SETTLE_TIMEOUT).await?;
        }
    }

    // Echoes are done; the next snapshot makes the list match the remote again.
    let remote_todos = decode_snapshot(&Snapshot::new(remote.documents(&app.config().collection)));
    wait_for_state(app.store(), |s: &AppState| s.todos.todos == remote_todos, SETTLE_TIMEOUT).await?;

    app.state(|s| {
        info!(
            user = %s.user.email,
            total = s.todos.len(),
            completed = s.todos.completed_count(),
            "Session summary"
        );
        for todo in &s.todos.todos {
            info!(id = %todo.id, text = %todo.text, completed = todo.completed, "Todo");
        }
    })
    .await;

    app.send(UserAction::Logout).await?;
    app.shutdown().await.context("shutting down")?;

    info!("=== Demo complete ===");
    Ok(())
}
