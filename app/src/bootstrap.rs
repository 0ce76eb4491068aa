//! Wiring of store, persistence and change feed.
//!
//! Startup order: rehydrate, build the store with the persist writer as a
//! listener, activate the change feed. Shutdown runs in reverse so the last
//! state written is the one the store ended with.

use crate::actions::AppAction;
use crate::config::AppConfig;
use crate::environment::{AppEnvironment, LogAlerter};
use crate::error::{AppError, Result};
use crate::reducers::{app_reducer, AppReducer};
use crate::sync::{SyncAdapter, SyncSubscription};
use crate::types::{AppState, RosterEntry};
use crate::validation::{LoginForm, SignUpForm};
use std::sync::Arc;
use todo_sync_core::environment::{Alerter, Clock, SystemClock};
use todo_sync_core::remote::RemoteCollection;
use todo_sync_core::storage::KeyValueStorage;
use todo_sync_runtime::persist::{PersistWriter, Persistor};
use todo_sync_runtime::{EffectHandle, Store};
use tokio::sync::Mutex;

/// Store type of the app
pub type AppStore = Store<AppState, AppAction, AppEnvironment, AppReducer>;

/// Builder for [`App`]
pub struct AppBuilder {
    config: AppConfig,
    remote: Arc<dyn RemoteCollection>,
    storage: Arc<dyn KeyValueStorage>,
    alerter: Option<Arc<dyn Alerter>>,
    clock: Option<Arc<dyn Clock>>,
}

impl AppBuilder {
    /// Set the alerter (default: [`LogAlerter`])
    #[must_use]
    pub fn alerter(mut self, alerter: Arc<dyn Alerter>) -> Self {
        self.alerter = Some(alerter);
        self
    }

    /// Set the clock (default: [`SystemClock`])
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Rehydrates state, builds the store and activates the change feed
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] for an invalid configuration and
    /// [`AppError::Remote`] if the change feed subscription fails.
    pub async fn start(self) -> Result<App> {
        let Self {
            config,
            remote,
            storage,
            alerter,
            clock,
        } = self;
        config.validate()?;

        let persistor = Persistor::new(storage, config.persist_key.clone());
        let mut initial = persistor.rehydrate_or(AppState::default()).await;
        if initial.repair() {
            tracing::warn!(key = %persistor.key(), "Repaired inconsistent persisted state");
        }
        seed_roster(&mut initial, &config.seed_roster);

        let environment = AppEnvironment::new(
            Arc::clone(&remote),
            config.collection.clone(),
            alerter.unwrap_or_else(|| Arc::new(LogAlerter)),
        )
        .with_clock(clock.unwrap_or_else(|| Arc::new(SystemClock)));

        let writer = Arc::new(persistor.writer::<AppState>());
        writer.submit(&initial);

        let store = Store::with_config(initial, app_reducer(), environment.clone(), config.store_config())
            .with_listener(writer.clone());

        let adapter = SyncAdapter::new(remote, config.collection.clone());
        let subscription = match adapter.activate(&store).await {
            Ok(subscription) => subscription,
            Err(error) => {
                if let Err(close_error) = writer.close().await {
                    tracing::warn!(error = %close_error, "Persist writer did not close cleanly");
                }
                return Err(AppError::Remote(error));
            },
        };

        tracing::info!(collection = %config.collection, key = %persistor.key(), "App started");

        Ok(App {
            config,
            environment,
            store,
            persistor,
            writer,
            subscription: Mutex::new(Some(subscription)),
        })
    }
}

/// Adds seed accounts missing from the roster
fn seed_roster(state: &mut AppState, seed: &[RosterEntry]) {
    for entry in seed {
        if state.user.find_account(&entry.email).is_none() {
            state.user.roster.push(entry.clone());
        }
    }
}

/// A running to-do client
pub struct App {
    config: AppConfig,
    environment: AppEnvironment,
    store: AppStore,
    persistor: Persistor,
    writer: Arc<PersistWriter<AppState>>,
    subscription: Mutex<Option<SyncSubscription>>,
}

impl App {
    /// Starts building an app on `remote` and `storage`
    #[must_use]
    pub fn builder(
        config: AppConfig,
        remote: Arc<dyn RemoteCollection>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> AppBuilder {
        AppBuilder {
            config,
            remote,
            storage,
            alerter: None,
            clock: None,
        }
    }

    /// The configuration the app was started with
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The store, for dispatching and reading state
    #[must_use]
    pub const fn store(&self) -> &AppStore {
        &self.store
    }

    /// The persistor of the root state
    #[must_use]
    pub const fn persistor(&self) -> &Persistor {
        &self.persistor
    }

    /// Dispatches an action
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] once shutdown has begun.
    pub async fn send(&self, action: impl Into<AppAction>) -> Result<EffectHandle> {
        Ok(self.store.send(action.into()).await?)
    }

    /// Reads the current state
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&AppState) -> T,
    {
        self.store.state(f).await
    }

    /// Validates a sign-up form and dispatches `Register`
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] without dispatching if a field fails.
    pub async fn sign_up(&self, form: SignUpForm) -> Result<EffectHandle> {
        let action = form.submit(self.environment.clock.as_ref())?;
        self.send(action).await
    }

    /// Validates a login form and dispatches `Login`
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] without dispatching if a field fails.
    pub async fn log_in(&self, form: LoginForm) -> Result<EffectHandle> {
        let action = form.submit()?;
        self.send(action).await
    }

    /// Whether the change feed is still running
    pub async fn is_syncing(&self) -> bool {
        self.subscription
            .lock()
            .await
            .as_ref()
            .is_some_and(SyncSubscription::is_active)
    }

    /// Stops the change feed, drains the store and flushes the final state
    ///
    /// Every step runs even if an earlier one fails; the first error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if effects are still pending after the
    /// configured timeout, or [`AppError::Persist`] if the writer failed.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(subscription) = self.subscription.lock().await.take() {
            subscription.deactivate().await;
        }

        let drained = self.store.shutdown(self.config.shutdown_timeout).await;
        if let Err(error) = &drained {
            tracing::warn!(%error, "Store shutdown incomplete");
        }
        let flushed = self.writer.close().await;

        drained?;
        flushed?;
        tracing::info!("App stopped");
        Ok(())
    }
}

