//! Dependencies injected into the reducers.

use std::sync::Arc;
use todo_sync_core::environment::{Alerter, Clock, SystemClock};
use todo_sync_core::remote::RemoteCollection;

/// Environment shared by every reducer of the app
#[derive(Clone)]
pub struct AppEnvironment {
    /// Remote document collection holding the to-do list
    pub remote: Arc<dyn RemoteCollection>,
    /// Name of the to-do collection
    pub collection: String,
    /// User-facing notifications
    pub alerter: Arc<dyn Alerter>,
    /// Time source for date validation
    pub clock: Arc<dyn Clock>,
}

impl AppEnvironment {
    /// Creates an environment using the system clock
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteCollection>,
        collection: impl Into<String>,
        alerter: Arc<dyn Alerter>,
    ) -> Self {
        Self {
            remote,
            collection: collection.into(),
            alerter,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Alerter that writes alerts to the log
///
/// Used when no UI is attached, e.g. by the demo binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlerter;

impl Alerter for LogAlerter {
    fn alert(&self, title: &str, message: &str) {
        tracing::warn!(%title, %message, "Alert");
    }
}
