//! Application configuration.
//!
//! Values come from [`AppConfig::default`], optionally overridden by
//! `TODO_SYNC_*` environment variables through [`AppConfig::from_env`].

use crate::types::RosterEntry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use todo_sync_runtime::persist::DEFAULT_PERSIST_KEY;
use todo_sync_runtime::StoreConfig;

/// Environment variable overriding [`AppConfig::collection`]
pub const ENV_COLLECTION: &str = "TODO_SYNC_COLLECTION";
/// Environment variable overriding [`AppConfig::persist_key`]
pub const ENV_PERSIST_KEY: &str = "TODO_SYNC_PERSIST_KEY";
/// Environment variable overriding [`AppConfig::data_dir`]
pub const ENV_DATA_DIR: &str = "TODO_SYNC_DATA_DIR";
/// Environment variable overriding [`AppConfig::shutdown_timeout`], in seconds
pub const ENV_SHUTDOWN_TIMEOUT_SECS: &str = "TODO_SYNC_SHUTDOWN_TIMEOUT_SECS";

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be parsed
    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },

    /// A setting is empty or out of range
    #[error("Invalid setting {field}: {reason}")]
    Invalid {
        /// Setting name
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// Configuration of the to-do client
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote collection holding the to-do documents
    pub collection: String,
    /// Storage key of the persisted state
    pub persist_key: String,
    /// Directory of the file-backed key/value store
    pub data_dir: PathBuf,
    /// How long shutdown waits for in-flight effects
    #[serde(with = "duration_secs")]
    pub shutdown_timeout: Duration,
    /// Capacity of the store's action broadcast channel
    pub broadcast_capacity: usize,
    /// Accounts known before any registration
    pub seed_roster: Vec<RosterEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            collection: "todos".to_string(),
            persist_key: DEFAULT_PERSIST_KEY.to_string(),
            data_dir: PathBuf::from(".todo-sync"),
            shutdown_timeout: Duration::from_secs(5),
            broadcast_capacity: 16,
            seed_roster: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the `TODO_SYNC_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for an unparsable variable, or the
    /// error of [`AppConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`AppConfig::from_env`], reading variables through `lookup`
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(collection) = lookup(ENV_COLLECTION) {
            config.collection = collection;
        }
        if let Some(key) = lookup(ENV_PERSIST_KEY) {
            config.persist_key = key;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_SHUTDOWN_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_SHUTDOWN_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
            config.shutdown_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the remote collection name
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Set the storage key of the persisted state
    #[must_use]
    pub fn with_persist_key(mut self, key: impl Into<String>) -> Self {
        self.persist_key = key.into();
        self
    }

    /// Set the data directory
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the accounts known at startup
    #[must_use]
    pub fn with_seed_roster(mut self, roster: Vec<RosterEntry>) -> Self {
        self.seed_roster = roster;
        self
    }

    /// Checks that names are usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty collection or persist
    /// key, or a zero broadcast capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "collection",
                reason: "must not be empty",
            });
        }
        if self.persist_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "persist_key",
                reason: "must not be empty",
            });
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "broadcast_capacity",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Store settings derived from this configuration
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.broadcast_capacity, self.shutdown_timeout)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.collection, "todos");
        assert_eq!(config.persist_key, "root");
        assert_eq!(config.data_dir, PathBuf::from(".todo-sync"));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.broadcast_capacity, 16);
        assert!(config.seed_roster.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_COLLECTION, "groceries"),
            (ENV_PERSIST_KEY, "session"),
            (ENV_DATA_DIR, "/tmp/todo"),
            (ENV_SHUTDOWN_TIMEOUT_SECS, "12"),
        ]))
        .unwrap();

        assert_eq!(config.collection, "groceries");
        assert_eq!(config.persist_key, "session");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/todo"));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(12));
    }

    #[test]
    fn unparsable_timeout_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_SHUTDOWN_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                name: ENV_SHUTDOWN_TIMEOUT_SECS,
                value: "soon".into(),
            }
        );
    }

    #[test]
    fn empty_names_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_COLLECTION, " ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "collection", .. }));

        let err = AppConfig::default().with_persist_key("").validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "persist_key", .. }));
    }

    #[test]
    fn deserializes_partial_json() {
        let config: AppConfig = serde_json::from_str(r#"{ "collection": "work", "shutdown_timeout": 2 }"#).unwrap();
        assert_eq!(config.collection, "work");
        assert_eq!(config.shutdown_timeout, Duration::from_secs(2));
        assert_eq!(config.persist_key, "root");
    }

    #[test]
    fn store_config_carries_settings() {
        let store = AppConfig::default()
            .with_broadcast_capacity(4)
            .with_shutdown_timeout(Duration::from_secs(1))
            .store_config();
        assert_eq!(store.broadcast_capacity, 4);
        assert_eq!(store.default_shutdown_timeout, Duration::from_secs(1));
    }
}
