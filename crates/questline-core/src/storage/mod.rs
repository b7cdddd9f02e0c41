mod config;
pub mod database;
pub mod memory;
pub mod migrations;

pub use config::{BonusConfig, EngineConfig, StreakConfig};
pub use database::ProgressDb;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::error::{ConfigError, CoreError, StoreError};

/// Returns `~/.config/questline[-dev]/` based on QUESTLINE_ENV.
///
/// Set QUESTLINE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("QUESTLINE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("questline-dev")
    } else {
        base_dir.join("questline")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}

/// Record family stored per account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Domain {
    Xp,
    Activities,
    Counters,
    Badges,
    Streak,
    Skill(String),
}

impl Domain {
    pub fn key(&self) -> String {
        match self {
            Domain::Xp => "xp".to_string(),
            Domain::Activities => "activities".to_string(),
            Domain::Counters => "counters".to_string(),
            Domain::Badges => "badges".to_string(),
            Domain::Streak => "streak".to_string(),
            Domain::Skill(name) => format!("skill:{name}"),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Unit of work run against one account's records.
pub type AccountWork<'a> = dyn FnMut(&dyn ProgressStore) -> Result<(), CoreError> + 'a;

/// Keyed JSON records per account and domain.
///
/// Implementations must be consistent per key: a successful `set` is visible
/// to every later `get`.
pub trait ProgressStore {
    fn get(&self, account_id: &str, domain: &Domain) -> Result<Option<serde_json::Value>, StoreError>;

    fn set(&self, account_id: &str, domain: &Domain, value: &serde_json::Value) -> Result<(), StoreError>;

    /// Run `work` with exclusive access to `account_id`'s records.
    ///
    /// `work` must only touch the store it is handed. Stores shared between
    /// processes serialise here; an error from `work` is returned as is, and
    /// stores that can roll back discard the writes `work` made.
    fn with_account(&self, account_id: &str, work: &mut AccountWork<'_>) -> Result<(), CoreError>;
}

impl<S: ProgressStore + ?Sized> ProgressStore for &S {
    fn get(&self, account_id: &str, domain: &Domain) -> Result<Option<serde_json::Value>, StoreError> {
        (**self).get(account_id, domain)
    }

    fn set(&self, account_id: &str, domain: &Domain, value: &serde_json::Value) -> Result<(), StoreError> {
        (**self).set(account_id, domain, value)
    }

    fn with_account(&self, account_id: &str, work: &mut AccountWork<'_>) -> Result<(), CoreError> {
        (**self).with_account(account_id, work)
    }
}

impl<S: ProgressStore + ?Sized> ProgressStore for std::sync::Arc<S> {
    fn get(&self, account_id: &str, domain: &Domain) -> Result<Option<serde_json::Value>, StoreError> {
        (**self).get(account_id, domain)
    }

    fn set(&self, account_id: &str, domain: &Domain, value: &serde_json::Value) -> Result<(), StoreError> {
        (**self).set(account_id, domain, value)
    }

    fn with_account(&self, account_id: &str, work: &mut AccountWork<'_>) -> Result<(), CoreError> {
        (**self).with_account(account_id, work)
    }
}

/// Read a typed record, falling back to `T::default()` when it is absent or
/// does not parse. Corrupt records are logged, never surfaced.
pub fn load_or_default<T>(
    store: &dyn ProgressStore,
    account_id: &str,
    domain: &Domain,
) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    load_or_else(store, account_id, domain, T::default)
}

/// Like [`load_or_default`] with a caller-supplied default.
pub fn load_or_else<T, F>(
    store: &dyn ProgressStore,
    account_id: &str,
    domain: &Domain,
    default: F,
) -> Result<T, StoreError>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match store.get(account_id, domain)? {
        None => Ok(default()),
        Some(value) => match serde_json::from_value(value) {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::warn!(
                    account_id,
                    domain = %domain,
                    error = %e,
                    "corrupt progress record, reinitialising to default"
                );
                Ok(default())
            }
        },
    }
}

/// Serialize and write a typed record.
pub fn save<T: Serialize>(
    store: &dyn ProgressStore,
    account_id: &str,
    domain: &Domain,
    record: &T,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(record)
        .map_err(|e| StoreError::Backend(format!("cannot encode {domain}: {e}")))?;
    store.set(account_id, domain, &value)
}
