use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use propwise_config::{StoreBackend, StoreConfig, store_path};
use propwise_core::PreferenceVector;
use thiserror::Error;

mod json_file;
mod sqlite;

pub use json_file::JsonFilePreferenceStore;
pub use sqlite::SqlitePreferenceStore;

/// Preference fields exactly as persisted. Any field may be missing from an
/// externally edited store; callers fill the gaps with defaults.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StoredPreferences {
    pub w_roi: Option<f64>,
    pub w_risk: Option<f64>,
    pub w_budget: Option<f64>,
    pub interactions: Option<u64>,
}

impl From<PreferenceVector> for StoredPreferences {
    fn from(vector: PreferenceVector) -> Self {
        Self {
            w_roi: Some(vector.weights.w_roi),
            w_risk: Some(vector.weights.w_risk),
            w_budget: Some(vector.weights.w_budget),
            interactions: Some(vector.interactions),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid preference record for '{user_key}': {reason}")]
    InvalidRecord { user_key: String, reason: String },
}

pub trait PreferenceStore {
    fn get_preferences(&self, user_key: &str) -> Result<Option<StoredPreferences>, StoreError>;
    fn upsert_preferences(
        &self,
        user_key: &str,
        vector: &PreferenceVector,
    ) -> Result<(), StoreError>;
    /// Reads the entry for `user_key`, passes it to `apply` and writes the result back
    /// without any other writer interleaving. Entries of other users are untouched.
    fn update_preferences(
        &self,
        user_key: &str,
        apply: &mut dyn FnMut(Option<StoredPreferences>) -> PreferenceVector,
    ) -> Result<PreferenceVector, StoreError>;
    fn list_user_keys(&self) -> Result<Vec<String>, StoreError>;
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for Box<T> {
    fn get_preferences(&self, user_key: &str) -> Result<Option<StoredPreferences>, StoreError> {
        (**self).get_preferences(user_key)
    }

    fn upsert_preferences(
        &self,
        user_key: &str,
        vector: &PreferenceVector,
    ) -> Result<(), StoreError> {
        (**self).upsert_preferences(user_key, vector)
    }

    fn update_preferences(
        &self,
        user_key: &str,
        apply: &mut dyn FnMut(Option<StoredPreferences>) -> PreferenceVector,
    ) -> Result<PreferenceVector, StoreError> {
        (**self).update_preferences(user_key, apply)
    }

    fn list_user_keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).list_user_keys()
    }
}

pub fn open_preference_store(
    workspace_root: impl AsRef<Path>,
    config: &StoreConfig,
) -> Result<Box<dyn PreferenceStore>, StoreError> {
    let path = store_path(workspace_root, config);
    tracing::debug!(
        backend = config.backend.as_str(),
        path = %path.display(),
        "opening preference store"
    );

    match config.backend {
        StoreBackend::Sqlite => Ok(Box::new(SqlitePreferenceStore::open(&path)?)),
        StoreBackend::Json => Ok(Box::new(JsonFilePreferenceStore::open(&path)?)),
    }
}

pub(crate) fn current_unix_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}
