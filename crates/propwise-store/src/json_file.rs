use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use propwise_core::PreferenceVector;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{PreferenceStore, StoreError, StoredPreferences};

/// Whole-document preference store: `{"users": {"<key>": {w_roi, w_risk, w_budget,
/// interactions}}}`. Every mutation re-reads the document under an exclusive lock,
/// replaces one entry and swaps the file in with a rename.
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    lock_path: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferenceDocument {
    #[serde(default)]
    users: Map<String, Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl JsonFilePreferenceStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock_path = sibling_path(&path, "lock");

        Ok(Self { path, lock_path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_lock_file(&self) -> Result<File, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        Ok(file)
    }

    fn read_document(&self) -> Result<PreferenceDocument, StoreError> {
        if !self.path.exists() {
            return Ok(PreferenceDocument::default());
        }

        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(PreferenceDocument::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_document(&self, document: &PreferenceDocument) -> Result<(), StoreError> {
        let staging = sibling_path(&self.path, "tmp");
        let content = serde_json::to_string_pretty(document)?;
        fs::write(&staging, content)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn with_exclusive_lock<T>(
        &self,
        work: impl FnOnce() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let lock = self.open_lock_file()?;
        FileExt::lock_exclusive(&lock)?;
        release_after(lock, work())
    }

    fn with_shared_lock<T>(
        &self,
        work: impl FnOnce() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let lock = self.open_lock_file()?;
        FileExt::lock_shared(&lock)?;
        release_after(lock, work())
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get_preferences(&self, user_key: &str) -> Result<Option<StoredPreferences>, StoreError> {
        self.with_shared_lock(|| {
            let document = self.read_document()?;
            document
                .users
                .get(user_key)
                .map(|entry| decode_entry(user_key, entry))
                .transpose()
        })
    }

    fn upsert_preferences(
        &self,
        user_key: &str,
        vector: &PreferenceVector,
    ) -> Result<(), StoreError> {
        self.with_exclusive_lock(|| {
            let mut document = self.read_document()?;
            document
                .users
                .insert(user_key.to_owned(), encode_entry(vector));
            self.write_document(&document)
        })
    }

    fn update_preferences(
        &self,
        user_key: &str,
        apply: &mut dyn FnMut(Option<StoredPreferences>) -> PreferenceVector,
    ) -> Result<PreferenceVector, StoreError> {
        self.with_exclusive_lock(|| {
            let mut document = self.read_document()?;
            let current = document
                .users
                .get(user_key)
                .map(|entry| decode_entry(user_key, entry))
                .transpose()?;
            let updated = apply(current);
            document
                .users
                .insert(user_key.to_owned(), encode_entry(&updated));
            self.write_document(&document)?;
            Ok(updated)
        })
    }

    fn list_user_keys(&self) -> Result<Vec<String>, StoreError> {
        self.with_shared_lock(|| {
            let document = self.read_document()?;
            let mut keys = document.users.keys().cloned().collect::<Vec<_>>();
            keys.sort();
            Ok(keys)
        })
    }
}

/// Unlocks after `work` ran. The lock is also released when the handle closes, so a
/// failed unlock only surfaces when `work` itself succeeded.
fn release_after<T>(lock: File, result: Result<T, StoreError>) -> Result<T, StoreError> {
    let unlocked = FileExt::unlock(&lock);
    drop(lock);
    work_error_first(result, unlocked)
}

fn work_error_first<T>(
    result: Result<T, StoreError>,
    unlocked: std::io::Result<()>,
) -> Result<T, StoreError> {
    let value = result?;
    unlocked?;
    Ok(value)
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn encode_entry(vector: &PreferenceVector) -> Value {
    json!({
        "w_roi": encode_weight(vector.weights.w_roi),
        "w_risk": encode_weight(vector.weights.w_risk),
        "w_budget": encode_weight(vector.weights.w_budget),
        "interactions": vector.interactions,
    })
}

// JSON numbers cannot hold NaN or infinities; text keeps them distinct from a missing
// field and `coerce_f64` parses it back.
fn encode_weight(value: f64) -> Value {
    if value.is_finite() {
        json!(value)
    } else {
        Value::String(value.to_string())
    }
}

fn decode_entry(user_key: &str, entry: &Value) -> Result<StoredPreferences, StoreError> {
    let Some(fields) = entry.as_object() else {
        if entry.is_null() {
            return Ok(StoredPreferences::default());
        }
        return Err(invalid(user_key, "entry is not an object"));
    };

    Ok(StoredPreferences {
        w_roi: coerce_f64(user_key, fields, "w_roi")?,
        w_risk: coerce_f64(user_key, fields, "w_risk")?,
        w_budget: coerce_f64(user_key, fields, "w_budget")?,
        interactions: coerce_count(user_key, fields, "interactions")?,
    })
}

fn coerce_f64(
    user_key: &str,
    fields: &Map<String, Value>,
    field: &str,
) -> Result<Option<f64>, StoreError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => Ok(number.as_f64()),
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(user_key, &format!("{field} is not numeric: {text:?}"))),
        Some(other) => Err(invalid(
            user_key,
            &format!("{field} has unexpected type: {other}"),
        )),
    }
}

fn coerce_count(
    user_key: &str,
    fields: &Map<String, Value>,
    field: &str,
) -> Result<Option<u64>, StoreError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => {
            if let Some(value) = number.as_u64() {
                return Ok(Some(value));
            }
            match number.as_f64() {
                Some(value) if value.is_finite() => Ok(Some(value.trunc().max(0.0) as u64)),
                _ => Err(invalid(user_key, &format!("{field} is not a count"))),
            }
        }
        Some(Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .map(|value| Some(value.max(0) as u64))
            .map_err(|_| invalid(user_key, &format!("{field} is not an integer: {text:?}"))),
        Some(other) => Err(invalid(
            user_key,
            &format!("{field} has unexpected type: {other}"),
        )),
    }
}

fn invalid(user_key: &str, reason: &str) -> StoreError {
    StoreError::InvalidRecord {
        user_key: user_key.to_owned(),
        reason: reason.to_owned(),
    }
}
