use std::fs;
use std::path::Path;
use std::time::Duration;

use propwise_core::PreferenceVector;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};

use crate::{PreferenceStore, StoreError, StoredPreferences, current_unix_timestamp_millis};

pub struct SqlitePreferenceStore {
    conn: Connection,
}

impl SqlitePreferenceStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        run_migrations(&conn)?;

        Ok(Self { conn })
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    fn get_preferences(&self, user_key: &str) -> Result<Option<StoredPreferences>, StoreError> {
        read_preferences(&self.conn, user_key)
    }

    fn upsert_preferences(
        &self,
        user_key: &str,
        vector: &PreferenceVector,
    ) -> Result<(), StoreError> {
        write_preferences(&self.conn, user_key, vector)
    }

    fn update_preferences(
        &self,
        user_key: &str,
        apply: &mut dyn FnMut(Option<StoredPreferences>) -> PreferenceVector,
    ) -> Result<PreferenceVector, StoreError> {
        // IMMEDIATE takes the write lock up front so two processes cannot both read
        // the old row and then race on the write.
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let current = read_preferences(&tx, user_key)?;
        let updated = apply(current);
        write_preferences(&tx, user_key, &updated)?;
        tx.commit()?;

        Ok(updated)
    }

    fn list_user_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_key FROM preferences ORDER BY user_key ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let keys = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

fn read_preferences(
    conn: &Connection,
    user_key: &str,
) -> Result<Option<StoredPreferences>, StoreError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT w_roi, w_risk, w_budget, interactions
        FROM preferences
        WHERE user_key = ?1
        "#,
    )?;

    let row = stmt
        .query_row(params![user_key], |row| {
            Ok((
                row.get::<_, Value>(0)?,
                row.get::<_, Value>(1)?,
                row.get::<_, Value>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })
        .optional()?;

    let Some((w_roi, w_risk, w_budget, interactions)) = row else {
        return Ok(None);
    };
    Ok(Some(StoredPreferences {
        w_roi: weight_from_sql(user_key, "w_roi", w_roi)?,
        w_risk: weight_from_sql(user_key, "w_risk", w_risk)?,
        w_budget: weight_from_sql(user_key, "w_budget", w_budget)?,
        interactions: interactions.map(|value| value.max(0) as u64),
    }))
}

// SQLite binds NaN as NULL, so non-finite weights are stored as text instead.
fn weight_to_sql(value: f64) -> Value {
    if value.is_finite() {
        Value::Real(value)
    } else {
        Value::Text(value.to_string())
    }
}

fn weight_from_sql(user_key: &str, field: &str, value: Value) -> Result<Option<f64>, StoreError> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(value) => Ok(Some(value as f64)),
        Value::Real(value) => Ok(Some(value)),
        Value::Text(text) => text.trim().parse::<f64>().map(Some).map_err(|_| {
            StoreError::InvalidRecord {
                user_key: user_key.to_owned(),
                reason: format!("{field} is not numeric: {text:?}"),
            }
        }),
        Value::Blob(_) => Err(StoreError::InvalidRecord {
            user_key: user_key.to_owned(),
            reason: format!("{field} is a blob"),
        }),
    }
}

fn write_preferences(
    conn: &Connection,
    user_key: &str,
    vector: &PreferenceVector,
) -> Result<(), StoreError> {
    let interactions = i64::try_from(vector.interactions).unwrap_or(i64::MAX);
    conn.execute(
        r#"
        INSERT INTO preferences (user_key, w_roi, w_risk, w_budget, interactions, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(user_key) DO UPDATE SET
            w_roi = excluded.w_roi,
            w_risk = excluded.w_risk,
            w_budget = excluded.w_budget,
            interactions = excluded.interactions,
            updated_at = excluded.updated_at
        "#,
        params![
            user_key,
            weight_to_sql(vector.weights.w_roi),
            weight_to_sql(vector.weights.w_risk),
            weight_to_sql(vector.weights.w_budget),
            interactions,
            current_unix_timestamp_millis(),
        ],
    )?;

    Ok(())
}

fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS preferences (
            user_key TEXT PRIMARY KEY,
            w_roi REAL,
            w_risk REAL,
            w_budget REAL,
            interactions INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL
        );
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use propwise_core::PreferenceWeights;
    use tempfile::tempdir;

    use super::*;

    fn vector(w_roi: f64, w_risk: f64, w_budget: f64, interactions: u64) -> PreferenceVector {
        PreferenceVector::new(PreferenceWeights::new(w_roi, w_risk, w_budget), interactions)
    }

    #[test]
    fn store_persists_preferences_across_reopen_without_duplicates() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested/preferences.sqlite");

        let store = SqlitePreferenceStore::open(&path).expect("open store");
        assert!(path.exists());

        store
            .upsert_preferences("mona", &vector(0.5, 0.3, 0.2, 0))
            .expect("first upsert");
        store
            .upsert_preferences("mona", &vector(0.6, 0.25, 0.15, 3))
            .expect("second upsert");
        drop(store);

        let reopened = SqlitePreferenceStore::open(&path).expect("reopen store");
        assert_eq!(
            reopened.list_user_keys().expect("list"),
            vec!["mona".to_owned()]
        );
        assert_eq!(
            reopened.get_preferences("mona").expect("get"),
            Some(StoredPreferences::from(vector(0.6, 0.25, 0.15, 3)))
        );
    }

    #[test]
    fn update_preferences_touches_only_the_requested_user() {
        let temp = tempdir().expect("tempdir");
        let store =
            SqlitePreferenceStore::open(temp.path().join("p.sqlite")).expect("open store");

        store
            .upsert_preferences("ali", &vector(0.4, 0.4, 0.2, 7))
            .expect("seed sibling");

        let mut seen = None;
        let updated = store
            .update_preferences("mona", &mut |current| {
                seen = Some(current);
                vector(0.7, 0.2, 0.1, 1)
            })
            .expect("update");

        assert_eq!(seen, Some(None));
        assert_eq!(updated, vector(0.7, 0.2, 0.1, 1));
        assert_eq!(
            store.get_preferences("ali").expect("get sibling"),
            Some(StoredPreferences::from(vector(0.4, 0.4, 0.2, 7)))
        );
        assert_eq!(
            store.list_user_keys().expect("list"),
            vec!["ali".to_owned(), "mona".to_owned()]
        );
    }

    #[test]
    fn update_preferences_sees_previous_value() {
        let temp = tempdir().expect("tempdir");
        let store =
            SqlitePreferenceStore::open(temp.path().join("p.sqlite")).expect("open store");
        store
            .upsert_preferences("mona", &vector(0.5, 0.3, 0.2, 4))
            .expect("seed");

        let updated = store
            .update_preferences("mona", &mut |current| {
                let interactions = current.and_then(|stored| stored.interactions).unwrap_or(0);
                vector(0.5, 0.3, 0.2, interactions + 1)
            })
            .expect("update");

        assert_eq!(updated.interactions, 5);
        assert_eq!(
            store
                .get_preferences("mona")
                .expect("get")
                .and_then(|stored| stored.interactions),
            Some(5)
        );
    }

    #[test]
    fn non_finite_weights_are_not_stored_as_null() {
        let temp = tempdir().expect("tempdir");
        let store =
            SqlitePreferenceStore::open(temp.path().join("p.sqlite")).expect("open store");

        store
            .upsert_preferences("mona", &vector(f64::NAN, f64::NEG_INFINITY, 0.4, 2))
            .expect("upsert");

        let stored = store.get_preferences("mona").expect("get").expect("row exists");
        assert!(stored.w_roi.is_some_and(f64::is_nan), "{stored:?}");
        assert_eq!(stored.w_risk, Some(f64::NEG_INFINITY));
        assert_eq!(stored.w_budget, Some(0.4));
        assert_eq!(stored.interactions, Some(2));
    }

    #[test]
    fn text_weight_that_is_not_numeric_is_an_invalid_record() {
        let temp = tempdir().expect("tempdir");
        let store =
            SqlitePreferenceStore::open(temp.path().join("p.sqlite")).expect("open store");
        store
            .conn
            .execute(
                "INSERT INTO preferences (user_key, w_roi, updated_at) VALUES ('x', 'lots', 0)",
                [],
            )
            .expect("insert text weight");

        let err = store.get_preferences("x").expect_err("invalid weight");
        assert!(matches!(
            err,
            StoreError::InvalidRecord { ref user_key, .. } if user_key == "x"
        ));
    }

    #[test]
    fn null_columns_read_back_as_missing_fields() {
        let temp = tempdir().expect("tempdir");
        let store =
            SqlitePreferenceStore::open(temp.path().join("p.sqlite")).expect("open store");
        store
            .conn
            .execute(
                "INSERT INTO preferences (user_key, w_roi, interactions, updated_at) VALUES ('x', 0.9, 2, 0)",
                [],
            )
            .expect("insert partial row");

        let stored = store.get_preferences("x").expect("get").expect("row exists");
        assert_eq!(stored.w_roi, Some(0.9));
        assert_eq!(stored.w_risk, None);
        assert_eq!(stored.w_budget, None);
        assert_eq!(stored.interactions, Some(2));
    }
}
