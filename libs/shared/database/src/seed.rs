use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::keys;
use crate::store::{Database, StoreError};

/// Seed dataset: a JSON object whose keys are storage keys.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    entries: Map<String, Value>,
}

impl SeedData {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed data from {}", path.display()))?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("Seed data in {} is not valid JSON", path.display()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => anyhow::bail!("Seed data must be a JSON object, got {}", json_kind(&other)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Serialized array for `key`. Anything that is not an array seeds as `[]`.
    fn array_text(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|value| match value {
            Value::Array(_) => value.to_string(),
            other => {
                warn!("Seed value for '{}' is a {}, storing an empty list", key, json_kind(other));
                "[]".to_string()
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// True when the seed dataset was written on this run.
    pub seeded: bool,
    pub backfilled: Vec<String>,
}

/// Writes the seed dataset unless the store is already initialized, then
/// makes sure every required key exists.
pub async fn initialize(db: &Database, seed: &SeedData) -> Result<InitReport, StoreError> {
    let report = db
        .transact(|tx| {
            let mut report = InitReport::default();

            if !tx.contains(keys::DATA_INITIALIZED) {
                let current_user = tx.get_raw(keys::CURRENT_USER).map(str::to_owned);

                for key in seed.keys() {
                    if let Some(text) = seed.array_text(key) {
                        tx.set_raw(key, text);
                    }
                }

                if let Some(current_user) = current_user {
                    tx.set_raw(keys::CURRENT_USER, current_user);
                }

                tx.set_raw(keys::DATA_INITIALIZED, "true");
                report.seeded = true;
            }

            for key in keys::REQUIRED_KEYS {
                if !tx.contains(key) {
                    tx.set_raw(key, "[]");
                    report.backfilled.push(key.to_string());
                }
            }

            Ok::<_, StoreError>(report)
        })
        .await?;

    if report.seeded {
        info!("Seeded store with {} dataset keys", seed.entries.len());
    } else {
        debug!("Store already initialized, seed skipped");
    }
    if !report.backfilled.is_empty() {
        info!("Back-filled missing keys: {}", report.backfilled.join(", "));
    }

    Ok(report)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_seed() -> SeedData {
        SeedData::from_value(json!({
            "doctors": [{ "id": 1, "name": "Dr. Lan" }],
            "news": [],
            "specialties": "not a list"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_initialize_seeds_and_backfills() {
        let db = Database::in_memory();
        let report = initialize(&db, &sample_seed()).await.unwrap();

        assert!(report.seeded);
        assert_eq!(db.get_raw(keys::DATA_INITIALIZED).await.as_deref(), Some("true"));
        assert_eq!(db.get_raw(keys::SPECIALTIES).await.as_deref(), Some("[]"));
        for key in keys::REQUIRED_KEYS {
            assert!(db.contains(key).await, "missing {}", key);
        }
        assert!(report.backfilled.contains(&keys::APPOINTMENTS.to_string()));
        assert!(!report.backfilled.contains(&keys::DOCTORS.to_string()));
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let db = Database::in_memory();
        initialize(&db, &sample_seed()).await.unwrap();
        db.set_raw(keys::DOCTORS, "[]").await.unwrap();

        let report = initialize(&db, &sample_seed()).await.unwrap();

        assert!(!report.seeded);
        assert!(report.backfilled.is_empty());
        assert_eq!(db.get_raw(keys::DOCTORS).await.as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_initialize_preserves_current_user() {
        let db = Database::in_memory();
        db.set_raw(keys::CURRENT_USER, r#"{"email":"a@b.co"}"#).await.unwrap();

        initialize(&db, &sample_seed()).await.unwrap();

        assert_eq!(
            db.get_raw(keys::CURRENT_USER).await.as_deref(),
            Some(r#"{"email":"a@b.co"}"#)
        );
    }

    #[test]
    fn test_seed_must_be_object() {
        assert!(SeedData::from_value(json!([1, 2])).is_err());
    }
}
