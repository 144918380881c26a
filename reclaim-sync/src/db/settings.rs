//! Settings database operations
//!
//! Key-value accessors over the `settings` table. Deletion score settings are
//! one JSON document; the pipeline only reads them.

use crate::models::DeletionScoreSettings;
use reclaim_common::{Error, Result};
use sqlx::{Pool, Sqlite};

pub const DELETION_SCORE_SETTINGS_KEY: &str = "deletion_score_settings";
pub const RECALCULATION_BATCH_SIZE_KEY: &str = "score_recalculation_batch_size";

const DEFAULT_RECALCULATION_BATCH_SIZE: usize = 100;

/// Seed the default scoring document if none is stored yet
pub async fn seed_deletion_score_settings(db: &Pool<Sqlite>) -> Result<()> {
    let json = serde_json::to_string(&DeletionScoreSettings::default())
        .map_err(|e| Error::Internal(format!("Serialize default score settings failed: {}", e)))?;
    reclaim_common::db::ensure_setting(db, DELETION_SCORE_SETTINGS_KEY, &json).await
}

/// Load scoring settings
///
/// **Default:** [`DeletionScoreSettings::default`] when missing or unparseable
pub async fn load_deletion_score_settings(db: &Pool<Sqlite>) -> Result<DeletionScoreSettings> {
    let raw = get_setting::<String>(db, DELETION_SCORE_SETTINGS_KEY).await?;

    match raw {
        Some(json) => match serde_json::from_str(&json) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!(error = %e, "Stored deletion score settings invalid; using defaults");
                Ok(DeletionScoreSettings::default())
            }
        },
        None => Ok(DeletionScoreSettings::default()),
    }
}

/// Replace the scoring settings document
pub async fn save_deletion_score_settings(
    db: &Pool<Sqlite>,
    settings: &DeletionScoreSettings,
) -> Result<()> {
    let json = serde_json::to_string(settings)
        .map_err(|e| Error::InvalidInput(format!("Serialize score settings failed: {}", e)))?;
    set_setting(db, DELETION_SCORE_SETTINGS_KEY, json).await
}

/// Rows per recalculation batch
///
/// **Default:** 100
pub async fn get_recalculation_batch_size(db: &Pool<Sqlite>) -> Result<usize> {
    get_setting::<usize>(db, RECALCULATION_BATCH_SIZE_KEY)
        .await
        .map(|opt| opt.unwrap_or(DEFAULT_RECALCULATION_BATCH_SIZE).max(1))
}

/// Generic setting getter
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((Some(value),)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting {} failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Generic setting setter
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatePreference;
    use sqlx::SqlitePool;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        reclaim_common::db::create_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_missing_settings_use_defaults() {
        let pool = setup_test_db().await;
        let settings = load_deletion_score_settings(&pool).await.unwrap();
        assert_eq!(settings, DeletionScoreSettings::default());
    }

    #[tokio::test]
    async fn test_save_and_load_settings() {
        let pool = setup_test_db().await;
        let mut settings = DeletionScoreSettings::default();
        settings.date_preference = DatePreference::Oldest;
        settings.folder_space.enabled = true;

        save_deletion_score_settings(&pool, &settings).await.unwrap();
        let loaded = load_deletion_score_settings(&pool).await.unwrap();

        assert_eq!(loaded, settings);
    }

    #[tokio::test]
    async fn test_invalid_document_falls_back() {
        let pool = setup_test_db().await;
        set_setting(&pool, DELETION_SCORE_SETTINGS_KEY, "{not json").await.unwrap();

        let loaded = load_deletion_score_settings(&pool).await.unwrap();
        assert_eq!(loaded, DeletionScoreSettings::default());
    }

    #[tokio::test]
    async fn test_seed_does_not_overwrite() {
        let pool = setup_test_db().await;
        let mut custom = DeletionScoreSettings::default();
        custom.enabled = false;
        save_deletion_score_settings(&pool, &custom).await.unwrap();

        seed_deletion_score_settings(&pool).await.unwrap();

        assert!(!load_deletion_score_settings(&pool).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn test_batch_size_default_and_floor() {
        let pool = setup_test_db().await;
        assert_eq!(get_recalculation_batch_size(&pool).await.unwrap(), 100);

        set_setting(&pool, RECALCULATION_BATCH_SIZE_KEY, 0).await.unwrap();
        assert_eq!(get_recalculation_batch_size(&pool).await.unwrap(), 1);
    }
}
