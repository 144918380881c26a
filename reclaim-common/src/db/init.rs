//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies pragmas, and creates the tables
//! used by the reconciliation service. Every statement is idempotent so this runs on
//! each startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows API readers while a run is writing
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    create_tables(&pool).await?;

    let timeout_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'database_busy_timeout_ms'",
    )
    .fetch_optional(&pool)
    .await?
    .unwrap_or(5000);

    let pragma_sql = format!("PRAGMA busy_timeout = {}", timeout_ms);
    sqlx::query(&pragma_sql).execute(&pool).await?;

    info!("Database busy timeout set to {} ms", timeout_ms);

    Ok(pool)
}

/// Create all tables and seed default settings
///
/// Separate from [`init_database`] so tests can run it against any pool.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_media_items_table(pool).await?;
    init_default_settings(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the media_items table
///
/// One row per reconciled library item. `catalog_id` is the catalog's own item id and
/// is unique when present; back-end ids are only unique per `source`.
pub async fn create_media_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media_items (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            media_type TEXT NOT NULL CHECK (media_type IN ('movie', 'series')),
            year INTEGER,
            tmdb_id INTEGER,
            imdb_id TEXT,
            tvdb_id INTEGER,
            media_path TEXT NOT NULL DEFAULT '',
            parent_folder TEXT NOT NULL DEFAULT '',
            size_on_disk INTEGER NOT NULL DEFAULT 0 CHECK (size_on_disk >= 0),
            date_added_catalog TEXT,
            date_added_backend TEXT,
            source TEXT NOT NULL,
            catalog_id TEXT UNIQUE,
            series_id INTEGER,
            movie_id INTEGER,
            last_watched TEXT,
            watch_count INTEGER NOT NULL DEFAULT 0,
            quality TEXT,
            quality_score INTEGER,
            episodes_on_disk INTEGER,
            total_episodes INTEGER,
            season_count INTEGER,
            completion_percentage INTEGER,
            monitored INTEGER,
            overview TEXT,
            folder_remaining_percent REAL,
            deletion_score REAL,
            score_breakdown TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_media_items_series ON media_items(series_id, source)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_media_items_movie ON media_items(movie_id, source)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_media_items_title ON media_items(title, media_type, source)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize default settings
///
/// Only inserts missing keys; values written by the settings screens are kept.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "database_busy_timeout_ms", "5000").await?;
    ensure_setting(pool, "score_recalculation_batch_size", "100").await?;
    Ok(())
}

/// Insert a setting if the key does not exist yet
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?;

    // A NULL left behind by a manual edit is reset to the default
    sqlx::query("UPDATE settings SET value = ? WHERE key = ? AND value IS NULL")
        .bind(default_value)
        .bind(key)
        .execute(pool)
        .await?;

    Ok(())
}
