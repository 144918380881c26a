//! `media_items` persistence
//!
//! Rows are located by the best identity available, in order:
//! 1. back-end id (series_id / movie_id) + source
//! 2. title + media type + source
//! 3. catalog id
//!
//! A located row is updated in place (guid and created_at kept); otherwise a new
//! row is inserted.

use crate::models::{MediaKind, ProcessedItem, ScoreBreakdown};
use crate::scoring::ScoreInputs;
use chrono::{DateTime, Utc};
use reclaim_common::time::parse_timestamp;
use reclaim_common::{Error, Result};
use serde::Serialize;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

/// Columns written on both insert and update, in bind order
const DATA_COLUMNS: [&str; 28] = [
    "title",
    "media_type",
    "year",
    "tmdb_id",
    "imdb_id",
    "tvdb_id",
    "media_path",
    "parent_folder",
    "size_on_disk",
    "date_added_catalog",
    "date_added_backend",
    "source",
    "catalog_id",
    "series_id",
    "movie_id",
    "last_watched",
    "watch_count",
    "quality",
    "quality_score",
    "episodes_on_disk",
    "total_episodes",
    "season_count",
    "completion_percentage",
    "monitored",
    "overview",
    "folder_remaining_percent",
    "deletion_score",
    "score_breakdown",
];

/// Persisted row
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct StoredItem {
    pub guid: String,
    pub title: String,
    pub media_type: String,
    pub year: Option<i64>,
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub tvdb_id: Option<i64>,
    pub media_path: String,
    pub parent_folder: String,
    pub size_on_disk: i64,
    pub date_added_catalog: Option<String>,
    pub date_added_backend: Option<String>,
    pub source: String,
    pub catalog_id: Option<String>,
    pub series_id: Option<i64>,
    pub movie_id: Option<i64>,
    pub last_watched: Option<String>,
    pub watch_count: i64,
    pub quality: Option<String>,
    pub quality_score: Option<i64>,
    pub episodes_on_disk: Option<i64>,
    pub total_episodes: Option<i64>,
    pub season_count: Option<i64>,
    pub completion_percentage: Option<i64>,
    pub monitored: Option<bool>,
    pub overview: Option<String>,
    pub folder_remaining_percent: Option<f64>,
    pub deletion_score: Option<f64>,
    pub score_breakdown: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl StoredItem {
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::parse(&self.media_type)
    }

    /// Calculator inputs from the stored columns
    pub fn score_inputs(&self) -> ScoreInputs {
        ScoreInputs {
            title: self.title.clone(),
            last_watched: self.last_watched.as_deref().and_then(parse_timestamp),
            date_added_catalog: self.date_added_catalog.as_deref().and_then(parse_timestamp),
            date_added_backend: self.date_added_backend.as_deref().and_then(parse_timestamp),
            size_on_disk: Some(self.size_on_disk as f64),
            folder_remaining_percent: self.folder_remaining_percent,
        }
    }

    pub fn breakdown(&self) -> Option<ScoreBreakdown> {
        self.score_breakdown
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
    }
}

/// Result of [`upsert_item`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub guid: String,
    pub inserted: bool,
}

fn timestamp(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|dt| dt.to_rfc3339())
}

fn breakdown_json(score: Option<&ScoreBreakdown>) -> Result<Option<String>> {
    score
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| Error::Internal(format!("Serialize score breakdown failed: {}", e)))
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_data<'q>(query: SqliteQuery<'q>, item: &ProcessedItem, breakdown: Option<String>) -> SqliteQuery<'q> {
    query
        .bind(item.title.clone())
        .bind(item.kind.as_str())
        .bind(item.year)
        .bind(item.tmdb_id)
        .bind(item.imdb_id.clone())
        .bind(item.tvdb_id)
        .bind(item.media_path.clone())
        .bind(item.parent_folder.clone())
        .bind(item.size_on_disk.max(0))
        .bind(timestamp(item.date_added_catalog))
        .bind(timestamp(item.date_added_backend))
        .bind(item.source.clone())
        .bind(Some(item.catalog_id.clone()).filter(|id| !id.is_empty()))
        .bind(item.series_id)
        .bind(item.movie_id)
        .bind(timestamp(item.playback.last_watched))
        .bind(item.playback.watch_count)
        .bind(item.quality.clone())
        .bind(item.quality_score)
        .bind(item.episodes_on_disk)
        .bind(item.total_episodes)
        .bind(item.season_count)
        .bind(item.completion_percentage)
        .bind(item.monitored)
        .bind(item.overview.clone())
        .bind(item.folder_remaining_percent)
        .bind(item.deletion_score())
        .bind(breakdown)
}

/// Back-end id column and value when the item carries one
fn backend_key(item: &ProcessedItem) -> Option<(&'static str, i64)> {
    match (item.kind, item.series_id, item.movie_id) {
        (MediaKind::Series, Some(series_id), _) => Some(("series_id", series_id)),
        (MediaKind::Movie, _, Some(movie_id)) => Some(("movie_id", movie_id)),
        _ => None,
    }
}

/// Locate an existing row for this logical item
///
/// An item with a back-end id only falls back to title or catalog id on rows
/// without one, so same-titled entries with different ids stay separate.
pub async fn find_existing_guid(db: &Pool<Sqlite>, item: &ProcessedItem) -> Result<Option<String>> {
    let backend = backend_key(item);

    if let Some((column, id)) = backend {
        let sql = format!(
            "SELECT guid FROM media_items WHERE {} = ? AND source = ? LIMIT 1",
            column
        );
        let found = sqlx::query_scalar::<_, String>(&sql)
            .bind(id)
            .bind(&item.source)
            .fetch_optional(db)
            .await?;
        if found.is_some() {
            return Ok(found);
        }
    }

    let unlinked = backend
        .map(|(column, _)| format!(" AND {} IS NULL", column))
        .unwrap_or_default();

    let sql = format!(
        "SELECT guid FROM media_items WHERE title = ? AND media_type = ? AND source = ?{} LIMIT 1",
        unlinked
    );
    let title_match = sqlx::query_scalar::<_, String>(&sql)
        .bind(&item.title)
        .bind(item.kind.as_str())
        .bind(&item.source)
        .fetch_optional(db)
        .await?;
    if title_match.is_some() {
        return Ok(title_match);
    }

    if item.catalog_id.is_empty() {
        return Ok(None);
    }

    let sql = format!(
        "SELECT guid FROM media_items WHERE catalog_id = ?{} LIMIT 1",
        unlinked
    );
    Ok(sqlx::query_scalar::<_, String>(&sql)
        .bind(&item.catalog_id)
        .fetch_optional(db)
        .await?)
}

/// Insert or update the row for a processed item
pub async fn upsert_item(db: &Pool<Sqlite>, item: &ProcessedItem) -> Result<UpsertOutcome> {
    let breakdown = breakdown_json(item.score.as_ref())?;
    let now = Utc::now().to_rfc3339();

    if let Some(guid) = find_existing_guid(db, item).await? {
        let assignments = DATA_COLUMNS
            .iter()
            .map(|c| format!("{} = ?", c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE media_items SET {}, updated_at = ? WHERE guid = ?",
            assignments
        );

        bind_data(sqlx::query(&sql), item, breakdown)
            .bind(&now)
            .bind(&guid)
            .execute(db)
            .await?;

        tracing::debug!(guid = %guid, title = %item.title, "Updated media item");
        return Ok(UpsertOutcome {
            guid,
            inserted: false,
        });
    }

    let guid = Uuid::new_v4().to_string();
    let placeholders = vec!["?"; DATA_COLUMNS.len()].join(", ");
    let sql = format!(
        "INSERT INTO media_items (guid, {}, created_at, updated_at) VALUES (?, {}, ?, ?)",
        DATA_COLUMNS.join(", "),
        placeholders
    );

    bind_data(sqlx::query(&sql).bind(&guid), item, breakdown)
        .bind(&now)
        .bind(&now)
        .execute(db)
        .await?;

    tracing::debug!(guid = %guid, title = %item.title, "Inserted media item");
    Ok(UpsertOutcome {
        guid,
        inserted: true,
    })
}

pub async fn get_item(db: &Pool<Sqlite>, guid: &str) -> Result<Option<StoredItem>> {
    Ok(
        sqlx::query_as::<_, StoredItem>("SELECT * FROM media_items WHERE guid = ?")
            .bind(guid)
            .fetch_optional(db)
            .await?,
    )
}

pub async fn count_items(db: &Pool<Sqlite>) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM media_items")
        .fetch_one(db)
        .await?)
}

/// One page of rows in stable order
pub async fn list_items(db: &Pool<Sqlite>, limit: usize, offset: usize) -> Result<Vec<StoredItem>> {
    Ok(sqlx::query_as::<_, StoredItem>(
        "SELECT * FROM media_items ORDER BY guid LIMIT ? OFFSET ?",
    )
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(db)
    .await?)
}

/// Write a recomputed score (None clears it) with the folder space it used
pub async fn update_score(
    db: &Pool<Sqlite>,
    guid: &str,
    folder_remaining_percent: Option<f64>,
    score: Option<&ScoreBreakdown>,
) -> Result<()> {
    let breakdown = breakdown_json(score)?;
    sqlx::query(
        "UPDATE media_items SET folder_remaining_percent = ?, deletion_score = ?, score_breakdown = ?, updated_at = ? WHERE guid = ?",
    )
    .bind(folder_remaining_percent)
    .bind(score.map(|s| s.total_score))
    .bind(breakdown)
    .bind(Utc::now().to_rfc3339())
    .bind(guid)
    .execute(db)
    .await?;
    Ok(())
}
