//! In-memory merged record for one catalog item during a run

use super::catalog::{CatalogItem, MediaKind, PlaybackSummary};
use super::scoring::ScoreBreakdown;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Catalog item after matching, enrichment, aggregation and scoring
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedItem {
    pub catalog_id: String,
    pub title: String,
    pub kind: MediaKind,
    pub year: Option<i32>,
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub tvdb_id: Option<i64>,
    pub media_path: String,
    pub parent_folder: String,
    /// Bytes; may be negative if a back-end reports garbage, floored on store
    pub size_on_disk: i64,
    pub date_added_catalog: Option<DateTime<Utc>>,
    pub date_added_backend: Option<DateTime<Utc>>,
    /// Back-end instance name when matched, catalog name otherwise
    pub source: String,
    pub series_id: Option<i64>,
    pub movie_id: Option<i64>,
    pub monitored: Option<bool>,
    pub quality: Option<String>,
    pub quality_score: Option<i32>,
    pub episodes_on_disk: Option<i64>,
    pub total_episodes: Option<i64>,
    pub season_count: Option<i64>,
    pub completion_percentage: Option<i32>,
    pub overview: Option<String>,
    pub playback: PlaybackSummary,
    pub folder_remaining_percent: Option<f64>,
    pub score: Option<ScoreBreakdown>,
}

impl ProcessedItem {
    /// Start from catalog data only
    pub fn from_catalog(item: &CatalogItem, catalog_name: &str) -> Self {
        let media_path = item.path.clone().unwrap_or_default();
        let parent_folder = crate::matching::enrichment::parent_folder(&media_path)
            .unwrap_or_default();

        Self {
            catalog_id: item.id.clone(),
            title: item.title.clone(),
            kind: item.kind,
            year: item.year,
            tmdb_id: item.provider_ids.tmdb,
            imdb_id: item.provider_ids.imdb.clone(),
            tvdb_id: item.provider_ids.tvdb,
            media_path,
            parent_folder,
            size_on_disk: 0,
            date_added_catalog: item.date_created,
            date_added_backend: None,
            source: catalog_name.to_string(),
            series_id: None,
            movie_id: None,
            monitored: None,
            quality: None,
            quality_score: None,
            episodes_on_disk: None,
            total_episodes: None,
            season_count: None,
            completion_percentage: None,
            overview: item
                .overview
                .clone()
                .filter(|o| !o.trim().is_empty()),
            playback: PlaybackSummary::default(),
            folder_remaining_percent: None,
            score: None,
        }
    }

    pub fn deletion_score(&self) -> Option<f64> {
        self.score.as_ref().map(|s| s.total_score)
    }
}
