//! Shared fixtures: temp database and in-memory upstream fakes

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reclaim_sync::models::{
    CatalogItem, DiskSpaceRecord, MediaKind, MovieEntry, MovieFile, ProviderIds, QualityModel,
    QualityName, RootFolderRecord, SeriesEntry, SeriesStatistics,
};
use reclaim_sync::services::{
    ActivityQueryResult, ArrError, CatalogSource, EmbyError, MovieBackend, SeriesBackend, Sources,
};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub const GIB: i64 = 1024 * 1024 * 1024;

/// Fresh database in a temp dir; keep the TempDir alive for the test
pub async fn temp_db() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = reclaim_sync::db::init_database_pool(&dir.path().join("reclaim.db"))
        .await
        .unwrap();
    (dir, pool)
}

pub fn movie_item(id: &str, title: &str, tmdb: Option<i64>) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        title: title.to_string(),
        kind: MediaKind::Movie,
        year: Some(1999),
        path: Some(format!("/mnt/emby/movies/{}", title)),
        provider_ids: ProviderIds {
            tmdb,
            ..Default::default()
        },
        date_created: Some(Utc::now() - Duration::days(30)),
        overview: None,
    }
}

pub fn series_item(id: &str, title: &str, tvdb: Option<i64>, imdb: Option<&str>) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        title: title.to_string(),
        kind: MediaKind::Series,
        year: Some(2011),
        path: Some(format!("/mnt/emby/tv/{}", title)),
        provider_ids: ProviderIds {
            tvdb,
            imdb: imdb.map(str::to_string),
            ..Default::default()
        },
        date_created: Some(Utc::now() - Duration::days(30)),
        overview: None,
    }
}

pub fn movie_entry(id: i64, title: &str, tmdb: i64, size: i64, added_days_ago: i64) -> MovieEntry {
    MovieEntry {
        id,
        title: Some(title.to_string()),
        tmdb_id: Some(tmdb),
        path: Some(format!("/media/movies/{}", title)),
        size_on_disk: Some(size),
        monitored: Some(true),
        added: Some((Utc::now() - Duration::days(added_days_ago)).to_rfc3339()),
        movie_file: Some(MovieFile {
            quality: Some(QualityModel {
                quality: Some(QualityName {
                    name: Some("Bluray-1080p".to_string()),
                }),
            }),
        }),
        ..Default::default()
    }
}

pub fn series_entry(id: i64, title: &str, tvdb: Option<i64>, imdb: Option<&str>) -> SeriesEntry {
    SeriesEntry {
        id,
        title: Some(title.to_string()),
        tvdb_id: tvdb,
        imdb_id: imdb.map(str::to_string),
        path: Some(format!("/media/tv/{}", title)),
        monitored: Some(true),
        added: Some((Utc::now() - Duration::days(100)).to_rfc3339()),
        statistics: Some(SeriesStatistics {
            size_on_disk: Some(40 * GIB),
            episode_file_count: Some(60),
            total_episode_count: Some(73),
            season_count: Some(8),
        }),
        ..Default::default()
    }
}

pub fn disk(path: &str, total_gib: i64, free_gib: i64) -> DiskSpaceRecord {
    DiskSpaceRecord {
        path: Some(path.to_string()),
        label: Some("media".to_string()),
        free_space: Some(free_gib * GIB),
        total_space: Some(total_gib * GIB),
    }
}

/// Root folder without its own total, as Sonarr reports it
pub fn root(path: &str, free_gib: i64) -> RootFolderRecord {
    RootFolderRecord {
        path: Some(path.to_string()),
        free_space: Some(free_gib * GIB),
        total_space: None,
    }
}

/// Activity-log row with one play `days_ago`
pub fn watched(days_ago: i64, count: i64) -> ActivityQueryResult {
    let last = (Utc::now() - Duration::days(days_ago))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    ActivityQueryResult {
        colums: vec!["LastWatched".to_string(), "WatchCount".to_string()],
        results: vec![vec![json!(last), json!(count)]],
    }
}

/// Catalog fake
///
/// `activity` pairs are matched against the query text; the first pair whose
/// key occurs in the SQL answers it.
#[derive(Default)]
pub struct FakeCatalog {
    pub items: Vec<CatalogItem>,
    pub activity: Vec<(String, ActivityQueryResult)>,
    pub fail_listing: bool,
    pub fail_queries: bool,
    /// Cancelled on the first activity query
    pub cancel_on_query: Option<CancellationToken>,
    pub queries: AtomicUsize,
}

impl FakeCatalog {
    pub fn with_items(items: Vec<CatalogItem>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    fn name(&self) -> &str {
        "Emby"
    }

    async fn list_items(&self) -> Result<Vec<CatalogItem>, EmbyError> {
        if self.fail_listing {
            return Err(EmbyError::Api(500, "catalog down".to_string()));
        }
        Ok(self.items.clone())
    }

    async fn query_activity(&self, sql: &str) -> Result<ActivityQueryResult, EmbyError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_on_query {
            token.cancel();
        }
        if self.fail_queries {
            return Err(EmbyError::Network("connection reset".to_string()));
        }
        Ok(self
            .activity
            .iter()
            .find(|(key, _)| sql.contains(key.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeSeriesBackend {
    pub series: Vec<SeriesEntry>,
    pub disk: Vec<DiskSpaceRecord>,
    pub roots: Vec<RootFolderRecord>,
    pub fail: bool,
}

#[async_trait]
impl SeriesBackend for FakeSeriesBackend {
    fn name(&self) -> &str {
        "Sonarr"
    }

    async fn list_series(&self) -> Result<Vec<SeriesEntry>, ArrError> {
        if self.fail {
            return Err(ArrError::Unauthorized);
        }
        Ok(self
            .series
            .iter()
            .cloned()
            .map(|mut s| {
                s.instance = "Sonarr".to_string();
                s
            })
            .collect())
    }

    async fn disk_space(&self) -> Result<Vec<DiskSpaceRecord>, ArrError> {
        if self.fail {
            return Err(ArrError::Unauthorized);
        }
        Ok(self.disk.clone())
    }

    async fn root_folders(&self) -> Result<Vec<RootFolderRecord>, ArrError> {
        if self.fail {
            return Err(ArrError::Unauthorized);
        }
        Ok(self.roots.clone())
    }
}

#[derive(Default)]
pub struct FakeMovieBackend {
    pub movies: Vec<MovieEntry>,
    pub disk: Vec<DiskSpaceRecord>,
    pub roots: Vec<RootFolderRecord>,
    pub fail: bool,
}

#[async_trait]
impl MovieBackend for FakeMovieBackend {
    fn name(&self) -> &str {
        "Radarr"
    }

    async fn list_movies(&self) -> Result<Vec<MovieEntry>, ArrError> {
        if self.fail {
            return Err(ArrError::Api(503, "unavailable".to_string()));
        }
        Ok(self
            .movies
            .iter()
            .cloned()
            .map(|mut m| {
                m.instance = "Radarr".to_string();
                m
            })
            .collect())
    }

    async fn disk_space(&self) -> Result<Vec<DiskSpaceRecord>, ArrError> {
        if self.fail {
            return Err(ArrError::Api(503, "unavailable".to_string()));
        }
        Ok(self.disk.clone())
    }

    async fn root_folders(&self) -> Result<Vec<RootFolderRecord>, ArrError> {
        if self.fail {
            return Err(ArrError::Api(503, "unavailable".to_string()));
        }
        Ok(self.roots.clone())
    }
}

pub fn sources(
    catalog: Arc<FakeCatalog>,
    series: Option<FakeSeriesBackend>,
    movies: Option<FakeMovieBackend>,
) -> Sources {
    Sources {
        catalog: Some(catalog as Arc<dyn CatalogSource>),
        series_backends: series
            .map(|s| vec![Arc::new(s) as Arc<dyn SeriesBackend>])
            .unwrap_or_default(),
        movie_backends: movies
            .map(|m| vec![Arc::new(m) as Arc<dyn MovieBackend>])
            .unwrap_or_default(),
    }
}
