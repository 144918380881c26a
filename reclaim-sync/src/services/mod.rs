//! Upstream services
//!
//! The pipeline talks to one media catalog and any number of series/movie
//! back-ends through the traits below. [`EmbyClient`] and [`ArrClient`] are the
//! HTTP implementations; tests substitute in-memory fakes.

pub mod arr_client;
pub mod emby_client;

pub use arr_client::{ArrClient, ArrError};
pub use emby_client::{ActivityQueryResult, EmbyClient, EmbyError};

use crate::models::{CatalogItem, DiskSpaceRecord, MovieEntry, RootFolderRecord, SeriesEntry};
use async_trait::async_trait;
use std::sync::Arc;

/// Media catalog: what exists and what has been watched
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Configured display name, persisted as `source` for unmatched items
    fn name(&self) -> &str;

    /// Enumerate every movie and series (all pages)
    async fn list_items(&self) -> Result<Vec<CatalogItem>, EmbyError>;

    /// Run a read-only query against the playback activity log
    async fn query_activity(&self, sql: &str) -> Result<ActivityQueryResult, EmbyError>;
}

/// Series back-end (Sonarr)
#[async_trait]
pub trait SeriesBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Full series collection, entries tagged with this instance's name
    async fn list_series(&self) -> Result<Vec<SeriesEntry>, ArrError>;

    async fn disk_space(&self) -> Result<Vec<DiskSpaceRecord>, ArrError>;

    async fn root_folders(&self) -> Result<Vec<RootFolderRecord>, ArrError>;

    /// Root folders counted for folder space; empty means all
    fn selected_folders(&self) -> &[String] {
        &[]
    }
}

/// Movie back-end (Radarr)
#[async_trait]
pub trait MovieBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Full movie collection, entries tagged with this instance's name
    async fn list_movies(&self) -> Result<Vec<MovieEntry>, ArrError>;

    async fn disk_space(&self) -> Result<Vec<DiskSpaceRecord>, ArrError>;

    async fn root_folders(&self) -> Result<Vec<RootFolderRecord>, ArrError>;

    /// Root folders counted for folder space; empty means all
    fn selected_folders(&self) -> &[String] {
        &[]
    }
}

/// Enabled upstream sources for a run
#[derive(Clone, Default)]
pub struct Sources {
    pub catalog: Option<Arc<dyn CatalogSource>>,
    pub series_backends: Vec<Arc<dyn SeriesBackend>>,
    pub movie_backends: Vec<Arc<dyn MovieBackend>>,
}

impl Sources {
    /// A run needs the catalog and at least one back-end
    pub fn is_configured(&self) -> bool {
        self.catalog.is_some()
            && (!self.series_backends.is_empty() || !self.movie_backends.is_empty())
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources")
            .field("catalog", &self.catalog.as_ref().map(|c| c.name().to_string()))
            .field(
                "series_backends",
                &self.series_backends.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .field(
                "movie_backends",
                &self.movie_backends.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
