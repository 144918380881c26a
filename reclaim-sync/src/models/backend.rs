//! Back-end entries as returned by the Sonarr and Radarr v3 APIs
//!
//! Every field except the id is optional; absence is handled by matching and
//! enrichment. `instance` is not part of the payload and is filled in by the
//! client with the configured instance name.

use chrono::{DateTime, Utc};
use reclaim_common::time::parse_timestamp;
use serde::{Deserialize, Serialize};

/// Sonarr series statistics block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesStatistics {
    pub size_on_disk: Option<i64>,
    pub episode_file_count: Option<i64>,
    pub total_episode_count: Option<i64>,
    pub season_count: Option<i64>,
}

/// Sonarr `/api/v3/series` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesEntry {
    pub id: i64,
    pub title: Option<String>,
    pub tvdb_id: Option<i64>,
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub path: Option<String>,
    pub monitored: Option<bool>,
    pub added: Option<String>,
    pub overview: Option<String>,
    pub statistics: Option<SeriesStatistics>,
    #[serde(skip)]
    pub instance: String,
}

impl SeriesEntry {
    pub fn added_at(&self) -> Option<DateTime<Utc>> {
        self.added.as_deref().and_then(parse_timestamp)
    }
}

/// Radarr quality name, nested as `movieFile.quality.quality.name`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityName {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityModel {
    pub quality: Option<QualityName>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieFile {
    pub quality: Option<QualityModel>,
}

/// Radarr `/api/v3/movie` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieEntry {
    pub id: i64,
    pub title: Option<String>,
    pub tmdb_id: Option<i64>,
    pub imdb_id: Option<String>,
    pub path: Option<String>,
    pub size_on_disk: Option<i64>,
    pub monitored: Option<bool>,
    pub added: Option<String>,
    pub overview: Option<String>,
    pub movie_file: Option<MovieFile>,
    #[serde(skip)]
    pub instance: String,
}

impl MovieEntry {
    pub fn added_at(&self) -> Option<DateTime<Utc>> {
        self.added.as_deref().and_then(parse_timestamp)
    }

    /// Quality name of the file on disk, if any
    pub fn quality_name(&self) -> Option<&str> {
        self.movie_file
            .as_ref()?
            .quality
            .as_ref()?
            .quality
            .as_ref()?
            .name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

/// `/api/v3/diskspace` record (bytes)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpaceRecord {
    pub path: Option<String>,
    pub label: Option<String>,
    pub free_space: Option<i64>,
    pub total_space: Option<i64>,
}

/// `/api/v3/rootfolder` record (bytes)
///
/// Sonarr omits `totalSpace`; it is then taken from the disk holding the folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootFolderRecord {
    pub path: Option<String>,
    pub free_space: Option<i64>,
    pub total_space: Option<i64>,
}

/// Free/total space for one root folder, in GB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderSpace {
    pub path: String,
    pub label: String,
    #[serde(rename = "totalSpaceGB")]
    pub total_space_gb: f64,
    #[serde(rename = "freeSpaceGB")]
    pub free_space_gb: f64,
}

pub(crate) const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

impl FolderSpace {
    /// Convert a disk-space record; records without a path are dropped
    pub fn from_record(record: &DiskSpaceRecord) -> Option<Self> {
        let path = record.path.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
        Some(Self {
            path: path.to_string(),
            label: record.label.clone().unwrap_or_default(),
            total_space_gb: record.total_space.unwrap_or(0) as f64 / BYTES_PER_GB,
            free_space_gb: record.free_space.unwrap_or(0) as f64 / BYTES_PER_GB,
        })
    }
}
