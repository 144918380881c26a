//! Sonarr / Radarr v3 API client
//!
//! Both back-ends share authentication and the disk-space and root-folder
//! endpoints, so one client type serves either role; it implements
//! [`SeriesBackend`] and [`MovieBackend`] and the configuration decides which
//! one it is used as.

use super::{MovieBackend, SeriesBackend};
use crate::models::{DiskSpaceRecord, MovieEntry, RootFolderRecord, SeriesEntry};
use async_trait::async_trait;
use reclaim_common::config::BackendConfig;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("reclaim-sync/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Back-end client errors
#[derive(Debug, Error)]
pub enum ArrError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid API key")]
    Unauthorized,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ArrError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ArrError::Timeout
        } else if e.is_decode() {
            ArrError::Parse(e.to_string())
        } else {
            ArrError::Network(e.to_string())
        }
    }
}

/// Sonarr/Radarr HTTP client
pub struct ArrClient {
    http_client: reqwest::Client,
    name: String,
    base_url: String,
    api_key: String,
    selected_folders: Vec<String>,
}

impl ArrClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ArrError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ArrError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            name: config.name.clone(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            selected_folders: config.selected_folders.clone(),
        })
    }

    pub fn instance_name(&self) -> &str {
        &self.name
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ArrError> {
        let url = format!("{}/api/v3/{}", self.base_url, endpoint);

        tracing::debug!(instance = %self.name, url = %url, "Querying back-end");

        let response = self
            .http_client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        let status = response.status();

        if status == 401 {
            return Err(ArrError::Unauthorized);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ArrError::Api(status.as_u16(), error_text));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ArrError::Parse(e.to_string()))
    }

    async fn fetch_disk_space(&self) -> Result<Vec<DiskSpaceRecord>, ArrError> {
        self.get_json("diskspace").await
    }

    async fn fetch_root_folders(&self) -> Result<Vec<RootFolderRecord>, ArrError> {
        self.get_json("rootfolder").await
    }
}

#[async_trait]
impl SeriesBackend for ArrClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_series(&self) -> Result<Vec<SeriesEntry>, ArrError> {
        let mut series: Vec<SeriesEntry> = self.get_json("series").await?;
        for entry in &mut series {
            entry.instance = self.name.clone();
        }

        tracing::info!(instance = %self.name, series = series.len(), "Fetched series collection");
        Ok(series)
    }

    async fn disk_space(&self) -> Result<Vec<DiskSpaceRecord>, ArrError> {
        self.fetch_disk_space().await
    }

    async fn root_folders(&self) -> Result<Vec<RootFolderRecord>, ArrError> {
        self.fetch_root_folders().await
    }

    fn selected_folders(&self) -> &[String] {
        &self.selected_folders
    }
}

#[async_trait]
impl MovieBackend for ArrClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_movies(&self) -> Result<Vec<MovieEntry>, ArrError> {
        let mut movies: Vec<MovieEntry> = self.get_json("movie").await?;
        for entry in &mut movies {
            entry.instance = self.name.clone();
        }

        tracing::info!(instance = %self.name, movies = movies.len(), "Fetched movie collection");
        Ok(movies)
    }

    async fn disk_space(&self) -> Result<Vec<DiskSpaceRecord>, ArrError> {
        self.fetch_disk_space().await
    }

    async fn root_folders(&self) -> Result<Vec<RootFolderRecord>, ArrError> {
        self.fetch_root_folders().await
    }

    fn selected_folders(&self) -> &[String] {
        &self.selected_folders
    }
}
