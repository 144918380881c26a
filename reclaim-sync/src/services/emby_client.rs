//! Emby catalog client
//!
//! Item enumeration via `/emby/Items` and raw queries against the Playback
//! Reporting plugin's activity log.

use super::CatalogSource;
use crate::models::{CatalogItem, MediaKind, ProviderIds};
use async_trait::async_trait;
use reclaim_common::config::CatalogConfig;
use reclaim_common::time::parse_timestamp;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("reclaim-sync/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;
const PAGE_SIZE: usize = 500;
const ITEM_FIELDS: &str = "ProviderIds,Path,ProductionYear,DateCreated,Overview";

/// Emby client errors
#[derive(Debug, Error)]
pub enum EmbyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for EmbyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EmbyError::Timeout
        } else if e.is_decode() {
            EmbyError::Parse(e.to_string())
        } else {
            EmbyError::Network(e.to_string())
        }
    }
}

/// Activity-log query response
///
/// `colums` is spelled the way the plugin spells it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityQueryResult {
    #[serde(default)]
    pub colums: Vec<String>,
    #[serde(default)]
    pub results: Vec<Vec<serde_json::Value>>,
}

impl ActivityQueryResult {
    /// Index of a column by case-insensitive name
    pub fn column(&self, name: &str) -> Option<usize> {
        self.colums.iter().position(|c| c.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EmbyItem {
    id: String,
    name: Option<String>,
    #[serde(rename = "Type")]
    item_type: Option<String>,
    production_year: Option<i32>,
    path: Option<String>,
    provider_ids: Option<HashMap<String, serde_json::Value>>,
    date_created: Option<String>,
    overview: Option<String>,
}

impl EmbyItem {
    fn into_catalog_item(self) -> Option<CatalogItem> {
        let kind = MediaKind::parse(self.item_type.as_deref()?)?;
        Some(CatalogItem {
            id: self.id,
            title: self.name.unwrap_or_default(),
            kind,
            year: self.production_year,
            path: self.path.filter(|p| !p.trim().is_empty()),
            provider_ids: self
                .provider_ids
                .as_ref()
                .map(ProviderIds::from_raw)
                .unwrap_or_default(),
            date_created: self.date_created.as_deref().and_then(parse_timestamp),
            overview: self.overview,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EmbyItemsPage {
    #[serde(default)]
    items: Vec<EmbyItem>,
    total_record_count: Option<usize>,
}

/// Emby HTTP client
pub struct EmbyClient {
    http_client: reqwest::Client,
    name: String,
    base_url: String,
    api_key: String,
    user_id: Option<String>,
}

impl EmbyClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, EmbyError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| EmbyError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            name: config.name.clone(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            user_id: config.user_id.clone().filter(|u| !u.trim().is_empty()),
        })
    }

    async fn fetch_page(&self, start_index: usize) -> Result<EmbyItemsPage, EmbyError> {
        let url = format!("{}/emby/Items", self.base_url);
        let start = start_index.to_string();
        let limit = PAGE_SIZE.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("Recursive", "true"),
            ("IncludeItemTypes", "Movie,Series"),
            ("Fields", ITEM_FIELDS),
            ("StartIndex", &start),
            ("Limit", &limit),
        ];
        if let Some(user_id) = self.user_id.as_deref() {
            query.push(("UserId", user_id));
        }

        tracing::debug!(url = %url, start_index, "Fetching catalog page");

        let response = self
            .http_client
            .get(&url)
            .header("X-Emby-Token", &self.api_key)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbyError::Api(status.as_u16(), error_text));
        }

        response
            .json::<EmbyItemsPage>()
            .await
            .map_err(|e| EmbyError::Parse(e.to_string()))
    }
}

#[async_trait]
impl CatalogSource for EmbyClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_items(&self) -> Result<Vec<CatalogItem>, EmbyError> {
        let mut items = Vec::new();
        let mut start_index = 0usize;

        loop {
            let page = self.fetch_page(start_index).await?;
            let received = page.items.len();
            let total = page.total_record_count;

            items.extend(page.items.into_iter().filter_map(EmbyItem::into_catalog_item));
            start_index += received;

            let exhausted = match total {
                Some(total) => start_index >= total,
                None => received < PAGE_SIZE,
            };
            if received == 0 || exhausted {
                break;
            }
        }

        tracing::info!(
            catalog = %self.name,
            items = items.len(),
            "Enumerated catalog items"
        );

        Ok(items)
    }

    async fn query_activity(&self, sql: &str) -> Result<ActivityQueryResult, EmbyError> {
        let url = format!("{}/emby/user_usage_stats/submit_custom_query", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header("X-Emby-Token", &self.api_key)
            .json(&json!({
                "CustomQueryString": sql,
                "ReplaceUserId": true,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbyError::Api(status.as_u16(), error_text));
        }

        response
            .json::<ActivityQueryResult>()
            .await
            .map_err(|e| EmbyError::Parse(e.to_string()))
    }
}
