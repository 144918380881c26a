//! Source construction and run options from the TOML configuration

use crate::playback::DEFAULT_QUERY_TIMEOUT;
use crate::services::{ArrClient, EmbyClient, MovieBackend, SeriesBackend, Sources};
use crate::workflow::ReconcileOptions;
use reclaim_common::config::TomlConfig;
use reclaim_common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Default HTTP port for `serve`
pub const DEFAULT_PORT: u16 = 5780;

/// Build HTTP clients for every enabled source
pub fn build_sources(config: &TomlConfig) -> Result<Sources> {
    let catalog = match config.enabled_catalog() {
        Some(catalog) => {
            let client = EmbyClient::new(catalog)
                .map_err(|e| Error::Config(format!("Catalog {}: {}", catalog.name, e)))?;
            info!(catalog = %catalog.name, url = %catalog.url, "Catalog configured");
            Some(Arc::new(client) as Arc<dyn crate::services::CatalogSource>)
        }
        None => None,
    };

    let mut series_backends: Vec<Arc<dyn SeriesBackend>> = Vec::new();
    for backend in config.enabled_series_backends() {
        let client = ArrClient::new(backend)
            .map_err(|e| Error::Config(format!("Series back-end {}: {}", backend.name, e)))?;
        info!(instance = %backend.name, url = %backend.url, "Series back-end configured");
        series_backends.push(Arc::new(client));
    }

    let mut movie_backends: Vec<Arc<dyn MovieBackend>> = Vec::new();
    for backend in config.enabled_movie_backends() {
        let client = ArrClient::new(backend)
            .map_err(|e| Error::Config(format!("Movie back-end {}: {}", backend.name, e)))?;
        info!(instance = %backend.name, url = %backend.url, "Movie back-end configured");
        movie_backends.push(Arc::new(client));
    }

    Ok(Sources {
        catalog,
        series_backends,
        movie_backends,
    })
}

/// Run options from the config file
pub fn reconcile_options(config: &TomlConfig) -> ReconcileOptions {
    ReconcileOptions {
        item_limit: config.item_limit.filter(|limit| *limit > 0),
        playback_timeout: config
            .playback_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_QUERY_TIMEOUT),
    }
}
