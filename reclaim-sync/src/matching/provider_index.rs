//! Provider-id lookup maps over the full back-end collections
//!
//! Built once per run. Zero and blank ids are never indexed; when two entries
//! share a key the later one wins.

use crate::models::catalog::normalize_imdb;
use crate::models::{MovieEntry, SeriesEntry};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ProviderIndex {
    series: Vec<SeriesEntry>,
    movies: Vec<MovieEntry>,
    series_by_tvdb: HashMap<i64, usize>,
    series_by_tmdb: HashMap<i64, usize>,
    series_by_imdb: HashMap<String, usize>,
    movies_by_tmdb: HashMap<i64, usize>,
    movies_by_imdb: HashMap<String, usize>,
}

fn positive(id: Option<i64>) -> Option<i64> {
    id.filter(|id| *id > 0)
}

impl ProviderIndex {
    /// Index all series and movies from every enabled instance
    pub fn build(series: Vec<SeriesEntry>, movies: Vec<MovieEntry>) -> Self {
        let mut index = ProviderIndex {
            series,
            movies,
            ..Default::default()
        };

        for (pos, entry) in index.series.iter().enumerate() {
            if let Some(id) = positive(entry.tvdb_id) {
                index.series_by_tvdb.insert(id, pos);
            }
            if let Some(id) = positive(entry.tmdb_id) {
                index.series_by_tmdb.insert(id, pos);
            }
            if let Some(key) = normalize_imdb(entry.imdb_id.as_deref()) {
                index.series_by_imdb.insert(key, pos);
            }
        }

        for (pos, entry) in index.movies.iter().enumerate() {
            if let Some(id) = positive(entry.tmdb_id) {
                index.movies_by_tmdb.insert(id, pos);
            }
            if let Some(key) = normalize_imdb(entry.imdb_id.as_deref()) {
                index.movies_by_imdb.insert(key, pos);
            }
        }

        tracing::debug!(
            series = index.series.len(),
            movies = index.movies.len(),
            series_tvdb_keys = index.series_by_tvdb.len(),
            movie_tmdb_keys = index.movies_by_tmdb.len(),
            "Built provider-id index"
        );

        index
    }

    pub fn series_by_tvdb(&self, id: i64) -> Option<&SeriesEntry> {
        self.series_by_tvdb.get(&id).map(|&pos| &self.series[pos])
    }

    pub fn series_by_tmdb(&self, id: i64) -> Option<&SeriesEntry> {
        self.series_by_tmdb.get(&id).map(|&pos| &self.series[pos])
    }

    /// `imdb` is matched case-insensitively
    pub fn series_by_imdb(&self, imdb: &str) -> Option<&SeriesEntry> {
        let key = normalize_imdb(Some(imdb))?;
        self.series_by_imdb.get(&key).map(|&pos| &self.series[pos])
    }

    pub fn movie_by_tmdb(&self, id: i64) -> Option<&MovieEntry> {
        self.movies_by_tmdb.get(&id).map(|&pos| &self.movies[pos])
    }

    /// `imdb` is matched case-insensitively
    pub fn movie_by_imdb(&self, imdb: &str) -> Option<&MovieEntry> {
        let key = normalize_imdb(Some(imdb))?;
        self.movies_by_imdb.get(&key).map(|&pos| &self.movies[pos])
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn movie_count(&self) -> usize {
        self.movies.len()
    }
}
