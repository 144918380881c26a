//! Catalog-side data: items enumerated from the media catalog and their watch history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kind of library item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    /// Value stored in `media_items.media_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
        }
    }

    /// Parse the stored value or the catalog's `Type` field (`Movie`, `Series`)
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "movie" => Some(MediaKind::Movie),
            "series" => Some(MediaKind::Series),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External identifiers attached to an item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIds {
    pub tmdb: Option<i64>,
    /// Stored as reported; compare with [`ProviderIds::imdb_key`]
    pub imdb: Option<String>,
    pub tvdb: Option<i64>,
}

impl ProviderIds {
    /// Normalize the catalog's free-form `ProviderIds` object
    ///
    /// Keys match case-insensitively and `imdb` / `imdbid` are both accepted.
    /// Numeric ids that do not parse, and zero, are dropped. When several keys
    /// name the same id, the first usable value in key order wins.
    pub fn from_raw(raw: &HashMap<String, serde_json::Value>) -> Self {
        let mut ids = ProviderIds::default();

        let mut entries: Vec<_> = raw.iter().collect();
        entries.sort_by(|(a, _), (b, _)| {
            a.to_ascii_lowercase()
                .cmp(&b.to_ascii_lowercase())
                .then_with(|| a.cmp(b))
        });

        for (key, value) in entries {
            let text = match value {
                serde_json::Value::String(s) => s.trim().to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => continue,
            };
            if text.is_empty() {
                continue;
            }

            match key.to_ascii_lowercase().as_str() {
                "tmdb" => ids.tmdb = ids.tmdb.or_else(|| parse_numeric_id(&text)),
                "tvdb" => ids.tvdb = ids.tvdb.or_else(|| parse_numeric_id(&text)),
                "imdb" | "imdbid" => ids.imdb = ids.imdb.take().or(Some(text)),
                _ => {}
            }
        }

        ids
    }

    /// Lowercased IMDb id, None when absent or blank
    pub fn imdb_key(&self) -> Option<String> {
        normalize_imdb(self.imdb.as_deref())
    }
}

/// Lenient numeric id parse; zero counts as absent
pub fn parse_numeric_id(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

/// Lowercase an IMDb id for lookups
pub fn normalize_imdb(imdb: Option<&str>) -> Option<String> {
    imdb.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_ascii_lowercase)
}

/// One item enumerated from the media catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Catalog's own item id
    pub id: String,
    pub title: String,
    pub kind: MediaKind,
    pub year: Option<i32>,
    pub path: Option<String>,
    pub provider_ids: ProviderIds,
    pub date_created: Option<DateTime<Utc>>,
    pub overview: Option<String>,
}

/// Watch-history aggregate for one item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSummary {
    pub last_watched: Option<DateTime<Utc>>,
    /// Sessions that count as a real viewing
    pub watch_count: i64,
}

impl PlaybackSummary {
    /// True when the activity log reported anything for the item
    pub fn found(&self) -> bool {
        self.last_watched.is_some() || self.watch_count > 0
    }

    /// Merge two partial aggregates (max timestamp, summed counts)
    pub fn merge(self, other: PlaybackSummary) -> PlaybackSummary {
        PlaybackSummary {
            last_watched: match (self.last_watched, other.last_watched) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            },
            watch_count: self.watch_count + other.watch_count,
        }
    }
}
