//! Merge matched back-end fields into the catalog-derived record
//!
//! Merge-by-presence: a field is overwritten only when the back-end supplies
//! it. Blank strings count as absent.

use crate::models::{MovieEntry, ProcessedItem, SeriesEntry};

/// Quality name → score; anything not listed scores [`UNKNOWN_QUALITY_SCORE`]
const QUALITY_SCORES: &[(&str, i32)] = &[
    ("Bluray-2160p", 100),
    ("WEBDL-2160p", 95),
    ("WEBRip-2160p", 90),
    ("Bluray-1080p", 85),
    ("WEBDL-1080p", 80),
    ("WEBRip-1080p", 75),
    ("Bluray-720p", 70),
    ("WEBDL-720p", 65),
    ("WEBRip-720p", 60),
    ("HDTV-1080p", 55),
    ("HDTV-720p", 50),
    ("DVD", 40),
    ("SDTV", 30),
];

pub const UNKNOWN_QUALITY_SCORE: i32 = 20;

pub fn quality_score(quality: &str) -> i32 {
    QUALITY_SCORES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(quality.trim()))
        .map(|(_, score)| *score)
        .unwrap_or(UNKNOWN_QUALITY_SCORE)
}

/// round(files / total × 100); None when total is zero or unknown
pub fn completion_percentage(files_on_disk: Option<i64>, total: Option<i64>) -> Option<i32> {
    let total = total.filter(|t| *t > 0)?;
    let files = files_on_disk.unwrap_or(0).max(0);
    Some(((files as f64 / total as f64) * 100.0).round() as i32)
}

/// Parent directory of a back-end path, accepting `/` and `\` separators
pub fn parent_folder(path: &str) -> Option<String> {
    let trimmed = path.trim().trim_end_matches(['/', '\\']);
    let idx = trimmed.rfind(['/', '\\'])?;
    if idx == 0 {
        return Some(trimmed[..1].to_string());
    }
    Some(trimmed[..idx].to_string())
}

fn present(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

fn apply_path(item: &mut ProcessedItem, path: Option<&String>) {
    if let Some(path) = present(path) {
        if let Some(parent) = parent_folder(&path) {
            item.parent_folder = parent;
        }
        item.media_path = path;
    }
}

fn apply_common(
    item: &mut ProcessedItem,
    instance: &str,
    monitored: Option<bool>,
    added: Option<chrono::DateTime<chrono::Utc>>,
    overview: Option<&String>,
) {
    if let Some(monitored) = monitored {
        item.monitored = Some(monitored);
    }
    if let Some(added) = added {
        item.date_added_backend = Some(added);
    }
    if let Some(overview) = present(overview) {
        item.overview = Some(overview);
    }
    if !instance.trim().is_empty() {
        item.source = instance.to_string();
    }
}

/// Merge a matched Sonarr entry
pub fn enrich_series(item: &mut ProcessedItem, entry: &SeriesEntry) {
    item.series_id = Some(entry.id);
    apply_path(item, entry.path.as_ref());
    apply_common(
        item,
        &entry.instance,
        entry.monitored,
        entry.added_at(),
        entry.overview.as_ref(),
    );

    if let Some(stats) = &entry.statistics {
        if let Some(size) = stats.size_on_disk {
            item.size_on_disk = size;
        }
        if stats.episode_file_count.is_some() {
            item.episodes_on_disk = stats.episode_file_count;
        }
        if stats.total_episode_count.is_some() {
            item.total_episodes = stats.total_episode_count;
        }
        if stats.season_count.is_some() {
            item.season_count = stats.season_count;
        }
        item.completion_percentage =
            completion_percentage(stats.episode_file_count, stats.total_episode_count);
    }
}

/// Merge a matched Radarr entry
pub fn enrich_movie(item: &mut ProcessedItem, entry: &MovieEntry) {
    item.movie_id = Some(entry.id);
    apply_path(item, entry.path.as_ref());
    apply_common(
        item,
        &entry.instance,
        entry.monitored,
        entry.added_at(),
        entry.overview.as_ref(),
    );

    if let Some(size) = entry.size_on_disk {
        item.size_on_disk = size;
    }
    if let Some(quality) = entry.quality_name() {
        item.quality_score = Some(quality_score(quality));
        item.quality = Some(quality.to_string());
    }
}
