//! Watch-history aggregation from the catalog's playback activity log
//!
//! Movies aggregate by catalog item id. Series aggregate by episode name prefix
//! (`<title> - s%`), since the log records episodes rather than the series;
//! series whose titles share a prefix can pick up each other's plays.
//!
//! Any failure or timeout degrades to "no playback data" with a warning.

use crate::models::{CatalogItem, MediaKind, PlaybackSummary};
use crate::services::{ActivityQueryResult, CatalogSource};
use reclaim_common::events::EventBus;
use reclaim_common::time::parse_timestamp;
use std::sync::Arc;
use std::time::Duration;

/// Item ids per activity-log query
pub const ID_CHUNK_SIZE: usize = 800;

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Sessions shorter than this (seconds) are not viewings
const MIN_PLAY_SECONDS: i64 = 300;
/// Sessions longer than this (seconds) are left-running players
const MAX_PLAY_SECONDS: i64 = 28_800;

/// Escape a value for a single-quoted SQL literal
pub fn escape_sql_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn aggregate_select() -> String {
    format!(
        "SELECT MAX(DateCreated) AS LastWatched, \
         SUM(CASE WHEN PlayDuration > {} AND PlayDuration < {} THEN 1 ELSE 0 END) AS WatchCount \
         FROM PlaybackActivity",
        MIN_PLAY_SECONDS, MAX_PLAY_SECONDS
    )
}

/// Aggregate query over a set of catalog item ids
pub fn movie_query(item_ids: &[String]) -> String {
    let ids = item_ids
        .iter()
        .map(|id| format!("'{}'", escape_sql_literal(id)))
        .collect::<Vec<_>>()
        .join(",");
    format!("{} WHERE ItemId IN ({})", aggregate_select(), ids)
}

/// Aggregate query over every episode of a series, by name prefix
pub fn series_query(title: &str) -> String {
    format!(
        "{} WHERE ItemName LIKE '{} - s%'",
        aggregate_select(),
        escape_sql_literal(title)
    )
}

fn value_as_i64(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

/// Read `LastWatched` / `WatchCount` from the first result row
pub fn parse_summary(result: &ActivityQueryResult) -> PlaybackSummary {
    let Some(row) = result.results.first() else {
        return PlaybackSummary::default();
    };

    let last_watched = result
        .column("LastWatched")
        .and_then(|idx| row.get(idx))
        .and_then(|v| v.as_str())
        .and_then(parse_timestamp);

    let watch_count = result
        .column("WatchCount")
        .and_then(|idx| row.get(idx))
        .and_then(value_as_i64)
        .unwrap_or(0)
        .max(0);

    PlaybackSummary {
        last_watched,
        watch_count,
    }
}

/// Runs activity-log queries with a bounded timeout
pub struct PlaybackAggregator {
    source: Arc<dyn CatalogSource>,
    timeout: Duration,
    events: Option<EventBus>,
}

impl PlaybackAggregator {
    pub fn new(source: Arc<dyn CatalogSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            events: None,
        }
    }

    /// Mirror degraded-path warnings to the event log
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Aggregate for one catalog item according to its kind
    pub async fn for_item(&self, item: &CatalogItem) -> PlaybackSummary {
        match item.kind {
            MediaKind::Movie => self.for_ids(std::slice::from_ref(&item.id)).await,
            MediaKind::Series => self.for_series(&item.title).await,
        }
    }

    /// Aggregate over any number of item ids, chunked and merged
    pub async fn for_ids(&self, item_ids: &[String]) -> PlaybackSummary {
        let mut summary = PlaybackSummary::default();
        for chunk in item_ids.chunks(ID_CHUNK_SIZE) {
            let partial = self.run(&movie_query(chunk), "item ids").await;
            summary = summary.merge(partial);
        }
        summary
    }

    pub async fn for_series(&self, title: &str) -> PlaybackSummary {
        self.run(&series_query(title), title).await
    }

    async fn run(&self, sql: &str, context: &str) -> PlaybackSummary {
        match tokio::time::timeout(self.timeout, self.source.query_activity(sql)).await {
            Ok(Ok(result)) => parse_summary(&result),
            Ok(Err(e)) => {
                self.warn(format!("Playback query failed for {}: {}", context, e));
                PlaybackSummary::default()
            }
            Err(_) => {
                self.warn(format!(
                    "Playback query for {} timed out after {:?}",
                    context, self.timeout
                ));
                PlaybackSummary::default()
            }
        }
    }

    fn warn(&self, message: String) {
        tracing::warn!("{}", message);
        if let Some(events) = &self.events {
            events.warning("playback", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::EmbyError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    fn row(last_watched: &str, count: i64) -> ActivityQueryResult {
        ActivityQueryResult {
            colums: vec!["LastWatched".to_string(), "WatchCount".to_string()],
            results: vec![vec![json!(last_watched), json!(count)]],
        }
    }

    /// Answers after `delay`; records every query it receives
    struct ScriptedLog {
        delay: Duration,
        answers: Vec<(String, ActivityQueryResult)>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedLog {
        fn new(delay: Duration, answers: Vec<(&str, ActivityQueryResult)>) -> Arc<Self> {
            Arc::new(Self {
                delay,
                answers: answers
                    .into_iter()
                    .map(|(key, result)| (key.to_string(), result))
                    .collect(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn queries(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CatalogSource for ScriptedLog {
        fn name(&self) -> &str {
            "Emby"
        }

        async fn list_items(&self) -> Result<Vec<CatalogItem>, EmbyError> {
            Ok(Vec::new())
        }

        async fn query_activity(&self, sql: &str) -> Result<ActivityQueryResult, EmbyError> {
            self.seen.lock().unwrap().push(sql.to_string());
            tokio::time::sleep(self.delay).await;
            Ok(self
                .answers
                .iter()
                .find(|(key, _)| sql.contains(key.as_str()))
                .map(|(_, result)| result.clone())
                .unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_slow_query_times_out_to_no_data() {
        let log = ScriptedLog::new(
            Duration::from_millis(500),
            vec![("LIKE 'Fargo - s%'", row("2024-03-01 20:00:00", 3))],
        );
        let events = EventBus::new(16);
        let mut rx = events.subscribe();
        let aggregator =
            PlaybackAggregator::new(log.clone(), Duration::from_millis(20)).with_events(events);

        let summary = aggregator.for_series("Fargo").await;

        assert_eq!(summary, PlaybackSummary::default());
        assert_eq!(log.queries().len(), 1);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_ids_split_into_chunks_and_merged() {
        let ids: Vec<String> = (0..=ID_CHUNK_SIZE).map(|n| format!("id{}", n)).collect();
        let log = ScriptedLog::new(
            Duration::ZERO,
            vec![
                ("'id0'", row("2024-01-01 10:00:00", 2)),
                ("'id800'", row("2024-03-01 10:00:00", 3)),
            ],
        );
        let aggregator = PlaybackAggregator::new(log.clone(), DEFAULT_QUERY_TIMEOUT);

        let summary = aggregator.for_ids(&ids).await;

        let queries = log.queries();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].contains("'id799'"));
        assert!(!queries[0].contains("'id800'"));
        assert_eq!(summary.watch_count, 5);
        assert_eq!(summary.last_watched, parse_timestamp("2024-03-01 10:00:00"));
    }

    #[test]
    fn test_series_query_escapes_quotes() {
        let sql = series_query("Grey's Anatomy");
        assert!(sql.contains("ItemName LIKE 'Grey''s Anatomy - s%'"));
        assert!(sql.contains("PlayDuration > 300 AND PlayDuration < 28800"));
    }

    #[test]
    fn test_movie_query_lists_ids() {
        let sql = movie_query(&["a1".to_string(), "b'2".to_string()]);
        assert!(sql.ends_with("WHERE ItemId IN ('a1','b''2')"));
    }

    #[test]
    fn test_parse_summary_with_string_values() {
        let result = ActivityQueryResult {
            colums: vec!["LastWatched".to_string(), "WatchCount".to_string()],
            results: vec![vec![json!("2024-03-01 20:15:33.1234567"), json!("4")]],
        };
        let summary = parse_summary(&result);
        assert_eq!(summary.watch_count, 4);
        assert!(summary.last_watched.is_some());
    }

    #[test]
    fn test_parse_summary_null_row_is_not_found() {
        let result = ActivityQueryResult {
            colums: vec!["LastWatched".to_string(), "WatchCount".to_string()],
            results: vec![vec![serde_json::Value::Null, serde_json::Value::Null]],
        };
        assert!(!parse_summary(&result).found());
        assert!(!parse_summary(&ActivityQueryResult::default()).found());
    }
}
