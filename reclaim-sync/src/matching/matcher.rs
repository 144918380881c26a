//! Catalog item → back-end entry resolution
//!
//! Series try TVDB, then TMDB, then IMDb. Movies try TMDB, then IMDb. The first
//! identifier that is present and indexed decides the match.

use super::provider_index::ProviderIndex;
use crate::models::{CatalogItem, MediaKind, MovieEntry, SeriesEntry};
use std::fmt;

/// Identifier that produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    Tvdb,
    Tmdb,
    Imdb,
}

impl MatchedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchedBy::Tvdb => "tvdb",
            MatchedBy::Tmdb => "tmdb",
            MatchedBy::Imdb => "imdb",
        }
    }
}

impl fmt::Display for MatchedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of resolving one catalog item
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutcome<'a> {
    Series {
        entry: &'a SeriesEntry,
        matched_by: MatchedBy,
    },
    Movie {
        entry: &'a MovieEntry,
        matched_by: MatchedBy,
    },
    /// Normal outcome; the item continues with catalog data only
    Unmatched,
}

impl MatchOutcome<'_> {
    pub fn matched_by(&self) -> Option<MatchedBy> {
        match self {
            MatchOutcome::Series { matched_by, .. } | MatchOutcome::Movie { matched_by, .. } => {
                Some(*matched_by)
            }
            MatchOutcome::Unmatched => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        !matches!(self, MatchOutcome::Unmatched)
    }
}

/// Resolve a catalog item against the index
pub fn match_item<'a>(index: &'a ProviderIndex, item: &CatalogItem) -> MatchOutcome<'a> {
    let ids = &item.provider_ids;

    match item.kind {
        MediaKind::Series => {
            let hit = ids
                .tvdb
                .and_then(|id| index.series_by_tvdb(id))
                .map(|e| (e, MatchedBy::Tvdb))
                .or_else(|| {
                    ids.tmdb
                        .and_then(|id| index.series_by_tmdb(id))
                        .map(|e| (e, MatchedBy::Tmdb))
                })
                .or_else(|| {
                    ids.imdb
                        .as_deref()
                        .and_then(|id| index.series_by_imdb(id))
                        .map(|e| (e, MatchedBy::Imdb))
                });

            match hit {
                Some((entry, matched_by)) => MatchOutcome::Series { entry, matched_by },
                None => MatchOutcome::Unmatched,
            }
        }
        MediaKind::Movie => {
            let hit = ids
                .tmdb
                .and_then(|id| index.movie_by_tmdb(id))
                .map(|e| (e, MatchedBy::Tmdb))
                .or_else(|| {
                    ids.imdb
                        .as_deref()
                        .and_then(|id| index.movie_by_imdb(id))
                        .map(|e| (e, MatchedBy::Imdb))
                });

            match hit {
                Some((entry, matched_by)) => MatchOutcome::Movie { entry, matched_by },
                None => MatchOutcome::Unmatched,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderIds;

    fn catalog(kind: MediaKind, ids: ProviderIds) -> CatalogItem {
        CatalogItem {
            id: "c1".to_string(),
            title: "Title".to_string(),
            kind,
            year: None,
            path: None,
            provider_ids: ids,
            date_created: None,
            overview: None,
        }
    }

    fn overlapping_series_index() -> ProviderIndex {
        ProviderIndex::build(
            vec![
                SeriesEntry {
                    id: 1,
                    tvdb_id: Some(100),
                    ..Default::default()
                },
                SeriesEntry {
                    id: 2,
                    tmdb_id: Some(200),
                    ..Default::default()
                },
                SeriesEntry {
                    id: 3,
                    imdb_id: Some("tt300".to_string()),
                    ..Default::default()
                },
            ],
            vec![],
        )
    }

    #[test]
    fn test_series_prefers_tvdb() {
        let index = overlapping_series_index();
        let item = catalog(
            MediaKind::Series,
            ProviderIds {
                tvdb: Some(100),
                tmdb: Some(200),
                imdb: Some("tt300".to_string()),
            },
        );

        match match_item(&index, &item) {
            MatchOutcome::Series { entry, matched_by } => {
                assert_eq!(entry.id, 1);
                assert_eq!(matched_by, MatchedBy::Tvdb);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_series_falls_back_to_tmdb_then_imdb() {
        let index = overlapping_series_index();

        let by_tmdb = catalog(
            MediaKind::Series,
            ProviderIds {
                tvdb: Some(999),
                tmdb: Some(200),
                imdb: Some("tt300".to_string()),
            },
        );
        assert_eq!(match_item(&index, &by_tmdb).matched_by(), Some(MatchedBy::Tmdb));

        let by_imdb = catalog(
            MediaKind::Series,
            ProviderIds {
                imdb: Some("TT300".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(match_item(&index, &by_imdb).matched_by(), Some(MatchedBy::Imdb));
    }

    #[test]
    fn test_movie_prefers_tmdb_over_imdb() {
        let index = ProviderIndex::build(
            vec![],
            vec![
                MovieEntry {
                    id: 10,
                    tmdb_id: Some(603),
                    ..Default::default()
                },
                MovieEntry {
                    id: 11,
                    imdb_id: Some("tt0133093".to_string()),
                    ..Default::default()
                },
            ],
        );
        let item = catalog(
            MediaKind::Movie,
            ProviderIds {
                tmdb: Some(603),
                imdb: Some("tt0133093".to_string()),
                tvdb: None,
            },
        );

        match match_item(&index, &item) {
            MatchOutcome::Movie { entry, matched_by } => {
                assert_eq!(entry.id, 10);
                assert_eq!(matched_by, MatchedBy::Tmdb);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_movie_never_matches_series_collection() {
        let index = overlapping_series_index();
        let item = catalog(
            MediaKind::Movie,
            ProviderIds {
                tvdb: Some(100),
                ..Default::default()
            },
        );
        let outcome = match_item(&index, &item);
        assert!(!outcome.is_matched());
        assert_eq!(outcome.matched_by(), None);
    }
}
