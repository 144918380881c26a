//! Deletion score calculator
//!
//! A pure function of (inputs, settings, now). Each breakpoint factor sorts its
//! breakpoints by threshold, highest first, and takes the first one whose
//! threshold the metric strictly exceeds:
//!
//! ```text
//! points = clamp(round(max_points × percent / 100), 0, max_points)
//! total  = min(100, Σ enabled factor points)
//! ```
//!
//! Missing or non-finite inputs make the affected factor contribute 0 and log a
//! warning; scoring never fails.

use crate::models::{
    Breakpoint, BreakpointFactor, DatePreference, DeletionScoreSettings, FactorScore,
    ProcessedItem, ScoreBreakdown,
};
use chrono::{DateTime, Utc};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Inputs the calculator reads, shared by live runs and stored-row rescoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreInputs {
    pub title: String,
    pub last_watched: Option<DateTime<Utc>>,
    pub date_added_catalog: Option<DateTime<Utc>>,
    pub date_added_backend: Option<DateTime<Utc>>,
    /// Bytes
    pub size_on_disk: Option<f64>,
    pub folder_remaining_percent: Option<f64>,
}

impl From<&ProcessedItem> for ScoreInputs {
    fn from(item: &ProcessedItem) -> Self {
        Self {
            title: item.title.clone(),
            last_watched: item.playback.last_watched,
            date_added_catalog: item.date_added_catalog,
            date_added_backend: item.date_added_backend,
            size_on_disk: Some(item.size_on_disk as f64),
            folder_remaining_percent: item.folder_remaining_percent,
        }
    }
}

/// Points for `metric` under a breakpoint list, and the breakpoint that applied
pub fn breakpoint_points(
    breakpoints: &[Breakpoint],
    max_points: f64,
    metric: f64,
) -> (f64, Option<Breakpoint>) {
    let max_points = if max_points.is_finite() { max_points.max(0.0) } else { 0.0 };

    let mut sorted: Vec<Breakpoint> = breakpoints
        .iter()
        .copied()
        .filter(|b| b.threshold.is_finite() && b.percent.is_finite())
        .collect();
    sorted.sort_by(|a, b| b.threshold.total_cmp(&a.threshold));

    match sorted.into_iter().find(|b| metric > b.threshold) {
        Some(bp) => {
            let points = (max_points * bp.percent / 100.0).round().clamp(0.0, max_points);
            (points, Some(bp))
        }
        None => (0.0, None),
    }
}

/// Borrowed settings plus a reference instant
pub struct DeletionScoreCalculator<'a> {
    settings: &'a DeletionScoreSettings,
    now: DateTime<Utc>,
}

impl<'a> DeletionScoreCalculator<'a> {
    pub fn new(settings: &'a DeletionScoreSettings, now: DateTime<Utc>) -> Self {
        Self { settings, now }
    }

    /// Added date per the configured preference, falling back to the other date
    pub fn resolve_added_date(&self, inputs: &ScoreInputs) -> Option<DateTime<Utc>> {
        let catalog = inputs.date_added_catalog;
        let backend = inputs.date_added_backend;

        match self.settings.date_preference {
            DatePreference::Catalog => catalog.or(backend),
            DatePreference::Backend => backend.or(catalog),
            DatePreference::Oldest => match (catalog, backend) {
                (Some(c), Some(b)) => Some(c.min(b)),
                (c, b) => c.or(b),
            },
        }
    }

    fn days_since(&self, date: DateTime<Utc>) -> f64 {
        reclaim_common::time::days_between(date, self.now) as f64
    }

    /// Score one item; None when scoring is switched off
    pub fn calculate(&self, inputs: &ScoreInputs) -> Option<ScoreBreakdown> {
        if !self.settings.enabled {
            return None;
        }

        let added = self.resolve_added_date(inputs);

        let days_unwatched_metric = inputs
            .last_watched
            .or(added)
            .map(|date| self.days_since(date));
        let age_metric = added.map(|date| self.days_since(date));
        let size_metric = inputs.size_on_disk.map(|bytes| bytes / BYTES_PER_GIB);
        let used_metric = inputs.folder_remaining_percent.map(|remaining| 100.0 - remaining);

        let days_unwatched = self.breakpoint_factor(
            &self.settings.days_unwatched,
            days_unwatched_metric,
            "days",
            "days unwatched",
            &inputs.title,
        );
        let never_watched = self.never_watched(inputs);
        let size_on_disk = self.breakpoint_factor(
            &self.settings.size_on_disk,
            size_metric,
            "GB",
            "size on disk",
            &inputs.title,
        );
        let age_since_added = self.breakpoint_factor(
            &self.settings.age_since_added,
            age_metric,
            "days",
            "age since added",
            &inputs.title,
        );
        let folder_space = self.breakpoint_factor(
            &self.settings.folder_space,
            used_metric,
            "% used",
            "folder space",
            &inputs.title,
        );

        let sum: f64 = [
            &days_unwatched,
            &never_watched,
            &size_on_disk,
            &age_since_added,
            &folder_space,
        ]
        .iter()
        .filter(|f| f.enabled)
        .map(|f| f.points_earned)
        .sum();

        Some(ScoreBreakdown {
            days_unwatched,
            never_watched,
            size_on_disk,
            age_since_added,
            folder_space,
            total_score: sum.clamp(0.0, 100.0),
        })
    }

    fn never_watched(&self, inputs: &ScoreInputs) -> FactorScore {
        let factor = &self.settings.never_watched;
        let max_points = if factor.max_points.is_finite() {
            factor.max_points.max(0.0)
        } else {
            0.0
        };

        if !factor.enabled {
            return FactorScore::disabled(max_points);
        }

        let (points_earned, category) = if inputs.last_watched.is_none() {
            (max_points, "never watched")
        } else {
            (0.0, "watched")
        };

        FactorScore {
            enabled: true,
            points_earned,
            max_points,
            category: category.to_string(),
        }
    }

    fn breakpoint_factor(
        &self,
        factor: &BreakpointFactor,
        metric: Option<f64>,
        unit: &str,
        label: &str,
        title: &str,
    ) -> FactorScore {
        if !factor.enabled {
            return FactorScore::disabled(factor.max_points);
        }

        let metric = match metric {
            Some(value) if value.is_finite() => value,
            other => {
                tracing::warn!(
                    title = %title,
                    factor = label,
                    value = ?other,
                    "Missing or invalid scoring input; factor scores 0"
                );
                return FactorScore {
                    enabled: true,
                    points_earned: 0.0,
                    max_points: factor.max_points,
                    category: "unknown".to_string(),
                };
            }
        };

        let (points_earned, applied) = breakpoint_points(&factor.breakpoints, factor.max_points, metric);

        let category = match applied {
            Some(bp) => format!("over {} {}", bp.threshold, unit),
            None => match factor
                .breakpoints
                .iter()
                .map(|b| b.threshold)
                .filter(|t| t.is_finite())
                .reduce(f64::min)
            {
                Some(lowest) => format!("up to {} {}", lowest, unit),
                None => "no breakpoints".to_string(),
            },
        };

        FactorScore {
            enabled: true,
            points_earned,
            max_points: factor.max_points,
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_breakpoint_strictly_exceeds() {
        let bps = [Breakpoint::new(30.0, 50.0), Breakpoint::new(90.0, 100.0)];
        assert_eq!(breakpoint_points(&bps, 10.0, 30.0).0, 0.0);
        assert_eq!(breakpoint_points(&bps, 10.0, 31.0).0, 5.0);
        assert_eq!(breakpoint_points(&bps, 10.0, 90.0).0, 5.0);
        assert_eq!(breakpoint_points(&bps, 10.0, 91.0).0, 10.0);
    }

    #[test]
    fn test_breakpoints_unsorted_input() {
        let bps = [
            Breakpoint::new(365.0, 73.0),
            Breakpoint::new(30.0, 0.0),
            Breakpoint::new(180.0, 50.0),
        ];
        let (points, applied) = breakpoint_points(&bps, 30.0, 200.0);
        assert_eq!(points, 15.0);
        assert_eq!(applied.map(|b| b.threshold), Some(180.0));
    }

    #[test]
    fn test_points_clamped_to_max() {
        let bps = [Breakpoint::new(0.0, 250.0)];
        assert_eq!(breakpoint_points(&bps, 10.0, 5.0).0, 10.0);

        let negative = [Breakpoint::new(0.0, -40.0)];
        assert_eq!(breakpoint_points(&negative, 10.0, 5.0).0, 0.0);
    }

    #[test]
    fn test_points_within_bounds_for_metric_sweep() {
        let settings = DeletionScoreSettings::default();
        let factor = &settings.size_on_disk;
        let mut metric = -10.0;
        while metric < 200.0 {
            let (points, applied) = breakpoint_points(&factor.breakpoints, factor.max_points, metric);
            assert!((0.0..=factor.max_points).contains(&points));
            if metric <= 1.0 {
                assert!(applied.is_none());
            }
            metric += 0.5;
        }
    }

    #[test]
    fn test_unwatched_large_old_movie_defaults() {
        let settings = DeletionScoreSettings::default();
        let calc = DeletionScoreCalculator::new(&settings, now());
        let inputs = ScoreInputs {
            title: "Alien".to_string(),
            date_added_backend: Some(now() - Duration::days(400)),
            size_on_disk: Some(5e9),
            ..Default::default()
        };

        let breakdown = calc.calculate(&inputs).unwrap();
        assert_eq!(breakdown.size_on_disk.points_earned, 0.0);
        assert_eq!(breakdown.never_watched.points_earned, 20.0);
        assert_eq!(breakdown.days_unwatched.points_earned, 30.0);
        assert_eq!(breakdown.age_since_added.points_earned, 10.0);
        assert_eq!(breakdown.total_score, 60.0);
        assert_eq!(breakdown.age_since_added.category, "over 365 days");
    }

    #[test]
    fn test_total_capped_at_100() {
        let mut settings = DeletionScoreSettings::default();
        settings.folder_space.enabled = true;
        settings.never_watched.max_points = 80.0;
        let calc = DeletionScoreCalculator::new(&settings, now());
        let inputs = ScoreInputs {
            date_added_backend: Some(now() - Duration::days(2000)),
            size_on_disk: Some(100.0 * BYTES_PER_GIB),
            folder_remaining_percent: Some(5.0),
            ..Default::default()
        };

        let breakdown = calc.calculate(&inputs).unwrap();
        assert_eq!(breakdown.total_score, 100.0);
        assert_eq!(breakdown.folder_space.points_earned, 10.0);
    }

    #[test]
    fn test_master_switch_off() {
        let settings = DeletionScoreSettings {
            enabled: false,
            ..Default::default()
        };
        let calc = DeletionScoreCalculator::new(&settings, now());
        assert!(calc.calculate(&ScoreInputs::default()).is_none());
    }

    #[test]
    fn test_missing_dates_contribute_zero() {
        let settings = DeletionScoreSettings::default();
        let calc = DeletionScoreCalculator::new(&settings, now());
        let breakdown = calc
            .calculate(&ScoreInputs {
                size_on_disk: Some(f64::NAN),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(breakdown.days_unwatched.points_earned, 0.0);
        assert_eq!(breakdown.age_since_added.points_earned, 0.0);
        assert_eq!(breakdown.size_on_disk.category, "unknown");
        assert_eq!(breakdown.total_score, 20.0);
    }

    #[test]
    fn test_recent_watch_uses_last_watched() {
        let settings = DeletionScoreSettings::default();
        let calc = DeletionScoreCalculator::new(&settings, now());
        let breakdown = calc
            .calculate(&ScoreInputs {
                last_watched: Some(now() - Duration::days(10)),
                date_added_backend: Some(now() - Duration::days(1000)),
                size_on_disk: Some(0.0),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(breakdown.days_unwatched.points_earned, 0.0);
        assert_eq!(breakdown.never_watched.points_earned, 0.0);
        assert_eq!(breakdown.age_since_added.points_earned, 15.0);
        assert_eq!(breakdown.total_score, 15.0);
    }

    #[test]
    fn test_date_preference_resolution() {
        let catalog = now() - Duration::days(10);
        let backend = now() - Duration::days(20);
        let inputs = ScoreInputs {
            date_added_catalog: Some(catalog),
            date_added_backend: Some(backend),
            ..Default::default()
        };

        let mut settings = DeletionScoreSettings::default();
        settings.date_preference = DatePreference::Catalog;
        assert_eq!(
            DeletionScoreCalculator::new(&settings, now()).resolve_added_date(&inputs),
            Some(catalog)
        );

        settings.date_preference = DatePreference::Oldest;
        assert_eq!(
            DeletionScoreCalculator::new(&settings, now()).resolve_added_date(&inputs),
            Some(backend)
        );

        settings.date_preference = DatePreference::Backend;
        let catalog_only = ScoreInputs {
            date_added_catalog: Some(catalog),
            ..Default::default()
        };
        assert_eq!(
            DeletionScoreCalculator::new(&settings, now()).resolve_added_date(&catalog_only),
            Some(catalog)
        );
    }

    #[test]
    fn test_disabled_factor_excluded_from_total() {
        let mut settings = DeletionScoreSettings::default();
        settings.never_watched.enabled = false;
        let calc = DeletionScoreCalculator::new(&settings, now());
        let breakdown = calc.calculate(&ScoreInputs::default()).unwrap();

        assert!(!breakdown.never_watched.enabled);
        assert_eq!(breakdown.never_watched.category, "disabled");
        assert_eq!(breakdown.total_score, 0.0);
    }
}
