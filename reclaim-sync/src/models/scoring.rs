//! Deletion score settings and breakdown
//!
//! Settings are stored as one JSON document in the `settings` table; the field
//! names below are the JSON keys the settings screens write.

use serde::{Deserialize, Serialize};

/// One step of a breakpoint rule: metric above `threshold` earns `percent` of the factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub threshold: f64,
    pub percent: f64,
}

impl Breakpoint {
    pub const fn new(threshold: f64, percent: f64) -> Self {
        Self { threshold, percent }
    }
}

/// Factor scored through a breakpoint list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointFactor {
    pub enabled: bool,
    pub max_points: f64,
    #[serde(default)]
    pub breakpoints: Vec<Breakpoint>,
}

/// Flat bonus factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusFactor {
    pub enabled: bool,
    pub max_points: f64,
}

/// Which added date drives the age and days-unwatched metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePreference {
    /// Date the catalog first saw the item
    Catalog,
    /// Date the back-end added the item
    #[default]
    Backend,
    /// Whichever of the two is older
    Oldest,
}

/// Complete scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeletionScoreSettings {
    /// Master switch; disabled means no score is computed
    pub enabled: bool,
    pub days_unwatched: BreakpointFactor,
    pub never_watched: BonusFactor,
    pub size_on_disk: BreakpointFactor,
    pub age_since_added: BreakpointFactor,
    /// Breakpoints are over percent of space used
    pub folder_space: BreakpointFactor,
    pub date_preference: DatePreference,
}

impl Default for DeletionScoreSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            days_unwatched: BreakpointFactor {
                enabled: true,
                max_points: 30.0,
                breakpoints: vec![
                    Breakpoint::new(30.0, 0.0),
                    Breakpoint::new(90.0, 17.0),
                    Breakpoint::new(180.0, 50.0),
                    Breakpoint::new(365.0, 73.0),
                    Breakpoint::new(366.0, 100.0),
                ],
            },
            never_watched: BonusFactor {
                enabled: true,
                max_points: 20.0,
            },
            size_on_disk: BreakpointFactor {
                enabled: true,
                max_points: 35.0,
                breakpoints: vec![
                    Breakpoint::new(1.0, 0.0),
                    Breakpoint::new(5.0, 0.0),
                    Breakpoint::new(10.0, 29.0),
                    Breakpoint::new(20.0, 43.0),
                    Breakpoint::new(50.0, 71.0),
                    Breakpoint::new(51.0, 100.0),
                ],
            },
            age_since_added: BreakpointFactor {
                enabled: true,
                max_points: 15.0,
                breakpoints: vec![
                    Breakpoint::new(180.0, 33.0),
                    Breakpoint::new(365.0, 67.0),
                    Breakpoint::new(730.0, 100.0),
                ],
            },
            folder_space: BreakpointFactor {
                enabled: false,
                max_points: 10.0,
                breakpoints: vec![
                    Breakpoint::new(50.0, 30.0),
                    Breakpoint::new(70.0, 60.0),
                    Breakpoint::new(80.0, 80.0),
                    Breakpoint::new(90.0, 100.0),
                ],
            },
            date_preference: DatePreference::Backend,
        }
    }
}

/// Outcome of one factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorScore {
    pub enabled: bool,
    pub points_earned: f64,
    pub max_points: f64,
    /// Human-readable bracket, e.g. "over 365 days"
    pub category: String,
}

impl FactorScore {
    pub fn disabled(max_points: f64) -> Self {
        Self {
            enabled: false,
            points_earned: 0.0,
            max_points,
            category: "disabled".to_string(),
        }
    }
}

/// Per-factor explanation of a deletion score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub days_unwatched: FactorScore,
    pub never_watched: FactorScore,
    pub size_on_disk: FactorScore,
    pub age_since_added: FactorScore,
    pub folder_space: FactorScore,
    /// min(100, sum of enabled factor points)
    pub total_score: f64,
}

impl ScoreBreakdown {
    pub fn factors(&self) -> [&FactorScore; 5] {
        [
            &self.days_unwatched,
            &self.never_watched,
            &self.size_on_disk,
            &self.age_since_added,
            &self.folder_space,
        ]
    }
}
