//! Data models for the reconciliation pipeline

pub mod backend;
pub mod catalog;
pub mod processed;
pub mod progress;
pub mod scoring;

pub use backend::{
    DiskSpaceRecord, FolderSpace, MovieEntry, MovieFile, QualityModel, QualityName,
    RootFolderRecord, SeriesEntry, SeriesStatistics,
};
pub use catalog::{CatalogItem, MediaKind, PlaybackSummary, ProviderIds};
pub use processed::ProcessedItem;
pub use progress::{RunPhase, RunProgress};
pub use scoring::{
    BonusFactor, Breakpoint, BreakpointFactor, DatePreference, DeletionScoreSettings,
    FactorScore, ScoreBreakdown,
};
