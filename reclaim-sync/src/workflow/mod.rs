//! Run orchestration, progress tracking and background rescoring

pub mod backends;
pub mod orchestrator;
pub mod progress;
pub mod recalculation;

pub use orchestrator::{ReconcileOptions, ReconcileOrchestrator, ReconcileReport, CANCELLED};
pub use progress::{ProgressHandle, ProgressRegistry};
pub use recalculation::{RecalcStatus, RecalcSummary, RecalculationHandle, ScoreRecalculator};
