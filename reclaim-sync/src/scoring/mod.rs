//! Deletion scoring

pub mod calculator;
pub mod folder_space;

pub use calculator::{breakpoint_points, DeletionScoreCalculator, ScoreInputs};
