//! # Reclaim Common Library
//!
//! Shared code for the Reclaim crates:
//! - Error type
//! - Configuration loading and root folder resolution
//! - SQLite initialization and schema
//! - Structured event log (EventBus)
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
