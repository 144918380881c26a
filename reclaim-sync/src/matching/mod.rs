//! Entity matching and enrichment

pub mod enrichment;
pub mod matcher;
pub mod provider_index;

pub use matcher::{match_item, MatchOutcome, MatchedBy};
pub use provider_index::ProviderIndex;
