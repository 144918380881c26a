//! HTTP API handlers

pub mod health;
pub mod reconcile;
pub mod scores;

pub use health::health_routes;
pub use reconcile::reconcile_routes;
pub use scores::score_routes;
