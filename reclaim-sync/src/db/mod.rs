//! Database access for reclaim-sync

pub mod media_items;
pub mod settings;

use reclaim_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the shared database and seed the scoring settings document
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let pool = reclaim_common::db::init_database(db_path).await?;
    settings::seed_deletion_score_settings(&pool).await?;
    Ok(pool)
}
