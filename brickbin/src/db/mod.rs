//! Metadata cache persistence
//!
//! One durable SQLite table keyed by DesignID, holding the taxonomy path and
//! part image fetched from the remote catalog. Survives restarts; each
//! pipeline invocation opens its own pool and closes it when done.

pub mod parts;

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to the cache database, creating the file and the parts table on
/// first run.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the parts table if it doesn't exist
///
/// `labels` is the comma-joined taxonomy path, root-most first, never empty
/// once set. `image` is a base64 PNG, NULL until fetched. `updated` is the
/// calendar date of the last fetch attempt.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parts (
            design_id INTEGER PRIMARY KEY,
            labels    TEXT NOT NULL,
            image     TEXT,
            updated   TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::debug!("Database tables initialized (parts)");

    Ok(())
}
