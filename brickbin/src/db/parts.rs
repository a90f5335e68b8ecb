//! Part metadata cache operations
//!
//! All lookups are scoped to an explicit DesignID list: the cache holds every
//! part ever fetched, but one invocation only ever touches its own working set.

use crate::{Error, Result};
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use std::collections::{HashMap, HashSet};

/// One cached part: taxonomy path plus optional image blob.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub design_id: i64,
    /// Ordered taxonomy terms, root-most first, minimum one term
    pub labels: Vec<String>,
    /// Base64 PNG, None if the image fetch failed
    pub image: Option<String>,
    /// Calendar date of the last fetch attempt
    pub updated: NaiveDate,
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Build a `?,?,...` placeholder list for an IN clause.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

/// Fetch labels for the given DesignIDs. Left-join semantics: ids without a
/// cache row are simply absent from the result, never an error.
pub async fn get_labels(pool: &SqlitePool, ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = format!(
        "SELECT design_id, labels FROM parts WHERE design_id IN ({})",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await?;
    let mut labels = HashMap::with_capacity(rows.len());
    for row in rows {
        let design_id: i64 = row.get("design_id");
        let joined: String = row.get("labels");
        labels.insert(design_id, split_labels(&joined));
    }
    Ok(labels)
}

/// DesignIDs from the given list that already have a cache row.
pub async fn existing_ids(pool: &SqlitePool, ids: &[i64]) -> Result<HashSet<i64>> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let sql = format!(
        "SELECT design_id FROM parts WHERE design_id IN ({})",
        placeholders(ids.len())
    );
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for id in ids {
        query = query.bind(id);
    }

    Ok(query.fetch_all(pool).await?.into_iter().collect())
}

/// Insert a batch of fetched entries in one transaction.
///
/// A duplicate DesignID, within the batch or against an existing row, is a
/// `CacheIntegrity` error: the enrichment phase only fetches cache misses and
/// dedups canonical-id rewrites before flushing, so a duplicate here means a
/// caller bug.
pub async fn insert_entries(pool: &SqlitePool, entries: &[CacheEntry]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.design_id) {
            return Err(Error::CacheIntegrity(format!(
                "duplicate DesignID {} in cache batch",
                entry.design_id
            )));
        }
    }

    let mut tx = pool.begin().await?;
    for entry in entries {
        let result = sqlx::query(
            r#"
            INSERT INTO parts (design_id, labels, image, updated)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(entry.design_id)
        .bind(entry.labels.join(","))
        .bind(&entry.image)
        .bind(entry.updated.format(DATE_FORMAT).to_string())
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::CacheIntegrity(format!(
                    "DesignID {} already cached",
                    entry.design_id
                )));
            }
            Err(e) => return Err(e.into()),
        }
    }
    tx.commit().await?;

    Ok(())
}

/// Rows from the given working set with labels set but no image, along with
/// their last fetch date. Feeds the once-per-day image refresher.
pub async fn missing_image_candidates(
    pool: &SqlitePool,
    ids: &[i64],
) -> Result<Vec<(i64, NaiveDate)>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT design_id, updated FROM parts WHERE design_id IN ({}) AND image IS NULL",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await?;
    let mut candidates = Vec::with_capacity(rows.len());
    for row in rows {
        let design_id: i64 = row.get("design_id");
        let updated: String = row.get("updated");
        let date = match NaiveDate::parse_from_str(&updated, DATE_FORMAT) {
            Ok(date) => date,
            Err(_) => {
                // Unparsable date: treat as stale so the next image update
                // rewrites a well-formed one.
                tracing::warn!(
                    "Part {} has unparsable updated date {:?}, treating as stale",
                    design_id,
                    updated
                );
                NaiveDate::default()
            }
        };
        candidates.push((design_id, date));
    }
    Ok(candidates)
}

/// Store a freshly fetched image (or the lack of one) and stamp today's date,
/// so the refresher retries at most once per calendar day.
pub async fn update_image(
    pool: &SqlitePool,
    design_id: i64,
    image: Option<&str>,
    today: NaiveDate,
) -> Result<()> {
    sqlx::query("UPDATE parts SET image = ?, updated = ? WHERE design_id = ?")
        .bind(image)
        .bind(today.format(DATE_FORMAT).to_string())
        .bind(design_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Images for the given DesignIDs in ascending id order, for rendering.
/// Uncached ids are absent; cached ids without an image come back as None.
pub async fn images_for_parts(
    pool: &SqlitePool,
    ids: &[i64],
) -> Result<Vec<(i64, Option<String>)>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT design_id, image FROM parts WHERE design_id IN ({}) ORDER BY design_id ASC",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|row| (row.get("design_id"), row.get("image")))
        .collect())
}

fn split_labels(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
