//! Enrichment fetch phase and the daily image refresher
//!
//! The fetch phase runs one task per cache-miss DesignID across a bounded
//! worker pool; results are buffered and flushed as a single batch cache
//! write once the whole phase completes, so the refresher never interleaves
//! with it. The refresher then retries missing images, at most once per
//! calendar day per part.

use crate::db::parts::{self, CacheEntry};
use crate::services::brick_architect::BrickArchitectClient;
use crate::Result;
use chrono::Local;
use futures::stream::{self, StreamExt};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Fetch taxonomy and image for every cache miss, write the batch to the
/// cache, and return the labels keyed by the *queried* id (the working-set
/// join key). Metadata is cached under the *resolved* id, which may differ
/// when the catalog redirects to a canonical mold.
pub async fn fetch_missing(
    client: &BrickArchitectClient,
    pool: &SqlitePool,
    missing: &[i64],
    width: usize,
) -> Result<HashMap<i64, Vec<String>>> {
    if missing.is_empty() {
        return Ok(HashMap::new());
    }

    info!("Fetching {} parts across {} workers", missing.len(), width);

    let fetched = stream::iter(missing.iter().copied())
        .map(|design_id| client.fetch_part(design_id))
        .buffer_unordered(width)
        .collect::<Vec<_>>()
        .await;

    let today = Local::now().date_naive();
    let mut labels = HashMap::with_capacity(fetched.len());
    let mut entries: Vec<CacheEntry> = Vec::with_capacity(fetched.len());
    let mut seen = HashSet::with_capacity(fetched.len());
    let mut rewritten = Vec::new();

    for part in &fetched {
        labels.insert(part.design_id, part.labels.clone());

        // Two queried ids can resolve to the same canonical id; the first
        // fetch wins the cache slot.
        if !seen.insert(part.resolved_id) {
            debug!(
                "Part {} resolved to {} which is already in this batch, skipping cache write",
                part.design_id, part.resolved_id
            );
            continue;
        }
        if part.resolved_id != part.design_id {
            rewritten.push(part.resolved_id);
        }
        entries.push(CacheEntry {
            design_id: part.resolved_id,
            labels: part.labels.clone(),
            image: part.image.clone(),
            updated: today,
        });
    }

    // A redirect can also land on an id that was cached in an earlier run.
    // Queried ids themselves are guaranteed misses, so only rewrites are
    // checked; anything else duplicated is a bug insert_entries will catch.
    let already_cached = parts::existing_ids(pool, &rewritten).await?;
    entries.retain(|entry| {
        if already_cached.contains(&entry.design_id) {
            debug!(
                "Canonical id {} already cached from an earlier run, skipping cache write",
                entry.design_id
            );
            false
        } else {
            true
        }
    });

    parts::insert_entries(pool, &entries).await?;
    Ok(labels)
}

/// Retry the image fetch for every cached working-set row with labels but no
/// image whose last attempt was before today. Returns the number of fetches
/// performed, so a second run on the same day reports zero.
pub async fn refresh_images(
    client: &BrickArchitectClient,
    pool: &SqlitePool,
    ids: &[i64],
) -> Result<usize> {
    let candidates = parts::missing_image_candidates(pool, ids).await?;
    let today = Local::now().date_naive();

    let mut refreshed = 0;
    for (design_id, last_attempt) in candidates {
        if last_attempt >= today {
            continue;
        }
        info!("Updating image for part {}", design_id);
        let image = client.part_image(design_id).await;
        parts::update_image(pool, design_id, image.as_deref(), today).await?;
        refreshed += 1;
    }

    Ok(refreshed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ROOT_CATEGORY;
    use chrono::NaiveDate;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    /// Client whose every request fails fast, exercising the fallback paths.
    fn offline_client() -> BrickArchitectClient {
        BrickArchitectClient::with_base_url("http://127.0.0.1:1").unwrap()
    }

    #[tokio::test]
    async fn failed_fetches_degrade_to_root_label_and_no_image() {
        let pool = test_pool().await;
        let client = offline_client();

        let labels = fetch_missing(&client, &pool, &[3001, 3002], 2).await.unwrap();
        assert_eq!(labels[&3001], vec![ROOT_CATEGORY.to_string()]);
        assert_eq!(labels[&3002], vec![ROOT_CATEGORY.to_string()]);

        // Fallback entries are cached with today's date and no image
        let cached = parts::get_labels(&pool, &[3001, 3002]).await.unwrap();
        assert_eq!(cached.len(), 2);
        let images = parts::images_for_parts(&pool, &[3001, 3002]).await.unwrap();
        assert!(images.iter().all(|(_, image)| image.is_none()));
    }

    #[tokio::test]
    async fn no_misses_means_no_work() {
        let pool = test_pool().await;
        let client = offline_client();

        let labels = fetch_missing(&client, &pool, &[], 10).await.unwrap();
        assert!(labels.is_empty());
    }

    #[tokio::test]
    async fn refresher_runs_at_most_once_per_day() {
        let pool = test_pool().await;
        let client = offline_client();

        let yesterday = Local::now().date_naive().pred_opt().unwrap();
        parts::insert_entries(
            &pool,
            &[CacheEntry {
                design_id: 3001,
                labels: vec![ROOT_CATEGORY.to_string()],
                image: None,
                updated: yesterday,
            }],
        )
        .await
        .unwrap();

        // First run attempts the fetch (which fails, leaving the image NULL)
        // and stamps today; the second run finds nothing stale.
        assert_eq!(refresh_images(&client, &pool, &[3001]).await.unwrap(), 1);
        assert_eq!(refresh_images(&client, &pool, &[3001]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn refresher_ignores_parts_outside_working_set() {
        let pool = test_pool().await;
        let client = offline_client();

        let old = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        parts::insert_entries(
            &pool,
            &[CacheEntry {
                design_id: 3001,
                labels: vec![ROOT_CATEGORY.to_string()],
                image: None,
                updated: old,
            }],
        )
        .await
        .unwrap();

        assert_eq!(refresh_images(&client, &pool, &[9999]).await.unwrap(), 0);
    }
}
