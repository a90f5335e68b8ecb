//! Cluster rendering
//!
//! Each cluster becomes a self-contained HTML block: the cleaned label and
//! summed quantity, then the cached image of every member that has one, in
//! ascending DesignID order. Blocks are rendered concurrently but always
//! reassembled in the incoming (quantity-sorted) order, so concurrency never
//! reorders the output.

use crate::db::parts;
use crate::types::ClusterSummary;
use crate::Result;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::SqlitePool;

/// Catalog categories carry a sorting-sheet index prefix like "2. Technic"
static CATEGORY_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\. ").expect("valid category index regex"));

/// Render the sorted cluster list into one HTML artifact.
pub async fn render_clusters(pool: &SqlitePool, clusters: &[ClusterSummary]) -> Result<String> {
    let width = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);

    let mut blocks: Vec<(usize, Result<String>)> = stream::iter(clusters.iter().enumerate())
        .map(|(index, cluster)| async move { (index, render_single_cluster(pool, cluster).await) })
        .buffer_unordered(width)
        .collect()
        .await;

    // Completion order is arbitrary; output order is not
    blocks.sort_by_key(|(index, _)| *index);

    let mut html = String::new();
    for (_, block) in blocks {
        html.push_str(&block?);
    }
    Ok(html)
}

/// Strip the leading category index from a cluster label.
fn clean_label(label: &str) -> String {
    CATEGORY_INDEX.replace(label, "").into_owned()
}

async fn render_single_cluster(pool: &SqlitePool, cluster: &ClusterSummary) -> Result<String> {
    let mut html = String::new();
    html.push_str("<div>\n");
    html.push_str(&format!(
        "<p style=\"margin: 10px; font-size: 32px;\">{} ({})</p>\n",
        clean_label(&cluster.label),
        cluster.quantity
    ));

    for (_, image) in parts::images_for_parts(pool, &cluster.members).await? {
        if let Some(image) = image {
            html.push_str(&format!(
                "<img src=\"data:image/png;base64,{}\" style=\"margin: 10px;\">\n",
                image
            ));
        }
    }

    html.push_str("</div>\n<br>");
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::parts::CacheEntry;
    use chrono::NaiveDate;

    #[test]
    fn category_index_prefix_is_stripped() {
        assert_eq!(clean_label("2. Technic"), "Technic");
        assert_eq!(clean_label("12. Plates"), "Plates");
        assert_eq!(clean_label("Other"), "Other");
        // Only a leading index is cleaned, not embedded ones
        assert_eq!(clean_label("Technic, 3. Gears"), "Technic, 3. Gears");
    }

    // File-backed: the renderer acquires pool connections concurrently, and
    // an in-memory SQLite pool hands every new connection a blank database.
    async fn seeded_pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::db::init_database_pool(&dir.path().join("parts.sqlite"))
            .await
            .unwrap();

        let updated = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        let entries: Vec<CacheEntry> = [
            (3001, Some("imgA")),
            (3002, None),
            (3003, Some("imgC")),
        ]
        .into_iter()
        .map(|(design_id, image)| CacheEntry {
            design_id,
            labels: vec!["Lego".to_string()],
            image: image.map(str::to_string),
            updated,
        })
        .collect();
        parts::insert_entries(&pool, &entries).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn blocks_follow_cluster_order_and_skip_missing_images() {
        let (_dir, pool) = seeded_pool().await;
        let clusters = vec![
            ClusterSummary {
                label: "1. Bricks".to_string(),
                quantity: 4,
                members: vec![3001, 3002],
            },
            ClusterSummary {
                label: "Other".to_string(),
                quantity: 9,
                members: vec![3003],
            },
        ];

        let html = render_clusters(&pool, &clusters).await.unwrap();

        let bricks = html.find("Bricks (4)").unwrap();
        let other = html.find("Other (9)").unwrap();
        assert!(bricks < other, "cluster order must match the input order");

        assert!(html.contains("data:image/png;base64,imgA"));
        assert!(html.contains("data:image/png;base64,imgC"));
        // 3002 has no cached image and contributes no tag
        assert_eq!(html.matches("<img").count(), 2);
    }

    #[tokio::test]
    async fn member_images_render_in_ascending_id_order() {
        let (_dir, pool) = seeded_pool().await;
        let clusters = vec![ClusterSummary {
            label: "Bricks".to_string(),
            quantity: 4,
            members: vec![3003, 3001],
        }];

        let html = render_clusters(&pool, &clusters).await.unwrap();
        let first = html.find("imgA").unwrap();
        let second = html.find("imgC").unwrap();
        assert!(first < second);
    }
}
