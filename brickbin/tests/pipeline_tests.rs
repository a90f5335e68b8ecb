//! Offline end-to-end pipeline tests
//!
//! The cache is pre-seeded with every part in the fixture inventory, so the
//! full load → cluster → render path runs without touching the network: no
//! cache misses means no fetch phase, and refresh candidates are stamped
//! with today's date.

use brickbin::db::parts::CacheEntry;
use brickbin::{db, Config, Error, Inventory};
use chrono::Local;
use std::path::{Path, PathBuf};

const FIXTURE_CSV: &str = "\
Part,Color,Quantity
3001,4,5
3001,1,3
3002a,0,2
3003,2,7
";

fn fixture_config(dir: &Path) -> Config {
    Config {
        database: Some(dir.join("parts.sqlite")),
        ..Config::default()
    }
}

fn write_fixture_csv(dir: &Path) -> PathBuf {
    let path = dir.join("inventory.csv");
    std::fs::write(&path, FIXTURE_CSV).unwrap();
    path
}

async fn seed_cache(database: &Path) {
    let pool = db::init_database_pool(database).await.unwrap();
    let today = Local::now().date_naive();
    let entries = vec![
        CacheEntry {
            design_id: 3001,
            labels: vec!["Lego".into(), "1. Bricks".into()],
            image: Some("aW1nMzAwMQ".into()),
            updated: today,
        },
        CacheEntry {
            design_id: 3002,
            labels: vec!["Lego".into(), "1. Bricks".into(), "Round".into()],
            image: Some("aW1nMzAwMg".into()),
            updated: today,
        },
        CacheEntry {
            design_id: 3003,
            labels: vec!["Lego".into(), "2. Plates".into()],
            image: None,
            updated: today,
        },
    ];
    db::parts::insert_entries(&pool, &entries).await.unwrap();
    pool.close().await;
}

#[tokio::test]
async fn load_cluster_render_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path());
    seed_cache(&config.database_path()).await;
    let csv = write_fixture_csv(dir.path());

    let mut inventory = Inventory::new(config);
    inventory.load_and_enrich(None, Some(&csv)).await.unwrap();

    // Normalization: 3001 summed across colors, decoration stripped from 3002a
    let quantities: Vec<(i64, i64)> = inventory
        .records()
        .iter()
        .map(|r| (r.design_id, r.quantity))
        .collect();
    assert_eq!(quantities, vec![(3001, 8), (3002, 2), (3003, 7)]);

    let seed = inventory.cluster(2, Some("42")).unwrap();
    assert_eq!(seed, 42);

    let clusters = inventory.clusters().unwrap();

    // Members partition the working set exactly
    let mut all_members: Vec<i64> = clusters
        .iter()
        .flat_map(|c| c.members.iter().copied())
        .collect();
    all_members.sort_unstable();
    assert_eq!(all_members, vec![3001, 3002, 3003]);

    // Sorted ascending by summed quantity
    for pair in clusters.windows(2) {
        assert!(pair[0].quantity <= pair[1].quantity);
    }

    let html = inventory.render().await.unwrap();
    assert!(html.contains("data:image/png;base64,aW1nMzAwMQ"));
    assert!(html.contains("data:image/png;base64,aW1nMzAwMg"));
    // 3003 has no cached image and must simply be skipped
    assert_eq!(html.matches("<img").count(), 2);
}

#[tokio::test]
async fn same_seed_reproduces_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path());
    seed_cache(&config.database_path()).await;
    let csv = write_fixture_csv(dir.path());

    let mut members = Vec::new();
    for _ in 0..2 {
        let mut inventory = Inventory::new(fixture_config(dir.path()));
        inventory.load_and_enrich(None, Some(&csv)).await.unwrap();
        inventory.cluster(2, Some("1234")).unwrap();
        members.push(
            inventory
                .clusters()
                .unwrap()
                .iter()
                .map(|c| c.members.clone())
                .collect::<Vec<_>>(),
        );
    }
    assert_eq!(members[0], members[1]);
}

#[tokio::test]
async fn cluster_before_load_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut inventory = Inventory::new(fixture_config(dir.path()));
    assert!(matches!(
        inventory.cluster(2, None),
        Err(Error::InvalidParameter(_))
    ));
}

#[tokio::test]
async fn render_before_cluster_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let inventory = Inventory::new(fixture_config(dir.path()));
    assert!(matches!(
        inventory.render().await,
        Err(Error::InvalidParameter(_))
    ));
}

#[tokio::test]
async fn oversized_cluster_count_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path());
    seed_cache(&config.database_path()).await;
    let csv = write_fixture_csv(dir.path());

    let mut inventory = Inventory::new(config);
    inventory.load_and_enrich(None, Some(&csv)).await.unwrap();

    assert!(matches!(
        inventory.cluster(99, None),
        Err(Error::InvalidParameter(_))
    ));
}
