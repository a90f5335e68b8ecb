//! Pipeline orchestration
//!
//! One `Inventory` drives a full invocation: load and normalize the input,
//! left-join against the cache, fetch what's missing, refresh stale images,
//! encode the hierarchy, then cluster and render on demand. All parameters
//! are explicit per invocation; nothing is shared across invocations except
//! the durable cache itself.

use crate::config::Config;
use crate::hierarchy::{self, FeatureMatrix};
use crate::services::brick_architect::BrickArchitectClient;
use crate::services::enrichment;
use crate::services::rebrickable_client::RebrickableClient;
use crate::types::{ClusterSummary, EnrichedRecord};
use crate::{cluster, db, input, render};
use crate::{Error, Result};
use std::path::Path;
use tracing::info;

pub struct Inventory {
    config: Config,
    records: Vec<EnrichedRecord>,
    matrix: Option<FeatureMatrix>,
    clusters: Option<Vec<ClusterSummary>>,
}

impl Inventory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            records: Vec::new(),
            matrix: None,
            clusters: None,
        }
    }

    /// Supported input file extensions, for front-end display.
    pub fn supported_extensions() -> String {
        input::supported_extensions()
    }

    /// The enriched working set, once loaded.
    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    /// The clustering result, once computed.
    pub fn clusters(&self) -> Option<&[ClusterSummary]> {
        self.clusters.as_deref()
    }

    /// Load an inventory from a set identifier and/or file, enrich it from
    /// the cache and the remote catalog, and encode the label hierarchy.
    ///
    /// The cache pool lives only for the duration of this call.
    pub async fn load_and_enrich(&mut self, set: Option<&str>, file: Option<&Path>) -> Result<()> {
        let rebrickable = RebrickableClient::new()?;

        info!("Loading inventory...");
        let records = input::load(set, file, &self.config, &rebrickable).await?;
        info!("Loaded {} distinct parts", records.len());

        let pool = db::init_database_pool(&self.config.database_path()).await?;

        info!("Merging with local cache...");
        let ids: Vec<i64> = records.iter().map(|r| r.design_id).collect();
        let mut labels = db::parts::get_labels(&pool, &ids).await?;

        let missing: Vec<i64> = ids
            .iter()
            .filter(|id| !labels.contains_key(id))
            .copied()
            .collect();
        let architect = BrickArchitectClient::new()?;

        info!("Fetching missing parts and images...");
        let fetched =
            enrichment::fetch_missing(&architect, &pool, &missing, self.config.fetch_width())
                .await?;
        labels.extend(fetched);

        info!("Updating missing images...");
        enrichment::refresh_images(&architect, &pool, &ids).await?;

        // No need for the cache until render time
        pool.close().await;

        info!("Creating label hierarchy...");
        self.records = records
            .into_iter()
            .map(|record| {
                let record_labels = labels.get(&record.design_id).cloned();
                EnrichedRecord::new(record, record_labels)
            })
            .collect();
        self.matrix = Some(hierarchy::encode(&self.records));
        self.clusters = None;

        Ok(())
    }

    /// Cluster the working set into `k` groups. Returns the seed actually
    /// used, so the run is reproducible even when the seed was drawn fresh.
    pub fn cluster(&mut self, k: usize, seed: Option<&str>) -> Result<u32> {
        let matrix = self.matrix.as_ref().ok_or_else(|| {
            Error::InvalidParameter("no inventory loaded; call load_and_enrich first".to_string())
        })?;

        let seed = cluster::resolve_seed(seed);
        info!("Clustering into {} groups with seed {}", k, seed);
        self.clusters = Some(cluster::cluster(matrix, k, seed)?);

        Ok(seed)
    }

    /// Render the clustered inventory into an HTML artifact.
    ///
    /// Opens its own cache pool for image lookups and closes it when done.
    pub async fn render(&self) -> Result<String> {
        let clusters = self.clusters.as_deref().ok_or_else(|| {
            Error::InvalidParameter("no clusters computed; call cluster first".to_string())
        })?;

        info!("Generating HTML...");
        let pool = db::init_database_pool(&self.config.database_path()).await?;
        let html = render::render_clusters(&pool, clusters).await;
        pool.close().await;

        let html = html?;
        info!("Rendering done");
        Ok(html)
    }
}
