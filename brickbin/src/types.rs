//! Core domain types for the inventory pipeline

use serde::{Deserialize, Serialize};

/// Top-level taxonomy term shared by every part in this domain. Doubles as
/// the fallback label for parts the remote catalog cannot resolve.
pub const ROOT_CATEGORY: &str = "Lego";

/// Canonical inventory record: one row per part shape, color-independent.
///
/// Produced by an input adapter after dedup/summation, consumed by the
/// cache join. Discarded once the working set is enriched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRecord {
    /// Canonical numeric part identifier (positive)
    pub design_id: i64,
    /// Total piece count across all color variants (non-negative)
    pub quantity: i64,
}

/// Working-set record after the cache join / enrichment phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub design_id: i64,
    pub quantity: i64,
    /// Ordered taxonomy path, root-most first. `None` until the fetch
    /// phase fills the gap; non-empty once set.
    pub labels: Option<Vec<String>>,
}

impl EnrichedRecord {
    pub fn new(record: PartRecord, labels: Option<Vec<String>>) -> Self {
        Self {
            design_id: record.design_id,
            quantity: record.quantity,
            labels,
        }
    }
}

/// One clustering result group, ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Human-meaningful label derived from shared taxonomy terms ("Other" if none)
    pub label: String,
    /// Sum of member quantities
    pub quantity: i64,
    /// Member DesignIDs, ascending
    pub members: Vec<i64>,
}
