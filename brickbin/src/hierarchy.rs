//! Label hierarchy encoding
//!
//! Turns the variable-depth taxonomy paths of a working set into a one-hot
//! feature matrix. Column order is breadth-first across depth: all depth-0
//! terms (in record order), then all depth-1 terms, and so on, each distinct
//! term appearing once — so broader categories always come before narrower
//! ones. The root term is excluded as a universal baseline. A record's value
//! for a column is 1 iff that exact term appears anywhere in its path.

use crate::types::{EnrichedRecord, ROOT_CATEGORY};
use tracing::warn;

/// Traversal depth cap. Pathological breadcrumb paths are truncated here
/// rather than growing the column set without bound.
pub const MAX_DEPTH: usize = 16;

/// One record's row in the feature matrix.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub design_id: i64,
    pub quantity: i64,
    /// One 0.0/1.0 entry per matrix column
    pub features: Vec<f64>,
}

/// One-hot encoded working set. Columns are fixed for one clustering run.
#[derive(Debug, Clone, Default)]
pub struct FeatureMatrix {
    /// Distinct non-root taxonomy terms, broadest depth first
    pub columns: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Encode the working set. A record whose labels are absent or empty (a
/// totally failed fetch) is treated as carrying the root term alone, so it
/// stays represented with an all-zero feature row.
pub fn encode(records: &[EnrichedRecord]) -> FeatureMatrix {
    let root_only = [ROOT_CATEGORY.to_string()];
    let paths: Vec<&[String]> = records
        .iter()
        .map(|record| match record.labels.as_deref() {
            Some(labels) if !labels.is_empty() => {
                if labels.len() > MAX_DEPTH {
                    warn!(
                        "Label path for part {} has {} levels, truncating to {}",
                        record.design_id,
                        labels.len(),
                        MAX_DEPTH
                    );
                    &labels[..MAX_DEPTH]
                } else {
                    labels
                }
            }
            _ => &root_only[..],
        })
        .collect();

    let max_depth = paths.iter().map(|path| path.len()).max().unwrap_or(0);

    // Breadth-first across depth: visit every record's depth-0 term, then
    // every depth-1 term, appending each newly seen non-root term once.
    let mut columns: Vec<String> = Vec::new();
    for depth in 0..max_depth {
        for path in &paths {
            let Some(term) = path.get(depth) else {
                continue;
            };
            if term.is_empty() || term == ROOT_CATEGORY {
                continue;
            }
            if !columns.iter().any(|c| c == term) {
                columns.push(term.clone());
            }
        }
    }

    let rows = records
        .iter()
        .zip(&paths)
        .map(|(record, path)| FeatureRow {
            design_id: record.design_id,
            quantity: record.quantity,
            features: columns
                .iter()
                .map(|column| {
                    if path.iter().any(|term| term == column) {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect(),
        })
        .collect();

    FeatureMatrix { columns, rows }
}
