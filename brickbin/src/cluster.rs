//! Weighted k-means clustering over the taxonomy feature matrix
//!
//! Lloyd's algorithm with per-record quantities as sample weights: a part
//! present two hundred times pulls its cluster centroid harder than a part
//! present twice, which is what sizes clusters for physical sorting.
//! Diagnostics (inertia, silhouette) are emitted as log events, not returned.

use crate::hierarchy::FeatureMatrix;
use crate::types::ClusterSummary;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use tracing::{info, warn};

const MAX_ITERATIONS: usize = 100;

/// Cluster label when no taxonomy term is shared by every member
const DEFAULT_LABEL: &str = "Other";

/// Resolve the clustering seed. A missing or unparsable seed is recovered by
/// drawing a fresh random 32-bit seed; the value used is always reported so
/// the run can be reproduced.
pub fn resolve_seed(seed: Option<&str>) -> u32 {
    match seed.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => match text.parse::<u32>() {
            Ok(value) => value,
            Err(_) => {
                let value = rand::thread_rng().gen();
                warn!(
                    "Seed {:?} is not a 32-bit integer, substituting random seed {}",
                    text, value
                );
                value
            }
        },
        None => rand::thread_rng().gen(),
    }
}

/// Group the working set into `k` quantity-weighted clusters.
///
/// Output is sorted ascending by summed quantity (small clusters first) and
/// partitions the working set exactly: every DesignID appears in exactly one
/// summary.
pub fn cluster(matrix: &FeatureMatrix, k: usize, seed: u32) -> Result<Vec<ClusterSummary>> {
    let n = matrix.len();
    if k < 1 || k > n {
        return Err(Error::InvalidParameter(format!(
            "cluster count {} out of range 1..={}",
            k, n
        )));
    }

    let points: Vec<&[f64]> = matrix.rows.iter().map(|r| r.features.as_slice()).collect();
    let weights: Vec<f64> = matrix.rows.iter().map(|r| r.quantity as f64).collect();

    let fit = weighted_kmeans(&points, &weights, k, seed);

    match silhouette_score(&points, &fit.assignments, k) {
        Some(silhouette) => info!(
            "WSS (lower is better) = {:.4}, silhouette (closer to 1 is better) = {:.4}",
            fit.inertia, silhouette
        ),
        None => info!("WSS (lower is better) = {:.4}", fit.inertia),
    }

    let mut summaries = summarize(matrix, &fit.assignments, k);
    summaries.sort_by_key(|summary| summary.quantity);
    log_quantity_stats(&summaries);

    Ok(summaries)
}

struct KMeansFit {
    assignments: Vec<usize>,
    inertia: f64,
}

fn weighted_kmeans(points: &[&[f64]], weights: &[f64], k: usize, seed: u32) -> KMeansFit {
    let n = points.len();
    let dims = points.first().map(|p| p.len()).unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(seed as u64);

    // Seed centroids from k distinct records
    let mut centroids: Vec<Vec<f64>> = rand::seq::index::sample(&mut rng, n, k)
        .into_iter()
        .map(|i| points[i].to_vec())
        .collect();

    let mut assignments = vec![0usize; n];
    for _ in 0..MAX_ITERATIONS {
        let mut next: Vec<usize> = points.iter().map(|p| nearest(p, &centroids)).collect();
        fix_empty_clusters(&mut next, k, points, weights, &centroids);

        let converged = next == assignments;
        assignments = next;
        centroids = recompute_centroids(points, weights, &assignments, k, dims, &centroids);
        if converged {
            break;
        }
    }

    let inertia = points
        .iter()
        .enumerate()
        .map(|(i, p)| weights[i] * squared_distance(p, &centroids[assignments[i]]))
        .sum();

    KMeansFit {
        assignments,
        inertia,
    }
}

/// Index of the nearest centroid; ties go to the lowest index.
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}

/// Re-seed each empty cluster with the point contributing most to the
/// inertia, drawn from a cluster that can spare a member.
fn fix_empty_clusters(
    assignments: &mut [usize],
    k: usize,
    points: &[&[f64]],
    weights: &[f64],
    centroids: &[Vec<f64>],
) {
    loop {
        let mut counts = vec![0usize; k];
        for &a in assignments.iter() {
            counts[a] += 1;
        }
        let Some(empty) = counts.iter().position(|&c| c == 0) else {
            break;
        };

        let donor = (0..points.len())
            .filter(|&i| counts[assignments[i]] > 1)
            .max_by(|&a, &b| {
                let cost_a = weights[a] * squared_distance(points[a], &centroids[assignments[a]]);
                let cost_b = weights[b] * squared_distance(points[b], &centroids[assignments[b]]);
                cost_a.partial_cmp(&cost_b).unwrap_or(Ordering::Equal)
            });
        match donor {
            Some(i) => assignments[i] = empty,
            // Unreachable while k <= n, but never loop on it
            None => break,
        }
    }
}

fn recompute_centroids(
    points: &[&[f64]],
    weights: &[f64],
    assignments: &[usize],
    k: usize,
    dims: usize,
    previous: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let mut sums = vec![vec![0.0; dims]; k];
    let mut weight_totals = vec![0.0; k];
    let mut counts = vec![0usize; k];

    for (i, point) in points.iter().enumerate() {
        let c = assignments[i];
        for (d, value) in point.iter().enumerate() {
            sums[c][d] += weights[i] * value;
        }
        weight_totals[c] += weights[i];
        counts[c] += 1;
    }

    (0..k)
        .map(|c| {
            if counts[c] == 0 {
                return previous[c].clone();
            }
            if weight_totals[c] > 0.0 {
                return sums[c].iter().map(|s| s / weight_totals[c]).collect();
            }
            // Every member carries zero quantity; fall back to a plain mean
            let mut mean = vec![0.0; dims];
            for (i, point) in points.iter().enumerate() {
                if assignments[i] == c {
                    for (d, value) in point.iter().enumerate() {
                        mean[d] += value;
                    }
                }
            }
            mean.into_iter().map(|v| v / counts[c] as f64).collect()
        })
        .collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// Mean silhouette coefficient over all records, euclidean, unweighted.
/// Only defined for 2 <= k <= n-1; singleton-cluster members score 0.
fn silhouette_score(points: &[&[f64]], assignments: &[usize], k: usize) -> Option<f64> {
    let n = points.len();
    if k < 2 || k + 1 > n {
        return None;
    }

    let mut counts = vec![0usize; k];
    for &a in assignments {
        counts[a] += 1;
    }

    let mut total = 0.0;
    for i in 0..n {
        let own = assignments[i];
        if counts[own] <= 1 {
            continue; // s(i) = 0 by convention
        }

        let mut distance_sums = vec![0.0; k];
        for j in 0..n {
            if i == j {
                continue;
            }
            distance_sums[assignments[j]] += squared_distance(points[i], points[j]).sqrt();
        }

        let a = distance_sums[own] / (counts[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && counts[c] > 0)
            .map(|c| distance_sums[c] / counts[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denominator = a.max(b);
        if denominator > 0.0 {
            total += (b - a) / denominator;
        }
    }

    Some(total / n as f64)
}

/// Collapse the fitted assignments into per-cluster summaries.
fn summarize(matrix: &FeatureMatrix, assignments: &[usize], k: usize) -> Vec<ClusterSummary> {
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (row, &cluster) in assignments.iter().enumerate() {
        groups[cluster].push(row);
    }

    groups
        .into_iter()
        .filter(|rows| !rows.is_empty())
        .map(|rows| {
            let quantity = rows.iter().map(|&r| matrix.rows[r].quantity).sum();
            let mut members: Vec<i64> = rows.iter().map(|&r| matrix.rows[r].design_id).collect();
            members.sort_unstable();

            // A taxonomy term labels the cluster iff every member carries it
            let qualifying: Vec<&str> = matrix
                .columns
                .iter()
                .enumerate()
                .filter(|(column, _)| {
                    rows.iter().all(|&r| matrix.rows[r].features[*column] == 1.0)
                })
                .map(|(_, name)| name.as_str())
                .collect();
            let label = if qualifying.is_empty() {
                DEFAULT_LABEL.to_string()
            } else {
                qualifying.join(", ")
            };

            ClusterSummary {
                label,
                quantity,
                members,
            }
        })
        .collect()
}

fn log_quantity_stats(summaries: &[ClusterSummary]) {
    if summaries.is_empty() {
        return;
    }
    let min = summaries.iter().map(|s| s.quantity).min().unwrap_or(0);
    let max = summaries.iter().map(|s| s.quantity).max().unwrap_or(0);
    let mean =
        summaries.iter().map(|s| s.quantity).sum::<i64>() as f64 / summaries.len() as f64;
    info!(
        "Cluster quantities: min {}, mean {:.1}, max {}",
        min, mean, max
    );
}
