//! Grouping flagged screening samples into conjunction candidates
//!
//! Consecutive flagged instants for the same pair describe one close
//! approach; a short dropout below threshold inside an encounter should not
//! split it in two. Successive rows whose grid-index gap is at most the
//! `window` parameter merge into one candidate; any larger gap starts a new,
//! independent candidate.

use crate::grid::TimeGrid;
use crate::propagation::Catalog;
use crate::screening::SampleRow;

/// One coarse conjunction candidate awaiting refinement. Immutable.
#[derive(Debug, Clone)]
pub struct ConjunctionCandidate {
    /// Identifier of the first object of the pair
    pub a: String,
    /// Identifier of the second object of the pair
    pub b: String,
    /// Catalog indices of the pair, `pair.0 < pair.1`
    pub pair: (usize, usize),
    /// First flagged grid index of the cluster
    pub window_start: usize,
    /// Last flagged grid index of the cluster
    pub window_end: usize,
    /// Grid index of the minimum sampled distance (approximate TCA);
    /// ties broken by the earliest instant
    pub approx_index: usize,
    /// Sampled distance at `approx_index`, km
    pub approx_distance_km: f64,
}

impl ConjunctionCandidate {
    /// Approximate TCA as an instant on the coarse grid.
    pub fn approx_tca(&self, grid: &TimeGrid) -> chrono::DateTime<chrono::Utc> {
        grid.instant(self.approx_index)
    }
}

/// Cluster flagged rows into candidates.
///
/// `rows` must be pair-major and index-ascending within each pair, which is
/// how [`crate::screening::coarse_screen`] emits them. `window` is the
/// maximum merged gap in grid steps (>= 1; 1 means strictly contiguous).
/// Output is deterministic for a given row set.
pub fn cluster_samples(
    rows: &[SampleRow],
    catalog: &Catalog,
    window: usize,
) -> Vec<ConjunctionCandidate> {
    let mut candidates = Vec::new();
    let mut open: Option<ConjunctionCandidate> = None;

    for row in rows {
        match open.as_mut() {
            Some(current)
                if current.pair == row.pair
                    && row
                        .index
                        .checked_sub(current.window_end)
                        .is_some_and(|gap| gap <= window) =>
            {
                current.window_end = row.index;
                // Strict comparison keeps the earliest instant on ties.
                if row.distance_km < current.approx_distance_km {
                    current.approx_index = row.index;
                    current.approx_distance_km = row.distance_km;
                }
            }
            _ => {
                if let Some(done) = open.take() {
                    candidates.push(done);
                }
                open = Some(ConjunctionCandidate {
                    a: catalog.entry(row.pair.0).id().to_string(),
                    b: catalog.entry(row.pair.1).id().to_string(),
                    pair: row.pair,
                    window_start: row.index,
                    window_end: row.index,
                    approx_index: row.index,
                    approx_distance_km: row.distance_km,
                });
            }
        }
    }
    if let Some(done) = open {
        candidates.push(done);
    }
    candidates
}
