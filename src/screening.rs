//! Coarse pairwise distance screening over the time grid
//!
//! The dominant cost of a run: every unordered object pair is checked at
//! every grid instant. Propagation is object-major (each object propagated
//! once per instant, in parallel across objects), then the pairwise distance
//! scan runs in parallel across pairs against the shared position table.
//!
//! Per-sample propagation failures drop that sample with a warning and never
//! abort the pass; a pair is simply not comparable at instants where either
//! object has no state.

use log::warn;
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::grid::TimeGrid;
use crate::propagation::Catalog;

/// One flagged screening sample: a pair at or under the threshold at one
/// grid instant. Transient; consumed by the clusterer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRow {
    /// Catalog indices of the pair, `pair.0 < pair.1`
    pub pair: (usize, usize),
    /// Grid index of the instant
    pub index: usize,
    /// Separation at that instant, km
    pub distance_km: f64,
}

/// Positions of every object at every grid instant; `None` where propagation
/// failed for that sample.
fn position_table(catalog: &Catalog, grid: &TimeGrid) -> Vec<Vec<Option<Vector3<f64>>>> {
    catalog
        .entries()
        .par_iter()
        .map(|entry| {
            grid.instants()
                .map(|instant| match entry.propagator().state_at(instant) {
                    Ok(state) => Some(state.position),
                    Err(err) => {
                        warn!("dropping sample for {} at {instant}: {err}", entry.id());
                        None
                    }
                })
                .collect()
        })
        .collect()
}

/// Screen every unordered pair of catalog objects over the grid.
///
/// Returns every (pair, instant) whose separation is at or under
/// `threshold_km`, pair-major in catalog order and grid-index ascending
/// within a pair. With fewer than two objects there is nothing to compare
/// and the result is empty.
pub fn coarse_screen(catalog: &Catalog, grid: &TimeGrid, threshold_km: f64) -> Vec<SampleRow> {
    let n = catalog.len();
    if n < 2 {
        return Vec::new();
    }

    let positions = position_table(catalog, grid);

    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .collect();

    pairs
        .par_iter()
        .map(|&(i, j)| {
            let mut rows = Vec::new();
            for index in 0..grid.len() {
                if let (Some(a), Some(b)) = (positions[i][index], positions[j][index]) {
                    let distance_km = (a - b).norm();
                    if distance_km <= threshold_km {
                        rows.push(SampleRow {
                            pair: (i, j),
                            index,
                            distance_km,
                        });
                    }
                }
            }
            rows
        })
        .flatten()
        .collect()
}
