//! Pipeline driver: validate, screen, cluster, refine, plan
//!
//! Stages hand owned values forward; the only shared data is the read-only
//! catalog. Refinement and maneuver planning fan out across rayon workers
//! (each candidate is independent) and the results are collected at a join
//! point, then sorted by TCA so output order is deterministic regardless of
//! worker scheduling.
//!
//! Per-candidate failures are dropped with a warning; only configuration
//! errors abort a run, and they do so before any propagation work starts.

use log::{info, warn};
use rayon::prelude::*;

use crate::cluster::cluster_samples;
use crate::config::{ConfigError, ManeuverConfig, ScreeningConfig};
use crate::grid::TimeGrid;
use crate::maneuver::{suggest_dv, DvSuggestion};
use crate::propagation::Catalog;
use crate::refine::{refine_candidate, RefinedConjunction};
use crate::screening::coarse_screen;

/// Run the full screening-and-refinement pipeline.
///
/// Returns refined conjunctions sorted by TCA (then pair identifiers).
pub fn run_pipeline(
    catalog: &Catalog,
    config: &ScreeningConfig,
) -> Result<Vec<RefinedConjunction>, ConfigError> {
    config.validate()?;
    let grid = TimeGrid::new(config.start, config.end, config.step_s)?;

    info!(
        "screening {} objects ({} pairs) over {} instants",
        catalog.len(),
        catalog.len() * catalog.len().saturating_sub(1) / 2,
        grid.len()
    );
    let rows = coarse_screen(catalog, &grid, config.threshold_km);
    info!("{} samples at or under {} km", rows.len(), config.threshold_km);

    let candidates = cluster_samples(&rows, catalog, config.cluster_window);
    // The sample rows are not needed past this point.
    drop(rows);
    info!("{} conjunction candidates", candidates.len());

    let mut refined: Vec<RefinedConjunction> = candidates
        .par_iter()
        .filter_map(|candidate| {
            match refine_candidate(candidate, catalog, &grid, config.upsample, config.half_steps) {
                Ok(refined) => Some(refined),
                Err(err) => {
                    warn!(
                        "dropping candidate ({}, {}): {err}",
                        candidate.a, candidate.b
                    );
                    None
                }
            }
        })
        .collect();

    refined.sort_by(|x, y| (x.tca, &x.a, &x.b).cmp(&(y.tca, &y.a, &y.b)));
    Ok(refined)
}

/// Evaluate the delta-v sandbox for every refined conjunction.
///
/// Suggestions come back in the same order as `refined`; conjunctions whose
/// sandbox evaluation fails are dropped with a warning.
pub fn plan_maneuvers(
    refined: &[RefinedConjunction],
    catalog: &Catalog,
    config: &ScreeningConfig,
    maneuver: &ManeuverConfig,
) -> Result<Vec<DvSuggestion>, ConfigError> {
    config.validate()?;
    maneuver.validate()?;
    let grid = TimeGrid::new(config.start, config.end, config.step_s)?;

    Ok(refined
        .par_iter()
        .filter_map(|conjunction| {
            match suggest_dv(
                conjunction,
                catalog,
                &grid,
                config.upsample,
                config.half_steps,
                maneuver,
            ) {
                Ok(suggestion) => Some(suggestion),
                Err(err) => {
                    warn!(
                        "dropping maneuver plan for ({}, {}): {err}",
                        conjunction.a, conjunction.b
                    );
                    None
                }
            }
        })
        .collect())
}
