//! Delta-v sandbox: heuristic avoidance maneuver search
//!
//! Given a refined conjunction, this stage perturbs the first object's
//! velocity with a small impulse at a burn time ahead of TCA, re-runs the
//! local refinement on the perturbed geometry, and looks for the smallest
//! impulse that lifts the projected DCA above a target.
//!
//! The post-burn trajectory uses a first-order impulse model: position gains
//! `dv * (t - t_burn)` and velocity gains `dv` after the burn. That is the
//! same linearization the displacement heuristic `ds ~ dv * dt` rests on; it
//! keeps the sandbox deterministic and propagator-agnostic, and it is
//! explicitly not an optimal-control solver.
//!
//! The trial set is fixed: six directions from the object's state at burn
//! time (+/- along-track, +/- radial, +/- cross-track) crossed with an
//! ascending ladder of magnitude fractions of the budget. Determinism comes
//! from that fixed enumeration order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use nalgebra::Vector3;

use crate::config::ManeuverConfig;
use crate::grid::TimeGrid;
use crate::propagation::{Catalog, PropagationError, Propagator};
use crate::refine::{refine_pair, RefineError, RefinedConjunction};
use crate::state::StateVector;

/// Fractions of the delta-v budget tried, smallest first, so the first
/// feasible ladder rung is the smallest magnitude tested that works.
const MAGNITUDE_FRACTIONS: [f64; 4] = [0.25, 0.5, 0.75, 1.0];

/// Directions below this speed/radius are degenerate and skipped.
const BASIS_EPSILON: f64 = 1e-9;

/// Outcome of the sandbox search for one conjunction.
#[derive(Debug, Clone)]
pub struct DvSuggestion {
    /// Identifier of the first object of the pair (the maneuvering one)
    pub a: String,
    /// Identifier of the second object of the pair
    pub b: String,
    /// When the impulse is applied
    pub burn_time: DateTime<Utc>,
    /// Suggested impulse, km/s (zero vector when no maneuver is needed)
    pub dv_kms: Vector3<f64>,
    /// Magnitude of the impulse, m/s
    pub dv_mps: f64,
    /// DCA of the perturbed geometry, km
    pub projected_dca_km: f64,
    /// Whether the target DCA was reached within the budget
    pub feasible: bool,
}

/// First-order impulsive perturbation of a base propagator.
struct ImpulsePropagator {
    inner: Arc<dyn Propagator>,
    burn_time: DateTime<Utc>,
    dv_kms: Vector3<f64>,
}

impl Propagator for ImpulsePropagator {
    fn state_at(&self, instant: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        let mut state = self.inner.state_at(instant)?;
        if instant >= self.burn_time {
            let dt_s = (instant - self.burn_time)
                .num_microseconds()
                .map(|us| us as f64 / 1e6)
                .unwrap_or(0.0);
            state.position += self.dv_kms * dt_s;
            state.velocity += self.dv_kms;
        }
        Ok(state)
    }
}

/// Orthonormal maneuver directions from the object's state at burn time:
/// +/- along-track, +/- radial, +/- cross-track. Degenerate axes (near-zero
/// speed or radius) are dropped.
fn trial_directions(state: &StateVector) -> Vec<Vector3<f64>> {
    let mut axes = Vec::with_capacity(3);
    if state.velocity.norm() > BASIS_EPSILON {
        axes.push(state.velocity.normalize());
    }
    if state.position.norm() > BASIS_EPSILON {
        axes.push(state.position.normalize());
    }
    let cross = state.position.cross(&state.velocity);
    if cross.norm() > BASIS_EPSILON {
        axes.push(cross.normalize());
    }

    let mut directions = Vec::with_capacity(axes.len() * 2);
    for axis in axes {
        directions.push(axis);
        directions.push(-axis);
    }
    directions
}

/// Search for the smallest impulse that raises the conjunction's DCA to the
/// configured target.
///
/// The first object of the pair maneuvers; the second is left untouched.
/// When the unperturbed DCA already meets the target the suggestion is the
/// zero vector with `feasible = true`. When no tested impulse within the
/// budget reaches the target, `feasible = false` and the suggestion carries
/// the best DCA achieved.
pub fn suggest_dv(
    refined: &RefinedConjunction,
    catalog: &Catalog,
    grid: &TimeGrid,
    upsample: u32,
    half_steps: u32,
    config: &ManeuverConfig,
) -> Result<DvSuggestion, RefineError> {
    let burn_time = {
        let lead = chrono::Duration::microseconds((config.lead_time_s * 1e6) as i64);
        (refined.tca - lead).max(grid.start())
    };

    if refined.dca_km >= config.target_dca_km {
        return Ok(DvSuggestion {
            a: refined.a.clone(),
            b: refined.b.clone(),
            burn_time,
            dv_kms: Vector3::zeros(),
            dv_mps: 0.0,
            projected_dca_km: refined.dca_km,
            feasible: true,
        });
    }

    let actor_index = catalog
        .index_of(&refined.a)
        .ok_or_else(|| PropagationError::UnknownObject(refined.a.clone()))?;
    let other_index = catalog
        .index_of(&refined.b)
        .ok_or_else(|| PropagationError::UnknownObject(refined.b.clone()))?;
    let actor = catalog.entry(actor_index).propagator().clone();
    let other = catalog.entry(other_index).propagator().clone();

    let burn_state = actor.state_at(burn_time)?;
    let directions = trial_directions(&burn_state);

    let hint_offset_s = (refined.tca - grid.start())
        .num_microseconds()
        .map(|us| us as f64 / 1e6)
        .unwrap_or(0.0);

    // Best trial so far for the infeasible fallback: highest projected DCA,
    // earliest trial on ties.
    let mut best: Option<(Vector3<f64>, f64, f64)> = None;

    for fraction in MAGNITUDE_FRACTIONS {
        let dv_mps = fraction * config.max_dv_mps;
        let mut feasible_at_this_rung: Option<(Vector3<f64>, f64)> = None;

        for direction in &directions {
            let dv_kms = direction * (dv_mps / 1000.0);
            let perturbed = ImpulsePropagator {
                inner: actor.clone(),
                burn_time,
                dv_kms,
            };
            let trial = refine_pair(
                &perturbed,
                other.as_ref(),
                &refined.a,
                &refined.b,
                grid,
                hint_offset_s,
                upsample,
                half_steps,
            )?;
            debug!(
                "dv trial ({}, {}): {:.4} m/s along {:?} -> DCA {:.4} km",
                refined.a, refined.b, dv_mps, direction, trial.dca_km
            );

            if best.as_ref().map_or(true, |(_, _, dca)| trial.dca_km > *dca) {
                best = Some((dv_kms, dv_mps, trial.dca_km));
            }
            if trial.dca_km >= config.target_dca_km {
                let better = feasible_at_this_rung
                    .as_ref()
                    .map_or(true, |(_, dca)| trial.dca_km > *dca);
                if better {
                    feasible_at_this_rung = Some((dv_kms, trial.dca_km));
                }
            }
        }

        // The ladder ascends, so the first rung with a feasible trial is the
        // smallest magnitude tested that achieves the target.
        if let Some((dv_kms, projected_dca_km)) = feasible_at_this_rung {
            return Ok(DvSuggestion {
                a: refined.a.clone(),
                b: refined.b.clone(),
                burn_time,
                dv_kms,
                dv_mps,
                projected_dca_km,
                feasible: true,
            });
        }
    }

    let (dv_kms, dv_mps, projected_dca_km) =
        best.unwrap_or((Vector3::zeros(), 0.0, refined.dca_km));
    Ok(DvSuggestion {
        a: refined.a.clone(),
        b: refined.b.clone(),
        burn_time,
        dv_kms,
        dv_mps,
        projected_dca_km,
        feasible: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::LinearTrajectory;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    /// Near-miss geometry: closest approach 0.1 km at t = 1000 s. Both
    /// tracks sit 7000 km up the z axis so the actor's radial and
    /// cross-track maneuver directions are well defined.
    fn near_miss() -> (Catalog, TimeGrid, RefinedConjunction) {
        let mut catalog = Catalog::new();
        catalog
            .add(
                "A",
                None,
                Arc::new(LinearTrajectory::new(
                    Vector3::new(0.0, 0.0, 7000.0),
                    Vector3::new(1.0, 0.0, 0.0),
                    epoch(),
                )),
            )
            .unwrap();
        catalog
            .add(
                "B",
                None,
                Arc::new(LinearTrajectory::new(
                    Vector3::new(2000.0, 0.1, 7000.0),
                    Vector3::new(-1.0, 0.0, 0.0),
                    epoch(),
                )),
            )
            .unwrap();
        let grid =
            TimeGrid::new(epoch(), epoch() + chrono::Duration::seconds(2000), 10.0).unwrap();
        let refined = crate::refine::refine_pair(
            catalog.entry(0).propagator().as_ref(),
            catalog.entry(1).propagator().as_ref(),
            "A",
            "B",
            &grid,
            1000.0,
            10,
            2,
        )
        .unwrap();
        (catalog, grid, refined)
    }

    #[test]
    fn already_safe_conjunction_needs_no_maneuver() {
        let (catalog, grid, refined) = near_miss();
        // Unperturbed DCA (~0.1 km) already beats a 0.05 km target.
        let config = ManeuverConfig {
            target_dca_km: 0.05,
            max_dv_mps: 1.0,
            lead_time_s: 600.0,
        };
        let suggestion = suggest_dv(&refined, &catalog, &grid, 10, 2, &config).unwrap();
        assert!(suggestion.feasible);
        assert_relative_eq!(suggestion.dv_mps, 0.0, epsilon = 1e-15);
        assert_relative_eq!(suggestion.dv_kms.norm(), 0.0, epsilon = 1e-15);
        assert_relative_eq!(suggestion.projected_dca_km, refined.dca_km, epsilon = 1e-12);
    }

    #[test]
    fn budget_reaches_target_when_geometry_allows() {
        let (catalog, grid, refined) = near_miss();
        assert!(refined.dca_km < 0.2);
        // 600 s of lead at up to 20 m/s moves the actor by up to 12 km.
        let config = ManeuverConfig {
            target_dca_km: 5.0,
            max_dv_mps: 20.0,
            lead_time_s: 600.0,
        };
        let suggestion = suggest_dv(&refined, &catalog, &grid, 10, 2, &config).unwrap();
        assert!(suggestion.feasible);
        assert!(suggestion.projected_dca_km >= config.target_dca_km);
        assert!(suggestion.dv_mps <= config.max_dv_mps + 1e-12);
        assert!(suggestion.dv_mps > 0.0);
        assert_relative_eq!(
            suggestion.dv_kms.norm() * 1000.0,
            suggestion.dv_mps,
            epsilon = 1e-9
        );
    }

    #[test]
    fn insufficient_budget_reports_infeasible_with_best_dca() {
        let (catalog, grid, refined) = near_miss();
        // 1 mm/s over 600 s moves the actor by at most 60 cm; a 50 km
        // target is unreachable.
        let config = ManeuverConfig {
            target_dca_km: 50.0,
            max_dv_mps: 0.001,
            lead_time_s: 600.0,
        };
        let suggestion = suggest_dv(&refined, &catalog, &grid, 10, 2, &config).unwrap();
        assert!(!suggestion.feasible);
        assert!(suggestion.projected_dca_km < config.target_dca_km);
        // The best trial should still be at least as good as doing nothing.
        assert!(suggestion.projected_dca_km >= refined.dca_km - 1e-6);
    }

    #[test]
    fn search_is_deterministic() {
        let (catalog, grid, refined) = near_miss();
        let config = ManeuverConfig {
            target_dca_km: 5.0,
            max_dv_mps: 20.0,
            lead_time_s: 600.0,
        };
        let first = suggest_dv(&refined, &catalog, &grid, 10, 2, &config).unwrap();
        let second = suggest_dv(&refined, &catalog, &grid, 10, 2, &config).unwrap();
        assert_eq!(first.dv_kms, second.dv_kms);
        assert_eq!(first.feasible, second.feasible);
        assert_relative_eq!(
            first.projected_dca_km,
            second.projected_dca_km,
            epsilon = 1e-15
        );
    }
}
