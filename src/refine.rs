//! Local refinement of conjunction candidates around TCA
//!
//! Each candidate's approximate TCA is only accurate to the coarse grid
//! step. Refinement brackets it with `half_steps` coarse steps on each side,
//! upsamples the bracket, locates the interior fine-grid minimum, then runs
//! a golden-section search inside the bracketing triple until the TCA
//! estimate stops moving by more than a fraction of the fine step.
//!
//! The fine grid is anchored on the approximate TCA, so the coarse minimum
//! is always re-evaluated and the refined DCA can never exceed the coarse
//! estimate: the engine reports the best sample it has seen.

use chrono::{DateTime, Utc};
use log::warn;
use nalgebra::Vector3;
use thiserror::Error;

use crate::cluster::ConjunctionCandidate;
use crate::grid::TimeGrid;
use crate::propagation::{Catalog, PropagationError, Propagator};
use crate::state::StateVector;

/// Convergence tolerance on the TCA estimate, as a fraction of the fine
/// grid step.
pub const TCA_TOLERANCE_FRACTION: f64 = 1e-3;

/// Iteration cap for the golden-section stage. The search interval shrinks
/// by ~0.618 per iteration, so this bound is generous for any sane upsample
/// factor.
pub const MAX_REFINE_ITERATIONS: usize = 64;

const INV_PHI: f64 = 0.618_033_988_749_894_9;

/// Tuning for the golden-section stage.
///
/// The defaults are generous: the search interval starts two fine steps wide
/// and shrinks by ~0.618 per iteration, so the default tolerance is reached
/// long before the iteration cap. Tightening the tolerance or lowering the
/// cap trades TCA precision for bounded work; an overrun is reported on the
/// result as [`RefinementFlag::ConvergenceNotReached`], not an error.
#[derive(Debug, Clone)]
pub struct RefineTuning {
    /// Convergence tolerance on the TCA estimate, as a fraction of the fine
    /// grid step
    pub tolerance_fraction: f64,
    /// Iteration cap for the golden-section stage
    pub max_iterations: usize,
}

impl Default for RefineTuning {
    fn default() -> Self {
        Self {
            tolerance_fraction: TCA_TOLERANCE_FRACTION,
            max_iterations: MAX_REFINE_ITERATIONS,
        }
    }
}

/// Non-fatal diagnostics attached to a refined conjunction so downstream
/// consumers can flag low-confidence results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinementFlag {
    /// The golden-section stage hit its iteration cap before the tolerance;
    /// the best point found is reported.
    ConvergenceNotReached,
    /// The separation minimum sat on the bracket edge even after one bracket
    /// extension; the edge value is reported. Typically means the true
    /// minimum lies outside the analysis horizon.
    BoundaryTca,
}

impl RefinementFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefinementFlag::ConvergenceNotReached => "convergence_not_reached",
            RefinementFlag::BoundaryTca => "boundary_tca",
        }
    }
}

/// The pipeline's terminal artifact: one refined close approach.
#[derive(Debug, Clone)]
pub struct RefinedConjunction {
    /// Identifier of the first object of the pair
    pub a: String,
    /// Identifier of the second object of the pair
    pub b: String,
    /// Refined time of closest approach (continuous, sub-grid-step)
    pub tca: DateTime<Utc>,
    /// Distance of closest approach, km
    pub dca_km: f64,
    /// Velocity of `a` relative to `b` at TCA, km/s
    pub relative_velocity: Vector3<f64>,
    /// State of object `a` at TCA
    pub state_a: StateVector,
    /// State of object `b` at TCA
    pub state_b: StateVector,
    /// Non-fatal refinement diagnostics
    pub flags: Vec<RefinementFlag>,
}

impl RefinedConjunction {
    /// Magnitude of the relative velocity at TCA, km/s.
    pub fn relative_speed_kms(&self) -> f64 {
        self.relative_velocity.norm()
    }
}

/// Errors that abandon a single candidate. Never fatal to the batch.
#[derive(Debug, Error)]
pub enum RefineError {
    #[error("no finite separation sample inside the refinement bracket")]
    NoFiniteSamples,

    #[error(transparent)]
    Propagation(#[from] PropagationError),
}

/// Refine one candidate from the catalog it was screened against.
pub fn refine_candidate(
    candidate: &ConjunctionCandidate,
    catalog: &Catalog,
    grid: &TimeGrid,
    upsample: u32,
    half_steps: u32,
) -> Result<RefinedConjunction, RefineError> {
    refine_pair(
        catalog.entry(candidate.pair.0).propagator().as_ref(),
        catalog.entry(candidate.pair.1).propagator().as_ref(),
        &candidate.a,
        &candidate.b,
        grid,
        grid.offset_s(candidate.approx_index),
        upsample,
        half_steps,
    )
}

/// Refine the closest approach of two propagators around a TCA hint, with
/// the default [`RefineTuning`].
///
/// `hint_offset_s` is the approximate TCA as an offset from the grid start;
/// it does not need to lie on the coarse grid (the delta-v sandbox passes
/// continuous values). The search bracket is `hint +- half_steps * step`,
/// clipped to the analysis horizon, and is extended once by the same amount
/// if the minimum lands on an edge.
#[allow(clippy::too_many_arguments)]
pub fn refine_pair(
    prop_a: &dyn Propagator,
    prop_b: &dyn Propagator,
    a_id: &str,
    b_id: &str,
    grid: &TimeGrid,
    hint_offset_s: f64,
    upsample: u32,
    half_steps: u32,
) -> Result<RefinedConjunction, RefineError> {
    refine_pair_with(
        prop_a,
        prop_b,
        a_id,
        b_id,
        grid,
        hint_offset_s,
        upsample,
        half_steps,
        &RefineTuning::default(),
    )
}

/// [`refine_pair`] with explicit golden-section tuning.
#[allow(clippy::too_many_arguments)]
pub fn refine_pair_with(
    prop_a: &dyn Propagator,
    prop_b: &dyn Propagator,
    a_id: &str,
    b_id: &str,
    grid: &TimeGrid,
    hint_offset_s: f64,
    upsample: u32,
    half_steps: u32,
    tuning: &RefineTuning,
) -> Result<RefinedConjunction, RefineError> {
    let step = grid.step_s();
    let span = grid.span_s();
    let half_span = half_steps.max(1) as f64 * step;
    let fine = step / upsample.max(1) as f64;
    let hint = hint_offset_s.clamp(0.0, span);

    let separation = |offset_s: f64| -> f64 {
        let instant = grid.at_offset_s(offset_s);
        match (prop_a.state_at(instant), prop_b.state_at(instant)) {
            (Ok(sa), Ok(sb)) => sa.separation_km(&sb),
            (Err(err), _) | (_, Err(err)) => {
                warn!("separation sample dropped for ({a_id}, {b_id}) at {instant}: {err}");
                f64::INFINITY
            }
        }
    };

    let mut lo = (hint - half_span).max(0.0);
    let mut hi = (hint + half_span).min(span);
    let mut flags = Vec::new();

    let mut samples = fine_scan(&separation, hint, lo, hi, fine);
    let mut min_idx = finite_argmin(&samples).ok_or(RefineError::NoFiniteSamples)?;

    // A minimum on the bracket edge means the distance was still decreasing
    // at the boundary; widen once and look again.
    if min_idx == 0 || min_idx + 1 == samples.len() {
        let wider_lo = (lo - half_span).max(0.0);
        let wider_hi = (hi + half_span).min(span);
        if wider_lo < lo || wider_hi > hi {
            lo = wider_lo;
            hi = wider_hi;
            samples = fine_scan(&separation, hint, lo, hi, fine);
            min_idx = finite_argmin(&samples).ok_or(RefineError::NoFiniteSamples)?;
        }
    }

    let mut best = samples[min_idx];

    if min_idx == 0 || min_idx + 1 == samples.len() {
        flags.push(RefinementFlag::BoundaryTca);
        warn!(
            "({a_id}, {b_id}): separation minimum pinned to bracket edge at offset {:.3} s",
            best.0
        );
    } else {
        let bracket = (samples[min_idx - 1].0, samples[min_idx + 1].0);
        let tolerance = fine * tuning.tolerance_fraction;
        let converged = golden_section_min(
            &separation,
            bracket.0,
            bracket.1,
            tolerance,
            tuning.max_iterations,
            &mut best,
        );
        if !converged {
            flags.push(RefinementFlag::ConvergenceNotReached);
            warn!(
                "({a_id}, {b_id}): TCA search did not reach tolerance {tolerance:.3e} s in {} iterations",
                tuning.max_iterations
            );
        }
    }

    let tca = grid.at_offset_s(best.0);
    let state_a = prop_a.state_at(tca)?;
    let state_b = prop_b.state_at(tca)?;

    Ok(RefinedConjunction {
        a: a_id.to_string(),
        b: b_id.to_string(),
        tca,
        dca_km: best.1,
        relative_velocity: state_a.relative_velocity(&state_b),
        state_a,
        state_b,
        flags,
    })
}

/// Evaluate the separation on a fine grid anchored at `anchor` covering
/// `[lo, hi]`. Anchoring guarantees the coarse-minimum instant is one of the
/// samples. Returns (offset, distance) pairs in time order; failed
/// propagations appear as infinite distances.
fn fine_scan<F: Fn(f64) -> f64>(
    separation: &F,
    anchor: f64,
    lo: f64,
    hi: f64,
    fine_step: f64,
) -> Vec<(f64, f64)> {
    let k_lo = ((lo - anchor) / fine_step - 1e-9).ceil() as i64;
    let k_hi = ((hi - anchor) / fine_step + 1e-9).floor() as i64;
    (k_lo..=k_hi)
        .map(|k| {
            let offset = anchor + k as f64 * fine_step;
            (offset, separation(offset))
        })
        .collect()
}

/// Index of the smallest finite sample; earliest wins ties. `None` when
/// every sample is infinite.
fn finite_argmin(samples: &[(f64, f64)]) -> Option<usize> {
    let mut min_idx = None;
    let mut min_val = f64::INFINITY;
    for (i, &(_, d)) in samples.iter().enumerate() {
        if d < min_val {
            min_val = d;
            min_idx = Some(i);
        }
    }
    min_idx
}

/// Golden-section minimization over `[a, b]`, updating `best` with every
/// point evaluated. Returns whether the interval shrank below `tolerance`
/// within the iteration cap.
fn golden_section_min<F: Fn(f64) -> f64>(
    f: &F,
    mut a: f64,
    mut b: f64,
    tolerance: f64,
    max_iterations: usize,
    best: &mut (f64, f64),
) -> bool {
    let track = |t: f64, d: f64, best: &mut (f64, f64)| {
        if d < best.1 {
            *best = (t, d);
        }
    };

    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);
    track(c, fc, best);
    track(d, fd, best);

    for _ in 0..max_iterations {
        if b - a < tolerance {
            return true;
        }
        if fc <= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = f(c);
            track(c, fc, best);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = f(d);
            track(d, fd, best);
        }
    }
    b - a < tolerance
}
