//! Conjunction screening and refinement for orbiting objects
//!
//! This crate screens pairs of orbiting objects for close approaches within a
//! time window, then refines each candidate around the time of closest
//! approach (TCA) to produce an accurate distance of closest approach (DCA),
//! relative velocity, and optional avoidance delta-v suggestions.
//!
//! The pipeline runs coarse-to-fine:
//!
//! 1. [`grid::TimeGrid`] samples the analysis window at a fixed step.
//! 2. [`screening::coarse_screen`] flags every (pair, instant) whose
//!    separation is at or under the screening threshold.
//! 3. [`cluster::cluster_samples`] merges adjacent flagged instants into
//!    [`cluster::ConjunctionCandidate`] windows.
//! 4. [`refine::refine_candidate`] upsamples each candidate window and runs a
//!    bracketed golden-section search for the true separation minimum.
//! 5. [`maneuver::suggest_dv`] evaluates impulsive velocity perturbations
//!    against a refined conjunction to propose an avoidance maneuver.
//!
//! Propagation is abstracted behind [`propagation::Propagator`], so the same
//! pipeline runs against SGP4-propagated TLEs ([`sgp4_adapter`]) or analytic
//! orbits ([`propagation::CircularOrbit`]).

pub mod cluster;
pub mod config;
pub mod grid;
pub mod maneuver;
pub mod pipeline;
pub mod propagation;
pub mod refine;
pub mod report;
pub mod screening;
pub mod sgp4_adapter;
pub mod state;
pub mod tle;

// Re-exports for easier access
pub use cluster::{cluster_samples, ConjunctionCandidate};
pub use config::{ConfigError, ManeuverConfig, ScreeningConfig};
pub use grid::TimeGrid;
pub use maneuver::{suggest_dv, DvSuggestion};
pub use pipeline::{plan_maneuvers, run_pipeline};
pub use propagation::{Catalog, CircularOrbit, PropagationError, Propagator};
pub use refine::{
    refine_candidate, refine_pair, refine_pair_with, RefineError, RefineTuning,
    RefinedConjunction, RefinementFlag,
};
pub use screening::{coarse_screen, SampleRow};
pub use sgp4_adapter::Sgp4Propagator;
pub use state::StateVector;
