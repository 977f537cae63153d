//! Propagation adapter boundary and the read-only object catalog
//!
//! The pipeline never talks to a propagator implementation directly; every
//! stage goes through the [`Propagator`] trait, which maps an instant to a
//! [`StateVector`] and may fail per call. Propagator state is computed once
//! at load time and held immutably in a [`Catalog`], so parallel workers
//! share it without locks.
//!
//! [`CircularOrbit`] is an exact analytic propagator. It backs the test
//! scenarios with known closest-approach geometry and is handy for sizing
//! screening parameters without element sets.

use std::f64::consts::TAU;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use thiserror::Error;

use crate::state::StateVector;

/// Errors surfaced by propagator calls or catalog lookups.
///
/// Per-sample propagation failures are recoverable: callers drop the affected
/// sample with a warning and continue. Only the pipeline configuration is
/// allowed to fail a run outright.
#[derive(Debug, Error)]
pub enum PropagationError {
    /// The underlying model could not produce a state at this instant
    /// (e.g. SGP4 divergence for a decayed or stale element set).
    #[error("propagation diverged at {instant}: {reason}")]
    Diverged {
        instant: DateTime<Utc>,
        reason: String,
    },

    /// An object identifier was not present in the catalog.
    #[error("object not found in catalog: {0}")]
    UnknownObject(String),

    /// An object identifier was added to the catalog twice.
    #[error("duplicate object identifier: {0}")]
    DuplicateObject(String),
}

/// Black-box propagator: object state as a function of time.
///
/// Implementations must be side-effect free and safe to call concurrently
/// for different instants; the screening and refinement stages fan out
/// across rayon workers holding shared references.
pub trait Propagator: Send + Sync {
    /// State of the object at `instant`, in the common inertial frame.
    fn state_at(&self, instant: DateTime<Utc>) -> Result<StateVector, PropagationError>;
}

/// One catalog entry: a unique identifier bound to its propagator.
#[derive(Clone)]
pub struct CatalogEntry {
    id: String,
    norad_id: Option<u32>,
    propagator: Arc<dyn Propagator>,
}

impl CatalogEntry {
    /// Object identifier, unique within the catalog.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// NORAD catalog number when the object came from a TLE.
    pub fn norad_id(&self) -> Option<u32> {
        self.norad_id
    }

    /// The propagator backing this object.
    pub fn propagator(&self) -> &Arc<dyn Propagator> {
        &self.propagator
    }
}

/// Read-only table of objects under analysis.
///
/// Built once before screening begins and never mutated afterwards; all
/// pipeline stages borrow it immutably.
#[derive(Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object. Fails if the identifier is already present.
    pub fn add(
        &mut self,
        id: impl Into<String>,
        norad_id: Option<u32>,
        propagator: Arc<dyn Propagator>,
    ) -> Result<(), PropagationError> {
        let id = id.into();
        if self.index_of(&id).is_some() {
            return Err(PropagationError::DuplicateObject(id));
        }
        self.entries.push(CatalogEntry {
            id,
            norad_id,
            propagator,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> &CatalogEntry {
        &self.entries[index]
    }

    /// Position of an object's identifier in the catalog, if present.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Propagate the object at `index` to `instant`.
    pub fn state_at(
        &self,
        index: usize,
        instant: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError> {
        self.entries[index].propagator.state_at(instant)
    }
}

/// Standard gravitational parameter of Earth, km^3/s^2 (WGS-72 value, the
/// constant set SGP4 itself uses).
pub const EARTH_MU_KM3_S2: f64 = 398_600.8;

/// Exact circular orbit propagator.
///
/// The orbit plane is spanned by two orthonormal basis vectors; the object
/// moves at a constant angular rate from its phase at epoch. Never fails.
#[derive(Debug, Clone)]
pub struct CircularOrbit {
    radius_km: f64,
    angular_rate_rad_s: f64,
    phase_rad: f64,
    epoch: DateTime<Utc>,
    u: Vector3<f64>,
    v: Vector3<f64>,
}

impl CircularOrbit {
    /// Keplerian mean motion for a circular orbit of the given radius, rad/s.
    pub fn kepler_rate(radius_km: f64) -> f64 {
        (EARTH_MU_KM3_S2 / radius_km.powi(3)).sqrt()
    }

    /// Circular orbit in the equatorial (x-y) plane at the Keplerian rate.
    pub fn equatorial(radius_km: f64, phase_rad: f64, epoch: DateTime<Utc>) -> Self {
        Self {
            radius_km,
            angular_rate_rad_s: Self::kepler_rate(radius_km),
            phase_rad,
            epoch,
            u: Vector3::x(),
            v: Vector3::y(),
        }
    }

    /// Circular orbit inclined by `inclination_rad` about the x axis.
    pub fn inclined(
        radius_km: f64,
        inclination_rad: f64,
        phase_rad: f64,
        epoch: DateTime<Utc>,
    ) -> Self {
        let (sin_i, cos_i) = inclination_rad.sin_cos();
        Self {
            radius_km,
            angular_rate_rad_s: Self::kepler_rate(radius_km),
            phase_rad,
            epoch,
            u: Vector3::x(),
            v: Vector3::new(0.0, cos_i, sin_i),
        }
    }

    /// Override the angular rate (decouples the orbit from Keplerian motion).
    pub fn with_angular_rate(mut self, angular_rate_rad_s: f64) -> Self {
        self.angular_rate_rad_s = angular_rate_rad_s;
        self
    }

    pub fn angular_rate_rad_s(&self) -> f64 {
        self.angular_rate_rad_s
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    fn phase_at(&self, instant: DateTime<Utc>) -> f64 {
        let dt_s = (instant - self.epoch)
            .num_microseconds()
            .map(|us| us as f64 / 1e6)
            .unwrap_or(f64::MAX);
        (self.phase_rad + self.angular_rate_rad_s * dt_s) % TAU
    }
}

impl Propagator for CircularOrbit {
    fn state_at(&self, instant: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        let (sin_t, cos_t) = self.phase_at(instant).sin_cos();
        let position = self.radius_km * (cos_t * self.u + sin_t * self.v);
        let speed = self.radius_km * self.angular_rate_rad_s;
        let velocity = speed * (-sin_t * self.u + cos_t * self.v);
        Ok(StateVector::new(position, velocity))
    }
}

/// Straight-line constant-velocity trajectory.
///
/// Not an orbit, but its pairwise separation has a closed-form minimum, which
/// makes it the reference geometry for screening and refinement validation.
#[derive(Debug, Clone)]
pub struct LinearTrajectory {
    position_at_epoch: Vector3<f64>,
    velocity: Vector3<f64>,
    epoch: DateTime<Utc>,
}

impl LinearTrajectory {
    pub fn new(
        position_at_epoch: Vector3<f64>,
        velocity: Vector3<f64>,
        epoch: DateTime<Utc>,
    ) -> Self {
        Self {
            position_at_epoch,
            velocity,
            epoch,
        }
    }
}

impl Propagator for LinearTrajectory {
    fn state_at(&self, instant: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        let dt_s = (instant - self.epoch)
            .num_microseconds()
            .map(|us| us as f64 / 1e6)
            .unwrap_or(f64::MAX);
        Ok(StateVector::new(
            self.position_at_epoch + self.velocity * dt_s,
            self.velocity,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn circular_orbit_stays_on_radius() {
        let orbit = CircularOrbit::equatorial(7000.0, 0.3, epoch());
        for minutes in [0, 10, 45, 90, 200] {
            let t = epoch() + chrono::Duration::minutes(minutes);
            let state = orbit.state_at(t).unwrap();
            assert_relative_eq!(state.position.norm(), 7000.0, epsilon = 1e-6);
            // Velocity is tangential
            assert_relative_eq!(state.position.dot(&state.velocity), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn circular_orbit_period_closes() {
        let orbit = CircularOrbit::equatorial(7000.0, 0.0, epoch());
        let period_s = TAU / orbit.angular_rate_rad_s();
        let start = orbit.state_at(epoch()).unwrap();
        let after = orbit
            .state_at(epoch() + chrono::Duration::microseconds((period_s * 1e6) as i64))
            .unwrap();
        assert_relative_eq!(
            (start.position - after.position).norm(),
            0.0,
            epsilon = 1e-3
        );
    }

    #[test]
    fn linear_trajectory_advances_with_velocity() {
        let traj = LinearTrajectory::new(
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
            epoch(),
        );
        let state = traj.state_at(epoch() + chrono::Duration::seconds(5)).unwrap();
        assert_relative_eq!(state.position.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(state.position.y, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn catalog_rejects_duplicate_ids() {
        let mut catalog = Catalog::new();
        let orbit = Arc::new(CircularOrbit::equatorial(7000.0, 0.0, epoch()));
        catalog.add("SAT-A", None, orbit.clone()).unwrap();
        assert!(matches!(
            catalog.add("SAT-A", None, orbit),
            Err(PropagationError::DuplicateObject(id)) if id == "SAT-A"
        ));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.index_of("SAT-A"), Some(0));
        assert_eq!(catalog.index_of("SAT-B"), None);
    }
}
