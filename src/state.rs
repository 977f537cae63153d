//! Inertial state vectors shared across the pipeline
//!
//! All positions are kilometers and all velocities kilometers per second in a
//! single common inertial frame (TEME when states come from SGP4). The frame
//! is never converted inside the pipeline; separation distances only require
//! that both objects of a pair use the same frame.

use nalgebra::Vector3;

/// Position and velocity of one object at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    /// Position in km
    pub position: Vector3<f64>,
    /// Velocity in km/s
    pub velocity: Vector3<f64>,
}

impl StateVector {
    /// Create a state vector from raw position/velocity components.
    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self { position, velocity }
    }

    /// Euclidean separation distance to another state, in km.
    pub fn separation_km(&self, other: &StateVector) -> f64 {
        (self.position - other.position).norm()
    }

    /// Velocity of `self` relative to `other`, in km/s.
    pub fn relative_velocity(&self, other: &StateVector) -> Vector3<f64> {
        self.velocity - other.velocity
    }
}
