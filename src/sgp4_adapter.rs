//! SGP4-backed propagation adapter
//!
//! Binds a two-line element set to the [`Propagator`] trait via the `sgp4`
//! crate. Element parsing and constant derivation happen once at load time;
//! per-instant propagation is read-only and safe to call from parallel
//! workers. States come back in the TEME frame (km, km/s), which is the
//! common frame the whole pipeline screens in.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::propagation::{PropagationError, Propagator};
use crate::state::StateVector;
use crate::tle::TleError;

/// A single object propagated from its TLE with SGP4.
pub struct Sgp4Propagator {
    name: String,
    epoch: NaiveDateTime,
    constants: sgp4::Constants,
}

impl Sgp4Propagator {
    /// Parse a TLE pair and derive the SGP4 constants.
    ///
    /// Fails on malformed lines, checksum mismatches, or element sets SGP4
    /// cannot initialize (e.g. non-physical eccentricity).
    pub fn from_tle(name: &str, line1: &str, line2: &str) -> Result<Self, TleError> {
        let elements = sgp4::Elements::from_tle(
            Some(name.to_string()),
            line1.as_bytes(),
            line2.as_bytes(),
        )
        .map_err(|err| TleError::InvalidElements {
            name: name.to_string(),
            reason: err.to_string(),
        })?;
        let constants =
            sgp4::Constants::from_elements(&elements).map_err(|err| TleError::InvalidElements {
                name: name.to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            name: name.to_string(),
            epoch: elements.datetime,
            constants,
        })
    }

    /// Epoch of the element set (UTC, naive).
    pub fn epoch(&self) -> NaiveDateTime {
        self.epoch
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Propagator for Sgp4Propagator {
    fn state_at(&self, instant: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        let minutes = (instant.naive_utc() - self.epoch)
            .num_microseconds()
            .map(|us| us as f64 / 60e6)
            .unwrap_or(f64::MAX);
        let prediction = self
            .constants
            .propagate(sgp4::MinutesSinceEpoch(minutes))
            .map_err(|err| PropagationError::Diverged {
                instant,
                reason: format!("{}: {err}", self.name),
            })?;
        Ok(StateVector::new(
            prediction.position.into(),
            prediction.velocity.into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // ISS element set; checksums are valid.
    const LINE1: &str =
        "1 25544U 98067A   19343.69339541  .00001764  00000-0  40967-4 0  9998";
    const LINE2: &str =
        "2 25544  51.6439 211.2001 0007417  17.6667  85.6398 15.50103472202482";

    #[test]
    fn propagates_to_a_plausible_leo_state() {
        let propagator = Sgp4Propagator::from_tle("ISS (ZARYA)", LINE1, LINE2).unwrap();
        let instant = Utc.with_ymd_and_hms(2019, 12, 10, 0, 0, 0).unwrap();
        let state = propagator.state_at(instant).unwrap();

        // LEO sanity: geocentric radius and orbital speed.
        let radius = state.position.norm();
        assert!((6500.0..7100.0).contains(&radius), "radius {radius} km");
        let speed = state.velocity.norm();
        assert!((7.0..8.2).contains(&speed), "speed {speed} km/s");
    }

    #[test]
    fn rejects_corrupted_elements() {
        let corrupted = LINE1.replace("25544", "2554X");
        assert!(matches!(
            Sgp4Propagator::from_tle("BROKEN", &corrupted, LINE2),
            Err(TleError::InvalidElements { .. })
        ));
    }

    #[test]
    fn epoch_matches_the_element_set_day() {
        let propagator = Sgp4Propagator::from_tle("ISS (ZARYA)", LINE1, LINE2).unwrap();
        // Day-of-year 343.69... of 2019 is December 9th.
        assert_eq!(
            propagator.epoch().date(),
            chrono::NaiveDate::from_ymd_opt(2019, 12, 9).unwrap()
        );
    }
}
