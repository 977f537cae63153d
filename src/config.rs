//! Pipeline configuration surface and fail-fast validation
//!
//! Every tunable enters the core through one of these structs and is checked
//! before any propagation work begins. Configuration errors are the only
//! fatal errors in the pipeline; everything downstream degrades per sample
//! or per candidate.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Fatal configuration errors, raised before any computation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("time range end {end} is not after start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("grid step must be positive and finite, got {0} s")]
    InvalidStep(f64),

    #[error("screening threshold must be positive and finite, got {0} km")]
    InvalidThreshold(f64),

    #[error("cluster window must be at least 1 grid step, got {0}")]
    InvalidWindow(usize),

    #[error("upsample factor must be at least 1, got {0}")]
    InvalidUpsample(u32),

    #[error("half-steps must be at least 1, got {0}")]
    InvalidHalfSteps(u32),

    #[error("target DCA must be positive and finite, got {0} km")]
    InvalidTargetDca(f64),

    #[error("max delta-v must be positive and finite, got {0} m/s")]
    InvalidMaxDv(f64),

    #[error("maneuver lead time must be positive and finite, got {0} s")]
    InvalidLeadTime(f64),
}

/// Screening and refinement tunables for one pipeline run.
///
/// The grid step and threshold trade fidelity for throughput: coarse
/// screening cost is O(pairs x grid length), so halving the step doubles the
/// dominant cost of the run.
#[derive(Debug, Clone)]
pub struct ScreeningConfig {
    /// Analysis window start (UTC)
    pub start: DateTime<Utc>,
    /// Analysis window end (UTC), strictly after `start`
    pub end: DateTime<Utc>,
    /// Coarse grid step in seconds
    pub step_s: f64,
    /// Screening distance threshold in km
    pub threshold_km: f64,
    /// Maximum grid-index gap merged into one candidate cluster
    pub cluster_window: usize,
    /// Fine-grid upsampling factor inside each refinement bracket
    pub upsample: u32,
    /// Coarse steps included on each side of the approximate TCA
    pub half_steps: u32,
}

impl ScreeningConfig {
    /// Config with the default tunables for a given analysis window.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            step_s: 20.0,
            threshold_km: 25.0,
            cluster_window: 3,
            upsample: 10,
            half_steps: 3,
        }
    }

    /// Check every tunable; returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.end <= self.start {
            return Err(ConfigError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        if !self.step_s.is_finite() || self.step_s <= 0.0 {
            return Err(ConfigError::InvalidStep(self.step_s));
        }
        if !self.threshold_km.is_finite() || self.threshold_km <= 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold_km));
        }
        if self.cluster_window == 0 {
            return Err(ConfigError::InvalidWindow(self.cluster_window));
        }
        if self.upsample == 0 {
            return Err(ConfigError::InvalidUpsample(self.upsample));
        }
        if self.half_steps == 0 {
            return Err(ConfigError::InvalidHalfSteps(self.half_steps));
        }
        Ok(())
    }
}

/// Delta-v sandbox tunables.
#[derive(Debug, Clone)]
pub struct ManeuverConfig {
    /// Separation the maneuver should achieve, km
    pub target_dca_km: f64,
    /// Magnitude budget for the impulse, m/s
    pub max_dv_mps: f64,
    /// Burn time placed this many seconds before the refined TCA
    /// (clipped to the analysis window start)
    pub lead_time_s: f64,
}

impl Default for ManeuverConfig {
    fn default() -> Self {
        Self {
            target_dca_km: 2.0,
            max_dv_mps: 0.05,
            lead_time_s: 1800.0,
        }
    }
}

impl ManeuverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.target_dca_km.is_finite() || self.target_dca_km <= 0.0 {
            return Err(ConfigError::InvalidTargetDca(self.target_dca_km));
        }
        if !self.max_dv_mps.is_finite() || self.max_dv_mps <= 0.0 {
            return Err(ConfigError::InvalidMaxDv(self.max_dv_mps));
        }
        if !self.lead_time_s.is_finite() || self.lead_time_s <= 0.0 {
            return Err(ConfigError::InvalidLeadTime(self.lead_time_s));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        (start, start + chrono::Duration::hours(2))
    }

    #[test]
    fn default_config_validates() {
        let (start, end) = window();
        assert!(ScreeningConfig::new(start, end).validate().is_ok());
        assert!(ManeuverConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let (start, end) = window();
        let config = ScreeningConfig::new(end, start);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn bad_tunables_are_rejected_individually() {
        let (start, end) = window();
        let base = ScreeningConfig::new(start, end);

        let mut c = base.clone();
        c.step_s = 0.0;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidStep(_))));

        let mut c = base.clone();
        c.threshold_km = -1.0;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidThreshold(_))));

        let mut c = base.clone();
        c.cluster_window = 0;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidWindow(0))));

        let mut c = base.clone();
        c.upsample = 0;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidUpsample(0))));

        let mut c = base;
        c.half_steps = 0;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidHalfSteps(0))));
    }

    #[test]
    fn maneuver_budget_must_be_positive() {
        let mut config = ManeuverConfig::default();
        config.max_dv_mps = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMaxDv(_))
        ));
    }

    #[test]
    fn maneuver_lead_time_must_be_positive() {
        for lead_time_s in [0.0, -60.0, f64::INFINITY] {
            let mut config = ManeuverConfig::default();
            config.lead_time_s = lead_time_s;
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidLeadTime(_))),
                "lead_time_s={lead_time_s}"
            );
        }
    }
}
