//! Fixed-step time grid over the analysis window
//!
//! The grid is the shared time axis for screening: `t_i = start + i * step`
//! for every `t_i <= end`. It is deterministic, restartable (indexable), and
//! cheap to share; instants are derived on demand rather than materialized.

use chrono::{DateTime, Duration, Utc};

use crate::config::ConfigError;

/// Ordered, finite sequence of sample instants at a fixed step.
#[derive(Debug, Clone)]
pub struct TimeGrid {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step_s: f64,
    len: usize,
}

impl TimeGrid {
    /// Build a grid from `start` to `end` (inclusive where the step lands
    /// exactly) at `step_s` seconds.
    ///
    /// Produces `floor((end - start) / step) + 1` instants. Fails with
    /// [`ConfigError::InvalidRange`] when `end <= start` and
    /// [`ConfigError::InvalidStep`] when the step is not a positive finite
    /// number.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, step_s: f64) -> Result<Self, ConfigError> {
        if end <= start {
            return Err(ConfigError::InvalidRange { start, end });
        }
        if !step_s.is_finite() || step_s <= 0.0 {
            return Err(ConfigError::InvalidStep(step_s));
        }
        let span_s = (end - start)
            .num_microseconds()
            .map(|us| us as f64 / 1e6)
            .unwrap_or(f64::MAX);
        // The epsilon keeps an exactly-divisible span from losing its last
        // instant to floating-point round-off.
        let len = ((span_s / step_s) + 1e-9).floor() as usize + 1;
        Ok(Self {
            start,
            end,
            step_s,
            len,
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Requested end of the analysis horizon. The last grid instant is at or
    /// before this.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn step_s(&self) -> f64 {
        self.step_s
    }

    /// Number of instants on the grid (always at least 1).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the analysis horizon in seconds.
    pub fn span_s(&self) -> f64 {
        (self.end - self.start)
            .num_microseconds()
            .map(|us| us as f64 / 1e6)
            .unwrap_or(f64::MAX)
    }

    /// Offset of grid index `index` from the start, in seconds.
    pub fn offset_s(&self, index: usize) -> f64 {
        index as f64 * self.step_s
    }

    /// Instant at grid index `index`.
    pub fn instant(&self, index: usize) -> DateTime<Utc> {
        debug_assert!(index < self.len);
        self.at_offset_s(self.offset_s(index))
    }

    /// Instant at an arbitrary (continuous) offset from the start, in
    /// seconds. Used by the refinement stage, which searches between grid
    /// instants. Resolution is one microsecond.
    pub fn at_offset_s(&self, offset_s: f64) -> DateTime<Utc> {
        self.start + Duration::microseconds((offset_s * 1e6).round() as i64)
    }

    /// Iterate over all grid instants in order. Each call restarts from the
    /// first instant.
    pub fn instants(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        (0..self.len).map(|i| self.instant(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn instant_count_matches_floor_formula() {
        // (span_s, step_s, expected floor(span/step) + 1)
        let cases = [
            (3600.0, 20.0, 181),
            (3600.0, 7.0, 515),   // 514.28... -> 514 + 1
            (100.0, 100.0, 2),    // start and end both on the grid
            (99.0, 100.0, 1),     // only the start fits
            (86400.0, 1.0, 86401),
        ];
        for (span_s, step_s, expected) in cases {
            let end = start() + Duration::microseconds((span_s * 1e6) as i64);
            let grid = TimeGrid::new(start(), end, step_s).unwrap();
            assert_eq!(grid.len(), expected, "span={span_s} step={step_s}");
        }
    }

    #[test]
    fn instants_are_strictly_increasing_from_start() {
        let grid = TimeGrid::new(start(), start() + Duration::minutes(10), 13.0).unwrap();
        let instants: Vec<_> = grid.instants().collect();
        assert_eq!(instants[0], grid.start());
        assert_eq!(instants.len(), grid.len());
        for pair in instants.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(*instants.last().unwrap() <= grid.end());
    }

    #[test]
    fn offsets_round_trip_through_instants() {
        let grid = TimeGrid::new(start(), start() + Duration::hours(1), 20.0).unwrap();
        let t = grid.instant(7);
        assert_relative_eq!(grid.offset_s(7), 140.0, epsilon = 1e-12);
        assert_eq!(grid.at_offset_s(140.0), t);
    }

    #[test]
    fn rejects_inverted_range_and_bad_step() {
        let end = start() + Duration::hours(1);
        assert!(matches!(
            TimeGrid::new(end, start(), 20.0),
            Err(ConfigError::InvalidRange { .. })
        ));
        assert!(matches!(
            TimeGrid::new(start(), start(), 20.0),
            Err(ConfigError::InvalidRange { .. })
        ));
        assert!(matches!(
            TimeGrid::new(start(), end, 0.0),
            Err(ConfigError::InvalidStep(_))
        ));
        assert!(matches!(
            TimeGrid::new(start(), end, -5.0),
            Err(ConfigError::InvalidStep(_))
        ));
        assert!(matches!(
            TimeGrid::new(start(), end, f64::NAN),
            Err(ConfigError::InvalidStep(_))
        ));
    }
}
