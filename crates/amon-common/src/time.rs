//! ---
//! amon_section: "01-core-functionality"
//! amon_subsection: "module"
//! amon_type: "source"
//! amon_scope: "code"
//! amon_description: "Shared primitives and utilities for the simulation runtime."
//! amon_version: "v0.1.0"
//! amon_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::{bail, Result};

/// Longest span a time-unit count may describe. Timers add periods to the
/// current instant, so anything longer is refused up front.
pub const MAX_SPAN: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Converts abstract simulation time-units into wall-clock durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeScale {
    unit: Duration,
}

impl TimeScale {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }

    /// Wall-clock length of `units` time-units, or an error when the count is
    /// negative, not finite, or longer than [`MAX_SPAN`].
    pub fn try_units(&self, units: f64) -> Result<Duration> {
        if !units.is_finite() || units < 0.0 {
            bail!("{} is not a valid number of time-units", units);
        }
        match Duration::try_from_secs_f64(self.unit.as_secs_f64() * units) {
            Ok(span) if span <= MAX_SPAN => Ok(span),
            _ => bail!(
                "{} time-units of {:?} exceed the longest supported span",
                units,
                self.unit
            ),
        }
    }

    /// Infallible variant of [`TimeScale::try_units`]: invalid counts map to
    /// zero and oversized ones saturate at [`MAX_SPAN`].
    pub fn units(&self, units: f64) -> Duration {
        if !units.is_finite() || units <= 0.0 {
            return Duration::ZERO;
        }
        self.try_units(units).unwrap_or(MAX_SPAN)
    }

    /// Inverse of [`TimeScale::units`], used when reporting elapsed simulation time.
    pub fn to_units(&self, duration: Duration) -> f64 {
        if self.unit.is_zero() {
            return 0.0;
        }
        duration.as_secs_f64() / self.unit.as_secs_f64()
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_fractional_units() {
        let scale = TimeScale::new(Duration::from_millis(500));
        assert_eq!(scale.units(2.0), Duration::from_secs(1));
        assert_eq!(scale.units(0.2), Duration::from_millis(100));
    }

    #[test]
    fn non_positive_units_are_zero() {
        let scale = TimeScale::default();
        assert_eq!(scale.units(-1.0), Duration::ZERO);
        assert_eq!(scale.units(f64::NAN), Duration::ZERO);
    }

    #[test]
    fn oversized_spans_are_refused() {
        let scale = TimeScale::default();
        assert!(scale.try_units(1e30).is_err());
        assert!(scale.try_units(f64::INFINITY).is_err());
        assert!(scale.try_units(-0.5).is_err());
        assert_eq!(scale.units(1e30), MAX_SPAN);
        assert_eq!(scale.try_units(0.0).expect("zero is representable"), Duration::ZERO);
    }

    #[test]
    fn converts_back_to_units() {
        let scale = TimeScale::new(Duration::from_millis(250));
        assert!((scale.to_units(Duration::from_secs(1)) - 4.0).abs() < f64::EPSILON);
    }
}
