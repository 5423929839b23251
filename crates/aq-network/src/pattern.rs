//! Demand patterns and piecewise-linear curves.

use aq_core::{CurveId, PatternId, Real};
use serde::{Deserialize, Serialize};

/// A stepwise, cyclic multiplier sequence.
///
/// The multiplier for time t is the entry covering t at the pattern's fixed
/// interval; past the end the sequence wraps around. Stepwise interpolation
/// is the fixed contract for demand and head patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub name: String,
    /// Step length (s)
    pub interval: Real,
    pub multipliers: Vec<Real>,
}

impl Pattern {
    /// Multiplier at simulated time t (seconds).
    pub fn value_at(&self, t: Real) -> Real {
        let n = self.multipliers.len();
        let step = (t / self.interval).floor() as i64;
        let idx = step.rem_euclid(n as i64) as usize;
        self.multipliers[idx]
    }

    /// Time of the next step boundary strictly after t, in seconds.
    pub fn next_boundary_after(&self, t: Real) -> Real {
        let step = (t / self.interval).floor();
        let boundary = (step + 1.0) * self.interval;
        if boundary > t {
            boundary
        } else {
            boundary + self.interval
        }
    }
}

/// An ordered (x, y) table with linear interpolation and clamped ends.
///
/// Linear interpolation is the fixed contract for data curves (e.g. pump
/// test points fed to the curve fit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub id: CurveId,
    pub name: String,
    /// Ascending x values.
    pub x: Vec<Real>,
    pub y: Vec<Real>,
}

impl Curve {
    /// Interpolated y at the given x, clamped to the table's range.
    pub fn interpolate(&self, x: Real) -> Real {
        let n = self.x.len();
        if x <= self.x[0] {
            return self.y[0];
        }
        if x >= self.x[n - 1] {
            return self.y[n - 1];
        }
        // x is strictly inside; find the bracketing segment.
        let mut hi = 1;
        while self.x[hi] < x {
            hi += 1;
        }
        let lo = hi - 1;
        let frac = (x - self.x[lo]) / (self.x[hi] - self.x[lo]);
        self.y[lo] + frac * (self.y[hi] - self.y[lo])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aq_core::Id;
    use proptest::prelude::*;

    fn pattern(multipliers: Vec<Real>) -> Pattern {
        Pattern {
            id: Id::from_index(0),
            name: "p".into(),
            interval: 3600.0,
            multipliers,
        }
    }

    #[test]
    fn stepwise_lookup() {
        let p = pattern(vec![1.0, 1.5, 0.5]);
        assert_eq!(p.value_at(0.0), 1.0);
        assert_eq!(p.value_at(3599.0), 1.0);
        assert_eq!(p.value_at(3600.0), 1.5);
        assert_eq!(p.value_at(7300.0), 0.5);
    }

    #[test]
    fn lookup_wraps_cyclically() {
        let p = pattern(vec![1.0, 2.0]);
        assert_eq!(p.value_at(2.0 * 3600.0), 1.0);
        assert_eq!(p.value_at(3.0 * 3600.0 + 10.0), 2.0);
    }

    #[test]
    fn next_boundary_is_strictly_after() {
        let p = pattern(vec![1.0, 2.0]);
        assert_eq!(p.next_boundary_after(0.0), 3600.0);
        assert_eq!(p.next_boundary_after(3600.0), 7200.0);
        assert_eq!(p.next_boundary_after(3601.0), 7200.0);
    }

    #[test]
    fn curve_interpolation_and_clamping() {
        let c = Curve {
            id: Id::from_index(0),
            name: "c".into(),
            x: vec![0.0, 1.0, 3.0],
            y: vec![10.0, 20.0, 0.0],
        };
        assert_eq!(c.interpolate(-1.0), 10.0);
        assert_eq!(c.interpolate(0.5), 15.0);
        assert_eq!(c.interpolate(2.0), 10.0);
        assert_eq!(c.interpolate(5.0), 0.0);
    }

    proptest! {
        #[test]
        fn pattern_value_is_always_a_member(
            multipliers in proptest::collection::vec(0.0_f64..5.0, 1..24),
            t in 0.0_f64..1e7,
        ) {
            let p = pattern(multipliers.clone());
            let v = p.value_at(t);
            prop_assert!(multipliers.contains(&v));
        }

        #[test]
        fn boundary_always_advances(t in 0.0_f64..1e7) {
            let p = pattern(vec![1.0, 0.5, 2.0]);
            prop_assert!(p.next_boundary_after(t) > t);
        }
    }
}
