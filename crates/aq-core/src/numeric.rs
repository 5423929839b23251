use crate::CoreError;

/// Floating point type used throughout the engine
pub type Real = f64;

/// Standard gravity (m/s^2), used by the Darcy-Weisbach law.
pub const GRAVITY: Real = 9.80665;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Cubic Hermite segment through (x0, f0) and (x1, f1) with end slopes d0, d1.
///
/// Returns (value, slope) at `x`. Callers must guarantee x1 > x0; used to blend
/// a curve into its neighbors with continuous value and derivative.
pub fn hermite_cubic(x: Real, x0: Real, f0: Real, d0: Real, x1: Real, f1: Real, d1: Real) -> (Real, Real) {
    let w = x1 - x0;
    let s = (x - x0) / w;
    let s2 = s * s;
    let s3 = s2 * s;

    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;

    let value = h00 * f0 + h10 * w * d0 + h01 * f1 + h11 * w * d1;

    let dh00 = 6.0 * s2 - 6.0 * s;
    let dh10 = 3.0 * s2 - 4.0 * s + 1.0;
    let dh01 = -6.0 * s2 + 6.0 * s;
    let dh11 = 3.0 * s2 - 2.0 * s;

    let slope = (dh00 * f0 + dh01 * f1) / w + dh10 * d0 + dh11 * d1;

    (value, slope)
}
