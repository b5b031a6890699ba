/// Floating point type used throughout the engine.
pub type Real = f64;

/// Magnitudes at or below this are treated as zero.
pub const ZERO_TOL: Real = 1e-12;

pub fn is_negligible(v: Real) -> bool {
    v.abs() <= ZERO_TOL
}

/// Divide, returning `None` when the denominator is negligible or the
/// quotient is not finite.
pub fn safe_ratio(num: Real, den: Real) -> Option<Real> {
    if is_negligible(den) {
        return None;
    }
    let q = num / den;
    q.is_finite().then_some(q)
}

/// Sign as -1, 0 or +1 (zero for negligible values and NaN).
pub fn signum0(v: Real) -> i8 {
    if is_negligible(v) || v.is_nan() {
        0
    } else if v > 0.0 {
        1
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_ratio_guards_zero() {
        assert_eq!(safe_ratio(1.0, 0.0), None);
        assert_eq!(safe_ratio(0.0, 1e-13), None);
        assert_eq!(safe_ratio(1.0, 4.0), Some(0.25));
        assert_eq!(safe_ratio(f64::MAX, 1e-3), None);
    }

    #[test]
    fn signum_of_tiny_is_zero() {
        assert_eq!(signum0(1e-15), 0);
        assert_eq!(signum0(-0.3), -1);
        assert_eq!(signum0(2.0), 1);
        assert_eq!(signum0(Real::NAN), 0);
    }
}
