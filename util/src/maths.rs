//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Sign of a value as -1, 0 or +1.
///
/// Unlike `f64::signum` zero maps to zero, so a target directly abeam of the
/// vehicle gives no preferred direction.
pub fn sign<T>(value: T) -> T
where
    T: Float
{
    if value > T::zero() {
        T::one()
    }
    else if value < T::zero() {
        -T::one()
    }
    else {
        T::zero()
    }
}

pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    // Shift into [0, 2pi), then back down. rem_euclid makes the result
    // non-negative so -pi maps to +pi.
    let mut c = rem_euclid(-angle + pi_t, tau_t);
    c = pi_t - c;

    if c <= -pi_t {
        c = c + tau_t;
    }

    c
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `self` is much smaller than `rhs.abs()` in
/// magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;
    const EPS: f64 = 1e-12;

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(0.5f64) - 0.5).abs() < EPS);
        assert!((wrap_pi(-0.5f64) + 0.5).abs() < EPS);
        assert!((wrap_pi(PI) - PI).abs() < EPS);
        assert!((wrap_pi(-PI) - PI).abs() < EPS);
        assert!((wrap_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < EPS);
        assert!((wrap_pi(-3.0 * PI / 2.0) - PI / 2.0).abs() < EPS);
        assert!((wrap_pi(5.0 * PI) - PI).abs() < 1e-9);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(3.2f64), 1.0);
        assert_eq!(sign(-0.1f64), -1.0);
        assert_eq!(sign(0f64), 0.0);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&5.0f64, &0.0, &1.0), 1.0);
        assert_eq!(clamp(&-5.0f64, &0.0, &1.0), 0.0);
        assert_eq!(clamp(&0.5f64, &0.0, &1.0), 0.5);
    }
}
