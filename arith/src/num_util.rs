//! Small helpers on arbitrary-precision rationals.

use num::{BigInt, One, Signed, Zero};

use crate::{Int, Rational};

/// Total number of bits in the reduced numerator and denominator. Used as a
/// crude measure of representation size when ranking sample candidates.
pub fn bitsize(r: &Rational) -> u64 {
    r.numer().bits() + r.denom().bits()
}

pub fn floor_int(r: &Rational) -> Int {
    r.floor().to_integer()
}

pub fn ceil_int(r: &Rational) -> Int {
    r.ceil().to_integer()
}

pub fn rational_from_int(i: Int) -> Rational {
    Rational::from_integer(i)
}

/// Convenience constructor used pervasively in tests.
pub fn rat(n: i64, d: i64) -> Rational {
    Rational::new(BigInt::from(n), BigInt::from(d))
}

/// Convenience constructor used pervasively in tests.
pub fn int(n: i64) -> Rational {
    Rational::from_integer(BigInt::from(n))
}

/// The rational with the smallest denominator (and then smallest numerator)
/// strictly inside the open interval `(lo, hi)`, found by walking the
/// Stern-Brocot tree along the continued fraction expansion of the
/// endpoints.
pub fn simplest_between(lo: &Rational, hi: &Rational) -> Rational {
    debug_assert!(lo < hi, "simplest_between requires lo < hi");
    if lo.is_negative() && hi.is_positive() {
        return Rational::zero();
    }
    if !hi.is_positive() {
        return -simplest_nonneg(&-hi.clone(), &-lo.clone());
    }
    simplest_nonneg(lo, hi)
}

/// `simplest_between` restricted to `0 <= lo < hi`.
fn simplest_nonneg(lo: &Rational, hi: &Rational) -> Rational {
    let next_int = lo.floor() + Rational::one();
    if &next_int < hi {
        return next_int;
    }
    // No integer strictly inside; strip the shared integer part and recurse
    // on the reciprocal interval.
    let f = lo.floor();
    let lo2 = lo - &f;
    let hi2 = hi - &f;
    if lo2.is_zero() {
        let n = hi2.recip().floor() + Rational::one();
        return f + n.recip();
    }
    f + simplest_nonneg(&hi2.recip(), &lo2.recip()).recip()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    #[test]
    fn simplest_between_basics() {
        assert_eq!(simplest_between(&rat(-1, 1), &rat(1, 1)), int(0));
        assert_eq!(simplest_between(&int(2), &int(3)), rat(5, 2));
        assert_eq!(simplest_between(&int(0), &int(1)), rat(1, 2));
        assert_eq!(simplest_between(&rat(1, 3), &rat(1, 2)), rat(2, 5));
        assert_eq!(simplest_between(&rat(-7, 2), &rat(-10, 3)), rat(-17, 5));
        assert_eq!(simplest_between(&rat(5, 2), &int(4)), int(3));
    }

    #[test]
    fn simplest_between_is_inside() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let a = rat(rng.gen_range(-50..50), rng.gen_range(1..20));
            let b = rat(rng.gen_range(-50..50), rng.gen_range(1..20));
            if a == b {
                continue;
            }
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            let m = simplest_between(&lo, &hi);
            assert!(lo < m && m < hi, "{m} not in ({lo}, {hi})");
        }
    }

    #[test]
    fn bitsize_grows_with_denominator() {
        assert!(bitsize(&rat(1, 1024)) > bitsize(&int(1)));
        assert!(bitsize(&int(0)) <= 2);
    }
}
