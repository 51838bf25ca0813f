//! Sturm-based real root isolation for rational univariate polynomials.

use num::{BigInt, Zero};

use crate::interval::Interval;
use crate::qpoly::{count_roots_half_open, QPoly};
use crate::ran::Ran;
use crate::Rational;

/// Isolates all real roots of `p`, returned in strictly increasing order.
///
/// Every returned number carries `is_root = true`. Rational roots found
/// during bisection come back numeric; the others carry the square-free part
/// of `p` as their defining polynomial together with a disjoint open
/// isolating interval.
pub fn isolate_real_roots(p: &QPoly) -> Vec<Ran> {
    let sf = p.squarefree_part();
    if sf.degree_plus_one() <= 1 {
        return Vec::new();
    }
    let seq = sf.sturm_sequence();
    let bound = sf.cauchy_bound();
    let lo = -&bound;
    let hi = bound.clone();
    debug_assert!(!sf.eval(&lo).is_zero() && !sf.eval(&hi).is_zero());

    let mut roots = Vec::new();
    isolate_in(&sf, &seq, lo, hi, &mut roots);
    debug_assert!(roots.windows(2).all(|w| w[0] < w[1]));
    roots
}

/// Isolates the real roots of `p` lying inside `within`.
pub fn isolate_real_roots_within(p: &QPoly, within: &Interval) -> Vec<Ran> {
    isolate_real_roots(p)
        .into_iter()
        .filter(|r| r.is_within(within))
        .collect()
}

/// Appends the roots of `sf` in `(lo, hi)` to `out`, in increasing order.
/// Requires non-root endpoints.
fn isolate_in(sf: &QPoly, seq: &[QPoly], lo: Rational, hi: Rational, out: &mut Vec<Ran>) {
    let count = count_roots_half_open(seq, &lo, &hi);
    if count == 0 {
        return;
    }
    if count == 1 {
        out.push(Ran::new_algebraic(sf.clone(), lo, hi, true));
        return;
    }
    let mid = (&lo + &hi) / Rational::from_integer(BigInt::from(2));
    if sf.eval(&mid).is_zero() {
        isolate_in(sf, seq, lo, shrink_towards(sf, seq, &mid, true), out);
        out.push(Ran::new_numeric(mid.clone(), true));
        isolate_in(sf, seq, shrink_towards(sf, seq, &mid, false), hi, out);
    } else {
        isolate_in(sf, seq, lo, mid.clone(), out);
        isolate_in(sf, seq, mid, hi, out);
    }
}

/// A non-root point strictly below (`below = true`) or above the root `m`,
/// close enough that no other root of `sf` lies between.
fn shrink_towards(sf: &QPoly, seq: &[QPoly], m: &Rational, below: bool) -> Rational {
    let mut step = Rational::from_integer(BigInt::from(1));
    let two = Rational::from_integer(BigInt::from(2));
    loop {
        let candidate = if below { m - &step } else { m + &step };
        if !sf.eval(&candidate).is_zero() {
            let (a, b) = if below {
                (candidate.clone(), m.clone())
            } else {
                (m.clone(), candidate.clone())
            };
            // The half-open count (a, b] sees the root at m itself exactly
            // when m is the right endpoint.
            let in_gap = count_roots_half_open(seq, &a, &b);
            let expected = usize::from(below);
            if in_gap == expected {
                return candidate;
            }
        }
        step = step / &two;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num_util::{int, rat};

    #[test]
    fn roots_of_quadratic() {
        // x^2 - 2: two irrational roots around +-1.414.
        let roots = isolate_real_roots(&QPoly::from_i64(&[-2, 0, 1]));
        assert_eq!(roots.len(), 2);
        assert!(roots[0] < Ran::zero());
        assert!(roots[1] > Ran::zero());
        assert!(roots.iter().all(|r| r.is_root()));
        assert_eq!(roots[0].cmp_rational(&rat(-3, 2)), core::cmp::Ordering::Greater);
        assert_eq!(roots[1].cmp_rational(&int(1)), core::cmp::Ordering::Greater);
        assert_eq!(roots[1].cmp_rational(&rat(3, 2)), core::cmp::Ordering::Less);
    }

    #[test]
    fn rational_roots_become_numeric() {
        // (x - 1)(x + 2)(x - 1/2)
        let p = &(&QPoly::from_i64(&[-1, 1]) * &QPoly::from_i64(&[2, 1]))
            * &QPoly::new(vec![rat(-1, 2), int(1)]);
        let roots = isolate_real_roots(&p);
        assert_eq!(roots.len(), 3);
        assert_eq!(roots[0].value(), Some(&int(-2)));
        assert_eq!(roots[1].value(), Some(&rat(1, 2)));
        assert_eq!(roots[2].value(), Some(&int(1)));
    }

    #[test]
    fn multiplicities_are_flattened() {
        // (x - 3)^2: a single root.
        let p = &QPoly::from_i64(&[-3, 1]) * &QPoly::from_i64(&[-3, 1]);
        let roots = isolate_real_roots(&p);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].value(), Some(&int(3)));
    }

    #[test]
    fn no_real_roots() {
        assert!(isolate_real_roots(&QPoly::from_i64(&[1, 0, 1])).is_empty());
        assert!(isolate_real_roots(&QPoly::from_i64(&[5])).is_empty());
        assert!(isolate_real_roots(&QPoly::empty()).is_empty());
    }

    #[test]
    fn restriction_to_interval() {
        let p = QPoly::from_i64(&[-2, 0, 1]);
        let pos = isolate_real_roots_within(&p, &Interval::above(int(0), crate::BoundKind::Strict));
        assert_eq!(pos.len(), 1);
        assert!(pos[0] > Ran::zero());
    }

    #[test]
    fn ordering_with_mixed_representations() {
        // x (x^2 - 2) (x^2 - 3): five roots, strictly ordered.
        let p = &(&QPoly::from_i64(&[0, 1]) * &QPoly::from_i64(&[-2, 0, 1]))
            * &QPoly::from_i64(&[-3, 0, 1]);
        let roots = isolate_real_roots(&p);
        assert_eq!(roots.len(), 5);
        for w in roots.windows(2) {
            assert!(w[0] < w[1]);
        }
        assert_eq!(roots[2].value(), Some(&int(0)));
    }
}
