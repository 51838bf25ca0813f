//! Real algebraic numbers: exact rationals, or irrational roots represented
//! by a square-free defining polynomial and an open isolating interval.

use core::cmp::Ordering;
use core::fmt;

use num::{BigInt, One, Zero};

use crate::interval::{BoundKind, Enclosure, Interval};
use crate::num_util::{bitsize, floor_int};
use crate::qpoly::QPoly;
use crate::{Rational, Sign};

#[derive(Clone, Debug)]
enum Repr {
    Num(Rational),
    Alg {
        /// Square-free defining polynomial with this number as its only root
        /// in the isolating interval.
        poly: QPoly,
        /// Open isolating interval; the endpoints are not roots.
        lo: Rational,
        hi: Rational,
    },
}

/// A real algebraic number together with the flag telling whether it arose
/// as a root of a lifting polynomial or as an intermediate witness.
#[derive(Clone, Debug)]
pub struct Ran {
    repr: Repr,
    is_root: bool,
}

impl Ran {
    pub fn new_numeric(value: Rational, is_root: bool) -> Self {
        Ran {
            repr: Repr::Num(value),
            is_root,
        }
    }

    /// An interval-represented number. The polynomial must be square-free
    /// with exactly one root in the open interval `(lo, hi)` and no root at
    /// either endpoint; small-degree rational roots are recognized and
    /// collapse to the numeric representation.
    pub fn new_algebraic(poly: QPoly, lo: Rational, hi: Rational, is_root: bool) -> Self {
        debug_assert!(lo < hi);
        debug_assert!(!poly.eval(&lo).is_zero() && !poly.eval(&hi).is_zero());
        let poly = poly.normalized();
        if let Some(roots) = poly.rational_roots_small() {
            for r in roots {
                if r > lo && r < hi {
                    return Ran::new_numeric(r, is_root);
                }
            }
        }
        Ran {
            repr: Repr::Alg { poly, lo, hi },
            is_root,
        }
    }

    pub fn zero() -> Self {
        Ran::new_numeric(Rational::zero(), false)
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn set_root(&mut self, is_root: bool) {
        self.is_root = is_root;
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.repr, Repr::Num(_))
    }

    pub fn value(&self) -> Option<&Rational> {
        match &self.repr {
            Repr::Num(v) => Some(v),
            Repr::Alg { .. } => None,
        }
    }

    /// The defining polynomial of an interval-represented number.
    pub fn defining_poly(&self) -> Option<&QPoly> {
        match &self.repr {
            Repr::Num(_) => None,
            Repr::Alg { poly, .. } => Some(poly),
        }
    }

    pub fn isolating_interval(&self) -> Option<(&Rational, &Rational)> {
        match &self.repr {
            Repr::Num(_) => None,
            Repr::Alg { lo, hi, .. } => Some((lo, hi)),
        }
    }

    /// A finite closed enclosure of the value.
    pub fn enclosure(&self) -> Enclosure {
        match &self.repr {
            Repr::Num(v) => Enclosure::point(v.clone()),
            Repr::Alg { lo, hi, .. } => Enclosure::new(lo.clone(), hi.clone()),
        }
    }

    /// Total bit-size of the representation.
    pub fn bitsize(&self) -> u64 {
        match &self.repr {
            Repr::Num(v) => bitsize(v),
            Repr::Alg { poly, lo, hi } => poly.bitsize() + bitsize(lo) + bitsize(hi),
        }
    }

    /// Halves the isolating interval once. May collapse the representation
    /// to numeric if the bisection point happens to be the root.
    pub fn refine(&mut self) {
        let exact = match &mut self.repr {
            Repr::Num(_) => None,
            Repr::Alg { poly, lo, hi } => match bisect_step(poly, lo, hi) {
                BisectStep::Exact(v) => Some(v),
                BisectStep::Narrowed => None,
            },
        };
        if let Some(v) = exact {
            let is_root = self.is_root;
            *self = Ran::new_numeric(v, is_root);
        }
    }

    /// Refines until the isolating interval is narrower than `width`.
    pub fn refine_below(&mut self, width: &Rational) {
        loop {
            let wide = match &self.repr {
                Repr::Num(_) => return,
                Repr::Alg { lo, hi, .. } => &(hi - lo) >= width,
            };
            if !wide {
                return;
            }
            self.refine();
        }
    }

    /// Exact position of this number relative to a rational.
    pub fn cmp_rational(&self, q: &Rational) -> Ordering {
        match &self.repr {
            Repr::Num(v) => v.cmp(q),
            Repr::Alg { poly, lo, hi } => {
                if q <= lo {
                    return Ordering::Greater;
                }
                if q >= hi {
                    return Ordering::Less;
                }
                if poly.eval(q).is_zero() {
                    return Ordering::Equal;
                }
                let (mut lo, mut hi) = (lo.clone(), hi.clone());
                loop {
                    match bisect_step(poly, &mut lo, &mut hi) {
                        BisectStep::Exact(v) => return v.cmp(q),
                        BisectStep::Narrowed => {}
                    }
                    if q <= &lo {
                        return Ordering::Greater;
                    }
                    if q >= &hi {
                        return Ordering::Less;
                    }
                }
            }
        }
    }

    /// Total order on values. Representations play no role: a numeric and an
    /// interval representation of the same real compare equal.
    pub fn compare(&self, other: &Ran) -> Ordering {
        match (&self.repr, &other.repr) {
            (Repr::Num(a), Repr::Num(b)) => a.cmp(b),
            (Repr::Num(q), Repr::Alg { .. }) => other.cmp_rational(q).reverse(),
            (Repr::Alg { .. }, Repr::Num(q)) => self.cmp_rational(q),
            (
                Repr::Alg {
                    poly: p1,
                    lo: l1,
                    hi: h1,
                },
                Repr::Alg {
                    poly: p2,
                    lo: l2,
                    hi: h2,
                },
            ) => compare_algebraic(p1, l1, h1, p2, l2, h2),
        }
    }

    /// Whether the value is an integer. Exact, via local refinement.
    pub fn is_integral(&self) -> bool {
        match &self.repr {
            Repr::Num(v) => v.is_integer(),
            Repr::Alg { poly, lo, hi } => {
                integral_value(poly, &mut lo.clone(), &mut hi.clone()).is_some()
            }
        }
    }

    pub fn floor(&self) -> BigInt {
        match &self.repr {
            Repr::Num(v) => floor_int(v),
            Repr::Alg { poly, lo, hi } => {
                let (mut lo, mut hi) = (lo.clone(), hi.clone());
                if let Some(m) = integral_value(poly, &mut lo, &mut hi) {
                    return m;
                }
                loop {
                    if floor_int(&lo) == floor_int(&hi) {
                        return floor_int(&lo);
                    }
                    match bisect_step(poly, &mut lo, &mut hi) {
                        BisectStep::Exact(v) => return floor_int(&v),
                        BisectStep::Narrowed => {}
                    }
                }
            }
        }
    }

    pub fn ceil(&self) -> BigInt {
        let f = self.floor();
        if self.is_integral() {
            f
        } else {
            f + BigInt::one()
        }
    }

    /// Tries to find a numeric representation for an interval-represented
    /// value; returns true if the representation changed. With `fast`, only
    /// checks already obvious candidates and does not refine.
    pub fn try_simplify(&mut self, fast: bool) -> bool {
        let is_root = self.is_root;
        let promoted = match &self.repr {
            Repr::Num(_) => return false,
            // Degree <= 2 collapses at construction; the remaining chances
            // are an integer value or a lucky bisection hit.
            Repr::Alg { poly, lo, hi } => integral_value(poly, &mut lo.clone(), &mut hi.clone()),
        };
        if let Some(m) = promoted {
            *self = Ran::new_numeric(Rational::from_integer(m), is_root);
            return true;
        }
        if !fast {
            for _ in 0..4 {
                self.refine();
                if self.is_numeric() {
                    return true;
                }
            }
        }
        false
    }

    /// Exact containment in a bound interval.
    pub fn is_within(&self, iv: &Interval) -> bool {
        if let Some((lo, kind)) = iv.lower() {
            match self.cmp_rational(lo) {
                Ordering::Less => return false,
                Ordering::Equal if kind == BoundKind::Strict => return false,
                _ => {}
            }
        }
        if let Some((hi, kind)) = iv.upper() {
            match self.cmp_rational(hi) {
                Ordering::Greater => return false,
                Ordering::Equal if kind == BoundKind::Strict => return false,
                _ => {}
            }
        }
        true
    }
}

/// Exact sign of a rational polynomial evaluated at an algebraic number.
pub fn qpoly_sign_at(q: &QPoly, r: &Ran) -> Sign {
    match &r.repr {
        Repr::Num(v) => q.sign_at(v),
        Repr::Alg { poly, lo, hi } => {
            // If q shares the root with the defining polynomial, the value is
            // exactly zero.
            let g = q.gcd(poly);
            if g.degree_plus_one() > 1 && has_root_strictly_inside(&g, lo, hi) {
                return Sign::Zero;
            }
            let (mut lo, mut hi) = (lo.clone(), hi.clone());
            loop {
                let e = q.eval_enclosure(&Enclosure::new(lo.clone(), hi.clone()));
                if let Some(s) = e.sign() {
                    return s;
                }
                match bisect_step(poly, &mut lo, &mut hi) {
                    BisectStep::Exact(v) => return q.sign_at(&v),
                    BisectStep::Narrowed => {}
                }
            }
        }
    }
}

fn has_root_strictly_inside(g: &QPoly, lo: &Rational, hi: &Rational) -> bool {
    // Callers only pass divisors of isolating-interval polynomials, so the
    // endpoints are never roots of g.
    debug_assert!(!g.eval(lo).is_zero() && !g.eval(hi).is_zero());
    let seq = g.squarefree_part().sturm_sequence();
    crate::qpoly::count_roots_half_open(&seq, lo, hi) > 0
}

enum BisectStep {
    /// The midpoint was the root; the exact value is returned.
    Exact(Rational),
    /// The interval was halved in place.
    Narrowed,
}

fn bisect_step(poly: &QPoly, lo: &mut Rational, hi: &mut Rational) -> BisectStep {
    let m = (&*lo + &*hi) / Rational::from_integer(BigInt::from(2));
    if poly.eval(&m).is_zero() {
        return BisectStep::Exact(m);
    }
    if poly.sign_at(lo) != poly.sign_at(&m) {
        *hi = m;
    } else {
        *lo = m;
    }
    BisectStep::Narrowed
}

/// If the unique root of `poly` in `(lo, hi)` is an integer, returns it.
fn integral_value(poly: &QPoly, lo: &mut Rational, hi: &mut Rational) -> Option<BigInt> {
    loop {
        if &*hi - &*lo < Rational::one() {
            let m = floor_int(lo) + BigInt::one();
            let mr = Rational::from_integer(m.clone());
            if mr > *lo && mr < *hi && poly.eval(&mr).is_zero() {
                return Some(m);
            }
            return None;
        }
        match bisect_step(poly, lo, hi) {
            BisectStep::Exact(v) => {
                return if v.is_integer() {
                    Some(v.to_integer())
                } else {
                    None
                }
            }
            BisectStep::Narrowed => {}
        }
    }
}

fn compare_algebraic(
    p1: &QPoly,
    l1: &Rational,
    h1: &Rational,
    p2: &QPoly,
    l2: &Rational,
    h2: &Rational,
) -> Ordering {
    if h1 <= l2 {
        return Ordering::Less;
    }
    if h2 <= l1 {
        return Ordering::Greater;
    }
    // Overlapping intervals: decide equality via a shared root of the gcd
    // strictly inside both intervals.
    let g = p1.gcd(p2);
    if g.degree_plus_one() > 1 {
        let olo = if l1 > l2 { l1 } else { l2 };
        let ohi = if h1 < h2 { h1 } else { h2 };
        if olo < ohi && has_root_strictly_inside(&g, olo, ohi) {
            return Ordering::Equal;
        }
    }
    // Distinct values: refine both until the intervals separate.
    let (mut a_lo, mut a_hi) = (l1.clone(), h1.clone());
    let (mut b_lo, mut b_hi) = (l2.clone(), h2.clone());
    loop {
        if a_hi <= b_lo {
            return Ordering::Less;
        }
        if b_hi <= a_lo {
            return Ordering::Greater;
        }
        let a_exact = match bisect_step(p1, &mut a_lo, &mut a_hi) {
            BisectStep::Exact(v) => Some(v),
            BisectStep::Narrowed => None,
        };
        let b_exact = match bisect_step(p2, &mut b_lo, &mut b_hi) {
            BisectStep::Exact(v) => Some(v),
            BisectStep::Narrowed => None,
        };
        match (a_exact, b_exact) {
            (Some(a), Some(b)) => return a.cmp(&b),
            (Some(a), None) => {
                let b = Ran {
                    repr: Repr::Alg {
                        poly: p2.clone(),
                        lo: b_lo,
                        hi: b_hi,
                    },
                    is_root: false,
                };
                return b.cmp_rational(&a).reverse();
            }
            (None, Some(b)) => {
                let a = Ran {
                    repr: Repr::Alg {
                        poly: p1.clone(),
                        lo: a_lo,
                        hi: a_hi,
                    },
                    is_root: false,
                };
                return a.cmp_rational(&b);
            }
            (None, None) => {}
        }
    }
}

impl PartialEq for Ran {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Ran {}

impl PartialOrd for Ran {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for Ran {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Display for Ran {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Num(v) => write!(f, "{v}"),
            Repr::Alg { poly, lo, hi } => {
                write!(f, "root of {} in ({lo}, {hi})", poly.display())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num_util::{int, rat};

    fn sqrt2() -> Ran {
        Ran::new_algebraic(QPoly::from_i64(&[-2, 0, 1]), int(1), int(2), true)
    }

    fn neg_sqrt2() -> Ran {
        Ran::new_algebraic(QPoly::from_i64(&[-2, 0, 1]), int(-2), int(-1), true)
    }

    #[test]
    fn ordering_mixed_representations() {
        let a = sqrt2();
        let b = neg_sqrt2();
        assert!(b < a);
        assert!(Ran::new_numeric(int(1), false) < a);
        assert!(a < Ran::new_numeric(int(2), false));
        assert!(a < Ran::new_numeric(rat(3, 2), false));
        assert_eq!(a, sqrt2());
    }

    #[test]
    fn equality_across_defining_polynomials() {
        // x^2 - 2 and (x^2 - 2)(x + 5) / normalization both isolate sqrt(2).
        let p = &QPoly::from_i64(&[-2, 0, 1]) * &QPoly::from_i64(&[5, 1]);
        let other = Ran::new_algebraic(p, int(1), rat(3, 2), true);
        assert_eq!(sqrt2(), other);
    }

    #[test]
    fn integrality_and_floor() {
        assert!(Ran::new_numeric(int(3), false).is_integral());
        assert!(!Ran::new_numeric(rat(1, 2), false).is_integral());
        let s = sqrt2();
        assert!(!s.is_integral());
        assert_eq!(s.floor(), 1.into());
        assert_eq!(s.ceil(), 2.into());
        assert_eq!(neg_sqrt2().floor(), (-2).into());
    }

    #[test]
    fn quadratic_rationals_collapse_to_numeric() {
        // x^2 - 9/4 has the rational root 3/2.
        let r = Ran::new_algebraic(
            QPoly::new(vec![rat(-9, 4), int(0), int(1)]),
            int(1),
            int(2),
            true,
        );
        assert!(r.is_numeric());
        assert_eq!(r.value().unwrap(), &rat(3, 2));
    }

    #[test]
    fn refinement_shrinks_the_interval() {
        let mut s = sqrt2();
        s.refine_below(&rat(1, 1000));
        if let Some((lo, hi)) = s.isolating_interval() {
            assert!(&(hi - lo) < &rat(1, 1000));
        } else {
            panic!("sqrt(2) must stay irrational");
        }
        assert_eq!(s, sqrt2());
    }

    #[test]
    fn sign_of_polynomial_at_ran() {
        let s = sqrt2();
        // x^2 - 2 vanishes at sqrt(2).
        assert_eq!(qpoly_sign_at(&QPoly::from_i64(&[-2, 0, 1]), &s), Sign::Zero);
        // x - 1 is positive there.
        assert_eq!(
            qpoly_sign_at(&QPoly::from_i64(&[-1, 1]), &s),
            Sign::Positive
        );
        // x - 2 is negative there.
        assert_eq!(
            qpoly_sign_at(&QPoly::from_i64(&[-2, 1]), &s),
            Sign::Negative
        );
    }

    #[test]
    fn containment_in_bounds() {
        let s = sqrt2();
        assert!(s.is_within(&Interval::open(int(1), int(2))));
        assert!(!s.is_within(&Interval::open(int(2), int(3))));
        assert!(s.is_within(&Interval::unbounded()));
    }
}
