//! Rational intervals: variable bounds with open/closed/infinite endpoints,
//! and finite closed enclosures used for interval-arithmetic refinement.

use core::fmt;

use num::{One, Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::num_util::{ceil_int, floor_int, simplest_between};
use crate::{Rational, Sign};

/// How an interval endpoint is to be interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundKind {
    /// The endpoint is excluded.
    Strict,
    /// The endpoint is included.
    Weak,
    /// No endpoint; the stored value is ignored.
    Infinite,
}

/// A rational interval used for variable bounds and feasible regions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    lo: Rational,
    lo_kind: BoundKind,
    hi: Rational,
    hi_kind: BoundKind,
}

impl Interval {
    pub fn new(lo: Rational, lo_kind: BoundKind, hi: Rational, hi_kind: BoundKind) -> Self {
        Interval {
            lo,
            lo_kind,
            hi,
            hi_kind,
        }
    }

    /// The whole real line.
    pub fn unbounded() -> Self {
        Interval::new(
            Rational::zero(),
            BoundKind::Infinite,
            Rational::zero(),
            BoundKind::Infinite,
        )
    }

    pub fn open(lo: Rational, hi: Rational) -> Self {
        Interval::new(lo, BoundKind::Strict, hi, BoundKind::Strict)
    }

    pub fn closed(lo: Rational, hi: Rational) -> Self {
        Interval::new(lo, BoundKind::Weak, hi, BoundKind::Weak)
    }

    pub fn point(v: Rational) -> Self {
        Interval::new(v.clone(), BoundKind::Weak, v, BoundKind::Weak)
    }

    /// `(-inf, hi)` or `(-inf, hi]`.
    pub fn below(hi: Rational, hi_kind: BoundKind) -> Self {
        Interval::new(Rational::zero(), BoundKind::Infinite, hi, hi_kind)
    }

    /// `(lo, inf)` or `[lo, inf)`.
    pub fn above(lo: Rational, lo_kind: BoundKind) -> Self {
        Interval::new(lo, lo_kind, Rational::zero(), BoundKind::Infinite)
    }

    pub fn lower(&self) -> Option<(&Rational, BoundKind)> {
        match self.lo_kind {
            BoundKind::Infinite => None,
            k => Some((&self.lo, k)),
        }
    }

    pub fn upper(&self) -> Option<(&Rational, BoundKind)> {
        match self.hi_kind {
            BoundKind::Infinite => None,
            k => Some((&self.hi, k)),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.lo_kind == BoundKind::Infinite && self.hi_kind == BoundKind::Infinite
    }

    pub fn is_empty(&self) -> bool {
        match (self.lower(), self.upper()) {
            (Some((lo, lk)), Some((hi, hk))) => {
                lo > hi || (lo == hi && (lk == BoundKind::Strict || hk == BoundKind::Strict))
            }
            _ => false,
        }
    }

    pub fn contains(&self, v: &Rational) -> bool {
        if let Some((lo, k)) = self.lower() {
            match k {
                BoundKind::Strict if v <= lo => return false,
                BoundKind::Weak if v < lo => return false,
                _ => {}
            }
        }
        if let Some((hi, k)) = self.upper() {
            match k {
                BoundKind::Strict if v >= hi => return false,
                BoundKind::Weak if v > hi => return false,
                _ => {}
            }
        }
        true
    }

    pub fn intersect(&self, other: &Interval) -> Interval {
        let (lo, lo_kind) = tighter_lower(self.lower(), other.lower());
        let (hi, hi_kind) = tighter_upper(self.upper(), other.upper());
        Interval::new(lo, lo_kind, hi, hi_kind)
    }

    /// A rational strictly inside the interval, chosen with small bit-size.
    ///
    /// Finite intervals are sampled by Stern-Brocot search; half-bounded ones
    /// get an integer at distance at most one from the finite endpoint. The
    /// interval must be non-empty and must have a non-empty interior.
    pub fn sample_within(&self) -> Rational {
        debug_assert!(!self.is_empty());
        match (self.lower(), self.upper()) {
            (None, None) => Rational::zero(),
            (Some((lo, _)), None) => Rational::from_integer(ceil_int(lo)) + Rational::one(),
            (None, Some((hi, _))) => Rational::from_integer(floor_int(hi)) - Rational::one(),
            (Some((lo, _)), Some((hi, _))) => {
                debug_assert!(lo < hi, "cannot sample the interior of a point interval");
                simplest_between(lo, hi)
            }
        }
    }
}

fn tighter_lower(
    a: Option<(&Rational, BoundKind)>,
    b: Option<(&Rational, BoundKind)>,
) -> (Rational, BoundKind) {
    match (a, b) {
        (None, None) => (Rational::zero(), BoundKind::Infinite),
        (Some((v, k)), None) | (None, Some((v, k))) => (v.clone(), k),
        (Some((va, ka)), Some((vb, kb))) => {
            if va > vb {
                (va.clone(), ka)
            } else if vb > va {
                (vb.clone(), kb)
            } else {
                let k = if ka == BoundKind::Strict || kb == BoundKind::Strict {
                    BoundKind::Strict
                } else {
                    BoundKind::Weak
                };
                (va.clone(), k)
            }
        }
    }
}

fn tighter_upper(
    a: Option<(&Rational, BoundKind)>,
    b: Option<(&Rational, BoundKind)>,
) -> (Rational, BoundKind) {
    match (a, b) {
        (None, None) => (Rational::zero(), BoundKind::Infinite),
        (Some((v, k)), None) | (None, Some((v, k))) => (v.clone(), k),
        (Some((va, ka)), Some((vb, kb))) => {
            if va < vb {
                (va.clone(), ka)
            } else if vb < va {
                (vb.clone(), kb)
            } else {
                let k = if ka == BoundKind::Strict || kb == BoundKind::Strict {
                    BoundKind::Strict
                } else {
                    BoundKind::Weak
                };
                (va.clone(), k)
            }
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lower() {
            None => write!(f, "(-oo, ")?,
            Some((lo, BoundKind::Strict)) => write!(f, "({lo}, ")?,
            Some((lo, _)) => write!(f, "[{lo}, ")?,
        }
        match self.upper() {
            None => write!(f, "oo)"),
            Some((hi, BoundKind::Strict)) => write!(f, "{hi})"),
            Some((hi, _)) => write!(f, "{hi}]"),
        }
    }
}

/// A finite closed interval `[lo, hi]` used as an outward-rounded enclosure
/// of a real value during refinement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Enclosure {
    pub lo: Rational,
    pub hi: Rational,
}

impl Enclosure {
    pub fn new(lo: Rational, hi: Rational) -> Self {
        debug_assert!(lo <= hi);
        Enclosure { lo, hi }
    }

    pub fn point(v: Rational) -> Self {
        Enclosure {
            lo: v.clone(),
            hi: v,
        }
    }

    pub fn width(&self) -> Rational {
        &self.hi - &self.lo
    }

    pub fn contains_zero(&self) -> bool {
        !self.lo.is_positive() && !self.hi.is_negative()
    }

    /// The sign of every value in the enclosure, if it is uniform.
    pub fn sign(&self) -> Option<Sign> {
        if self.lo.is_positive() {
            Some(Sign::Positive)
        } else if self.hi.is_negative() {
            Some(Sign::Negative)
        } else if self.lo.is_zero() && self.hi.is_zero() {
            Some(Sign::Zero)
        } else {
            None
        }
    }

    pub fn add(&self, other: &Enclosure) -> Enclosure {
        Enclosure {
            lo: &self.lo + &other.lo,
            hi: &self.hi + &other.hi,
        }
    }

    pub fn neg(&self) -> Enclosure {
        Enclosure {
            lo: -self.hi.clone(),
            hi: -self.lo.clone(),
        }
    }

    pub fn mul(&self, other: &Enclosure) -> Enclosure {
        let candidates = [
            &self.lo * &other.lo,
            &self.lo * &other.hi,
            &self.hi * &other.lo,
            &self.hi * &other.hi,
        ];
        let mut lo = candidates[0].clone();
        let mut hi = candidates[0].clone();
        for c in &candidates[1..] {
            if c < &lo {
                lo = c.clone();
            }
            if c > &hi {
                hi = c.clone();
            }
        }
        Enclosure { lo, hi }
    }

    pub fn scale(&self, r: &Rational) -> Enclosure {
        self.mul(&Enclosure::point(r.clone()))
    }

    pub fn pow(&self, k: u32) -> Enclosure {
        let mut acc = Enclosure::point(Rational::one());
        for _ in 0..k {
            acc = acc.mul(self);
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num_util::{int, rat};

    #[test]
    fn containment_respects_bound_kinds() {
        let iv = Interval::open(int(0), int(1));
        assert!(!iv.contains(&int(0)));
        assert!(iv.contains(&rat(1, 2)));
        let iv = Interval::closed(int(0), int(1));
        assert!(iv.contains(&int(0)));
        assert!(iv.contains(&int(1)));
        assert!(!iv.contains(&int(2)));
        assert!(Interval::unbounded().contains(&int(-100)));
    }

    #[test]
    fn intersection_and_emptiness() {
        let a = Interval::open(int(0), int(2));
        let b = Interval::closed(int(1), int(3));
        let c = a.intersect(&b);
        assert!(c.contains(&int(1)));
        assert!(!c.contains(&int(2)));
        assert!(Interval::open(int(1), int(1)).is_empty());
        assert!(!Interval::point(int(1)).is_empty());
        assert!(a.intersect(&Interval::open(int(2), int(3))).is_empty());
    }

    #[test]
    fn sampling_stays_inside() {
        let cases = [
            Interval::open(int(0), int(1)),
            Interval::open(rat(-7, 3), rat(-1, 5)),
            Interval::below(int(-4), BoundKind::Strict),
            Interval::above(rat(9, 2), BoundKind::Strict),
            Interval::unbounded(),
        ];
        for iv in &cases {
            let s = iv.sample_within();
            assert!(iv.contains(&s), "{s} not in {iv}");
        }
    }

    #[test]
    fn enclosure_products() {
        let a = Enclosure::new(int(-1), int(2));
        let sq = a.mul(&a);
        assert_eq!(sq.lo, int(-2));
        assert_eq!(sq.hi, int(4));
        assert!(sq.contains_zero());
        assert_eq!(Enclosure::new(int(1), int(2)).sign(), Some(Sign::Positive));
        assert_eq!(Enclosure::point(int(0)).sign(), Some(Sign::Zero));
        assert_eq!(Enclosure::new(int(-1), int(1)).sign(), None);
    }
}
