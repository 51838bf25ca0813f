//! Dense univariate polynomials over the rationals, in coefficient form.
//!
//! This is the representation real root isolation works on; every univariate
//! specialization of a projection polynomial ends up here.

use core::cmp::max;
use core::fmt;
use core::ops::{Add, Mul, Neg, Sub};

use num::{BigInt, Integer, One, Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::interval::Enclosure;
use crate::num_util::bitsize;
use crate::{Rational, Sign};

/// A univariate polynomial with rational coefficients, in ascending
/// coefficient order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QPoly {
    pub coeffs: Vec<Rational>,
}

impl QPoly {
    pub fn new(coeffs: Vec<Rational>) -> Self {
        QPoly { coeffs }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn constant(c: Rational) -> Self {
        Self::new(vec![c])
    }

    pub fn one() -> Self {
        Self::constant(Rational::one())
    }

    /// `x - r`.
    pub fn linear_root(r: &Rational) -> Self {
        Self::new(vec![-r.clone(), Rational::one()])
    }

    /// Convenience constructor from integer coefficients, ascending.
    pub fn from_i64(coeffs: &[i64]) -> Self {
        Self::new(
            coeffs
                .iter()
                .map(|&c| Rational::from_integer(BigInt::from(c)))
                .collect(),
        )
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|c| c.is_zero())
    }

    /// The number of coefficients stored; not necessarily related to the
    /// degree.
    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    /// Degree of the polynomial + 1, or 0 for a polynomial with no non-zero
    /// coefficients.
    pub fn degree_plus_one(&self) -> usize {
        (0..self.len())
            .rev()
            .find(|&i| !self.coeffs[i].is_zero())
            .map_or(0, |i| i + 1)
    }

    pub fn degree(&self) -> usize {
        self.degree_plus_one()
            .checked_sub(1)
            .expect("deg(0) is undefined")
    }

    /// Leading coefficient.
    pub fn lead(&self) -> Rational {
        self.coeffs
            .iter()
            .rev()
            .find(|c| !c.is_zero())
            .cloned()
            .unwrap_or_else(Rational::zero)
    }

    /// Removes any leading zero coefficients.
    pub fn trim(&mut self) {
        self.coeffs.truncate(self.degree_plus_one());
    }

    /// Removes any leading zero coefficients.
    pub fn trimmed(&self) -> Self {
        let coeffs = self.coeffs[..self.degree_plus_one()].to_vec();
        Self { coeffs }
    }

    pub fn eval(&self, x: &Rational) -> Rational {
        self.coeffs
            .iter()
            .rev()
            .fold(Rational::zero(), |acc, c| acc * x + c)
    }

    pub fn sign_at(&self, x: &Rational) -> Sign {
        Sign::of(&self.eval(x))
    }

    /// Horner evaluation in interval arithmetic; the result encloses the
    /// image of the input enclosure.
    pub fn eval_enclosure(&self, x: &Enclosure) -> Enclosure {
        self.coeffs
            .iter()
            .rev()
            .fold(Enclosure::point(Rational::zero()), |acc, c| {
                let mut next = acc.mul(x);
                next.lo = &next.lo + c;
                next.hi = &next.hi + c;
                next
            })
    }

    pub fn derivative(&self) -> Self {
        if self.coeffs.len() <= 1 {
            return Self::empty();
        }
        let coeffs = self.coeffs[1..]
            .iter()
            .enumerate()
            .map(|(i, c)| c * Rational::from_integer(BigInt::from(i as u64 + 1)))
            .collect();
        Self::new(coeffs)
    }

    pub fn scale(&self, r: &Rational) -> Self {
        Self::new(self.coeffs.iter().map(|c| c * r).collect())
    }

    /// Divides by the leading coefficient.
    pub fn monic(&self) -> Self {
        let lead = self.lead();
        if lead.is_zero() || lead.is_one() {
            return self.trimmed();
        }
        self.scale(&lead.recip()).trimmed()
    }

    /// Long division; returns `(quotient, remainder)` with
    /// `deg(remainder) < deg(divisor)`.
    pub fn div_rem(&self, divisor: &Self) -> (Self, Self) {
        let b = divisor.trimmed();
        assert!(!b.is_zero(), "division by the zero polynomial");
        let mut rem = self.trimmed();
        let db = b.len() - 1;
        if rem.len() <= db {
            return (Self::empty(), rem);
        }
        let mut quot = vec![Rational::zero(); rem.len() - db];
        let lead_inv = b.coeffs[db].clone().recip();
        while rem.degree_plus_one() > db {
            let dr = rem.degree_plus_one() - 1;
            let q = &rem.coeffs[dr] * &lead_inv;
            for (i, bc) in b.coeffs.iter().enumerate() {
                rem.coeffs[dr - db + i] -= &q * bc;
            }
            quot[dr - db] = q;
            rem.trim();
        }
        (Self::new(quot), rem)
    }

    /// The monic greatest common divisor.
    pub fn gcd(&self, other: &Self) -> Self {
        let mut a = self.trimmed();
        let mut b = other.trimmed();
        while !b.is_zero() {
            let (_, r) = a.div_rem(&b);
            a = b;
            b = r;
        }
        a.monic()
    }

    /// The square-free part, normalized to coprime integer coefficients with
    /// a positive leading coefficient.
    pub fn squarefree_part(&self) -> Self {
        let p = self.trimmed();
        if p.degree_plus_one() <= 1 {
            return p.normalized();
        }
        let g = p.gcd(&p.derivative());
        if g.degree_plus_one() <= 1 {
            return p.normalized();
        }
        let (q, r) = p.div_rem(&g);
        debug_assert!(r.is_zero());
        q.normalized()
    }

    /// Scales to coprime integer coefficients with a positive leading
    /// coefficient. The root set is unchanged.
    pub fn normalized(&self) -> Self {
        let p = self.trimmed();
        if p.is_zero() {
            return p;
        }
        let mut denom_lcm = BigInt::one();
        let mut numer_gcd = BigInt::zero();
        for c in &p.coeffs {
            denom_lcm = denom_lcm.lcm(c.denom());
            numer_gcd = numer_gcd.gcd(c.numer());
        }
        let mut factor = Rational::new(denom_lcm, numer_gcd);
        if p.lead().is_negative() {
            factor = -factor;
        }
        p.scale(&factor)
    }

    /// Total bit-size of all coefficients.
    pub fn bitsize(&self) -> u64 {
        self.coeffs.iter().map(bitsize).sum()
    }

    /// `1 + max |a_i / a_n|`; every real root lies strictly inside
    /// `(-bound, bound)`.
    pub fn cauchy_bound(&self) -> Rational {
        let p = self.trimmed();
        let lead = p.lead();
        let mut best = Rational::zero();
        for c in &p.coeffs[..p.len().saturating_sub(1)] {
            let ratio = (c / &lead).abs();
            if ratio > best {
                best = ratio;
            }
        }
        best + Rational::one()
    }

    /// The Sturm sequence `p, p', -rem(...), ...`; used for exact root
    /// counting.
    pub fn sturm_sequence(&self) -> Vec<Self> {
        let mut seq = vec![self.trimmed(), self.derivative().trimmed()];
        loop {
            let n = seq.len();
            if seq[n - 1].is_zero() {
                seq.pop();
                return seq;
            }
            let (_, r) = seq[n - 2].div_rem(&seq[n - 1]);
            if r.is_zero() {
                return seq;
            }
            seq.push(-&r);
        }
    }

    /// Rational roots of polynomials of degree at most two, in increasing
    /// order. Higher degrees return `None` (undetermined, not "no roots").
    pub fn rational_roots_small(&self) -> Option<Vec<Rational>> {
        let p = self.trimmed();
        match p.degree_plus_one() {
            0 | 1 => Some(Vec::new()),
            2 => Some(vec![-&p.coeffs[0] / &p.coeffs[1]]),
            3 => {
                let (c, b, a) = (&p.coeffs[0], &p.coeffs[1], &p.coeffs[2]);
                let disc = b * b - Rational::from_integer(BigInt::from(4)) * a * c;
                if disc.is_negative() {
                    return Some(Vec::new());
                }
                let Some(sqrt) = rational_sqrt(&disc) else {
                    // Irrational square root: both roots are irrational.
                    return Some(Vec::new());
                };
                let two_a = Rational::from_integer(BigInt::from(2)) * a;
                let mut roots = vec![(-b - &sqrt) / &two_a, (-b + &sqrt) / &two_a];
                roots.sort();
                roots.dedup();
                Some(roots)
            }
            _ => None,
        }
    }

    pub fn display(&self) -> QPolyDisplay<'_> {
        QPolyDisplay(self)
    }
}

/// The exact rational square root, if one exists.
fn rational_sqrt(r: &Rational) -> Option<Rational> {
    use num::integer::Roots;
    if r.is_negative() {
        return None;
    }
    let ns = r.numer().sqrt();
    let ds = r.denom().sqrt();
    if &(&ns * &ns) == r.numer() && &(&ds * &ds) == r.denom() {
        Some(Rational::new(ns, ds))
    } else {
        None
    }
}

/// Signs of a Sturm sequence evaluated at `x`, counted for variations.
pub fn sign_variations_at(seq: &[QPoly], x: &Rational) -> usize {
    count_variations(seq.iter().map(|p| p.sign_at(x)))
}

/// Sign variations of a Sturm sequence at `-oo` (`neg = true`) or `+oo`.
pub fn sign_variations_at_infinity(seq: &[QPoly], neg: bool) -> usize {
    count_variations(seq.iter().map(|p| {
        let lead_sign = Sign::of(&p.lead());
        if neg && p.degree_plus_one() % 2 == 0 && p.degree_plus_one() > 0 {
            -lead_sign
        } else {
            lead_sign
        }
    }))
}

fn count_variations(signs: impl Iterator<Item = Sign>) -> usize {
    let mut count = 0;
    let mut last: Option<Sign> = None;
    for s in signs {
        if s == Sign::Zero {
            continue;
        }
        if let Some(prev) = last {
            if prev != s {
                count += 1;
            }
        }
        last = Some(s);
    }
    count
}

/// Number of distinct real roots in `(lo, hi]`; requires `p(lo) != 0`.
pub fn count_roots_half_open(seq: &[QPoly], lo: &Rational, hi: &Rational) -> usize {
    sign_variations_at(seq, lo).saturating_sub(sign_variations_at(seq, hi))
}

impl PartialEq for QPoly {
    fn eq(&self, other: &Self) -> bool {
        let max_terms = self.coeffs.len().max(other.coeffs.len());
        for i in 0..max_terms {
            let a = self.coeffs.get(i).cloned().unwrap_or_else(Rational::zero);
            let b = other.coeffs.get(i).cloned().unwrap_or_else(Rational::zero);
            if a != b {
                return false;
            }
        }
        true
    }
}

impl Eq for QPoly {}

impl From<Vec<Rational>> for QPoly {
    fn from(coeffs: Vec<Rational>) -> Self {
        Self::new(coeffs)
    }
}

impl Add for &QPoly {
    type Output = QPoly;

    fn add(self, rhs: Self) -> QPoly {
        let len = max(self.len(), rhs.len());
        let mut coeffs = vec![Rational::zero(); len];
        for (i, c) in self.coeffs.iter().enumerate() {
            coeffs[i] += c;
        }
        for (i, c) in rhs.coeffs.iter().enumerate() {
            coeffs[i] += c;
        }
        QPoly::new(coeffs)
    }
}

impl Sub for &QPoly {
    type Output = QPoly;

    fn sub(self, rhs: Self) -> QPoly {
        let len = max(self.len(), rhs.len());
        let mut coeffs = vec![Rational::zero(); len];
        for (i, c) in self.coeffs.iter().enumerate() {
            coeffs[i] += c;
        }
        for (i, c) in rhs.coeffs.iter().enumerate() {
            coeffs[i] -= c;
        }
        QPoly::new(coeffs)
    }
}

impl Neg for &QPoly {
    type Output = QPoly;

    fn neg(self) -> QPoly {
        QPoly::new(self.coeffs.iter().map(|c| -c).collect())
    }
}

impl Mul for &QPoly {
    type Output = QPoly;

    fn mul(self, rhs: Self) -> QPoly {
        let a = self.trimmed();
        let b = rhs.trimmed();
        if a.is_zero() || b.is_zero() {
            return QPoly::empty();
        }
        let mut coeffs = vec![Rational::zero(); a.len() + b.len() - 1];
        for (i, ca) in a.coeffs.iter().enumerate() {
            for (j, cb) in b.coeffs.iter().enumerate() {
                coeffs[i + j] += ca * cb;
            }
        }
        QPoly::new(coeffs)
    }
}

pub struct QPolyDisplay<'a>(&'a QPoly);

impl fmt::Display for QPolyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.0.trimmed();
        if p.is_zero() {
            return write!(f, "0");
        }
        let mut first = true;
        for (i, c) in p.coeffs.iter().enumerate().rev() {
            if c.is_zero() {
                continue;
            }
            if !first {
                write!(f, " {} ", if c.is_negative() { "-" } else { "+" })?;
            } else if c.is_negative() {
                write!(f, "-")?;
            }
            first = false;
            let a = c.abs();
            match i {
                0 => write!(f, "{a}")?,
                _ => {
                    if !a.is_one() {
                        write!(f, "{a}*")?;
                    }
                    if i == 1 {
                        write!(f, "t")?;
                    } else {
                        write!(f, "t^{i}")?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::num_util::{int, rat};

    fn rand_poly(rng: &mut StdRng, deg: usize) -> QPoly {
        QPoly::new(
            (0..=deg)
                .map(|_| rat(rng.gen_range(-9..=9), rng.gen_range(1..=4)))
                .collect(),
        )
    }

    #[test]
    fn test_trimmed() {
        assert_eq!(QPoly::new(vec![]).trimmed(), QPoly::new(vec![]));
        assert_eq!(QPoly::from_i64(&[0]).trimmed(), QPoly::new(vec![]));
        assert_eq!(
            QPoly::from_i64(&[1, 2, 0, 0]).trimmed(),
            QPoly::from_i64(&[1, 2])
        );
    }

    #[test]
    fn test_division() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let a_deg = rng.gen_range(1..8);
            let a = rand_poly(&mut rng, a_deg);
            let b_deg = rng.gen_range(1..8);
            let b = rand_poly(&mut rng, b_deg);
            if b.is_zero() {
                continue;
            }
            let (q, r) = a.div_rem(&b);
            for _ in 0..8 {
                let x = rat(rng.gen_range(-20..20), rng.gen_range(1..5));
                assert_eq!(a.eval(&x), b.eval(&x) * q.eval(&x) + r.eval(&x));
            }
            assert!(r.degree_plus_one() <= b.degree());
        }
    }

    #[test]
    fn test_gcd() {
        // (x - 1)(x + 2) and (x - 1)(x - 3) share x - 1.
        let a = &QPoly::from_i64(&[-1, 1]) * &QPoly::from_i64(&[2, 1]);
        let b = &QPoly::from_i64(&[-1, 1]) * &QPoly::from_i64(&[-3, 1]);
        assert_eq!(a.gcd(&b), QPoly::from_i64(&[-1, 1]));
        // Coprime polynomials have gcd 1.
        let c = QPoly::from_i64(&[1, 0, 1]);
        assert_eq!(a.gcd(&c).degree_plus_one(), 1);
    }

    #[test]
    fn test_squarefree_part() {
        // (x - 1)^2 (x + 1) -> (x - 1)(x + 1) = x^2 - 1.
        let sq = &QPoly::from_i64(&[-1, 1]) * &QPoly::from_i64(&[-1, 1]);
        let p = &sq * &QPoly::from_i64(&[1, 1]);
        assert_eq!(p.squarefree_part(), QPoly::from_i64(&[-1, 0, 1]));
    }

    #[test]
    fn test_normalized() {
        let p = QPoly::new(vec![rat(1, 2), rat(-3, 4)]);
        let n = p.normalized();
        assert_eq!(n, QPoly::from_i64(&[-2, 3]).normalized());
        assert!(n.lead().is_positive() || n.is_zero());
    }

    #[test]
    fn test_sturm_root_count() {
        // x^2 - 2 has two real roots, one in (1, 2].
        let p = QPoly::from_i64(&[-2, 0, 1]);
        let seq = p.sturm_sequence();
        assert_eq!(
            sign_variations_at_infinity(&seq, true) - sign_variations_at_infinity(&seq, false),
            2
        );
        assert_eq!(count_roots_half_open(&seq, &int(1), &int(2)), 1);
        assert_eq!(count_roots_half_open(&seq, &int(2), &int(3)), 0);
    }

    #[test]
    fn test_rational_roots_small() {
        let p = QPoly::from_i64(&[-6, 1, 1]); // (x + 3)(x - 2)
        assert_eq!(
            p.rational_roots_small().unwrap(),
            vec![int(-3), int(2)]
        );
        let irr = QPoly::from_i64(&[-2, 0, 1]);
        assert_eq!(irr.rational_roots_small().unwrap(), Vec::<Rational>::new());
    }

    #[test]
    fn test_cauchy_bound_contains_roots() {
        let p = QPoly::from_i64(&[-6, 1, 1]);
        let b = p.cauchy_bound();
        assert!(b > int(3));
    }
}
