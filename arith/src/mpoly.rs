//! Sparse multivariate polynomials over the rationals.

use core::cmp::Ordering;
use core::fmt;
use core::ops::{Add, Mul, Neg, Sub};

use num::{BigInt, Integer, One, Signed, Zero};

use crate::interval::Enclosure;
use crate::upoly::UPoly;
use crate::var::Variable;
use crate::Rational;

pub type Exponent = u32;

/// A power product of variables, kept sorted by variable id with positive
/// exponents only.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Monomial {
    powers: Vec<(Variable, Exponent)>,
}

impl Monomial {
    pub fn one() -> Self {
        Monomial { powers: Vec::new() }
    }

    pub fn var(v: Variable) -> Self {
        Monomial {
            powers: vec![(v, 1)],
        }
    }

    pub fn var_pow(v: Variable, e: Exponent) -> Self {
        if e == 0 {
            Monomial::one()
        } else {
            Monomial {
                powers: vec![(v, e)],
            }
        }
    }

    pub fn is_one(&self) -> bool {
        self.powers.is_empty()
    }

    pub fn powers(&self) -> &[(Variable, Exponent)] {
        &self.powers
    }

    pub fn total_degree(&self) -> u64 {
        self.powers.iter().map(|&(_, e)| e as u64).sum()
    }

    pub fn degree_in(&self, v: Variable) -> Exponent {
        self.powers
            .iter()
            .find(|&&(w, _)| w == v)
            .map_or(0, |&(_, e)| e)
    }

    pub fn contains(&self, v: Variable) -> bool {
        self.degree_in(v) > 0
    }

    pub fn mul(&self, other: &Monomial) -> Monomial {
        let mut powers = Vec::with_capacity(self.powers.len() + other.powers.len());
        let (mut i, mut j) = (0, 0);
        while i < self.powers.len() && j < other.powers.len() {
            let (va, ea) = self.powers[i];
            let (vb, eb) = other.powers[j];
            match va.cmp(&vb) {
                Ordering::Less => {
                    powers.push((va, ea));
                    i += 1;
                }
                Ordering::Greater => {
                    powers.push((vb, eb));
                    j += 1;
                }
                Ordering::Equal => {
                    powers.push((va, ea + eb));
                    i += 1;
                    j += 1;
                }
            }
        }
        powers.extend_from_slice(&self.powers[i..]);
        powers.extend_from_slice(&other.powers[j..]);
        Monomial { powers }
    }

    /// Componentwise division, if `other` divides `self`.
    pub fn try_div(&self, other: &Monomial) -> Option<Monomial> {
        let mut powers = Vec::with_capacity(self.powers.len());
        let mut j = 0;
        for &(v, e) in &self.powers {
            let mut rem = e;
            if j < other.powers.len() && other.powers[j].0 == v {
                let eb = other.powers[j].1;
                if eb > e {
                    return None;
                }
                rem = e - eb;
                j += 1;
            }
            if rem > 0 {
                powers.push((v, rem));
            }
        }
        if j < other.powers.len() {
            return None;
        }
        Some(Monomial { powers })
    }

    /// Drops `v` from the power product, returning the exponent it had.
    fn without(&self, v: Variable) -> (Exponent, Monomial) {
        let mut powers = Vec::with_capacity(self.powers.len());
        let mut e = 0;
        for &(w, ew) in &self.powers {
            if w == v {
                e = ew;
            } else {
                powers.push((w, ew));
            }
        }
        (e, Monomial { powers })
    }

    /// Lexicographic order by exponent vectors, smallest variable id first.
    /// This order is admissible, which monomial division relies on.
    fn cmp_lex(&self, other: &Monomial) -> Ordering {
        let (mut i, mut j) = (0, 0);
        loop {
            match (self.powers.get(i), other.powers.get(j)) {
                (None, None) => return Ordering::Equal,
                (Some(_), None) => return Ordering::Greater,
                (None, Some(_)) => return Ordering::Less,
                (Some(&(va, ea)), Some(&(vb, eb))) => match va.cmp(&vb) {
                    // The side whose next power involves the smaller
                    // variable has a positive exponent where the other has
                    // zero.
                    Ordering::Less => return Ordering::Greater,
                    Ordering::Greater => return Ordering::Less,
                    Ordering::Equal => {
                        if ea != eb {
                            return ea.cmp(&eb);
                        }
                        i += 1;
                        j += 1;
                    }
                },
            }
        }
    }
}

impl PartialOrd for Monomial {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Monomial {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_lex(other)
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_one() {
            return write!(f, "1");
        }
        let mut first = true;
        for &(v, e) in &self.powers {
            if !first {
                write!(f, "*")?;
            }
            first = false;
            if e == 1 {
                write!(f, "{v}")?;
            } else {
                write!(f, "{v}^{e}")?;
            }
        }
        Ok(())
    }
}

/// A multivariate polynomial as a normalized term list: monomials strictly
/// decreasing, coefficients non-zero.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct MPoly {
    terms: Vec<(Monomial, Rational)>,
}

impl MPoly {
    pub fn zero() -> Self {
        MPoly { terms: Vec::new() }
    }

    pub fn one() -> Self {
        Self::constant(Rational::one())
    }

    pub fn constant(c: Rational) -> Self {
        if c.is_zero() {
            Self::zero()
        } else {
            MPoly {
                terms: vec![(Monomial::one(), c)],
            }
        }
    }

    pub fn var(v: Variable) -> Self {
        MPoly {
            terms: vec![(Monomial::var(v), Rational::one())],
        }
    }

    pub fn from_terms(terms: Vec<(Monomial, Rational)>) -> Self {
        let mut terms = terms;
        terms.sort_by(|a, b| b.0.cmp(&a.0));
        let mut out: Vec<(Monomial, Rational)> = Vec::with_capacity(terms.len());
        for (m, c) in terms {
            if let Some(last) = out.last_mut() {
                if last.0 == m {
                    last.1 = &last.1 + &c;
                    continue;
                }
            }
            out.push((m, c));
        }
        out.retain(|(_, c)| !c.is_zero());
        MPoly { terms: out }
    }

    pub fn terms(&self) -> &[(Monomial, Rational)] {
        &self.terms
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_constant(&self) -> bool {
        self.terms.len() <= 1 && self.terms.iter().all(|(m, _)| m.is_one())
    }

    /// The value of a constant polynomial; `None` if variables occur.
    pub fn constant_value(&self) -> Option<Rational> {
        if self.is_zero() {
            return Some(Rational::zero());
        }
        if self.is_constant() {
            return Some(self.terms[0].1.clone());
        }
        None
    }

    pub fn lead_monomial(&self) -> &Monomial {
        &self.terms[0].0
    }

    pub fn lead_coeff(&self) -> &Rational {
        &self.terms[0].1
    }

    /// All variables occurring with a positive exponent, ascending by id.
    pub fn variables(&self) -> Vec<Variable> {
        let mut vars: Vec<Variable> = self
            .terms
            .iter()
            .flat_map(|(m, _)| m.powers().iter().map(|&(v, _)| v))
            .collect();
        vars.sort();
        vars.dedup();
        vars
    }

    pub fn contains_var(&self, v: Variable) -> bool {
        self.terms.iter().any(|(m, _)| m.contains(v))
    }

    pub fn degree_in(&self, v: Variable) -> Exponent {
        self.terms
            .iter()
            .map(|(m, _)| m.degree_in(v))
            .max()
            .unwrap_or(0)
    }

    pub fn total_degree(&self) -> u64 {
        self.terms
            .iter()
            .map(|(m, _)| m.total_degree())
            .max()
            .unwrap_or(0)
    }

    pub fn scale(&self, r: &Rational) -> Self {
        if r.is_zero() {
            return Self::zero();
        }
        MPoly {
            terms: self
                .terms
                .iter()
                .map(|(m, c)| (m.clone(), c * r))
                .collect(),
        }
    }

    pub fn mul_monomial(&self, m: &Monomial, c: &Rational) -> Self {
        if c.is_zero() {
            return Self::zero();
        }
        MPoly {
            terms: self
                .terms
                .iter()
                .map(|(mm, cc)| (mm.mul(m), cc * c))
                .collect(),
        }
    }

    pub fn pow(&self, k: Exponent) -> Self {
        let mut acc = Self::one();
        for _ in 0..k {
            acc = &acc * self;
        }
        acc
    }

    pub fn derivative(&self, v: Variable) -> Self {
        let mut terms = Vec::new();
        for (m, c) in &self.terms {
            let (e, rest) = m.without(v);
            if e == 0 {
                continue;
            }
            let m2 = rest.mul(&Monomial::var_pow(v, e - 1));
            terms.push((m2, c * Rational::from_integer(BigInt::from(e))));
        }
        Self::from_terms(terms)
    }

    /// Substitutes exact rational values for some variables.
    pub fn substitute(&self, assignment: &[(Variable, Rational)]) -> Self {
        if assignment.is_empty() {
            return self.clone();
        }
        let mut terms = Vec::with_capacity(self.terms.len());
        for (m, c) in &self.terms {
            let mut coeff = c.clone();
            let mut rest = Vec::new();
            for &(v, e) in m.powers() {
                if let Some((_, val)) = assignment.iter().find(|&&(w, _)| w == v) {
                    coeff = coeff * pow_rational(val, e);
                } else {
                    rest.push((v, e));
                }
            }
            terms.push((Monomial { powers: rest }, coeff));
        }
        Self::from_terms(terms)
    }

    /// Evaluates fully; `None` if a variable is left unassigned.
    pub fn eval_rational(&self, assignment: &[(Variable, Rational)]) -> Option<Rational> {
        self.substitute(assignment).constant_value()
    }

    /// Interval evaluation; every variable must be assigned an enclosure.
    pub fn eval_enclosure(&self, assignment: &[(Variable, Enclosure)]) -> Enclosure {
        let mut acc = Enclosure::point(Rational::zero());
        for (m, c) in &self.terms {
            let mut t = Enclosure::point(c.clone());
            for &(v, e) in m.powers() {
                let enc = &assignment
                    .iter()
                    .find(|&&(w, _)| w == v)
                    .expect("unassigned variable in enclosure evaluation")
                    .1;
                t = t.mul(&enc.pow(e));
            }
            acc = acc.add(&t);
        }
        acc
    }

    /// Rewrites as a univariate polynomial in `v` with multivariate
    /// coefficients.
    pub fn to_univariate(&self, v: Variable) -> UPoly {
        let deg = self.degree_in(v);
        let mut coeffs = vec![Vec::new(); deg as usize + 1];
        for (m, c) in &self.terms {
            let (e, rest) = m.without(v);
            coeffs[e as usize].push((rest, c.clone()));
        }
        UPoly::new(v, coeffs.into_iter().map(MPoly::from_terms).collect())
    }

    /// The positive rational `c` such that `self / c` has coprime integer
    /// coefficients.
    pub fn content_rational(&self) -> Rational {
        if self.is_zero() {
            return Rational::one();
        }
        let mut denom_lcm = BigInt::one();
        let mut numer_gcd = BigInt::zero();
        for (_, c) in &self.terms {
            denom_lcm = denom_lcm.lcm(c.denom());
            numer_gcd = numer_gcd.gcd(c.numer());
        }
        Rational::new(numer_gcd, denom_lcm)
    }

    /// Divides out the rational content. Signs are preserved everywhere, so
    /// the sign behavior of the polynomial is unchanged.
    pub fn primitive_rational(&self) -> Self {
        let c = self.content_rational();
        if c.is_zero() || c.is_one() {
            return self.clone();
        }
        self.scale(&c.recip())
    }

    /// Exact multivariate division; `None` if `d` does not divide `self`.
    pub fn div_exact(&self, d: &MPoly) -> Option<MPoly> {
        assert!(!d.is_zero(), "division by the zero polynomial");
        let mut rem = self.clone();
        let mut quot: Vec<(Monomial, Rational)> = Vec::new();
        while !rem.is_zero() {
            let qm = rem.lead_monomial().try_div(d.lead_monomial())?;
            let qc = rem.lead_coeff() / d.lead_coeff();
            rem = &rem - &d.mul_monomial(&qm, &qc);
            quot.push((qm, qc));
        }
        Some(MPoly::from_terms(quot))
    }

    /// Conservative sign analysis used by the does-not-vanish test.
    pub fn definiteness(&self) -> Definiteness {
        if self.is_zero() {
            return Definiteness::Unknown;
        }
        let all_even = self
            .terms
            .iter()
            .all(|(m, _)| m.powers().iter().all(|&(_, e)| e % 2 == 0));
        if !all_even {
            return Definiteness::Unknown;
        }
        let has_pos_const = self
            .terms
            .iter()
            .any(|(m, c)| m.is_one() && c.is_positive());
        let has_neg_const = self
            .terms
            .iter()
            .any(|(m, c)| m.is_one() && c.is_negative());
        if self.terms.iter().all(|(_, c)| c.is_positive()) {
            return if has_pos_const {
                Definiteness::Positive
            } else {
                Definiteness::NonNegative
            };
        }
        if self.terms.iter().all(|(_, c)| c.is_negative()) {
            return if has_neg_const {
                Definiteness::Negative
            } else {
                Definiteness::NonPositive
            };
        }
        Definiteness::Unknown
    }

    /// True only if the polynomial provably has no zero anywhere: a non-zero
    /// constant, or definitely positive/negative.
    pub fn does_not_vanish(&self) -> bool {
        if self.is_zero() {
            return false;
        }
        if let Some(c) = self.constant_value() {
            return !c.is_zero();
        }
        matches!(
            self.definiteness(),
            Definiteness::Positive | Definiteness::Negative
        )
    }
}

/// Outcome of the conservative sign analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Definiteness {
    Positive,
    NonNegative,
    Negative,
    NonPositive,
    Unknown,
}

fn pow_rational(base: &Rational, e: Exponent) -> Rational {
    let mut acc = Rational::one();
    for _ in 0..e {
        acc = acc * base;
    }
    acc
}

impl Add for &MPoly {
    type Output = MPoly;

    fn add(self, rhs: Self) -> MPoly {
        let mut terms = Vec::with_capacity(self.terms.len() + rhs.terms.len());
        terms.extend(self.terms.iter().cloned());
        terms.extend(rhs.terms.iter().cloned());
        MPoly::from_terms(terms)
    }
}

impl Sub for &MPoly {
    type Output = MPoly;

    fn sub(self, rhs: Self) -> MPoly {
        let mut terms = Vec::with_capacity(self.terms.len() + rhs.terms.len());
        terms.extend(self.terms.iter().cloned());
        terms.extend(rhs.terms.iter().map(|(m, c)| (m.clone(), -c)));
        MPoly::from_terms(terms)
    }
}

impl Neg for &MPoly {
    type Output = MPoly;

    fn neg(self) -> MPoly {
        MPoly {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), -c)).collect(),
        }
    }
}

impl Mul for &MPoly {
    type Output = MPoly;

    fn mul(self, rhs: Self) -> MPoly {
        let mut terms = Vec::with_capacity(self.terms.len() * rhs.terms.len());
        for (ma, ca) in &self.terms {
            for (mb, cb) in &rhs.terms {
                terms.push((ma.mul(mb), ca * cb));
            }
        }
        MPoly::from_terms(terms)
    }
}

impl fmt::Display for MPoly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let mut first = true;
        for (m, c) in &self.terms {
            if !first {
                write!(f, " {} ", if c.is_negative() { "-" } else { "+" })?;
            } else if c.is_negative() {
                write!(f, "-")?;
            }
            first = false;
            let a = c.abs();
            if m.is_one() {
                write!(f, "{a}")?;
            } else if a.is_one() {
                write!(f, "{m}")?;
            } else {
                write!(f, "{a}*{m}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num_util::{int, rat};

    fn x() -> Variable {
        Variable::real(0)
    }
    fn y() -> Variable {
        Variable::real(1)
    }

    /// x^2 + y^2 - 1
    fn circle() -> MPoly {
        let px = MPoly::var(x());
        let py = MPoly::var(y());
        &(&(&px * &px) + &(&py * &py)) - &MPoly::one()
    }

    #[test]
    fn arithmetic_normalizes() {
        let p = circle();
        assert_eq!(p.total_degree(), 2);
        assert_eq!(p.degree_in(x()), 2);
        let q = &p - &p;
        assert!(q.is_zero());
        let doubled = &p + &p;
        assert_eq!(doubled, p.scale(&int(2)));
    }

    #[test]
    fn substitution_and_evaluation() {
        let p = circle();
        let on_circle = p.eval_rational(&[(x(), int(1)), (y(), int(0))]).unwrap();
        assert!(on_circle.is_zero());
        let partial = p.substitute(&[(x(), rat(1, 2))]);
        assert_eq!(partial.variables(), vec![y()]);
        assert_eq!(
            partial.eval_rational(&[(y(), int(0))]).unwrap(),
            rat(-3, 4)
        );
    }

    #[test]
    fn univariate_view_roundtrip() {
        let p = circle();
        let up = p.to_univariate(x());
        assert_eq!(up.degree(), 2);
        assert_eq!(up.to_mpoly(), p);
        // Coefficient of x^0 is y^2 - 1.
        let c0 = up.coeff(0);
        assert_eq!(c0.degree_in(y()), 2);
    }

    #[test]
    fn exact_division() {
        let p = circle();
        let q = &p * &p;
        assert_eq!(q.div_exact(&p), Some(p.clone()));
        let off = &q + &MPoly::one();
        assert_eq!(off.div_exact(&p), None);
    }

    #[test]
    fn derivative_rules() {
        let p = circle();
        let dx = p.derivative(x());
        assert_eq!(dx, MPoly::var(x()).scale(&int(2)));
        assert!(p.derivative(Variable::real(7)).is_zero());
    }

    #[test]
    fn definiteness_analysis() {
        // x^2 + y^2 + 1 > 0 everywhere.
        let pos = &circle() + &MPoly::constant(int(2));
        assert_eq!(pos.definiteness(), Definiteness::Positive);
        assert!(pos.does_not_vanish());
        // x^2 + y^2 touches zero.
        let touch = &circle() + &MPoly::one();
        assert_eq!(touch.definiteness(), Definiteness::NonNegative);
        assert!(!touch.does_not_vanish());
        // x^2 + y^2 - 1 changes sign.
        assert_eq!(circle().definiteness(), Definiteness::Unknown);
        assert!(!circle().does_not_vanish());
        assert!(MPoly::constant(int(-3)).does_not_vanish());
        assert!(!MPoly::zero().does_not_vanish());
    }

    #[test]
    fn content_and_primitive() {
        let p = circle().scale(&rat(2, 3));
        assert_eq!(p.content_rational(), rat(2, 3));
        assert_eq!(p.primitive_rational(), circle());
        let n = circle().scale(&int(-2));
        // Content is positive; the sign of the polynomial is preserved.
        assert_eq!(n.content_rational(), int(2));
        assert_eq!(n.primitive_rational(), circle().scale(&int(-1)));
    }

    #[test]
    fn monomial_order_is_admissible() {
        let a = Monomial::var(x());
        let b = Monomial::var(y());
        assert!(a > b, "earlier variables dominate in lex order");
        let c = Monomial::var(x());
        assert_eq!(a.mul(&b).cmp(&c.mul(&b)), a.cmp(&c));
    }
}
