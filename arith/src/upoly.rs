//! Univariate polynomials in a designated main variable, with multivariate
//! coefficients. Projection works on these: resultants, discriminants,
//! pseudo-division and square-free parts.

use core::fmt;

use itertools::Itertools;
use num::{One, Zero};

use crate::mpoly::MPoly;
use crate::qpoly::QPoly;
use crate::var::Variable;
use crate::Rational;

/// A polynomial viewed as univariate in `main`, with dense coefficients in
/// ascending order; the coefficients are polynomials in other variables.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UPoly {
    main: Variable,
    coeffs: Vec<MPoly>,
}

impl UPoly {
    /// Builds and trims. Coefficients must not mention the main variable.
    pub fn new(main: Variable, mut coeffs: Vec<MPoly>) -> Self {
        debug_assert!(coeffs.iter().all(|c| !c.contains_var(main)));
        while coeffs.last().is_some_and(MPoly::is_zero) {
            coeffs.pop();
        }
        UPoly { main, coeffs }
    }

    pub fn zero(main: Variable) -> Self {
        UPoly {
            main,
            coeffs: Vec::new(),
        }
    }

    pub fn constant(main: Variable, c: MPoly) -> Self {
        Self::new(main, vec![c])
    }

    /// The polynomial `main` itself.
    pub fn identity(main: Variable) -> Self {
        Self::new(main, vec![MPoly::zero(), MPoly::one()])
    }

    pub fn main_var(&self) -> Variable {
        self.main
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Constant with respect to the main variable; lower variables may still
    /// occur.
    pub fn is_constant(&self) -> bool {
        self.coeffs.len() <= 1
    }

    pub fn degree_plus_one(&self) -> usize {
        self.coeffs.len()
    }

    /// Degree in the main variable; 0 for constants including zero.
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// Leading coefficient; zero polynomial has a zero leading coefficient.
    pub fn lead(&self) -> MPoly {
        self.coeffs.last().cloned().unwrap_or_else(MPoly::zero)
    }

    pub fn coeff(&self, k: usize) -> MPoly {
        self.coeffs.get(k).cloned().unwrap_or_else(MPoly::zero)
    }

    pub fn coeffs(&self) -> &[MPoly] {
        &self.coeffs
    }

    pub fn to_mpoly(&self) -> MPoly {
        let xm = MPoly::var(self.main);
        let mut acc = MPoly::zero();
        for c in self.coeffs.iter().rev() {
            acc = &(&acc * &xm) + c;
        }
        acc
    }

    /// All variables, main first.
    pub fn variables(&self) -> Vec<Variable> {
        let mut vars = vec![self.main];
        for c in &self.coeffs {
            vars.extend(c.variables());
        }
        let mut tail: Vec<Variable> = vars.split_off(1);
        tail.sort();
        tail.dedup();
        vars.extend(tail);
        vars
    }

    pub fn derivative(&self) -> Self {
        if self.coeffs.len() <= 1 {
            return Self::zero(self.main);
        }
        let coeffs = self.coeffs[1..]
            .iter()
            .enumerate()
            .map(|(i, c)| c.scale(&Rational::from_integer((i as u64 + 1).into())))
            .collect();
        Self::new(self.main, coeffs)
    }

    pub fn scale(&self, r: &Rational) -> Self {
        Self::new(self.main, self.coeffs.iter().map(|c| c.scale(r)).collect())
    }

    pub(crate) fn mul_coeff(&self, c: &MPoly) -> Self {
        Self::new(self.main, self.coeffs.iter().map(|cc| cc * c).collect())
    }

    fn shift_up(&self, k: usize) -> Self {
        if self.is_zero() {
            return self.clone();
        }
        let mut coeffs = vec![MPoly::zero(); k];
        coeffs.extend(self.coeffs.iter().cloned());
        Self::new(self.main, coeffs)
    }

    fn sub(&self, rhs: &Self) -> Self {
        let len = self.coeffs.len().max(rhs.coeffs.len());
        let mut coeffs = Vec::with_capacity(len);
        for i in 0..len {
            let a = self.coeffs.get(i).cloned().unwrap_or_else(MPoly::zero);
            let b = rhs.coeffs.get(i).cloned().unwrap_or_else(MPoly::zero);
            coeffs.push(&a - &b);
        }
        Self::new(self.main, coeffs)
    }

    /// Pseudo-division: returns `(q, r)` with
    /// `lead(d)^(deg self - deg d + 1) * self = q * d + r` and
    /// `deg r < deg d`. When `deg self < deg d` the result is `(0, self)`.
    pub fn pseudo_divide(&self, d: &Self) -> (Self, Self) {
        assert!(!d.is_zero(), "pseudo-division by the zero polynomial");
        let dd = d.degree();
        let lead_d = d.lead();
        let mut rem = self.clone();
        let mut quot = Self::zero(self.main);
        if self.degree_plus_one() <= dd {
            return (quot, rem);
        }
        let e = self.degree() - dd + 1;
        let mut steps = 0;
        while !rem.is_zero() && rem.degree() >= dd {
            let k = rem.degree() - dd;
            let c = rem.lead();
            quot = quot.mul_coeff(&lead_d);
            quot = quot.sub(&Self::new(self.main, {
                let mut v = vec![MPoly::zero(); k];
                v.push(-&c);
                v
            }));
            rem = rem.mul_coeff(&lead_d).sub(&d.mul_coeff(&c).shift_up(k));
            steps += 1;
        }
        // Pad with the remaining powers of the leading coefficient so the
        // pseudo-division identity holds with exponent e.
        if steps < e {
            let factor = pow_mpoly(&lead_d, e - steps);
            quot = quot.mul_coeff(&factor);
            rem = rem.mul_coeff(&factor);
        }
        (quot, rem)
    }

    /// The pseudo-remainder.
    pub fn pseudo_rem(&self, d: &Self) -> Self {
        self.pseudo_divide(d).1
    }

    /// Remainder modulo a monic rational polynomial in the main variable.
    /// Value-preserving at every root of `d`.
    pub fn rem_monic(&self, d: &QPoly) -> Self {
        let d = d.trimmed();
        debug_assert!(d.lead().is_one());
        let dd = d.degree();
        let d_up = Self::new(
            self.main,
            d.coeffs.iter().cloned().map(MPoly::constant).collect(),
        );
        let mut rem = self.clone();
        while rem.degree_plus_one() > dd {
            let k = rem.degree() - dd;
            let c = rem.lead();
            rem = rem.sub(&d_up.mul_coeff(&c).shift_up(k));
        }
        rem
    }

    /// Divides out the positive rational content of all coefficients.
    pub fn primitive_part(&self) -> Self {
        if self.is_zero() {
            return self.clone();
        }
        let c = self
            .coeffs
            .iter()
            .filter(|c| !c.is_zero())
            .map(|c| c.content_rational())
            .fold(None::<Rational>, |acc, c| {
                Some(match acc {
                    None => c,
                    Some(a) => rational_gcd(&a, &c),
                })
            })
            .unwrap_or_else(Rational::one);
        if c.is_one() || c.is_zero() {
            return self.clone();
        }
        self.scale(&c.recip())
    }

    /// The resultant of `self` and `other` with respect to the main
    /// variable, computed as a fraction-free determinant of the Sylvester
    /// matrix.
    pub fn resultant(&self, other: &Self) -> MPoly {
        debug_assert_eq!(self.main, other.main);
        if self.is_zero() || other.is_zero() {
            return MPoly::zero();
        }
        let m = self.degree();
        let n = other.degree();
        if m == 0 && n == 0 {
            return MPoly::one();
        }
        if m == 0 {
            return pow_mpoly(&self.lead(), n);
        }
        if n == 0 {
            return pow_mpoly(&other.lead(), m);
        }
        let size = m + n;
        let mut mat = vec![vec![MPoly::zero(); size]; size];
        for row in 0..n {
            for (k, c) in self.coeffs.iter().rev().enumerate() {
                mat[row][row + k] = c.clone();
            }
        }
        for row in 0..m {
            for (k, c) in other.coeffs.iter().rev().enumerate() {
                mat[n + row][row + k] = c.clone();
            }
        }
        bareiss_determinant(mat)
    }

    /// The discriminant with respect to the main variable.
    pub fn discriminant(&self) -> MPoly {
        let d = self.degree();
        if d <= 1 {
            return MPoly::one();
        }
        let res = self.resultant(&self.derivative());
        let lead = self.lead();
        let quot = res.div_exact(&lead).unwrap_or(res);
        if (d * (d - 1) / 2) % 2 == 1 {
            -&quot
        } else {
            quot
        }
    }

    /// Greatest common divisor up to factors free of the main variable,
    /// computed by a primitive pseudo-remainder sequence.
    pub fn prs_gcd(&self, other: &Self) -> Self {
        debug_assert_eq!(self.main, other.main);
        let mut a = self.primitive_part();
        let mut b = other.primitive_part();
        if a.degree_plus_one() < b.degree_plus_one() {
            core::mem::swap(&mut a, &mut b);
        }
        loop {
            if b.is_zero() {
                return a;
            }
            if b.is_constant() {
                return Self::constant(self.main, MPoly::one());
            }
            let r = a.pseudo_rem(&b).primitive_part();
            a = b;
            b = r;
        }
    }

    /// The square-free part, up to factors free of the main variable.
    pub fn squarefree_part(&self) -> Self {
        let p = self.primitive_part();
        if p.degree() <= 1 {
            return p;
        }
        let g = p.prs_gcd(&p.derivative());
        if g.is_constant() {
            return p;
        }
        let (q, r) = p.pseudo_divide(&g);
        if !r.is_zero() {
            // The sequence degenerated; keep the original, which is sound.
            return p;
        }
        q.primitive_part()
    }

    /// A coarse factor split: the main-variable power factor plus the
    /// square-free layers of the rest. Every returned polynomial divides
    /// `self` up to factors free of the main variable; none is a proper
    /// power.
    pub fn squarefree_factors(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut p = self.primitive_part();
        if p.is_zero() || p.is_constant() {
            return vec![p];
        }
        // Split off main^k.
        let shift = self
            .coeffs
            .iter()
            .take_while(|c| c.is_zero())
            .count();
        if shift > 0 {
            out.push(Self::identity(self.main));
            p = Self::new(self.main, p.coeffs[shift..].to_vec());
            if p.is_constant() {
                return out;
            }
        }
        let mut layer = p;
        loop {
            let sf = layer.squarefree_part();
            if !sf.is_constant() && !out.contains(&sf) {
                out.push(sf);
            }
            let g = layer.prs_gcd(&layer.derivative());
            if g.is_constant() {
                break;
            }
            layer = g;
        }
        if out.is_empty() {
            out.push(self.primitive_part());
        }
        out
    }

    /// Re-reads the polynomial as univariate in `v`.
    pub fn switch_main_variable(&self, v: Variable) -> Self {
        self.to_mpoly().to_univariate(v)
    }

    /// Substitutes exact rational values into the coefficients.
    pub fn substitute(&self, assignment: &[(Variable, Rational)]) -> Self {
        Self::new(
            self.main,
            self.coeffs
                .iter()
                .map(|c| c.substitute(assignment))
                .collect(),
        )
    }

    /// Specializes to a rational univariate polynomial; `None` if a
    /// coefficient still mentions a variable after substitution.
    pub fn specialize(&self, assignment: &[(Variable, Rational)]) -> Option<QPoly> {
        let mut coeffs = Vec::with_capacity(self.coeffs.len());
        for c in &self.coeffs {
            coeffs.push(c.substitute(assignment).constant_value()?);
        }
        Some(QPoly::new(coeffs))
    }

    /// True only if the polynomial provably has no real root in its main
    /// variable for any value of the lower variables.
    pub fn definitely_no_real_roots(&self) -> bool {
        if self.is_zero() {
            return false;
        }
        if let Some(q) = self.specialize(&[]) {
            return crate::isolate::isolate_real_roots(&q).is_empty() && !q.is_zero();
        }
        self.to_mpoly().does_not_vanish()
    }
}

fn pow_mpoly(base: &MPoly, e: usize) -> MPoly {
    let mut acc = MPoly::one();
    for _ in 0..e {
        acc = &acc * base;
    }
    acc
}

fn rational_gcd(a: &Rational, b: &Rational) -> Rational {
    use num::Integer;
    Rational::new(
        a.numer().gcd(b.numer()),
        a.denom().lcm(b.denom()),
    )
}

/// Fraction-free Gaussian elimination; exact in any integral domain.
fn bareiss_determinant(mut mat: Vec<Vec<MPoly>>) -> MPoly {
    let size = mat.len();
    let mut sign = false;
    let mut prev = MPoly::one();
    for k in 0..size {
        if mat[k][k].is_zero() {
            let Some(swap) = (k + 1..size).find(|&i| !mat[i][k].is_zero()) else {
                return MPoly::zero();
            };
            mat.swap(k, swap);
            sign = !sign;
        }
        if k + 1 == size {
            break;
        }
        for i in k + 1..size {
            for j in k + 1..size {
                let num = &(&mat[k][k] * &mat[i][j]) - &(&mat[i][k] * &mat[k][j]);
                mat[i][j] = num
                    .div_exact(&prev)
                    .expect("Bareiss elimination divides exactly");
            }
            mat[i][k] = MPoly::zero();
        }
        prev = mat[k][k].clone();
    }
    let det = mat[size - 1][size - 1].clone();
    if sign {
        -&det
    } else {
        det
    }
}

impl fmt::Display for UPoly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let parts = self
            .coeffs
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, c)| !c.is_zero())
            .map(|(i, c)| match i {
                0 => format!("({c})"),
                1 => format!("({c})*{}", self.main),
                _ => format!("({c})*{}^{i}", self.main),
            })
            .join(" + ");
        write!(f, "{parts}")
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

    /// x^2 + y^2 - 1 as a polynomial in x.
    fn circle_in_x() -> UPoly {
        let py = MPoly::var(y());
        let c0 = &(&py * &py) - &MPoly::one();
        UPoly::new(x(), vec![c0, MPoly::zero(), MPoly::one()])
    }

    /// x - y as a polynomial in x.
    fn line_in_x() -> UPoly {
        UPoly::new(x(), vec![-&MPoly::var(y()), MPoly::one()])
    }

    #[test]
    fn resultant_of_circle_and_line() {
        // res_x(x^2 + y^2 - 1, x - y) = 2y^2 - 1.
        let r = circle_in_x().resultant(&line_in_x());
        let py = MPoly::var(y());
        let expected = &(&py * &py).scale(&int(2)) - &MPoly::one();
        assert_eq!(r, expected);
    }

    #[test]
    fn resultant_of_univariate_constants() {
        let p = UPoly::new(x(), vec![MPoly::constant(int(3))]);
        let q = UPoly::new(x(), vec![MPoly::constant(int(2)), MPoly::one()]);
        assert_eq!(p.resultant(&q), MPoly::constant(int(3)));
    }

    #[test]
    fn discriminant_of_quadratic() {
        // disc(a x^2 + b x + c) = b^2 - 4ac; here x^2 + y x + 1 -> y^2 - 4.
        let p = UPoly::new(x(), vec![MPoly::one(), MPoly::var(y()), MPoly::one()]);
        let d = p.discriminant();
        let py = MPoly::var(y());
        let expected = &(&py * &py) - &MPoly::constant(int(4));
        assert_eq!(d, expected);
    }

    #[test]
    fn pseudo_division_identity() {
        let p = circle_in_x();
        let d = line_in_x();
        let (q, r) = p.pseudo_divide(&d);
        let e = p.degree() - d.degree() + 1;
        let lhs = p.mul_coeff(&pow_mpoly(&d.lead(), e));
        let rhs = {
            let qd_m = &q.to_mpoly() * &d.to_mpoly();
            &qd_m + &r.to_mpoly()
        };
        assert_eq!(lhs.to_mpoly(), rhs);
        assert!(r.degree_plus_one() <= d.degree());
    }

    #[test]
    fn squarefree_part_drops_multiplicity() {
        // (x - y)^2 -> x - y up to a constant.
        let d = line_in_x();
        let sq = UPoly::new(
            x(),
            vec![
                &MPoly::var(y()) * &MPoly::var(y()),
                (-&MPoly::var(y())).scale(&int(2)),
                MPoly::one(),
            ],
        );
        let sf = sq.squarefree_part();
        assert_eq!(sf.degree(), 1);
        let ratio = sf.to_mpoly().div_exact(&d.to_mpoly());
        assert!(ratio.is_some());
        assert!(ratio.unwrap().is_constant());
    }

    #[test]
    fn switch_main_variable_roundtrip() {
        let p = circle_in_x();
        let q = p.switch_main_variable(y());
        assert_eq!(q.main_var(), y());
        assert_eq!(q.degree(), 2);
        assert_eq!(q.switch_main_variable(x()), p);
    }

    #[test]
    fn specialization() {
        let p = circle_in_x();
        let q = p.specialize(&[(y(), rat(1, 2))]).unwrap();
        // x^2 - 3/4.
        assert_eq!(q.eval(&int(0)), rat(-3, 4));
        assert_eq!(q.eval(&int(1)), rat(1, 4));
        assert!(p.specialize(&[]).is_none());
    }

    #[test]
    fn no_real_roots_detection() {
        let p = UPoly::new(x(), vec![MPoly::one(), MPoly::zero(), MPoly::one()]);
        assert!(p.definitely_no_real_roots());
        assert!(!circle_in_x().definitely_no_real_roots());
        // x^2 + y^2 + 1 has no roots for any y.
        let q = UPoly::new(
            x(),
            vec![
                &(&MPoly::var(y()) * &MPoly::var(y())) + &MPoly::one(),
                MPoly::zero(),
                MPoly::one(),
            ],
        );
        assert!(q.definitely_no_real_roots());
    }

    #[test]
    fn squarefree_factors_cover_the_input() {
        let d = line_in_x();
        let p = UPoly::new(
            x(),
            vec![
                &MPoly::var(y()) * &MPoly::var(y()),
                (-&MPoly::var(y())).scale(&int(2)),
                MPoly::one(),
            ],
        );
        let factors = p.squarefree_factors();
        assert!(!factors.is_empty());
        for f in &factors {
            assert!(f.degree() >= 1);
        }
        assert!(factors
            .iter()
            .any(|f| f.to_mpoly().div_exact(&d.to_mpoly()).is_some()
                || d.to_mpoly().div_exact(&f.to_mpoly()).is_some()));
    }
}
