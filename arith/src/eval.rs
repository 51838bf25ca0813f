//! Exact evaluation at real algebraic points.
//!
//! Rational coordinates are substituted directly. Algebraic coordinates are
//! handled by reducing modulo their (monic) defining polynomials, computing a
//! candidate defining polynomial for the value by iterated resultants, and
//! refining interval enclosures until either the sign is decided or the value
//! is pinned to the zero root of the candidate polynomial.

use core::cmp::Ordering;

use log::debug;
use num::Zero;

use crate::error::{ArithError, ArithResult};
use crate::interval::{Enclosure, Interval};
use crate::isolate::{isolate_real_roots, isolate_real_roots_within};
use crate::mpoly::MPoly;
use crate::qpoly::QPoly;
use crate::ran::{qpoly_sign_at, Ran};
use crate::upoly::UPoly;
use crate::var::Variable;
use crate::{Rational, Sign};

/// An algebraic coordinate of an evaluation point.
struct AlgCoord<'a> {
    var: Variable,
    monic: QPoly,
    ran: &'a Ran,
}

fn split_assignment(point: &[(Variable, Ran)]) -> (Vec<(Variable, Rational)>, Vec<AlgCoord<'_>>) {
    let mut rats = Vec::new();
    let mut algs = Vec::new();
    for (v, r) in point {
        match r.value() {
            Some(q) => rats.push((*v, q.clone())),
            None => algs.push(AlgCoord {
                var: *v,
                monic: r.defining_poly().expect("interval representation").monic(),
                ran: r,
            }),
        }
    }
    (rats, algs)
}

fn upoly_from_qpoly(v: Variable, q: &QPoly) -> UPoly {
    UPoly::new(
        v,
        q.trimmed().coeffs.into_iter().map(MPoly::constant).collect(),
    )
}

/// The exact sign of `p` at the given point. Every variable of `p` must be
/// assigned.
pub fn eval_sign(p: &MPoly, point: &[(Variable, Ran)]) -> ArithResult<Sign> {
    let (rats, algs) = split_assignment(point);
    let q = p.substitute(&rats);
    if let Some(c) = q.constant_value() {
        return Ok(Sign::of(&c));
    }
    let needed: Vec<&AlgCoord<'_>> = algs.iter().filter(|a| q.contains_var(a.var)).collect();
    if needed.is_empty() {
        return Err(ArithError::Numeric(format!(
            "unassigned variables while evaluating {q}"
        )));
    }
    if needed.len() == 1 {
        let a = needed[0];
        if let Some(qq) = q.to_univariate(a.var).specialize(&[]) {
            return Ok(qpoly_sign_at(&qq, a.ran));
        }
    }
    multi_sign(&q, &needed)
}

/// Sign determination with two or more algebraic coordinates.
fn multi_sign(q: &MPoly, algs: &[&AlgCoord<'_>]) -> ArithResult<Sign> {
    // Reduce modulo every defining polynomial; this keeps the value exact
    // and often collapses the whole expression to a constant.
    let mut w = q.clone();
    for a in algs {
        if w.contains_var(a.var) {
            w = w.to_univariate(a.var).rem_monic(&a.monic).to_mpoly();
        }
    }
    if let Some(c) = w.constant_value() {
        return Ok(Sign::of(&c));
    }

    // A candidate defining polynomial for the value: eliminate each
    // algebraic variable from `t - w` by a resultant with its defining
    // polynomial.
    let t = fresh_variable(&w, algs);
    let mut elim = &MPoly::var(t) - &w;
    for a in algs {
        if !elim.contains_var(a.var) {
            continue;
        }
        let d_up = upoly_from_qpoly(a.var, &a.monic);
        elim = elim.to_univariate(a.var).resultant(&d_up);
    }
    let defining = elim
        .to_univariate(t)
        .specialize(&[])
        .filter(|d| !d.is_zero())
        .ok_or_else(|| {
            ArithError::DegenerateElimination(format!("no defining polynomial for {w}"))
        })?;
    let value_candidates = isolate_real_roots(&defining);
    if value_candidates.is_empty() {
        return Err(ArithError::DegenerateElimination(format!(
            "candidate polynomial for {w} has no real roots"
        )));
    }

    let mut coords: Vec<(Variable, Ran)> = algs.iter().map(|a| (a.var, a.ran.clone())).collect();
    let mut rounds = 0usize;
    loop {
        let enclosures: Vec<(Variable, Enclosure)> =
            coords.iter().map(|(v, r)| (*v, r.enclosure())).collect();
        let e = w.eval_enclosure(&enclosures);
        if let Some(s) = e.sign() {
            return Ok(s);
        }
        let inside: Vec<&Ran> = value_candidates
            .iter()
            .filter(|r| {
                r.cmp_rational(&e.lo) != Ordering::Less && r.cmp_rational(&e.hi) != Ordering::Greater
            })
            .collect();
        if inside.len() == 1 && inside[0].cmp_rational(&Rational::zero()) == Ordering::Equal {
            return Ok(Sign::Zero);
        }
        if inside.is_empty() {
            return Err(ArithError::Numeric(format!(
                "enclosure refinement lost the value of {w}"
            )));
        }
        for (_, r) in &mut coords {
            r.refine();
        }
        rounds += 1;
        if rounds > 20_000 {
            return Err(ArithError::Numeric(format!(
                "sign refinement for {w} did not converge"
            )));
        }
    }
}

/// Real roots of the univariate specialization of `p` at a partial sample
/// point, restricted to `within`, in strictly increasing order.
///
/// A specialization that vanishes identically contributes no roots.
pub fn real_roots_specialized(
    p: &UPoly,
    point: &[(Variable, Ran)],
    within: &Interval,
) -> ArithResult<Vec<Ran>> {
    let (rats, algs) = split_assignment(point);
    let substituted = p.substitute(&rats);
    if let Some(q) = substituted.specialize(&[]) {
        if q.is_zero() {
            debug!("specialization vanished identically, no root constraints");
            return Ok(Vec::new());
        }
        return Ok(isolate_real_roots_within(&q, within));
    }

    let needed: Vec<&AlgCoord<'_>> = algs
        .iter()
        .filter(|a| substituted.coeffs().iter().any(|c| c.contains_var(a.var)))
        .collect();
    let mut reduced = substituted.clone();
    for a in &needed {
        reduced = UPoly::new(
            reduced.main_var(),
            reduced
                .coeffs()
                .iter()
                .map(|c| {
                    if c.contains_var(a.var) {
                        c.to_univariate(a.var).rem_monic(&a.monic).to_mpoly()
                    } else {
                        c.clone()
                    }
                })
                .collect(),
        );
    }

    let mut nullified = true;
    for c in reduced.coeffs() {
        if eval_sign(c, point)? != Sign::Zero {
            nullified = false;
            break;
        }
    }
    if nullified {
        debug!("specialization nullified at an algebraic point");
        return Ok(Vec::new());
    }

    let main = p.main_var();
    let mut elim = reduced.to_mpoly();
    for a in &needed {
        if !elim.contains_var(a.var) {
            continue;
        }
        let d_up = upoly_from_qpoly(a.var, &a.monic);
        elim = elim.to_univariate(a.var).resultant(&d_up);
    }
    let candidates_poly = elim
        .to_univariate(main)
        .specialize(&[])
        .filter(|d| !d.is_zero())
        .ok_or_else(|| {
            ArithError::DegenerateElimination(format!(
                "specialized root candidates for {p} are undetermined"
            ))
        })?;
    if candidates_poly.degree_plus_one() <= 1 {
        return Ok(Vec::new());
    }

    let reduced_m = reduced.to_mpoly();
    let mut out = Vec::new();
    for cand in isolate_real_roots_within(&candidates_poly, within) {
        let mut full = point.to_vec();
        full.push((main, cand.clone()));
        if eval_sign(&reduced_m, &full)? == Sign::Zero {
            let mut root = cand;
            root.set_root(true);
            out.push(root);
        }
    }
    Ok(out)
}

fn fresh_variable(w: &MPoly, algs: &[&AlgCoord<'_>]) -> Variable {
    let max_id = w
        .variables()
        .iter()
        .map(|v| v.id())
        .chain(algs.iter().map(|a| a.var.id()))
        .max()
        .unwrap_or(0);
    Variable::real(max_id + 1)
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

    fn sqrt_half(is_root: bool) -> Ran {
        // Root of 2t^2 - 1 in (0, 1).
        Ran::new_algebraic(QPoly::from_i64(&[-1, 0, 2]), int(0), int(1), is_root)
    }

    /// x^2 + y^2 - 1
    fn circle() -> MPoly {
        let px = MPoly::var(x());
        let py = MPoly::var(y());
        &(&(&px * &px) + &(&py * &py)) - &MPoly::one()
    }

    #[test]
    fn sign_with_rational_point() {
        let p = circle();
        let inside = [(x(), Ran::zero()), (y(), Ran::zero())];
        assert_eq!(eval_sign(&p, &inside).unwrap(), Sign::Negative);
        let on = [
            (x(), Ran::new_numeric(int(1), false)),
            (y(), Ran::zero()),
        ];
        assert_eq!(eval_sign(&p, &on).unwrap(), Sign::Zero);
    }

    #[test]
    fn sign_with_one_algebraic_coordinate() {
        // x^2 + y^2 - 1 at (1/2, sqrt(1/2)) = 1/4 + 1/2 - 1 < 0.
        let p = circle();
        let pt = [
            (x(), Ran::new_numeric(rat(1, 2), false)),
            (y(), sqrt_half(true)),
        ];
        assert_eq!(eval_sign(&p, &pt).unwrap(), Sign::Negative);
    }

    #[test]
    fn sign_with_two_algebraic_coordinates() {
        // Exactly on the circle: both coordinates sqrt(1/2).
        let p = circle();
        let pt = [(x(), sqrt_half(true)), (y(), sqrt_half(true))];
        assert_eq!(eval_sign(&p, &pt).unwrap(), Sign::Zero);
        // x - y also vanishes there.
        let diff = &MPoly::var(x()) - &MPoly::var(y());
        assert_eq!(eval_sign(&diff, &pt).unwrap(), Sign::Zero);
        // x + y is positive.
        let sum = &MPoly::var(x()) + &MPoly::var(y());
        assert_eq!(eval_sign(&sum, &pt).unwrap(), Sign::Positive);
    }

    #[test]
    fn roots_of_rational_specialization() {
        // x^2 + y^2 - 1 at y = 1/2: roots +-sqrt(3)/2.
        let p = circle().to_univariate(x());
        let pt = [(y(), Ran::new_numeric(rat(1, 2), false))];
        let roots = real_roots_specialized(&p, &pt, &Interval::unbounded()).unwrap();
        assert_eq!(roots.len(), 2);
        assert!(roots[0] < Ran::zero() && roots[1] > Ran::zero());
        assert!(roots.iter().all(|r| r.is_root()));
    }

    #[test]
    fn roots_of_algebraic_specialization() {
        // x^2 + y^2 - 1 at y = sqrt(1/2): roots are +-sqrt(1/2).
        let p = circle().to_univariate(x());
        let pt = [(y(), sqrt_half(true))];
        let roots = real_roots_specialized(&p, &pt, &Interval::unbounded()).unwrap();
        assert_eq!(roots.len(), 2);
        let neg_branch = Ran::new_algebraic(QPoly::from_i64(&[-1, 0, 2]), int(-1), int(0), true);
        assert_eq!(roots[0], neg_branch);
        assert_eq!(roots[1], sqrt_half(true));
        // x - y at the same point has the single root sqrt(1/2).
        let line = (&MPoly::var(x()) - &MPoly::var(y())).to_univariate(x());
        let line_roots = real_roots_specialized(&line, &pt, &Interval::unbounded()).unwrap();
        assert_eq!(line_roots.len(), 1);
        assert_eq!(line_roots[0], sqrt_half(true));
    }

    #[test]
    fn vanishing_specialization_has_no_roots() {
        // y * x at y = 0 vanishes identically in x.
        let p = (&MPoly::var(y()) * &MPoly::var(x())).to_univariate(x());
        let pt = [(y(), Ran::zero())];
        let roots = real_roots_specialized(&p, &pt, &Interval::unbounded()).unwrap();
        assert!(roots.is_empty());
    }

    #[test]
    fn bounded_root_isolation() {
        let p = circle().to_univariate(x());
        let pt = [(y(), Ran::zero())];
        let pos = real_roots_specialized(
            &p,
            &pt,
            &Interval::above(int(0), crate::BoundKind::Strict),
        )
        .unwrap();
        assert_eq!(pos.len(), 1);
        assert_eq!(pos[0].value(), Some(&int(1)));
    }
}
