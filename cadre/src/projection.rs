//! The projection operators: pure functions from polynomials (and pairs) to
//! the projection polynomials one level down.

use cadre_arith::{UPoly, Variable};
use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{CadError, CadResult};

/// The projection operator family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionKind {
    Brown,
    McCallum,
    /// Reserved; selecting it reports an unsupported-operator error.
    Hong,
}

/// Projection of a single polynomial: the polynomials in `var` whose
/// sign-invariance accounts for the root structure of `p` above each cell.
pub fn project_single(kind: ProjectionKind, p: &UPoly, var: Variable) -> CadResult<Vec<UPoly>> {
    match kind {
        ProjectionKind::McCallum => Ok(mccallum_single(p, var)),
        ProjectionKind::Brown => Ok(brown_single(p, var)),
        ProjectionKind::Hong => Err(CadError::UnsupportedProjection(kind)),
    }
}

/// Projection of a pair: the resultant, for both implemented operators.
pub fn project_paired(
    kind: ProjectionKind,
    p: &UPoly,
    q: &UPoly,
    var: Variable,
) -> CadResult<Vec<UPoly>> {
    match kind {
        ProjectionKind::McCallum | ProjectionKind::Brown => {
            trace!("resultant({p}, {q})");
            Ok(vec![p.resultant(q).to_univariate(var)])
        }
        ProjectionKind::Hong => Err(CadError::UnsupportedProjection(kind)),
    }
}

fn mccallum_single(p: &UPoly, var: Variable) -> Vec<UPoly> {
    trace!("discriminant({p})");
    let mut out = vec![p.discriminant().to_univariate(var)];
    for coeff in p.coeffs() {
        if coeff.is_constant() {
            continue;
        }
        out.push(coeff.to_univariate(var));
    }
    out
}

fn brown_single(p: &UPoly, var: Variable) -> Vec<UPoly> {
    trace!("discriminant({p})");
    let mut out = vec![p.discriminant().to_univariate(var)];
    if p.lead().does_not_vanish() {
        trace!("leading coefficient of {p} cannot vanish");
        return out;
    }
    if p.coeffs().iter().any(|c| c.does_not_vanish()) {
        trace!("some coefficient of {p} cannot vanish, keeping only the leading one");
        if !p.lead().is_constant() {
            out.push(p.lead().to_univariate(var));
        }
        return out;
    }
    for coeff in p.coeffs() {
        if coeff.is_constant() {
            continue;
        }
        out.push(coeff.to_univariate(var));
    }
    out
}

#[cfg(test)]
mod tests {
    use cadre_arith::num_util::int;
    use cadre_arith::MPoly;

    use super::*;

    fn x() -> Variable {
        Variable::real(0)
    }
    fn y() -> Variable {
        Variable::real(1)
    }

    /// x^2 + y^2 - 1 in x.
    fn circle() -> UPoly {
        let py = MPoly::var(y());
        UPoly::new(
            x(),
            vec![
                &(&py * &py) - &MPoly::one(),
                MPoly::zero(),
                MPoly::one(),
            ],
        )
    }

    /// x - y in x.
    fn line() -> UPoly {
        UPoly::new(x(), vec![-&MPoly::var(y()), MPoly::one()])
    }

    #[test]
    fn brown_stops_at_constant_lead() {
        // The circle has leading coefficient 1, so Brown only emits the
        // discriminant 4 - 4y^2 (up to normalization).
        let out = project_single(ProjectionKind::Brown, &circle(), y()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].main_var(), y());
        assert_eq!(out[0].degree(), 2);
    }

    #[test]
    fn mccallum_emits_coefficients() {
        // y*x^2 + x + y in x: discriminant and the two non-constant
        // coefficients y (twice, deduplicated later).
        let p = UPoly::new(
            x(),
            vec![MPoly::var(y()), MPoly::one(), MPoly::var(y())],
        );
        let out = project_single(ProjectionKind::McCallum, &p, y()).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn paired_projection_is_the_resultant() {
        let out =
            project_paired(ProjectionKind::Brown, &circle(), &line(), y()).unwrap();
        assert_eq!(out.len(), 1);
        // res_x(x^2 + y^2 - 1, x - y) = 2y^2 - 1.
        let r = &out[0];
        assert_eq!(r.degree(), 2);
        assert_eq!(r.coeff(0).constant_value(), Some(int(-1)));
        assert_eq!(r.coeff(2).constant_value(), Some(int(2)));
    }

    #[test]
    fn hong_is_unsupported() {
        assert!(matches!(
            project_single(ProjectionKind::Hong, &circle(), y()),
            Err(CadError::UnsupportedProjection(ProjectionKind::Hong))
        ));
    }
}
