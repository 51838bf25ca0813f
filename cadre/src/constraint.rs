//! Sign-condition constraints and the per-depth testability index.

use core::fmt;

use cadre_arith::eval::eval_sign;
use cadre_arith::{MPoly, Ran, Sign, Variable};
use log::trace;

use crate::conflict::ConflictGraph;
use crate::error::CadResult;
use crate::vars::Variables;

/// A constraint `sgn(p) = s` (or its negation) over an ordered variable
/// list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Constraint {
    poly: MPoly,
    sign: Sign,
    variables: Vec<Variable>,
    negated: bool,
}

impl Constraint {
    pub fn new(poly: MPoly, sign: Sign, variables: Vec<Variable>) -> Self {
        Self::with_negation(poly, sign, variables, false)
    }

    pub fn with_negation(
        poly: MPoly,
        sign: Sign,
        variables: Vec<Variable>,
        negated: bool,
    ) -> Self {
        debug_assert!(
            poly.variables().iter().all(|v| variables.contains(v)),
            "constraint polynomial uses a variable outside its variable list"
        );
        Constraint {
            poly,
            sign,
            variables,
            negated,
        }
    }

    pub fn polynomial(&self) -> &MPoly {
        &self.poly
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Evaluates the constraint at an exact point. Every variable of the
    /// polynomial must be assigned.
    pub fn satisfied_by(&self, point: &[(Variable, Ran)]) -> CadResult<bool> {
        let s = eval_sign(&self.poly, point)?;
        trace!("{self} evaluates to {s}");
        Ok(if self.negated {
            s != self.sign
        } else {
            s == self.sign
        })
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rel = match (self.negated, self.sign) {
            (false, Sign::Negative) => "< 0",
            (false, Sign::Zero) => "= 0",
            (false, Sign::Positive) => "> 0",
            (true, Sign::Negative) => ">= 0",
            (true, Sign::Zero) => "!= 0",
            (true, Sign::Positive) => "<= 0",
        };
        write!(f, "{} {rel}", self.poly)
    }
}

/// The constraint conjunction plus, per tree depth, the indices of the
/// constraints that become testable exactly at that depth.
#[derive(Clone, Debug, Default)]
pub struct ConstraintTable {
    constraints: Vec<Constraint>,
    by_depth: Vec<Vec<usize>>,
}

impl ConstraintTable {
    /// Rebuilds the table for a constraint conjunction under the given
    /// variable order. Depth d assigns the last d variables of the
    /// projection order; a constraint lands in the bucket of the first depth
    /// at which all its variables are assigned.
    pub fn set(&mut self, constraints: Vec<Constraint>, vars: &Variables) {
        debug_assert!(vars.new_is_empty());
        let n = vars.len();
        self.constraints = constraints;
        self.by_depth = vec![Vec::new(); n];
        let mut pending: Vec<bool> = vec![true; self.constraints.len()];
        for d in 1..=n {
            let assigned = &vars.current()[n - d..];
            for (c, cons) in self.constraints.iter().enumerate() {
                if !pending[c] {
                    continue;
                }
                if cons.variables.iter().all(|v| assigned.contains(v)) {
                    pending[c] = false;
                    self.by_depth[d - 1].push(c);
                }
            }
        }
        debug_assert!(
            pending.iter().all(|p| !p),
            "every constraint must become testable at full depth"
        );
    }

    pub fn clear(&mut self) {
        self.constraints.clear();
        self.by_depth.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn get(&self, idx: usize) -> &Constraint {
        &self.constraints[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    /// Indices of the constraints testable exactly at depth `d` (1-based).
    pub fn testable_at(&self, d: usize) -> &[usize] {
        if d == 0 || d > self.by_depth.len() {
            return &[];
        }
        &self.by_depth[d - 1]
    }

    /// Evaluates the constraints that become testable at the depth of the
    /// given partial assignment (deepest value first). Falsifications are
    /// recorded in the conflict graph when one is supplied.
    pub fn satisfied_partially_by(
        &self,
        path: &[Ran],
        vars: &Variables,
        conflict: Option<&mut ConflictGraph>,
    ) -> CadResult<bool> {
        let d = path.len();
        if d == 0 {
            return Ok(true);
        }
        let point = pair_assignment(path, vars);
        self.check_indices(self.testable_at(d), &point, conflict)
    }

    /// Evaluates all constraints at a full assignment.
    pub fn satisfied_by(
        &self,
        path: &[Ran],
        vars: &Variables,
        conflict: Option<&mut ConflictGraph>,
    ) -> CadResult<bool> {
        debug_assert_eq!(path.len(), vars.len());
        let point = pair_assignment(path, vars);
        let all: Vec<usize> = (0..self.constraints.len()).collect();
        self.check_indices(&all, &point, conflict)
    }

    fn check_indices(
        &self,
        indices: &[usize],
        point: &[(Variable, Ran)],
        conflict: Option<&mut ConflictGraph>,
    ) -> CadResult<bool> {
        if indices.is_empty() {
            return Ok(true);
        }
        let mut satisfied = true;
        match conflict {
            None => {
                for &c in indices {
                    if !self.constraints[c].satisfied_by(point)? {
                        satisfied = false;
                        break;
                    }
                }
            }
            Some(graph) => {
                let sample = graph.new_sample();
                for &c in indices {
                    let cid = graph.constraint_id(&self.constraints[c]);
                    let sat = self.constraints[c].satisfied_by(point)?;
                    graph.set(cid, sample, !sat);
                    satisfied = satisfied && sat;
                }
            }
        }
        Ok(satisfied)
    }
}

/// Pairs a deepest-first path with the variables it assigns: a path of
/// length d covers the last d variables of the projection order, deepest
/// value first.
pub fn pair_assignment(path: &[Ran], vars: &Variables) -> Vec<(Variable, Ran)> {
    let n = vars.len();
    let d = path.len();
    debug_assert!(d <= n);
    path.iter()
        .enumerate()
        .map(|(i, r)| (vars.get(n - d + i), r.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use cadre_arith::num_util::int;

    use super::*;

    fn x() -> Variable {
        Variable::real(0)
    }
    fn y() -> Variable {
        Variable::real(1)
    }

    fn circle() -> MPoly {
        let px = MPoly::var(x());
        let py = MPoly::var(y());
        &(&(&px * &px) + &(&py * &py)) - &MPoly::one()
    }

    #[test]
    fn evaluation_and_negation() {
        let c = Constraint::new(circle(), Sign::Negative, vec![x(), y()]);
        let origin = [(x(), Ran::zero()), (y(), Ran::zero())];
        assert!(c.satisfied_by(&origin).unwrap());
        let neg = Constraint::with_negation(circle(), Sign::Negative, vec![x(), y()], true);
        assert!(!neg.satisfied_by(&origin).unwrap());
        let on = [
            (x(), Ran::new_numeric(int(1), false)),
            (y(), Ran::zero()),
        ];
        let eq = Constraint::new(circle(), Sign::Zero, vec![x(), y()]);
        assert!(eq.satisfied_by(&on).unwrap());
    }

    #[test]
    fn depth_index_partitions_constraints() {
        // Projection order [x, y]: depth 1 assigns y, depth 2 assigns x.
        let vars = Variables::new(vec![x(), y()]);
        let only_y = Constraint::new(
            &(&MPoly::var(y()) * &MPoly::var(y())) - &MPoly::one(),
            Sign::Zero,
            vec![y()],
        );
        let both = Constraint::new(circle(), Sign::Negative, vec![x(), y()]);
        let mut table = ConstraintTable::default();
        table.set(vec![both.clone(), only_y.clone()], &vars);
        assert_eq!(table.testable_at(1), &[1]);
        assert_eq!(table.testable_at(2), &[0]);
        assert!(table.testable_at(3).is_empty());
    }

    #[test]
    fn partial_evaluation_uses_the_right_bucket() {
        let vars = Variables::new(vec![x(), y()]);
        let only_y = Constraint::new(MPoly::var(y()), Sign::Positive, vec![y()]);
        let mut table = ConstraintTable::default();
        table.set(vec![only_y], &vars);
        // Depth 1 path assigns y.
        let good = vec![Ran::new_numeric(int(2), false)];
        let bad = vec![Ran::new_numeric(int(-2), false)];
        assert!(table.satisfied_partially_by(&good, &vars, None).unwrap());
        assert!(!table.satisfied_partially_by(&bad, &vars, None).unwrap());
    }
}
