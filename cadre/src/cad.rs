//! The decomposition instance and its three-phase check driver.
//!
//! A `Cad` owns the polynomial arena, one elimination set per variable, the
//! sample tree and the settings. `check` decides a constraint conjunction:
//! phase 1 re-walks the trace of the previous satisfying assignment, phase 2
//! traverses the existing sample tree, and phase 3 lifts new samples from
//! the per-level lifting queues; phases 2 and 3 interleave in
//! [`Cad::lift_check`], which walks existing children before dequeueing new
//! lifting positions.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use cadre_arith::eval::real_roots_specialized;
use cadre_arith::num_util::simplest_between;
use cadre_arith::{BoundKind, Interval, MPoly, Ran, Rational, Variable};
use hashbrown::HashMap;
use log::{debug, info, trace, warn};

use crate::arena::{PolyArena, PolyId};
use crate::conflict::ConflictGraph;
use crate::constraint::{pair_assignment, Constraint, ConstraintTable};
use crate::elimination::{EliminationSet, PolyPair};
use crate::error::{Answer, CadError, CadResult};
use crate::projection::ProjectionKind;
use crate::sample::{SampleComparator, SampleSet};
use crate::settings::{CadSettings, IntegerHandling};
use crate::tree::{NodeId, SampleTree};
use crate::vars::Variables;

/// Bounds per variable index in the projection order.
pub type BoundMap = HashMap<usize, Interval>;

/// The public outcome of a [`Cad::check`] call. `point` is valid iff the
/// answer is SAT; `conflict` is valid iff the answer is UNSAT and the
/// conflict graph was enabled.
#[derive(Debug)]
pub struct CheckResult {
    pub answer: Answer,
    /// Satisfying assignment, indexed like the projection order.
    pub point: Option<Vec<Ran>>,
    pub conflict: Option<ConflictGraph>,
}

enum Lift {
    Sat(Vec<Ran>),
    Unsat,
}

/// A cylindrical algebraic decomposition instance.
pub struct Cad {
    variables: Variables,
    arena: PolyArena,
    /// Index 0 holds the input polynomials (main variable = first in the
    /// projection order); children of a step at level l land at level l+1.
    elim: Vec<EliminationSet>,
    tree: SampleTree,
    /// Input polynomials scheduled but not yet woven into the elimination
    /// sets, with their variable lists.
    scheduled: Vec<MPoly>,
    /// Active input polynomials and their level-0 handles.
    inputs: HashMap<MPoly, PolyId>,
    constraints: ConstraintTable,
    setting: CadSettings,
    interrupts: Vec<Arc<AtomicBool>>,
    elimination_complete: bool,
    sampling_complete: bool,
    interrupted: bool,
    /// Path of the previous satisfying assignment, shallowest value first.
    trace: Vec<Ran>,
    check_count: u64,
}

impl Cad {
    pub fn new(
        variables: Vec<Variable>,
        polynomials: Vec<MPoly>,
        interrupts: Vec<Arc<AtomicBool>>,
        setting: CadSettings,
    ) -> Self {
        let mut cad = Cad {
            variables: Variables::new(variables),
            arena: PolyArena::new(),
            elim: Vec::new(),
            tree: SampleTree::new(),
            scheduled: Vec::new(),
            inputs: HashMap::new(),
            constraints: ConstraintTable::default(),
            setting,
            interrupts,
            elimination_complete: false,
            sampling_complete: false,
            interrupted: false,
            trace: Vec::new(),
            check_count: 0,
        };
        for p in polynomials {
            cad.scheduled.push(p);
        }
        cad
    }

    pub fn with_setting(setting: CadSettings) -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), setting)
    }

    ///////////////
    // Selectors //
    ///////////////

    pub fn setting(&self) -> &CadSettings {
        &self.setting
    }

    pub fn variables(&self) -> &[Variable] {
        self.variables.current()
    }

    pub fn sample_tree(&self) -> &SampleTree {
        &self.tree
    }

    pub fn elimination_sets(&self) -> &[EliminationSet] {
        &self.elim
    }

    pub fn arena(&self) -> &PolyArena {
        &self.arena
    }

    /// The constraint table of the most recent check.
    pub fn constraints(&self) -> &ConstraintTable {
        &self.constraints
    }

    /// True once the sample tree has been exhaustively lifted.
    pub fn is_complete(&self) -> bool {
        self.sampling_complete
    }

    /// True if the previous check ended because of an interrupt. The flag is
    /// cleared on every `check` entry.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    fn an_answer_found(&self) -> bool {
        self.interrupts
            .iter()
            .any(|flag| flag.load(AtomicOrdering::Relaxed))
    }

    /// All sample points constructed so far; incomplete paths are padded
    /// with zero entries for the unassigned variables.
    pub fn samples(&self) -> Vec<Vec<Ran>> {
        let n = self.variables.len();
        self.tree
            .leaves(self.tree.root())
            .into_iter()
            .filter(|&leaf| leaf != self.tree.root())
            .map(|leaf| {
                let path = self.tree.construct_path(leaf);
                let mut point = vec![Ran::zero(); n - path.len()];
                point.extend(path);
                point
            })
            .collect()
    }

    /// The samples stored below a tree node.
    pub fn samples_at(&self, node: NodeId) -> SampleSet {
        self.tree.samples_at(node, self.comparator_for_depth(self.tree.depth(node) + 1))
    }

    ///////////////
    // Lifecycle //
    ///////////////

    /// Schedules a polynomial; unknown variables are appended to the list of
    /// new variables and woven into the order by `prepare_elimination`.
    pub fn add_polynomial(&mut self, p: MPoly, variables: &[Variable]) {
        debug!("scheduling polynomial {p}");
        self.variables.complete(variables);
        self.scheduled.push(p);
        self.elimination_complete = false;
        self.sampling_complete = false;
    }

    /// Removes an input polynomial and every projection polynomial that
    /// loses its last parent, at every level.
    pub fn remove_polynomial(&mut self, p: &MPoly) {
        if let Some(pos) = self.scheduled.iter().position(|s| s == p) {
            self.scheduled.remove(pos);
            return;
        }
        let Some(id) = self.inputs.remove(p) else {
            warn!("removing unknown polynomial {p}");
            return;
        };
        if self.inputs.values().any(|&other| other == id) {
            // Another input normalizes to the same interned polynomial.
            return;
        }
        self.remove_polynomial_by_id(id, 0, false);
    }

    /// Removes a polynomial by handle from the given level; with
    /// `children_only`, only its projection descendants are removed.
    pub fn remove_polynomial_by_id(&mut self, id: PolyId, level: usize, children_only: bool) {
        let mut removed = vec![id];
        if !children_only {
            self.elim[level].erase(id);
        }
        for l in level + 1..self.elim.len() {
            let mut deleted = Vec::new();
            for &r in &removed {
                deleted.extend(self.elim[l].remove_by_parent(r));
            }
            removed.extend(deleted);
        }
        if children_only {
            removed.retain(|&r| r != id);
        }
        for r in removed {
            if !self.inputs.values().any(|&other| other == r) {
                self.arena.release(r);
            }
        }
        self.sampling_complete = false;
        self.prune_unused_variable_levels();
    }

    /// Prunes sample tree levels whose variables provably no longer occur.
    ///
    /// Pruning on an empty elimination set alone is unsound while the
    /// elimination is incomplete, so the remaining inputs are consulted: a
    /// level is pruned only when it is empty, its variable occurs in no
    /// active or scheduled input polynomial, and the same holds for every
    /// level before it in the projection order.
    fn prune_unused_variable_levels(&mut self) {
        let n = self.variables.len();
        let mut prefix = 0;
        for i in 0..n.min(self.elim.len()) {
            let var = self.variables.get(i);
            let unused = self.elim[i].is_empty()
                && !self.inputs.keys().any(|p| p.contains_var(var))
                && !self.scheduled.iter().any(|p| p.contains_var(var));
            if unused {
                prefix = i + 1;
            } else {
                break;
            }
        }
        if prefix > 0 {
            debug!("pruning sample tree below depth {}", n - prefix);
            self.tree.prune_below(n - prefix);
        }
    }

    /// Interleaves the scheduled polynomials into the top elimination set,
    /// creating new levels for new variables. The top level is made
    /// square-free and primitive. Returns whether the variable order
    /// changed.
    pub fn prepare_elimination(&mut self) -> CadResult<bool> {
        if self.setting.projection_operator == ProjectionKind::Hong {
            return Err(CadError::UnsupportedProjection(ProjectionKind::Hong));
        }
        let mut order_changed = false;
        let added = self.variables.append_new_to_current();
        if added > 0 {
            order_changed = true;
            for i in (0..added).rev() {
                let var = self.variables.get(i);
                self.elim.insert(
                    0,
                    EliminationSet::new(var, self.setting.elimination_order, self.setting.lifting_order),
                );
            }
        }
        while self.elim.len() < self.variables.len() {
            // Initial construction: one level per variable.
            let var = self.variables.get(self.elim.len());
            self.elim.push(EliminationSet::new(
                var,
                self.setting.elimination_order,
                self.setting.lifting_order,
            ));
        }
        if self.scheduled.is_empty() && !order_changed {
            return Ok(false);
        }
        let n = self.variables.len();
        if n == 0 {
            return Ok(order_changed);
        }
        let main = self.variables.get(0);
        for p in core::mem::take(&mut self.scheduled) {
            let up = p
                .to_univariate(main)
                .squarefree_part()
                .primitive_part();
            if up.to_mpoly().is_constant() {
                debug!("ignoring constant input polynomial {p}");
                continue;
            }
            let (id, _) = self.arena.intern(up);
            self.elim[0].insert(&self.arena, id, &[PolyPair::input()], false);
            self.inputs.insert(p, id);
        }
        self.elim[0].make_squarefree(&mut self.arena);
        self.elim[0].make_primitive(&mut self.arena);
        if self.setting.simplify_by_factorization {
            self.elim[0].factorize(&mut self.arena);
        }
        self.relocate_constants(0);
        for level in &mut self.elim {
            level.save_lifting_reset_state();
        }
        self.elimination_complete = false;
        self.sampling_complete = false;
        Ok(order_changed)
    }

    /// Moves polynomials constant in their level's variable down the level
    /// chain, starting at `from`.
    fn relocate_constants(&mut self, from: usize) {
        let n = self.elim.len();
        for i in from..n {
            if i + 1 < n {
                let var = self.variables.get(i + 1);
                let (head, tail) = self.elim.split_at_mut(i + 1);
                head[i].move_constants(&mut self.arena, &mut tail[0], var);
            } else {
                self.elim[i].remove_constants(&self.arena);
            }
        }
    }

    /// Runs all elimination steps to a fixpoint. Polynomials whose real
    /// roots provably fall outside the bounds on their variable may be
    /// dropped when the corresponding filter is enabled.
    pub fn complete_elimination(&mut self, bounds: &BoundMap) -> CadResult<()> {
        self.prepare_elimination()?;
        let n = self.elim.len();
        for i in 0..n.saturating_sub(1) {
            while !self.elim[i].elimination_queues_empty() {
                if self.an_answer_found() {
                    return Err(CadError::Cancelled);
                }
                self.step_elimination(i, true)?;
            }
            if self.setting.exclude_roots_with_no_witness {
                self.elim[i + 1].remove_polynomials_without_real_roots(&self.arena);
            }
            self.filter_level_by_bounds(i + 1, bounds);
            self.elim[i + 1].save_lifting_reset_state();
        }
        if n > 0 {
            self.elim[n - 1].clear_elimination_queues();
        }
        self.elimination_complete = true;
        Ok(())
    }

    /// One elimination step from `level` into `level + 1`.
    fn step_elimination(&mut self, level: usize, synchronous: bool) -> CadResult<Vec<PolyId>> {
        let var = self.variables.get(level + 1);
        let (head, tail) = self.elim.split_at_mut(level + 1);
        let added = head[level].eliminate_next_into(
            &mut self.arena,
            &mut tail[0],
            var,
            &self.setting,
            synchronous,
        )?;
        if !added.is_empty() {
            self.relocate_constants(level + 1);
        }
        Ok(added)
    }

    /// Drops univariate polynomials of a bounded level that have no real
    /// root inside the bound for that variable.
    fn filter_level_by_bounds(&mut self, level: usize, bounds: &BoundMap) {
        let Some(bound) = bounds.get(&level) else {
            return;
        };
        if bound.is_unbounded() {
            return;
        }
        for id in self.elim[level].ids() {
            let Some(q) = self.arena.get(id).specialize(&[]) else {
                continue;
            };
            if q.is_zero() {
                continue;
            }
            if cadre_arith::isolate::isolate_real_roots_within(&q, bound).is_empty() {
                trace!("dropping {} (no roots within {bound})", self.arena.get(id));
                self.elim[level].erase(id);
                self.elim[level].bounded = true;
            }
        }
    }

    /// Performs elimination steps until the given level gains a polynomial,
    /// or no further steps are possible. Returns the level that gained.
    fn eliminate(&mut self, level: usize, _bounds: &BoundMap) -> CadResult<Option<usize>> {
        loop {
            if self.an_answer_found() {
                return Err(CadError::Cancelled);
            }
            let Some(src) = (0..level)
                .rev()
                .find(|&l| !self.elim[l].elimination_queues_empty())
            else {
                return Ok(None);
            };
            let added = self.step_elimination(src, true)?;
            if !added.is_empty() && src + 1 == level {
                return Ok(Some(level));
            }
        }
    }

    /// Computes all samples of this decomposition, without any constraints.
    pub fn complete(&mut self) -> CadResult<()> {
        let bounds = BoundMap::new();
        self.complete_elimination(&bounds)?;
        let saved = self.setting.clone();
        self.setting.early_lifting_pruning = false;
        let table = ConstraintTable::default();
        let vars = self.variables.clone();
        let mut sat_path = Vec::new();
        let outcome = self.lift_check(
            self.tree.root(),
            vars.len(),
            true,
            &table,
            &vars,
            &bounds,
            &mut None,
            false,
            false,
            &mut sat_path,
        );
        self.setting = saved;
        match outcome {
            Ok(_) => {
                self.sampling_complete = true;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Switches the settings of a live instance; lifting positions are
    /// rebuilt from the full polynomial sets.
    pub fn alter_setting(&mut self, setting: CadSettings) {
        self.setting = setting;
        for level in &mut self.elim {
            level.reset_lifting_positions(&self.arena, true);
            level.save_lifting_reset_state();
        }
    }

    ///////////
    // Check //
    ///////////

    /// Decides a constraint conjunction over this decomposition.
    ///
    /// With `next`, the engine skips the previously found sample and prefers
    /// new ones. With `check_bounds`, samples outside `bounds` are skipped;
    /// on SAT the bounds are shrunk around the witness point.
    pub fn check(
        &mut self,
        constraints: &[Constraint],
        bounds: &mut BoundMap,
        next: bool,
        check_bounds: bool,
    ) -> CadResult<CheckResult> {
        self.interrupted = false;
        self.check_count += 1;
        info!(
            "check #{}: {} constraints, {} bounds",
            self.check_count,
            constraints.len(),
            bounds.len()
        );
        self.prepare_elimination()?;

        if constraints.is_empty() {
            let infeasible = bounds.values().any(Interval::is_empty);
            return Ok(if infeasible {
                CheckResult {
                    answer: Answer::Unsat,
                    point: None,
                    conflict: self.setting.compute_conflict_graph.then(ConflictGraph::new),
                }
            } else {
                CheckResult {
                    answer: Answer::Sat,
                    point: Some(Vec::new()),
                    conflict: None,
                }
            });
        }

        let mut table = ConstraintTable::default();
        table.set(constraints.to_vec(), &self.variables);
        self.constraints = table.clone();
        let mut conflict = self
            .setting
            .compute_conflict_graph
            .then(ConflictGraph::new);
        let bounds_nontrivial = bounds.values().any(|iv| !iv.is_unbounded());

        let outcome = self.main_check(&table, bounds, &mut conflict, next, check_bounds);
        match outcome {
            Ok(Lift::Sat(point)) => {
                self.trace = point.iter().rev().cloned().collect();
                if bounds_nontrivial {
                    self.shrink_bounds(bounds, &point);
                }
                debug!("satisfiable with {point:?}");
                Ok(CheckResult {
                    answer: Answer::Sat,
                    point: Some(point),
                    conflict: None,
                })
            }
            Ok(Lift::Unsat) => {
                if !bounds_nontrivial {
                    self.sampling_complete = true;
                }
                Ok(CheckResult {
                    answer: Answer::Unsat,
                    point: None,
                    conflict,
                })
            }
            Err(CadError::Cancelled) => {
                self.interrupted = true;
                Ok(CheckResult {
                    answer: Answer::Unknown,
                    point: None,
                    conflict: None,
                })
            }
            Err(CadError::Numeric(msg)) => {
                warn!("check degraded to unknown: {msg}");
                Ok(CheckResult {
                    answer: Answer::Unknown,
                    point: None,
                    conflict: None,
                })
            }
            Err(e @ CadError::UnsupportedProjection(_)) => Err(e),
            Err(CadError::Invariant(msg)) => {
                debug_assert!(false, "invariant violation: {msg}");
                log::error!("invariant violation: {msg}");
                Ok(CheckResult {
                    answer: Answer::Unknown,
                    point: None,
                    conflict: None,
                })
            }
        }
    }

    /// The check strategy in phases: re-walk the trace of the previous
    /// satisfying assignment, then search the sample tree, lifting where
    /// lifting positions remain.
    fn main_check(
        &mut self,
        table: &ConstraintTable,
        bounds: &BoundMap,
        conflict: &mut Option<ConflictGraph>,
        next: bool,
        check_bounds: bool,
    ) -> CadResult<Lift> {
        let vars = self.variables.clone();
        let n = vars.len();
        if n == 0 {
            // No variables: the constraints are ground.
            let sat = table.satisfied_by(&[], &vars, conflict.as_mut())?;
            return Ok(if sat { Lift::Sat(Vec::new()) } else { Lift::Unsat });
        }

        // Phase 1: follow the previous satisfying path while it still exists
        // and try to extend from its deepest surviving node.
        if !next && !self.trace.is_empty() {
            let trace = self.trace.clone();
            let mut node = self.tree.root();
            for value in &trace {
                match self.tree.find_child(node, value) {
                    Some(child) => node = child,
                    None => break,
                }
            }
            let depth = self.tree.depth(node);
            if depth > 0 {
                trace!("phase 1: retrying the trace at depth {depth}");
                let mut sat_path = Vec::new();
                if let Lift::Sat(point) = self.lift_check(
                    node,
                    n - depth,
                    false,
                    table,
                    &vars,
                    bounds,
                    conflict,
                    next,
                    check_bounds,
                    &mut sat_path,
                )? {
                    return Ok(Lift::Sat(point));
                }
            }
        }

        // Phases 2 and 3, interleaved by the lifting recursion.
        let mut sat_path = Vec::new();
        self.lift_check(
            self.tree.root(),
            n,
            true,
            table,
            &vars,
            bounds,
            conflict,
            next,
            check_bounds,
            &mut sat_path,
        )
    }

    fn comparator_for_depth(&self, depth: usize) -> SampleComparator {
        let n = self.variables.len();
        let integers_first = depth >= 1
            && depth <= n
            && self.setting.integer_handling != IntegerHandling::None
            && self.variables.get(n - depth).is_integer();
        SampleComparator::new(self.setting.sample_ordering, integers_first)
    }

    /// The lifting workhorse: walks the existing children of `node` in heap
    /// order, dequeues lifting polynomials to create new samples when the
    /// walk runs dry, and recurses one level down per sample. Descends
    /// exactly `open_vars` levels.
    fn lift_check(
        &mut self,
        node: NodeId,
        open_vars: usize,
        restart_lifting: bool,
        table: &ConstraintTable,
        vars: &Variables,
        bounds: &BoundMap,
        conflict: &mut Option<ConflictGraph>,
        next: bool,
        check_bounds: bool,
        sat_path: &mut Vec<NodeId>,
    ) -> CadResult<Lift> {
        if self.an_answer_found() {
            return Err(CadError::Cancelled);
        }
        let n = vars.len();
        if open_vars == 0 {
            return self.base_check(node, table, vars, conflict, next);
        }
        let level = open_vars - 1;
        let depth = n - open_vars + 1;
        if restart_lifting {
            self.elim[level].reset_lifting_positions(&self.arena, false);
        }
        let bound_iv = match bounds.get(&level) {
            Some(iv) if check_bounds => iv.clone(),
            _ => Interval::unbounded(),
        };
        let comp = self.comparator_for_depth(depth);
        let mut queue = self.tree.samples_at(node, comp);
        let mut considered = queue.clone();
        let mut found_sat: Option<Vec<Ran>> = None;
        let mut tried_default_witness = false;

        loop {
            if self.an_answer_found() {
                return Err(CadError::Cancelled);
            }
            if queue.is_empty() {
                if self.elim[level].lifting_queue_empty() {
                    if !self.elimination_complete
                        && self.eliminate(level, bounds)?.is_some()
                    {
                        continue;
                    }
                    if considered.is_empty() && !tried_default_witness && !bound_iv.is_empty() {
                        // An unconstrained level still needs one witness for
                        // the single cell it consists of.
                        tried_default_witness = true;
                        let w = Ran::new_numeric(bound_iv.sample_within(), false);
                        considered.insert(w.clone());
                        queue.insert(w);
                        continue;
                    }
                    break;
                }
                let pid = self
                    .elim[level]
                    .next_lifting_position()
                    .expect("non-empty lifting queue");
                let poly = self.arena.get(pid).clone();
                let partial = self.tree.construct_path(node);
                let point = pair_assignment(&partial, vars);
                trace!("lifting {poly} over {partial:?}");
                let roots = real_roots_specialized(&poly, &point, &bound_iv)?;
                self.elim[level].pop_lifting_position();
                let (new_samples, replaced) =
                    construct_samples(roots, &mut considered, &bound_iv);
                for (_, promoted) in replaced {
                    // Keep tree nodes in sync with promoted samples.
                    self.tree.store_sample(promoted, node);
                }
                for s in new_samples {
                    queue.insert(s);
                }
                continue;
            }

            let sample = queue.pop().expect("non-empty queue");
            if check_bounds && !sample.is_within(&bound_iv) {
                trace!("skipping sample {sample} outside {bound_iv}");
                continue;
            }
            let (child, _) = self.tree.store_sample(sample, node);
            let partial = self.tree.construct_path(child);
            if !table.satisfied_partially_by(&partial, vars, conflict.as_mut())? {
                trace!("partial assignment already falsified at depth {depth}");
                continue;
            }
            sat_path.push(child);
            let answer = self.lift_check(
                child,
                open_vars - 1,
                true,
                table,
                vars,
                bounds,
                conflict,
                next,
                check_bounds,
                sat_path,
            )?;
            sat_path.pop();
            if let Lift::Sat(point) = answer {
                if self.setting.early_lifting_pruning {
                    return Ok(Lift::Sat(point));
                }
                found_sat.get_or_insert(point);
            }
        }
        Ok(match found_sat {
            Some(point) => Lift::Sat(point),
            None => Lift::Unsat,
        })
    }

    /// Evaluates a full assignment: integrality first (backtracking via the
    /// ordinary return path when a policy rejects the point), then the whole
    /// constraint conjunction.
    fn base_check(
        &mut self,
        node: NodeId,
        table: &ConstraintTable,
        vars: &Variables,
        conflict: &mut Option<ConflictGraph>,
        next: bool,
    ) -> CadResult<Lift> {
        let path = self.tree.construct_path(node);
        debug_assert_eq!(path.len(), vars.len());
        if self.setting.integer_handling != IntegerHandling::None {
            for (i, r) in path.iter().enumerate() {
                if vars.get(i).is_integer() && !r.is_integral() {
                    trace!("rejecting non-integral value {r} for {}", vars.get(i));
                    return Ok(Lift::Unsat);
                }
            }
        }
        if next && !self.trace.is_empty() {
            let previous: Vec<Ran> = self.trace.iter().rev().cloned().collect();
            if previous == path {
                trace!("skipping the previously returned sample point");
                return Ok(Lift::Unsat);
            }
        }
        let sat = table.satisfied_by(&path, vars, conflict.as_mut())?;
        Ok(if sat { Lift::Sat(path) } else { Lift::Unsat })
    }

    ////////////
    // Bounds //
    ////////////

    /// Shrinks the bounds to the cell of the sample tree containing the
    /// satisfying point.
    pub fn shrink_bounds(&self, bounds: &mut BoundMap, point: &[Ran]) {
        let n = self.variables.len();
        if point.len() != n {
            return;
        }
        let mut node = self.tree.root();
        // The path stores the point deepest-first; walk shallowest-first.
        for (depth, value) in point.iter().rev().enumerate() {
            let Some(child) = self.tree.find_child(node, value) else {
                return;
            };
            let level = n - depth - 1;
            if bounds.contains_key(&level) {
                let iv = self.cell_interval(node, child);
                bounds.insert(level, iv);
            }
            node = child;
        }
    }

    /// The boundaries of the sample tree cell containing `point`, one
    /// interval per variable index.
    pub fn cell_bounds(&self, point: &[Ran]) -> Vec<Interval> {
        let n = self.variables.len();
        let mut out = vec![Interval::unbounded(); n];
        if point.len() != n {
            return out;
        }
        let mut node = self.tree.root();
        for (depth, value) in point.iter().rev().enumerate() {
            let Some(child) = self.tree.find_child(node, value) else {
                break;
            };
            out[n - depth - 1] = self.cell_interval(node, child);
            node = child;
        }
        out
    }

    /// The interval spanned by the neighbors of `child` below `node`.
    fn cell_interval(&self, node: NodeId, child: NodeId) -> Interval {
        let children = self.tree.children(node);
        let pos = children
            .iter()
            .position(|&c| c == child)
            .expect("child belongs to node");
        let value = self.tree.sample(child).expect("non-root node");
        let lower = pos
            .checked_sub(1)
            .map(|i| separator(self.tree.sample(children[i]).expect("sample"), value));
        let upper = children
            .get(pos + 1)
            .map(|&c| separator(value, self.tree.sample(c).expect("sample")));
        match (lower, upper) {
            (None, None) => Interval::unbounded(),
            (Some(lo), None) => Interval::above(lo, BoundKind::Weak),
            (None, Some(hi)) => Interval::below(hi, BoundKind::Weak),
            (Some(lo), Some(hi)) => Interval::new(lo, BoundKind::Weak, hi, BoundKind::Weak),
        }
    }
}

/// A projection order chosen greedily: at each step the variable with the
/// smallest (maximum degree, total degree, occurrence count) key over the
/// given polynomials is eliminated next, ties broken by variable id.
pub fn order_variables_greedily(variables: &[Variable], polynomials: &[MPoly]) -> Vec<Variable> {
    let mut remaining: Vec<Variable> = variables.to_vec();
    let mut order = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let best = remaining
            .iter()
            .copied()
            .min_by_key(|&v| {
                let max_deg = polynomials.iter().map(|p| p.degree_in(v)).max().unwrap_or(0);
                let total: u64 = polynomials.iter().map(|p| p.degree_in(v) as u64).sum();
                let occurrences = polynomials.iter().filter(|p| p.contains_var(v)).count();
                (max_deg, total, occurrences, v.id())
            })
            .expect("non-empty remaining set");
        order.push(best);
        remaining.retain(|&v| v != best);
    }
    order
}

/// A rational strictly between two distinct samples, never equal to either.
fn separator(a: &Ran, b: &Ran) -> Rational {
    debug_assert!(a < b);
    let mut a = a.clone();
    let mut b = b.clone();
    loop {
        if let (Some(x), Some(y)) = (a.value(), b.value()) {
            return simplest_between(x, y);
        }
        let ahi = a.enclosure().hi;
        let blo = b.enclosure().lo;
        if ahi < blo {
            return simplest_between(&ahi, &blo);
        }
        // Touching enclosures of two interval samples pin the boundary point
        // strictly between the roots.
        if ahi == blo && a.value().is_none() && b.value().is_none() {
            return ahi;
        }
        a.refine();
        b.refine();
    }
}

/// Builds the sample universe of one lifting step: every root lands in
/// `considered` flagged as a root, adjacent roots get a rational non-root
/// witness between them, and the region below the smallest and above the
/// largest root each get an outer witness, all restricted to `bound`.
/// Returns the newly added samples and the replacements performed by
/// promotion.
fn construct_samples(
    roots: Vec<Ran>,
    considered: &mut SampleSet,
    bound: &Interval,
) -> (Vec<Ran>, Vec<(Ran, Ran)>) {
    let mut new_samples = Vec::new();
    let mut replaced = Vec::new();
    for root in roots {
        debug_assert!(root.is_root());
        if !root.is_within(bound) {
            continue;
        }
        let ins = considered.insert(root);
        if ins.changed {
            new_samples.push(ins.stored.clone());
            if let Some(old) = ins.replaced {
                replaced.push((old, ins.stored));
            }
        }
    }

    let ordered: Vec<Ran> = considered.iter().cloned().collect();
    let mut witnesses: Vec<Rational> = Vec::new();
    if ordered.is_empty() {
        if !bound.is_empty() {
            witnesses.push(bound.sample_within());
        }
    } else {
        for pair in ordered.windows(2) {
            if pair[0].is_root() && pair[1].is_root() {
                witnesses.push(separator(&pair[0], &pair[1]));
            }
        }
        if ordered.first().is_some_and(Ran::is_root) {
            if let Some(w) = witness_outside(ordered.first().expect("non-empty"), bound, true) {
                witnesses.push(w);
            }
        }
        if ordered.last().is_some_and(Ran::is_root) {
            if let Some(w) = witness_outside(ordered.last().expect("non-empty"), bound, false) {
                witnesses.push(w);
            }
        }
    }
    for w in witnesses {
        let ins = considered.insert(Ran::new_numeric(w, false));
        if ins.changed {
            new_samples.push(ins.stored.clone());
            if let Some(old) = ins.replaced {
                replaced.push((old, ins.stored));
            }
        }
    }
    (new_samples, replaced)
}

/// A rational strictly below (`below`) or above the extremal sample, within
/// the bound; `None` when the bound leaves no room.
fn witness_outside(extremal: &Ran, bound: &Interval, below: bool) -> Option<Rational> {
    // No room when the sample already sits at the bound edge.
    if below {
        if let Some((lo, _)) = bound.lower() {
            if extremal.cmp_rational(lo) != core::cmp::Ordering::Greater {
                return None;
            }
        }
    } else if let Some((hi, _)) = bound.upper() {
        if extremal.cmp_rational(hi) != core::cmp::Ordering::Less {
            return None;
        }
    }
    let mut pivot = extremal.clone();
    loop {
        let e = pivot.enclosure();
        let region = if below {
            bound.intersect(&Interval::below(e.lo.clone(), BoundKind::Weak))
        } else {
            bound.intersect(&Interval::above(e.hi.clone(), BoundKind::Weak))
        };
        if !region.is_empty() {
            let degenerate = matches!(
                (region.lower(), region.upper()),
                (Some((lo, _)), Some((hi, _))) if lo == hi
            );
            let w = if degenerate {
                region.lower().expect("degenerate region has bounds").0.clone()
            } else {
                region.sample_within()
            };
            if pivot.cmp_rational(&w) != core::cmp::Ordering::Equal {
                return Some(w);
            }
        }
        pivot.refine();
    }
}

#[cfg(test)]
mod tests {
    use cadre_arith::num_util::{int, rat};
    use cadre_arith::{QPoly, Sign};

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

    fn line() -> MPoly {
        &MPoly::var(x()) - &MPoly::var(y())
    }

    #[test]
    fn witness_construction_separates_roots() {
        let comp = SampleComparator::new(crate::sample::SampleOrdering::RatRoot, false);
        let mut considered = SampleSet::new(comp);
        let roots = vec![
            Ran::new_numeric(int(-1), true),
            Ran::new_numeric(int(1), true),
        ];
        let (added, _) = construct_samples(roots, &mut considered, &Interval::unbounded());
        // Two roots, one middle witness, two outer witnesses.
        assert_eq!(added.len(), 5);
        let values: Vec<Ran> = considered.iter().cloned().collect();
        for w in values.windows(2) {
            assert!(!(w[0].is_root() && w[1].is_root()));
        }
        assert!(!values.first().unwrap().is_root());
        assert!(!values.last().unwrap().is_root());
    }

    #[test]
    fn witness_construction_respects_bounds() {
        let comp = SampleComparator::new(crate::sample::SampleOrdering::RatRoot, false);
        let mut considered = SampleSet::new(comp);
        let roots = vec![
            Ran::new_numeric(int(-1), true),
            Ran::new_numeric(int(1), true),
        ];
        let bound = Interval::open(int(0), int(5));
        let (added, _) = construct_samples(roots, &mut considered, &bound);
        for s in &added {
            assert!(s.is_within(&bound), "{s} escapes {bound}");
        }
        assert!(considered.iter().all(|s| s.is_within(&bound)));
    }

    #[test]
    fn algebraic_roots_get_witnesses() {
        let comp = SampleComparator::new(crate::sample::SampleOrdering::RatRoot, false);
        let mut considered = SampleSet::new(comp);
        // sqrt(2) with a deliberately wide isolating interval, and its
        // negative with an overlapping one.
        let pos = Ran::new_algebraic(QPoly::from_i64(&[-2, 0, 1]), int(0), int(8), true);
        let neg = Ran::new_algebraic(QPoly::from_i64(&[-2, 0, 1]), int(-8), int(0), true);
        let (added, _) = construct_samples(vec![neg, pos], &mut considered, &Interval::unbounded());
        assert_eq!(added.len(), 5);
        let values: Vec<Ran> = considered.iter().cloned().collect();
        for w in values.windows(2) {
            assert!(w[0] < w[1]);
            assert!(!(w[0].is_root() && w[1].is_root()));
        }
    }

    #[test]
    fn empty_constraints_are_sat_without_bounds() {
        let mut cad = Cad::with_setting(CadSettings::default());
        cad.add_polynomial(circle(), &[x(), y()]);
        let mut bounds = BoundMap::new();
        let res = cad.check(&[], &mut bounds, false, true).unwrap();
        assert_eq!(res.answer, Answer::Sat);
        assert_eq!(res.point, Some(Vec::new()));
    }

    #[test]
    fn empty_constraints_with_infeasible_bounds_are_unsat() {
        let mut cad = Cad::with_setting(CadSettings::default());
        cad.add_polynomial(circle(), &[x(), y()]);
        let mut bounds = BoundMap::new();
        bounds.insert(0, Interval::open(int(1), int(1)));
        let res = cad.check(&[], &mut bounds, false, true).unwrap();
        assert_eq!(res.answer, Answer::Unsat);
    }

    #[test]
    fn hong_projection_is_rejected_at_setup() {
        let mut setting = CadSettings::default();
        setting.projection_operator = ProjectionKind::Hong;
        let mut cad = Cad::with_setting(setting);
        cad.add_polynomial(circle(), &[x(), y()]);
        assert!(matches!(
            cad.prepare_elimination(),
            Err(CadError::UnsupportedProjection(ProjectionKind::Hong))
        ));
    }

    #[test]
    fn prepare_weaves_new_variables_in_front() {
        let mut cad = Cad::with_setting(CadSettings::default());
        cad.add_polynomial(circle(), &[x(), y()]);
        cad.prepare_elimination().unwrap();
        assert_eq!(cad.variables(), &[x(), y()]);
        let z = Variable::real(2);
        cad.add_polynomial(&MPoly::var(z) * &MPoly::var(z), &[z]);
        let changed = cad.prepare_elimination().unwrap();
        assert!(changed);
        assert_eq!(cad.variables(), &[z, x(), y()]);
        assert_eq!(cad.elimination_sets().len(), 3);
    }

    #[test]
    fn add_then_remove_restores_structure() {
        let mut cad = Cad::with_setting(CadSettings::default());
        cad.add_polynomial(circle(), &[x(), y()]);
        cad.prepare_elimination().unwrap();
        cad.complete_elimination(&BoundMap::new()).unwrap();
        let sizes_before: Vec<usize> =
            cad.elimination_sets().iter().map(EliminationSet::len).collect();
        let arena_before = cad.arena().len();

        cad.add_polynomial(line(), &[x(), y()]);
        cad.complete_elimination(&BoundMap::new()).unwrap();
        assert!(cad.elimination_sets()[1].len() >= sizes_before[1]);

        cad.remove_polynomial(&line());
        let sizes_after: Vec<usize> =
            cad.elimination_sets().iter().map(EliminationSet::len).collect();
        assert_eq!(sizes_before, sizes_after);
        assert_eq!(cad.arena().len(), arena_before);
    }

    #[test]
    fn interrupts_yield_unknown() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut cad = Cad::new(
            vec![x(), y()],
            vec![circle()],
            vec![flag],
            CadSettings::default(),
        );
        let cons = Constraint::new(circle(), Sign::Zero, vec![x(), y()]);
        let mut bounds = BoundMap::new();
        let res = cad.check(&[cons], &mut bounds, false, true).unwrap();
        assert_eq!(res.answer, Answer::Unknown);
        assert!(cad.is_interrupted());
    }

    #[test]
    fn separator_between_mixed_samples() {
        let a = Ran::new_numeric(int(0), false);
        let b = Ran::new_algebraic(QPoly::from_i64(&[-2, 0, 1]), int(0), int(2), true);
        let s = separator(&a, &b);
        assert!(s > int(0));
        assert!(b.cmp_rational(&s) == core::cmp::Ordering::Greater);
        let c = Ran::new_numeric(rat(3, 2), false);
        let s2 = separator(&b, &c);
        assert!(b.cmp_rational(&s2) == core::cmp::Ordering::Less);
        assert!(s2 < rat(3, 2));
    }
}
