//! Per-level sets of projection polynomials with their work queues and
//! parent/child provenance.
//!
//! Each level owns three queues: paired elimination, single elimination and
//! lifting. The paired and single queues drive projection; their interplay
//! (see [`EliminationSet::eliminate_next_into`]) allows paired-only steps
//! whose children inherit an "asynchronous" status and are caught up later.
//! The lifting queue feeds sample construction and can be reset either from
//! a saved state or from the full polynomial set.

use core::cmp::Ordering;
use std::collections::BTreeSet;

use cadre_arith::{UPoly, Variable};
use hashbrown::{HashMap, HashSet};
use log::{debug, trace};

use crate::arena::{PolyArena, PolyId};
use crate::error::CadResult;
use crate::projection::{project_paired, project_single};
use crate::settings::{CadSettings, PolyOrder};

/// Provenance of a projection polynomial: one or two parents from the level
/// above, or none for an input polynomial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolyPair(Option<PolyId>, Option<PolyId>);

impl PolyPair {
    pub fn input() -> Self {
        PolyPair(None, None)
    }

    pub fn single(p: PolyId) -> Self {
        PolyPair(Some(p), None)
    }

    pub fn pair(p: PolyId, q: PolyId) -> Self {
        if p <= q {
            PolyPair(Some(p), Some(q))
        } else {
            PolyPair(Some(q), Some(p))
        }
    }

    pub fn contains(&self, p: PolyId) -> bool {
        self.0 == Some(p) || self.1 == Some(p)
    }

    pub fn parents(&self) -> impl Iterator<Item = PolyId> {
        [self.0, self.1].into_iter().flatten()
    }

    pub fn is_input(&self) -> bool {
        self.0.is_none() && self.1.is_none()
    }
}

fn poly_size(p: &UPoly) -> usize {
    p.coeffs().iter().map(|c| c.terms().len()).sum()
}

/// Total order on interned polynomials; ties are broken by handle id, so
/// queue order is reproducible run to run.
fn cmp_polys(arena: &PolyArena, order: PolyOrder, a: PolyId, b: PolyId) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let (pa, pb) = (arena.get(a), arena.get(b));
    let key = match order {
        PolyOrder::DegreeThenSize => (pa.degree(), poly_size(pa)).cmp(&(pb.degree(), poly_size(pb))),
        PolyOrder::SizeThenDegree => (poly_size(pa), pa.degree()).cmp(&(poly_size(pb), pb.degree())),
    };
    key.then(a.cmp(&b))
}

fn insert_sorted(
    queue: &mut Vec<PolyId>,
    id: PolyId,
    arena: &PolyArena,
    order: PolyOrder,
) {
    if queue.contains(&id) {
        return;
    }
    let pos = queue.partition_point(|&q| cmp_polys(arena, order, q, id) == Ordering::Less);
    queue.insert(pos, id);
}

/// The set of projection polynomials at one elimination level.
#[derive(Clone, Debug)]
pub struct EliminationSet {
    /// Main variable of every polynomial stored here.
    level_var: Variable,
    polynomials: HashSet<PolyId>,
    single_queue: Vec<PolyId>,
    paired_queue: Vec<PolyId>,
    lifting_queue: Vec<PolyId>,
    lifting_reset: Vec<PolyId>,
    /// Children in this set per parent one level up.
    children_per_parent: HashMap<PolyId, HashSet<PolyId>>,
    /// Parent pairs per polynomial of this set.
    parents_per_child: HashMap<PolyId, BTreeSet<PolyPair>>,
    elimination_order: PolyOrder,
    lifting_order: PolyOrder,
    /// Some polynomials here are only valid within variable bounds.
    pub bounded: bool,
}

impl EliminationSet {
    pub fn new(level_var: Variable, elimination_order: PolyOrder, lifting_order: PolyOrder) -> Self {
        EliminationSet {
            level_var,
            polynomials: HashSet::new(),
            single_queue: Vec::new(),
            paired_queue: Vec::new(),
            lifting_queue: Vec::new(),
            lifting_reset: Vec::new(),
            children_per_parent: HashMap::new(),
            parents_per_child: HashMap::new(),
            elimination_order,
            lifting_order,
            bounded: false,
        }
    }

    pub fn level_var(&self) -> Variable {
        self.level_var
    }

    pub fn len(&self) -> usize {
        self.polynomials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polynomials.is_empty()
    }

    pub fn contains(&self, id: PolyId) -> bool {
        self.polynomials.contains(&id)
    }

    /// Polynomial handles sorted by id; the deterministic iteration order.
    pub fn ids(&self) -> Vec<PolyId> {
        let mut ids: Vec<PolyId> = self.polynomials.iter().copied().collect();
        ids.sort();
        ids
    }

    pub fn parents_of(&self, id: PolyId) -> impl Iterator<Item = &PolyPair> {
        self.parents_per_child.get(&id).into_iter().flatten()
    }

    /// Whether `id` stems from a projection rather than from the input.
    pub fn has_nontrivial_parents(&self, id: PolyId) -> bool {
        self.parents_of(id).any(|p| !p.is_input())
    }

    ////////////////////
    // Access methods //
    ////////////////////

    /// Inserts a polynomial with the given provenance. Re-inserting an
    /// existing polynomial only augments its parent information; with
    /// `avoid_single` false it may also be scheduled back into the single
    /// queue while its paired step is still pending.
    pub fn insert(
        &mut self,
        arena: &PolyArena,
        id: PolyId,
        parents: &[PolyPair],
        avoid_single: bool,
    ) -> (PolyId, bool) {
        let inserted = self.polynomials.insert(id);
        let bucket = self.parents_per_child.entry(id).or_default();
        for pair in parents {
            bucket.insert(*pair);
            for parent in pair.parents() {
                self.children_per_parent.entry(parent).or_default().insert(id);
            }
        }
        if inserted {
            trace!("level {}: new polynomial {}", self.level_var, arena.get(id));
            if !arena.get(id).is_constant() {
                insert_sorted(&mut self.lifting_queue, id, arena, self.lifting_order);
                // The reset state covers the saved queue plus everything
                // inserted afterwards.
                insert_sorted(&mut self.lifting_reset, id, arena, self.lifting_order);
            }
            insert_sorted(&mut self.paired_queue, id, arena, self.elimination_order);
            if !avoid_single {
                insert_sorted(&mut self.single_queue, id, arena, self.elimination_order);
            }
        } else if !avoid_single
            && self.paired_queue.contains(&id)
            && !self.single_queue.contains(&id)
        {
            // Catch-up for a polynomial first produced by an asynchronous
            // paired step.
            insert_sorted(&mut self.single_queue, id, arena, self.elimination_order);
        }
        (id, inserted)
    }

    /// Removes a polynomial and all its bookkeeping. Returns whether it was
    /// present.
    pub fn erase(&mut self, id: PolyId) -> bool {
        if !self.polynomials.remove(&id) {
            return false;
        }
        self.single_queue.retain(|&q| q != id);
        self.paired_queue.retain(|&q| q != id);
        self.lifting_queue.retain(|&q| q != id);
        self.lifting_reset.retain(|&q| q != id);
        if let Some(bucket) = self.parents_per_child.remove(&id) {
            for pair in bucket {
                for parent in pair.parents() {
                    if let Some(children) = self.children_per_parent.get_mut(&parent) {
                        children.remove(&id);
                        if children.is_empty() {
                            self.children_per_parent.remove(&parent);
                        }
                    }
                }
            }
        }
        true
    }

    /// Removes exactly those polynomials whose parent set becomes empty once
    /// `parent` is gone; polynomials with other parents only lose the pairs
    /// mentioning `parent`. Returns the deleted handles.
    pub fn remove_by_parent(&mut self, parent: PolyId) -> Vec<PolyId> {
        let Some(children) = self.children_per_parent.remove(&parent) else {
            return Vec::new();
        };
        let mut deleted = Vec::new();
        for child in children {
            let Some(bucket) = self.parents_per_child.get_mut(&child) else {
                continue;
            };
            bucket.retain(|pair| !pair.contains(parent));
            if bucket.is_empty() {
                self.erase(child);
                deleted.push(child);
            }
        }
        if !deleted.is_empty() {
            debug!(
                "level {}: removed {} orphans of parent {parent}",
                self.level_var,
                deleted.len()
            );
        }
        deleted
    }

    pub fn clear(&mut self) {
        self.polynomials.clear();
        self.single_queue.clear();
        self.paired_queue.clear();
        self.lifting_queue.clear();
        self.lifting_reset.clear();
        self.children_per_parent.clear();
        self.parents_per_child.clear();
        self.bounded = false;
    }

    //////////////////////////////////
    // Lifting position management  //
    //////////////////////////////////

    pub fn next_lifting_position(&self) -> Option<PolyId> {
        self.lifting_queue.first().copied()
    }

    pub fn pop_lifting_position(&mut self) -> Option<PolyId> {
        if self.lifting_queue.is_empty() {
            None
        } else {
            Some(self.lifting_queue.remove(0))
        }
    }

    pub fn lifting_queue_empty(&self) -> bool {
        self.lifting_queue.is_empty()
    }

    pub fn full_lifting_queue(&self) -> bool {
        self.lifting_queue.len() == self.polynomials.len()
    }

    /// Refills the lifting queue: from the whole polynomial set when `full`,
    /// otherwise from the saved reset state.
    pub fn reset_lifting_positions(&mut self, arena: &PolyArena, full: bool) {
        if full {
            self.lifting_queue.clear();
            for id in self.ids() {
                if !arena.get(id).is_constant() {
                    insert_sorted(&mut self.lifting_queue, id, arena, self.lifting_order);
                }
            }
        } else {
            self.lifting_queue = self
                .lifting_reset
                .iter()
                .copied()
                .filter(|id| self.polynomials.contains(id))
                .collect();
        }
    }

    /// Snapshots the current lifting queue as the new reset state.
    pub fn save_lifting_reset_state(&mut self) {
        self.lifting_reset = self.lifting_queue.clone();
    }

    /////////////////////////////////////
    // Elimination position management //
    /////////////////////////////////////

    pub fn single_elimination_queue_empty(&self) -> bool {
        self.single_queue.is_empty()
    }

    pub fn paired_elimination_queue_empty(&self) -> bool {
        self.paired_queue.is_empty()
    }

    pub fn elimination_queues_empty(&self) -> bool {
        self.single_queue.is_empty() && self.paired_queue.is_empty()
    }

    /// Empties both elimination queues. Used on the last level, which has
    /// nothing to eliminate into.
    pub fn clear_elimination_queues(&mut self) {
        self.single_queue.clear();
        self.paired_queue.clear();
    }

    /// Performs both the paired eliminations of `id` against every other
    /// polynomial of this level and its single elimination, delivering the
    /// children into `dst`. The polynomial is popped from both elimination
    /// queues. Returns the handles newly added to `dst`.
    pub fn eliminate_into(
        &mut self,
        arena: &mut PolyArena,
        id: PolyId,
        dst: &mut EliminationSet,
        dst_var: Variable,
        settings: &CadSettings,
    ) -> CadResult<Vec<PolyId>> {
        let mut added = Vec::new();
        for other in self.ids() {
            if other == id {
                continue;
            }
            let children =
                project_paired(settings.projection_operator, arena.get(id), arena.get(other), dst_var)?;
            for child in children {
                dst.insert_projection(arena, child, PolyPair::pair(id, other), false, &mut added);
            }
        }
        let children = project_single(settings.projection_operator, arena.get(id), dst_var)?;
        for child in children {
            dst.insert_projection(arena, child, PolyPair::single(id), false, &mut added);
        }
        self.single_queue.retain(|&q| q != id);
        self.paired_queue.retain(|&q| q != id);
        Ok(added)
    }

    /// Steps the elimination queues once.
    ///
    /// In synchronous mode, when the heads of the single and the paired
    /// queue agree, both eliminations of that polynomial are performed;
    /// otherwise only the paired step runs and the children are inserted
    /// with `avoid_single`, inheriting the asynchronous status. When the
    /// paired queue is empty, the single step runs.
    pub fn eliminate_next_into(
        &mut self,
        arena: &mut PolyArena,
        dst: &mut EliminationSet,
        dst_var: Variable,
        settings: &CadSettings,
        synchronous: bool,
    ) -> CadResult<Vec<PolyId>> {
        let Some(&paired_head) = self.paired_queue.first() else {
            let Some(&single_head) = self.single_queue.first() else {
                return Ok(Vec::new());
            };
            let mut added = Vec::new();
            let children =
                project_single(settings.projection_operator, arena.get(single_head), dst_var)?;
            for child in children {
                dst.insert_projection(arena, child, PolyPair::single(single_head), false, &mut added);
            }
            self.single_queue.remove(0);
            return Ok(added);
        };
        if synchronous && self.single_queue.first() == Some(&paired_head) {
            return self.eliminate_into(arena, paired_head, dst, dst_var, settings);
        }
        let mut added = Vec::new();
        for other in self.ids() {
            if other == paired_head {
                continue;
            }
            let children = project_paired(
                settings.projection_operator,
                arena.get(paired_head),
                arena.get(other),
                dst_var,
            )?;
            for child in children {
                dst.insert_projection(
                    arena,
                    child,
                    PolyPair::pair(paired_head, other),
                    true,
                    &mut added,
                );
            }
        }
        self.paired_queue.remove(0);
        Ok(added)
    }

    /// Normalizes and inserts one projection result. Rational constants are
    /// dropped; polynomials constant in the level variable are kept (they
    /// are relocated by [`EliminationSet::move_constants`]) but never enter
    /// the lifting queue.
    fn insert_projection(
        &mut self,
        arena: &mut PolyArena,
        child: UPoly,
        parents: PolyPair,
        avoid_single: bool,
        added: &mut Vec<PolyId>,
    ) {
        let normalized = child.squarefree_part().primitive_part();
        if normalized.is_zero() || normalized.to_mpoly().is_constant() {
            trace!("dropping constant projection result {child}");
            return;
        }
        let (id, _) = arena.intern(normalized);
        let (_, inserted) = self.insert(arena, id, &[parents], avoid_single);
        if inserted {
            added.push(id);
        }
    }

    ////////////////
    // Operations //
    ////////////////

    /// Moves polynomials constant in this level's variable to `dst`, the
    /// next lower level; polynomials without any variable are deleted.
    pub fn move_constants(&mut self, arena: &mut PolyArena, dst: &mut EliminationSet, dst_var: Variable) {
        for id in self.ids() {
            let p = arena.get(id);
            if !p.is_constant() {
                continue;
            }
            if p.to_mpoly().is_constant() {
                self.erase(id);
                continue;
            }
            let switched = p.switch_main_variable(dst_var);
            let (nid, _) = arena.intern(switched);
            let parents: Vec<PolyPair> = self.parents_of(id).copied().collect();
            dst.insert(arena, nid, &parents, false);
            self.erase(id);
        }
    }

    /// Deletes all polynomials constant in this level's variable.
    pub fn remove_constants(&mut self, arena: &PolyArena) {
        for id in self.ids() {
            if arena.get(id).is_constant() {
                self.erase(id);
            }
        }
    }

    /// Deletes all polynomials that provably have no real roots.
    pub fn remove_polynomials_without_real_roots(&mut self, arena: &PolyArena) {
        for id in self.ids() {
            if arena.get(id).definitely_no_real_roots() {
                debug!("dropping rootless polynomial {}", arena.get(id));
                self.erase(id);
            }
        }
    }

    /// Replaces every polynomial by its square-free part. Only valid before
    /// this level has produced children.
    pub fn make_squarefree(&mut self, arena: &mut PolyArena) {
        for id in self.ids() {
            let sf = arena.get(id).squarefree_part();
            self.replace(arena, id, sf);
        }
    }

    /// Replaces every polynomial by its primitive part. Only valid before
    /// this level has produced children.
    pub fn make_primitive(&mut self, arena: &mut PolyArena) {
        for id in self.ids() {
            let pp = arena.get(id).primitive_part();
            self.replace(arena, id, pp);
        }
    }

    /// Splits every polynomial into coarse square-free factors, each
    /// inheriting the parent information. Only valid before this level has
    /// produced children.
    pub fn factorize(&mut self, arena: &mut PolyArena) {
        for id in self.ids() {
            let factors = arena.get(id).squarefree_factors();
            if factors.len() == 1 && &factors[0] == arena.get(id) {
                continue;
            }
            let parents: Vec<PolyPair> = self.parents_of(id).copied().collect();
            self.erase(id);
            for f in factors {
                if f.to_mpoly().is_constant() {
                    continue;
                }
                let (fid, _) = arena.intern(f);
                self.insert(arena, fid, &parents, false);
            }
        }
    }

    fn replace(&mut self, arena: &mut PolyArena, old: PolyId, new_poly: UPoly) {
        let (nid, _) = arena.intern(new_poly);
        if nid == old {
            return;
        }
        let parents: Vec<PolyPair> = self.parents_of(old).copied().collect();
        let in_single = self.single_queue.contains(&old);
        let in_paired = self.paired_queue.contains(&old);
        let in_lifting = self.lifting_queue.contains(&old);
        self.erase(old);
        self.insert(arena, nid, &parents, false);
        // An already processed polynomial must not re-enter the queues
        // through the replacement.
        if !in_single {
            self.single_queue.retain(|&q| q != nid);
        }
        if !in_paired {
            self.paired_queue.retain(|&q| q != nid);
        }
        if !in_lifting {
            self.lifting_queue.retain(|&q| q != nid);
        }
    }

    /// Debug consistency: every queued handle is in the set, every reset
    /// entry resolves, every child has a parent bucket.
    pub fn is_consistent(&self) -> bool {
        let queues = [
            &self.single_queue,
            &self.paired_queue,
            &self.lifting_queue,
            &self.lifting_reset,
        ];
        for q in queues {
            if !q.iter().all(|id| self.polynomials.contains(id)) {
                return false;
            }
        }
        self.polynomials
            .iter()
            .all(|id| self.parents_per_child.contains_key(id))
    }
}
