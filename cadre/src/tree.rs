//! The shared sample tree: a rooted tree whose depth-k nodes carry real
//! algebraic numbers, so every path from the root encodes a partial
//! assignment of the lifting variables.

use core::fmt;

use cadre_arith::Ran;
use log::trace;

use crate::sample::{SampleComparator, SampleSet};

/// Index of a node in the tree. Stable across insertions; pruned nodes leave
/// dead slots behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct Node {
    /// `None` exactly for the anonymous root.
    sample: Option<Ran>,
    parent: Option<NodeId>,
    /// Children in strictly increasing sample order.
    children: Vec<NodeId>,
    depth: u32,
    alive: bool,
}

/// Outcome of storing a sample below a node.
#[derive(Clone, Debug)]
pub enum StoreOutcome {
    /// A new child was created.
    New,
    /// An equal child existed; its representation or root flag was upgraded.
    Merged(Ran),
    /// An equal child existed and nothing changed.
    Unchanged,
}

/// The sample tree. The root is an anonymous virtual point; a node at depth
/// k holds the value assigned to the k-th lifting variable.
#[derive(Clone, Debug)]
pub struct SampleTree {
    nodes: Vec<Node>,
}

impl Default for SampleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleTree {
    pub fn new() -> Self {
        SampleTree {
            nodes: vec![Node {
                sample: None,
                parent: None,
                children: Vec::new(),
                depth: 0,
                alive: true,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.nodes[node.index()].alive
    }

    pub fn sample(&self, node: NodeId) -> Option<&Ran> {
        self.nodes[node.index()].sample.as_ref()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    pub fn depth(&self, node: NodeId) -> usize {
        self.nodes[node.index()].depth as usize
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].children
    }

    /// Number of live nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.alive).count()
    }

    /// Stores `sample` as a child of `parent`, keeping children ordered by
    /// value. An equal child is upgraded per the replacement rules instead
    /// of being duplicated.
    pub fn store_sample(&mut self, sample: Ran, parent: NodeId) -> (NodeId, StoreOutcome) {
        debug_assert!(self.is_alive(parent));
        let children = self.nodes[parent.index()].children.clone();
        let mut insert_at = children.len();
        for (i, &child) in children.iter().enumerate() {
            let existing = self.nodes[child.index()]
                .sample
                .as_ref()
                .expect("non-root nodes carry samples");
            match sample.compare(existing) {
                core::cmp::Ordering::Greater => continue,
                core::cmp::Ordering::Less => {
                    insert_at = i;
                    break;
                }
                core::cmp::Ordering::Equal => {
                    let simplifies = sample.is_numeric() && !existing.is_numeric();
                    let promotes = sample.is_root() && !existing.is_root();
                    if !simplifies && !promotes {
                        return (child, StoreOutcome::Unchanged);
                    }
                    let old = existing.clone();
                    let mut merged = if simplifies { sample } else { old.clone() };
                    merged.set_root(old.is_root() || merged.is_root() || promotes);
                    trace!("upgrading tree sample {old} to {merged}");
                    self.nodes[child.index()].sample = Some(merged);
                    return (child, StoreOutcome::Merged(old));
                }
            }
        }
        let depth = self.nodes[parent.index()].depth + 1;
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            sample: Some(sample),
            parent: Some(parent),
            children: Vec::new(),
            depth,
            alive: true,
        });
        self.nodes[parent.index()].children.insert(insert_at, id);
        (id, StoreOutcome::New)
    }

    /// The child of `parent` holding a value equal to `sample`.
    pub fn find_child(&self, parent: NodeId, sample: &Ran) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.sample(c).is_some_and(|s| s == sample))
    }

    /// The partial assignment encoded by the path from `node` to the root,
    /// deepest value first.
    pub fn construct_path(&self, node: NodeId) -> Vec<Ran> {
        let mut path = Vec::new();
        let mut cur = Some(node);
        while let Some(n) = cur {
            if let Some(s) = &self.nodes[n.index()].sample {
                path.push(s.clone());
            }
            cur = self.nodes[n.index()].parent;
        }
        path
    }

    /// All samples stored below `node`, as a fresh sample set.
    pub fn samples_at(&self, node: NodeId, comp: SampleComparator) -> SampleSet {
        let mut set = SampleSet::new(comp);
        for &child in self.children(node) {
            if let Some(s) = self.sample(child) {
                set.insert(s.clone());
            }
        }
        set
    }

    /// Deletes `node` and every descendant.
    pub fn prune_subtree(&mut self, node: NodeId) {
        if node == self.root() {
            let children = core::mem::take(&mut self.nodes[0].children);
            for c in children {
                self.kill(c);
            }
            return;
        }
        if let Some(parent) = self.nodes[node.index()].parent {
            self.nodes[parent.index()].children.retain(|&c| c != node);
        }
        self.kill(node);
    }

    /// Deletes every node strictly deeper than `depth`.
    pub fn prune_below(&mut self, depth: usize) {
        let victims: Vec<NodeId> = (0..self.nodes.len() as u32)
            .map(NodeId)
            .filter(|&n| self.nodes[n.index()].alive && self.depth(n) == depth + 1)
            .collect();
        for v in victims {
            self.prune_subtree(v);
        }
    }

    fn kill(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            let slot = &mut self.nodes[n.index()];
            slot.alive = false;
            slot.sample = None;
            stack.extend(core::mem::take(&mut slot.children));
        }
    }

    /// Live nodes in depth-first preorder, children in increasing sample
    /// order.
    pub fn dfs_preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(n) = stack.pop() {
            if !self.is_alive(n) {
                continue;
            }
            out.push(n);
            stack.extend(self.children(n).iter().rev());
        }
        out
    }

    /// Live leaves under `from`, left to right.
    pub fn leaves(&self, from: NodeId) -> Vec<NodeId> {
        self.dfs_preorder(from)
            .into_iter()
            .filter(|&n| self.children(n).is_empty())
            .collect()
    }

    /// Checks the structural invariants: children strictly increasing in
    /// value, and no two adjacent children both root-flagged.
    pub fn is_consistent(&self) -> bool {
        for (i, node) in self.nodes.iter().enumerate() {
            if !node.alive {
                continue;
            }
            let mut last: Option<&Ran> = None;
            for &c in &node.children {
                let Some(s) = self.sample(c) else {
                    return false;
                };
                if let Some(prev) = last {
                    if prev.compare(s) != core::cmp::Ordering::Less {
                        log::error!("children of node {i} out of order");
                        return false;
                    }
                    if prev.is_root() && s.is_root() {
                        log::error!("adjacent root samples below node {i}");
                        return false;
                    }
                }
                last = Some(s);
            }
        }
        true
    }
}

impl fmt::Display for SampleTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in self.dfs_preorder(self.root()) {
            let depth = self.depth(n);
            match self.sample(n) {
                None => writeln!(f, "<root>")?,
                Some(s) => writeln!(f, "{:indent$}{s}{}", "", if s.is_root() { " (root)" } else { "" }, indent = 2 * depth)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cadre_arith::num_util::{int, rat};
    use cadre_arith::QPoly;

    use super::*;
    use crate::sample::SampleOrdering;

    fn num(k: i64, root: bool) -> Ran {
        Ran::new_numeric(int(k), root)
    }

    #[test]
    fn children_stay_ordered() {
        let mut t = SampleTree::new();
        let r = t.root();
        t.store_sample(num(2, true), r);
        t.store_sample(num(0, false), r);
        t.store_sample(num(1, false), r);
        let vals: Vec<_> = t
            .children(r)
            .iter()
            .map(|&c| t.sample(c).unwrap().value().unwrap().clone())
            .collect();
        assert_eq!(vals, vec![int(0), int(1), int(2)]);
        assert!(t.is_consistent());
    }

    #[test]
    fn equal_samples_merge() {
        let mut t = SampleTree::new();
        let r = t.root();
        let (a, _) = t.store_sample(num(1, false), r);
        let (b, outcome) = t.store_sample(num(1, true), r);
        assert_eq!(a, b);
        assert!(matches!(outcome, StoreOutcome::Merged(_)));
        assert!(t.sample(a).unwrap().is_root());
        assert_eq!(t.children(r).len(), 1);
        // Numeric replaces an equal interval representation.
        let sqrt_like = Ran::new_algebraic(QPoly::from_i64(&[-2, 0, 1]), int(1), int(2), true);
        let (c, _) = t.store_sample(sqrt_like, r);
        let (d, outcome) = t.store_sample(
            Ran::new_algebraic(QPoly::from_i64(&[-2, 0, 1]), int(1), rat(3, 2), false),
            r,
        );
        assert_eq!(c, d);
        assert!(matches!(outcome, StoreOutcome::Unchanged));
    }

    #[test]
    fn paths_read_deepest_first() {
        let mut t = SampleTree::new();
        let r = t.root();
        let (a, _) = t.store_sample(num(5, false), r);
        let (b, _) = t.store_sample(num(7, false), a);
        let path = t.construct_path(b);
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].value(), Some(&int(7)));
        assert_eq!(path[1].value(), Some(&int(5)));
        assert_eq!(t.depth(b), 2);
    }

    #[test]
    fn pruning_removes_descendants() {
        let mut t = SampleTree::new();
        let r = t.root();
        let (a, _) = t.store_sample(num(0, false), r);
        let (b, _) = t.store_sample(num(1, false), a);
        t.store_sample(num(2, false), b);
        assert_eq!(t.len(), 4);
        t.prune_subtree(a);
        assert_eq!(t.len(), 1);
        assert!(t.children(r).is_empty());
        assert!(t.is_consistent());
    }

    #[test]
    fn prune_below_truncates_depth() {
        let mut t = SampleTree::new();
        let r = t.root();
        let (a, _) = t.store_sample(num(0, false), r);
        t.store_sample(num(1, false), a);
        t.prune_below(1);
        assert_eq!(t.len(), 2);
        assert!(t.children(a).is_empty());
    }

    #[test]
    fn leaves_and_dfs() {
        let mut t = SampleTree::new();
        let r = t.root();
        let (a, _) = t.store_sample(num(0, false), r);
        let (_b, _) = t.store_sample(num(1, false), r);
        t.store_sample(num(-1, false), a);
        t.store_sample(num(1, false), a);
        let leaves = t.leaves(r);
        assert_eq!(leaves.len(), 3);
        let order = t.dfs_preorder(r);
        assert_eq!(order.len(), 5);
        assert_eq!(order[0], r);
    }

    #[test]
    fn samples_at_collects_children() {
        let mut t = SampleTree::new();
        let r = t.root();
        t.store_sample(num(3, true), r);
        t.store_sample(num(1, false), r);
        let set = t.samples_at(r, SampleComparator::new(SampleOrdering::RatRoot, false));
        assert_eq!(set.len(), 2);
    }
}
