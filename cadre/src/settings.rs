use serde::{Deserialize, Serialize};

use crate::projection::ProjectionKind;
use crate::sample::SampleOrdering;

/// How integer-typed variables are treated during lifting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegerHandling {
    /// Integer variables are treated like real ones.
    None,
    /// Samples are unrestricted, but a completed assignment with a
    /// non-integer value at an integer variable is rejected and the search
    /// backtracks to the next candidate.
    SplitAtSample,
    /// Like `SplitAtSample`; kept as a distinct knob for callers that drive
    /// an outer branch-and-bound loop.
    BranchAndBound,
}

/// The strict total order used by the elimination and lifting queues. Ties
/// are always broken by the interned handle id, so dequeue order is
/// reproducible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolyOrder {
    /// Lower main-variable degree first, then smaller coefficient size.
    DegreeThenSize,
    /// Smaller coefficient size first, then lower degree.
    SizeThenDegree,
}

/// Immutable configuration of a decomposition instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CadSettings {
    /// The projection operator family.
    pub projection_operator: ProjectionKind,
    /// Ranking of candidate samples during lifting.
    pub sample_ordering: SampleOrdering,
    /// Policy for integer-typed variables.
    pub integer_handling: IntegerHandling,
    /// Stop lifting at the first satisfying leaf. When false, all samples
    /// under the current node are explored before an answer is returned.
    pub early_lifting_pruning: bool,
    /// Split the top-level polynomials into coarse factors before the first
    /// projection step.
    pub simplify_by_factorization: bool,
    /// Drop projection polynomials that provably have no real roots.
    pub exclude_roots_with_no_witness: bool,
    /// Record constraint/sample falsifications for UNSAT cores. When false,
    /// the engine may skip filling the conflict graph.
    pub compute_conflict_graph: bool,
    /// Dequeue order of the elimination queues.
    pub elimination_order: PolyOrder,
    /// Dequeue order of the lifting queue.
    pub lifting_order: PolyOrder,
}

impl Default for CadSettings {
    fn default() -> Self {
        CadSettings {
            projection_operator: ProjectionKind::Brown,
            sample_ordering: SampleOrdering::RatRoot,
            integer_handling: IntegerHandling::None,
            early_lifting_pruning: true,
            simplify_by_factorization: false,
            exclude_roots_with_no_witness: false,
            compute_conflict_graph: true,
            elimination_order: PolyOrder::DegreeThenSize,
            lifting_order: PolyOrder::DegreeThenSize,
        }
    }
}

impl CadSettings {
    /// A configuration tuned for problems with integer variables.
    pub fn with_integer_handling(handling: IntegerHandling) -> Self {
        CadSettings {
            integer_handling: handling,
            sample_ordering: SampleOrdering::IntRatRoot,
            ..Default::default()
        }
    }
}
