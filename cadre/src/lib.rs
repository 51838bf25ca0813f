//! A decision procedure for conjunctions of polynomial sign conditions over
//! the reals, by cylindrical algebraic decomposition.
//!
//! Input polynomials are projected level by level down to univariate
//! polynomials, a tree of real algebraic sample points is lifted back up
//! through the levels, and a three-phase search walks that tree against a
//! constraint conjunction. The answer is SAT with a witnessing point, UNSAT
//! with a conflict graph, or UNKNOWN after cancellation or a numeric
//! failure.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use cadre_arith as arith;

pub mod arena;
pub mod cad;
pub mod conflict;
pub mod constraint;
pub mod elimination;
pub mod error;
pub mod projection;
pub mod sample;
pub mod settings;
pub mod tree;
pub mod vars;

pub use arena::{PolyArena, PolyId};
pub use cad::{order_variables_greedily, BoundMap, Cad, CheckResult};
pub use elimination::{EliminationSet, PolyPair};
pub use conflict::ConflictGraph;
pub use constraint::{Constraint, ConstraintTable};
pub use error::{Answer, CadError};
pub use projection::ProjectionKind;
pub use sample::{SampleComparator, SampleOrdering, SampleSet};
pub use settings::{CadSettings, IntegerHandling, PolyOrder};
pub use tree::{NodeId, SampleTree};
pub use vars::Variables;
