use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::projection::ProjectionKind;

/// The public verdict of a satisfiability check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    Sat,
    Unsat,
    Unknown,
}

/// Failures of the decomposition engine.
///
/// `Cancelled` and `Numeric` are recoverable: the check driver converts them
/// to [`Answer::Unknown`]. `UnsupportedProjection` is a setup-time error.
/// `Invariant` is a programming bug; it panics in debug builds via the
/// assertions guarding the data structures and degrades to `Unknown` here in
/// release.
#[derive(Debug, Clone, Error)]
pub enum CadError {
    #[error("check was interrupted")]
    Cancelled,

    #[error("projection operator {0:?} is not implemented")]
    UnsupportedProjection(ProjectionKind),

    #[error("numeric computation failed: {0}")]
    Numeric(String),

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl From<cadre_arith::ArithError> for CadError {
    fn from(e: cadre_arith::ArithError) -> Self {
        CadError::Numeric(e.to_string())
    }
}

pub type CadResult<T> = Result<T, CadError>;
