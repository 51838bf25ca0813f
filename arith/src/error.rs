use thiserror::Error;

/// Failures of the exact arithmetic layer.
///
/// These are recoverable conditions: a caller deciding satisfiability is
/// expected to degrade to an "unknown" verdict rather than abort.
#[derive(Debug, Clone, Error)]
pub enum ArithError {
    /// An elimination chain collapsed to the zero polynomial, so no defining
    /// polynomial for the requested value could be computed.
    #[error("degenerate elimination at an algebraic point: {0}")]
    DegenerateElimination(String),

    /// A numeric primitive failed on its input.
    #[error("numeric computation failed: {0}")]
    Numeric(String),
}

pub type ArithResult<T> = Result<T, ArithError>;
