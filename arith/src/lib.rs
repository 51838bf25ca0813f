//! Exact arithmetic for real algebraic geometry.
//!
//! This crate provides the numeric substrate for a cylindrical algebraic
//! decomposition engine: arbitrary-precision rationals (via `num`),
//! rational intervals, dense univariate and sparse multivariate polynomials,
//! real root isolation, and real algebraic numbers with exact comparison and
//! sign evaluation at algebraic points.

#![allow(clippy::len_without_is_empty)]
#![allow(clippy::needless_range_loop)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod error;
pub mod eval;
pub mod interval;
pub mod isolate;
pub mod mpoly;
pub mod num_util;
pub mod qpoly;
pub mod ran;
pub mod sign;
pub mod upoly;
pub mod var;

pub use error::{ArithError, ArithResult};
pub use interval::{BoundKind, Enclosure, Interval};
pub use mpoly::MPoly;
pub use qpoly::QPoly;
pub use ran::Ran;
pub use sign::Sign;
pub use upoly::UPoly;
pub use var::{VarKind, Variable};

/// The rational scalar type used throughout.
pub type Rational = num::BigRational;
/// The integer type used throughout.
pub type Int = num::BigInt;
