use core::fmt;

use serde::{Deserialize, Serialize};

/// The domain a variable ranges over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VarKind {
    Real,
    Integer,
}

/// A variable, identified by an opaque integer id plus a domain tag.
///
/// Variables are `Copy` and cheap to compare; all polynomial types refer to
/// them by value. Two variables are the same iff their ids are equal,
/// regardless of kind, so a given id must not be reused with a different
/// kind.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Variable {
    id: u32,
    kind: VarKind,
}

impl Variable {
    pub const fn new(id: u32, kind: VarKind) -> Self {
        Variable { id, kind }
    }

    /// A fresh real-valued variable with the given id.
    pub const fn real(id: u32) -> Self {
        Self::new(id, VarKind::Real)
    }

    /// A fresh integer-valued variable with the given id.
    pub const fn integer(id: u32) -> Self {
        Self::new(id, VarKind::Integer)
    }

    pub const fn id(self) -> u32 {
        self.id
    }

    pub const fn kind(self) -> VarKind {
        self.kind
    }

    pub fn is_integer(self) -> bool {
        self.kind == VarKind::Integer
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl core::hash::Hash for Variable {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            VarKind::Real => write!(f, "x{}", self.id),
            VarKind::Integer => write!(f, "i{}", self.id),
        }
    }
}

static_assertions::assert_eq_size!(Variable, u64);
