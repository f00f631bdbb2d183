//! Type model errors

use crate::ty::TypeId;
use thiserror::Error;

/// Result type for type model operations
pub type TypeResult<T> = Result<T, TypeError>;

/// Errors raised while querying or building the type model
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// A `TypeId` that was never interned in this context
    #[error("Invalid type id {0}")]
    InvalidTypeId(TypeId),

    /// Named type lookup failed
    #[error("Undefined type: {name}")]
    UndefinedType {
        /// Requested name
        name: String,
    },

    /// Array rank outside `1..=max`
    #[error("Invalid array rank {rank} (maximum {max})")]
    InvalidArrayRank {
        /// Requested rank
        rank: usize,
        /// Largest supported rank
        max: usize,
    },

    /// Generic recursion exceeded the configured limit
    #[error("Generic nesting of {0} exceeds the recursion limit")]
    RecursionLimit(TypeId),
}
