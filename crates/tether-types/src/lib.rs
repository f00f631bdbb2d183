//! Tether Type Model
//!
//! Interned host type descriptors and the pure classification predicates the
//! binding engine is built on.

#![warn(missing_docs)]

pub mod classify;
pub mod context;
pub mod error;
pub mod ty;

pub use classify::{CompareFlags, DepthOptions, TypeClassifier, DEFAULT_GENERIC_LIMIT};
pub use context::{TypeContext, MAX_ARRAY_RANK};
pub use error::{TypeError, TypeResult};
pub use ty::{
    ArrayType, ClassKind, ClassType, EnumType, GenericInstance, GenericParam, InterfaceType,
    PrimitiveType, Type, TypeId,
};
