//! Tether SDK - value model and host contracts
//!
//! This crate provides the types an embedder needs to drive the binding
//! engine without depending on it: host values, call candidates, policy
//! flags, and the collaborator traits the engine calls back into.
//!
//! # Example
//!
//! ```ignore
//! use tether_sdk::{memory::MemoryHost, CallCandidate, ParameterInfo};
//! use tether_types::{PrimitiveType, TypeContext};
//!
//! let mut types = TypeContext::new();
//! let int = types.primitive(PrimitiveType::Int32);
//! let host = MemoryHost::new(types);
//! let add = CallCandidate::method("Add", vec![
//!     ParameterInfo::new("a", int),
//!     ParameterInfo::new("b", int),
//! ]);
//! ```

#![warn(missing_docs)]

pub mod argument;
pub mod binder;
pub mod error;
pub mod flags;
pub mod host;
pub mod member;
pub mod memory;
pub mod objects;
pub mod store;
pub mod value;

pub use argument::ArgumentValue;
pub use binder::{Binder, ChangeTypeOutcome, ConversionContext, InterfaceResolver, Invoker};
pub use error::{BinderError, InvokeError, StoreError, TableError};
pub use flags::{MarshalFlags, ObjectFlags, ReorderFlags};
pub use host::Host;
pub use member::{CallCandidate, InvocationToken, MemberKind, ParameterInfo};
pub use objects::{HandleQuery, ObjectEntry, ObjectTable};
pub use store::{Variable, VariableKind, VariableStore, VariableValue};
pub use value::{cell_count, HostObject, NativeArray, NativeValue, ObjectId};
