//! The interpreter as seen by the engine

use crate::binder::{Binder, InterfaceResolver};
use crate::objects::ObjectTable;
use crate::store::VariableStore;
use parking_lot::ReentrantMutex;
use tether_types::TypeContext;

/// Aggregates the collaborators owned by one interpreter instance
///
/// Every read-modify-write sequence against the variables or the object
/// table runs while holding [`Host::lock`].
pub trait Host: Send + Sync {
    /// Type model
    fn types(&self) -> &TypeContext;

    /// Variable store
    fn variables(&self) -> &dyn VariableStore;

    /// Object handle table
    fn objects(&self) -> &dyn ObjectTable;

    /// Type-change callbacks, if installed
    fn binder(&self) -> Option<&dyn Binder> {
        None
    }

    /// Interface resolver for COM-style objects, if installed
    fn interfaces(&self) -> Option<&dyn InterfaceResolver> {
        None
    }

    /// Culture name for conversions
    fn culture(&self) -> Option<&str> {
        None
    }

    /// Per-interpreter lock
    fn lock(&self) -> &ReentrantMutex<()>;
}
