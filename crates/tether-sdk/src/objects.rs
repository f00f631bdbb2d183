//! Object handle table contract
//!
//! Host values that cannot be rendered as plain strings are handed to the
//! script as opaque handle names. The table maps those names back to the
//! values and tracks the per-entry flags, alias binding and reference count.

use crate::error::TableError;
use crate::flags::ObjectFlags;
use crate::value::{NativeValue, ObjectId};
use tether_types::TypeId;

/// One registered value
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
    /// The value (an object or a non-simple array)
    pub value: NativeValue,
    /// Type the value was registered as
    pub ty: TypeId,
    /// Entry flags
    pub flags: ObjectFlags,
    /// Embedder data attached at registration
    pub client_data: Option<String>,
    /// Reference count supplied at registration
    pub ref_count: u32,
    /// Alias name bound to the handle, if any
    pub alias: Option<String>,
}

impl ObjectEntry {
    /// Entry with default flags and no alias
    pub fn new(value: NativeValue, ty: TypeId) -> Self {
        Self {
            value,
            ty,
            flags: ObjectFlags::NONE,
            client_data: None,
            ref_count: 0,
            alias: None,
        }
    }

    /// Identity of the registered value
    pub fn identity(&self) -> Option<ObjectId> {
        self.value.identity()
    }
}

/// Criteria for reusing an existing handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandleQuery {
    /// The handle must (true) or must not (false) carry an alias
    pub want_alias: bool,
    /// Flags the entry must have
    pub required: ObjectFlags,
    /// Flags the entry must not have
    pub excluded: ObjectFlags,
}

/// The interpreter's object handle table
pub trait ObjectTable: Send + Sync {
    /// Existing handle for a value identity matching the query
    fn try_get_handle(&self, identity: ObjectId, query: &HandleQuery) -> Option<String>;

    /// Entry registered under a handle name
    fn lookup(&self, handle: &str) -> Option<ObjectEntry>;

    /// Register a value under a new handle name; returns the removal token
    fn register(&self, handle: &str, entry: ObjectEntry) -> Result<String, TableError>;

    /// Bind an alias command to a registered handle; returns the alias name
    fn register_alias(&self, handle: &str, alias: &str) -> Result<String, TableError>;

    /// Remove an alias binding
    fn remove_alias(&self, alias: &str) -> Result<(), TableError>;

    /// Remove a registration by token
    fn remove(&self, token: &str) -> Result<ObjectEntry, TableError>;

    /// Release a value whose registration failed
    fn dispose(&self, value: &NativeValue) {
        if let NativeValue::Object(object) = value {
            object.dispose();
        }
    }
}
