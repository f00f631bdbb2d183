//! Error types reported by host collaborators

use thiserror::Error;

/// Variable store failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Write to a read-only variable
    #[error("can't set \"{name}\": variable is read-only")]
    ReadOnly {
        /// Variable name
        name: String,
    },

    /// Element write to a scalar variable
    #[error("can't set \"{name}\": variable isn't array")]
    NotArray {
        /// Variable name
        name: String,
    },

    /// Scalar write to an array variable
    #[error("can't set \"{name}\": variable is array")]
    IsArray {
        /// Variable name
        name: String,
    },

    /// Unset of an unknown variable
    #[error("can't unset \"{name}\": no such variable")]
    NotFound {
        /// Variable name
        name: String,
    },

    /// A trace or store-specific veto
    #[error("{0}")]
    Vetoed(String),
}

/// Object handle table failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableError {
    /// Handle name already registered
    #[error("object \"{0}\" already exists")]
    Duplicate(String),

    /// Unknown handle
    #[error("object \"{0}\" not found")]
    NotFound(String),

    /// Alias name already bound
    #[error("alias \"{0}\" already exists")]
    AliasConflict(String),

    /// Table-specific refusal
    #[error("{0}")]
    Rejected(String),
}

/// Type-change and to-string callback failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BinderError {
    /// The callback cannot convert to the requested type
    #[error("cannot convert \"{value}\" to {target}")]
    Unconvertible {
        /// String form of the value
        value: String,
        /// Target type name
        target: String,
    },

    /// The callback does not implement this operation
    #[error("operation not supported by binder")]
    Unsupported,

    /// Any other callback failure
    #[error("{0}")]
    Failed(String),
}

/// Member invocation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvokeError {
    /// The invoked member raised an exception
    #[error("{0}")]
    Exception(String),

    /// The embedder did not recognize the token
    #[error("unknown member token {0}")]
    UnknownMember(u64),
}
