//! Binding errors
//!
//! Every failure the engine reports is a structured [`BindError`]; callers
//! branch on [`BindError::kind`] rather than on message text.

use tether_sdk::{InvokeError, StoreError};
use tether_types::TypeError;
use thiserror::Error;

/// Result type for engine operations
pub type BindResult<T> = Result<T, BindError>;

/// Coarse classification of a [`BindError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No candidate matched by name
    NameNotFound,
    /// Argument count outside every accepted range
    ArityMismatch,
    /// Explicit type hint incompatible with a formal parameter
    TypeHintMismatch,
    /// An argument could not be coerced
    ConversionError,
    /// Output parameter could not be bound or written
    OutputBindingError,
    /// Malformed array shape or index
    ArrayShapeError,
    /// Candidate uses an unmanaged pointer parameter
    PointerTypeRejected,
    /// Object table add or alias failure
    RegistrationError,
    /// Request the engine cannot honour
    UnsupportedFeature,
    /// Variable store failure outside output binding rules
    Store,
    /// The invoked member failed
    Invocation,
    /// Overload selection failed after matching
    Selection,
    /// Contradictory policy flags
    Policy,
    /// Broken type model
    Type,
}

/// Binding, conversion and write-back errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BindError {
    /// No candidate has the requested name
    #[error("method \"{name}\" not found")]
    NameNotFound {
        /// Requested member name
        name: String,
    },

    /// Argument count outside the candidate's range
    #[error("{}", arity_message(.name, .min, .max, .supplied))]
    ArityMismatch {
        /// Member name
        name: String,
        /// Fewest accepted arguments
        min: usize,
        /// Most accepted arguments; `None` when unbounded
        max: Option<usize>,
        /// Arguments supplied
        supplied: usize,
    },

    /// Type hint incompatible with the formal parameter
    #[error("type hint {hint} for {at} is not compatible with parameter type {formal}")]
    TypeHintMismatch {
        /// Parameter description
        at: String,
        /// Hinted type name
        hint: String,
        /// Formal parameter type name
        formal: String,
    },

    /// Argument could not be converted
    #[error("could not convert {at} value {value} of type {source_type} to type {target}: {cause}")]
    ConversionError {
        /// Parameter description
        at: String,
        /// Supplied value
        value: String,
        /// Type of the supplied value
        source_type: String,
        /// Target type name
        target: String,
        /// Underlying cause
        cause: String,
    },

    /// Output parameter binding or write-back failure
    #[error("output {at}: {reason}")]
    OutputBindingError {
        /// Parameter description
        at: String,
        /// What went wrong
        reason: String,
    },

    /// Malformed array shape
    #[error("array {at}: {reason}")]
    ArrayShapeError {
        /// Parameter or variable description
        at: String,
        /// What went wrong
        reason: String,
    },

    /// Pointer-typed parameter
    #[error("{at} of method \"{name}\" has unsupported pointer type {ty}")]
    PointerTypeRejected {
        /// Member name
        name: String,
        /// Parameter description
        at: String,
        /// Pointer type name
        ty: String,
    },

    /// Object table failure
    #[error("could not register object \"{handle}\": {reason}")]
    RegistrationError {
        /// Handle being registered
        handle: String,
        /// Table error
        reason: String,
    },

    /// Request the engine cannot honour
    #[error("{0}")]
    UnsupportedFeature(String),

    /// Variable store failure
    #[error("variable \"{variable}\": {source}")]
    Store {
        /// Variable name
        variable: String,
        /// Store error
        #[source]
        source: StoreError,
    },

    /// Invoked member failed
    #[error("invocation failed: {0}")]
    Invocation(#[from] InvokeError),

    /// Strict member selection found more than one overload
    #[error("matched {count} method overloads of \"{name}\", need exactly 1")]
    AmbiguousMatch {
        /// Member name
        name: String,
        /// Overloads matched
        count: usize,
    },

    /// Explicit overload index out of range
    #[error("method index {index} is out of range, must be between 0 and {}", .count.saturating_sub(1))]
    InvalidIndex {
        /// Requested index
        index: usize,
        /// Overloads matched
        count: usize,
    },

    /// Contradictory policy flags
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// Every per-candidate failure, in candidate order
    #[error("{}", join_failures(.name, .failures))]
    Multiple {
        /// Member name
        name: String,
        /// Failures, one per rejected candidate
        failures: Vec<BindError>,
    },

    /// Broken type model
    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

impl BindError {
    /// Coarse classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            BindError::NameNotFound { .. } => ErrorKind::NameNotFound,
            BindError::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            BindError::TypeHintMismatch { .. } => ErrorKind::TypeHintMismatch,
            BindError::ConversionError { .. } => ErrorKind::ConversionError,
            BindError::OutputBindingError { .. } => ErrorKind::OutputBindingError,
            BindError::ArrayShapeError { .. } => ErrorKind::ArrayShapeError,
            BindError::PointerTypeRejected { .. } => ErrorKind::PointerTypeRejected,
            BindError::RegistrationError { .. } => ErrorKind::RegistrationError,
            BindError::UnsupportedFeature(_) => ErrorKind::UnsupportedFeature,
            BindError::Store { .. } => ErrorKind::Store,
            BindError::Invocation(_) => ErrorKind::Invocation,
            BindError::AmbiguousMatch { .. } | BindError::InvalidIndex { .. } => ErrorKind::Selection,
            BindError::InvalidPolicy(_) => ErrorKind::Policy,
            BindError::Multiple { failures, .. } => failures
                .first()
                .map(BindError::kind)
                .unwrap_or(ErrorKind::NameNotFound),
            BindError::Type(_) => ErrorKind::Type,
        }
    }

    /// Individual failures; a single error yields itself
    pub fn failures(&self) -> &[BindError] {
        match self {
            BindError::Multiple { failures, .. } => failures,
            other => std::slice::from_ref(other),
        }
    }

    /// Map a store error raised while writing an output variable
    pub(crate) fn from_store(at: &str, variable: &str, source: StoreError) -> Self {
        match source {
            StoreError::ReadOnly { .. } | StoreError::IsArray { .. } | StoreError::NotArray { .. } => {
                BindError::OutputBindingError {
                    at: at.to_string(),
                    reason: source.to_string(),
                }
            }
            other => BindError::Store {
                variable: variable.to_string(),
                source: other,
            },
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "argument"
    } else {
        "arguments"
    }
}

fn arity_message(name: &str, min: &usize, max: &Option<usize>, supplied: &usize) -> String {
    let supplied_text = format!(
        "{} {} supplied",
        supplied,
        if *supplied == 1 { "was" } else { "were" }
    );
    match max {
        Some(max) if max == min => format!(
            "method \"{}\" requires exactly {} {} and {}",
            name,
            min,
            plural(*min),
            supplied_text
        ),
        Some(max) => format!(
            "method \"{}\" requires between {} and {} {} and {}",
            name,
            min,
            max,
            plural(*max),
            supplied_text
        ),
        None => format!(
            "method \"{}\" requires at least {} {} and {}",
            name,
            min,
            plural(*min),
            supplied_text
        ),
    }
}

fn join_failures(name: &str, failures: &[BindError]) -> String {
    let mut out = format!("no overload of \"{}\" matched", name);
    for failure in failures {
        out.push_str("\n    ");
        out.push_str(&failure.to_string());
    }
    out
}
