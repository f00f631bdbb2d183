//! Script variable store contract

use crate::error::StoreError;
use crate::value::NativeValue;
use std::collections::BTreeMap;

/// Value held by a scalar variable
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    /// Ordinary string value
    Text(String),
    /// A host value stored whole (array-as-value write-back)
    Native(NativeValue),
    /// A live link to a host value (array-as-link write-back)
    Link(NativeValue),
}

impl VariableValue {
    /// Text of a string value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            VariableValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Shape of a variable
#[derive(Debug, Clone, PartialEq)]
pub enum VariableKind {
    /// Scalar variable
    Scalar(VariableValue),
    /// Associative array keyed by element name
    Array(BTreeMap<String, String>),
}

/// Snapshot of a variable as returned by [`VariableStore::get`]
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Shape and contents
    pub kind: VariableKind,
    /// Writes are refused
    pub read_only: bool,
}

impl Variable {
    /// Writable scalar text variable
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            kind: VariableKind::Scalar(VariableValue::Text(s.into())),
            read_only: false,
        }
    }

    /// Whether this is an array variable
    pub fn is_array(&self) -> bool {
        matches!(self.kind, VariableKind::Array(_))
    }

    /// Elements of an array variable
    pub fn elements(&self) -> Option<&BTreeMap<String, String>> {
        match &self.kind {
            VariableKind::Array(map) => Some(map),
            VariableKind::Scalar(_) => None,
        }
    }

    /// Value of a scalar variable
    pub fn scalar(&self) -> Option<&VariableValue> {
        match &self.kind {
            VariableKind::Scalar(v) => Some(v),
            VariableKind::Array(_) => None,
        }
    }
}

/// The interpreter's variable store
///
/// Every operation may be vetoed by the store (for example by a variable
/// trace) and reports a [`StoreError`] in that case.
pub trait VariableStore: Send + Sync {
    /// Snapshot of a variable, `None` when it does not exist
    fn get(&self, name: &str) -> Option<Variable>;

    /// Create or overwrite a scalar variable
    fn set(&self, name: &str, value: VariableValue) -> Result<(), StoreError>;

    /// Create or overwrite one element of an array variable
    fn set_element(&self, name: &str, index: &str, value: String) -> Result<(), StoreError>;

    /// Remove a variable
    fn unset(&self, name: &str) -> Result<(), StoreError>;
}
