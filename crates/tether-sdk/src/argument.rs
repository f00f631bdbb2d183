//! Actual arguments as supplied by the calling script

use crate::value::NativeValue;

/// One actual argument
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    /// Placeholder for an omitted optional argument
    Missing,
    /// Script string: a literal, a variable name, or a handle name
    Literal(String),
    /// Explicit object handle name
    Handle(String),
    /// Value that is already host-typed
    Native(NativeValue),
}

impl ArgumentValue {
    /// Literal argument
    pub fn literal(s: impl Into<String>) -> Self {
        ArgumentValue::Literal(s.into())
    }

    /// Text of a literal argument
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            ArgumentValue::Literal(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the argument was omitted
    pub fn is_missing(&self) -> bool {
        matches!(self, ArgumentValue::Missing)
    }

    /// Short description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            ArgumentValue::Missing => "<missing>".to_string(),
            ArgumentValue::Literal(s) => format!("\"{}\"", s),
            ArgumentValue::Handle(h) => format!("handle \"{}\"", h),
            ArgumentValue::Native(v) => format!("{:?}", v),
        }
    }
}

impl From<&str> for ArgumentValue {
    fn from(s: &str) -> Self {
        ArgumentValue::Literal(s.to_string())
    }
}

impl From<String> for ArgumentValue {
    fn from(s: String) -> Self {
        ArgumentValue::Literal(s)
    }
}

impl From<NativeValue> for ArgumentValue {
    fn from(v: NativeValue) -> Self {
        ArgumentValue::Native(v)
    }
}
