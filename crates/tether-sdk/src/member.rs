//! Call candidates
//!
//! A [`CallCandidate`] describes one invocable member overload: its name,
//! kind and formal parameter list. Candidates are supplied by the embedder
//! (usually from reflection over a host type) and are never mutated by the
//! engine.

use crate::value::NativeValue;
use tether_types::{TypeContext, TypeId};

/// Kind of member a candidate was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Ordinary method
    Method,
    /// Constructor
    Constructor,
    /// Property getter (`get_Name`)
    PropertyGetter,
    /// Property setter (`set_Name`)
    PropertySetter,
    /// Field access
    Field,
    /// Event accessor
    Event,
}

impl MemberKind {
    /// Whether this is a property accessor
    pub fn is_accessor(&self) -> bool {
        matches!(self, MemberKind::PropertyGetter | MemberKind::PropertySetter)
    }
}

/// Opaque embedder token identifying the member to invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InvocationToken(pub u64);

/// Formal parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    /// Parameter name
    pub name: String,
    /// Declared type; `ref` and `out` parameters are by-ref types
    pub ty: TypeId,
    /// Declared `out` (output only)
    pub is_out: bool,
    /// May be omitted by the caller
    pub optional: bool,
    /// Declared default used when omitted
    pub default_value: Option<NativeValue>,
    /// Variadic tail (`params T[]`); its type is the array type
    pub variadic: bool,
}

impl ParameterInfo {
    /// Required input parameter
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            is_out: false,
            optional: false,
            default_value: None,
            variadic: false,
        }
    }

    /// Mark as `out`; `ty` should be a by-ref type
    pub fn out(mut self) -> Self {
        self.is_out = true;
        self
    }

    /// Mark optional with an optional declared default
    pub fn optional(mut self, default_value: Option<NativeValue>) -> Self {
        self.optional = true;
        self.default_value = default_value;
        self
    }

    /// Mark as the variadic tail
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }
}

/// One overload that may be bound against the actual arguments
#[derive(Debug, Clone, PartialEq)]
pub struct CallCandidate {
    /// Member name as declared (accessors keep their `get_`/`set_` prefix)
    pub name: String,
    /// Member kind
    pub kind: MemberKind,
    /// Declaring type, when known
    pub declaring_type: Option<TypeId>,
    /// Formal parameters in order
    pub parameters: Vec<ParameterInfo>,
    /// Return type
    pub return_type: TypeId,
    /// Embedder token
    pub token: InvocationToken,
}

impl CallCandidate {
    /// Method candidate returning void
    pub fn method(name: impl Into<String>, parameters: Vec<ParameterInfo>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            declaring_type: None,
            parameters,
            return_type: TypeId::VOID,
            token: InvocationToken::default(),
        }
    }

    /// Set the member kind
    pub fn with_kind(mut self, kind: MemberKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the return type
    pub fn returning(mut self, ty: TypeId) -> Self {
        self.return_type = ty;
        self
    }

    /// Set the embedder token
    pub fn with_token(mut self, token: InvocationToken) -> Self {
        self.token = token;
        self
    }

    /// Set the declaring type
    pub fn declared_by(mut self, ty: TypeId) -> Self {
        self.declaring_type = Some(ty);
        self
    }

    /// Whether the last parameter is a variadic tail
    pub fn is_variadic(&self) -> bool {
        self.parameters.last().map(|p| p.variadic).unwrap_or(false)
    }

    /// Fewest actual arguments accepted
    pub fn min_arguments(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| !p.optional && !p.variadic)
            .count()
    }

    /// Most actual arguments accepted; `None` when unbounded
    pub fn max_arguments(&self) -> Option<usize> {
        if self.is_variadic() {
            None
        } else {
            Some(self.parameters.len())
        }
    }

    /// Signature text, e.g. `Int32 f(Int32 a, params Int32[] rest)`
    pub fn signature(&self, types: &TypeContext) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| {
                let prefix = if p.variadic {
                    "params "
                } else if p.is_out {
                    "out "
                } else if types.is_by_ref(p.ty) {
                    "ref "
                } else {
                    ""
                };
                format!("{}{} {}", prefix, types.display(types.strip_by_ref(p.ty)), p.name)
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} {}({})", types.display(self.return_type), self.name, params)
    }
}
