//! Core type definitions for the host type model
//!
//! Host types are described structurally and interned in a
//! [`TypeContext`](crate::TypeContext); everything else in the engine refers
//! to them through the copyable [`TypeId`] handle.

use std::fmt;

/// Unique identifier for a type in the type context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// The `Void` return type
    pub const VOID: TypeId = TypeId(0);
    /// The universal root of the reference hierarchy
    pub const OBJECT: TypeId = TypeId(1);
    /// The common root shared by all value types
    pub const VALUE_TYPE: TypeId = TypeId(2);
    /// The built-in string type
    pub const STRING: TypeId = TypeId(3);

    /// First id handed out to primitives; they are interned in declaration order
    pub(crate) const FIRST_PRIMITIVE: u32 = 4;

    /// Create a new TypeId from a raw value
    ///
    /// Note: This should generally only be used internally or for interop.
    /// Prefer using TypeContext methods to get well-known type IDs.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw value of this TypeId
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Well-known id of a primitive type
    pub const fn primitive(p: PrimitiveType) -> Self {
        Self(Self::FIRST_PRIMITIVE + p as u32)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Primitive value types of the host runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    /// Boolean
    Boolean,
    /// UTF-16 code unit, represented as a Rust `char`
    Char,
    /// Signed 8-bit integer
    SByte,
    /// Unsigned 8-bit integer
    Byte,
    /// Signed 16-bit integer
    Int16,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 32-bit integer
    Int32,
    /// Unsigned 32-bit integer
    UInt32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// Pointer-sized signed integer
    IntPtr,
    /// Pointer-sized unsigned integer
    UIntPtr,
    /// 32-bit float
    Single,
    /// 64-bit float
    Double,
}

impl PrimitiveType {
    /// All primitives, in interning order
    pub const ALL: [PrimitiveType; 14] = [
        PrimitiveType::Boolean,
        PrimitiveType::Char,
        PrimitiveType::SByte,
        PrimitiveType::Byte,
        PrimitiveType::Int16,
        PrimitiveType::UInt16,
        PrimitiveType::Int32,
        PrimitiveType::UInt32,
        PrimitiveType::Int64,
        PrimitiveType::UInt64,
        PrimitiveType::IntPtr,
        PrimitiveType::UIntPtr,
        PrimitiveType::Single,
        PrimitiveType::Double,
    ];

    /// Host name of the primitive
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::Char => "Char",
            PrimitiveType::SByte => "SByte",
            PrimitiveType::Byte => "Byte",
            PrimitiveType::Int16 => "Int16",
            PrimitiveType::UInt16 => "UInt16",
            PrimitiveType::Int32 => "Int32",
            PrimitiveType::UInt32 => "UInt32",
            PrimitiveType::Int64 => "Int64",
            PrimitiveType::UInt64 => "UInt64",
            PrimitiveType::IntPtr => "IntPtr",
            PrimitiveType::UIntPtr => "UIntPtr",
            PrimitiveType::Single => "Single",
            PrimitiveType::Double => "Double",
        }
    }

    /// Whether this is one of the integral types (excluding `Char` and `Boolean`)
    pub fn is_integral(&self) -> bool {
        !matches!(
            self,
            PrimitiveType::Boolean | PrimitiveType::Char | PrimitiveType::Single | PrimitiveType::Double
        )
    }

    /// Whether this is an IEEE float type
    pub fn is_floating(&self) -> bool {
        matches!(self, PrimitiveType::Single | PrimitiveType::Double)
    }

    /// Whether the integral type is signed
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            PrimitiveType::SByte
                | PrimitiveType::Int16
                | PrimitiveType::Int32
                | PrimitiveType::Int64
                | PrimitiveType::IntPtr
        )
    }

    /// Inclusive range of an integral type, widened to `i128`
    pub fn integral_range(&self) -> Option<(i128, i128)> {
        let range = match self {
            PrimitiveType::SByte => (i8::MIN as i128, i8::MAX as i128),
            PrimitiveType::Byte => (0, u8::MAX as i128),
            PrimitiveType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            PrimitiveType::UInt16 => (0, u16::MAX as i128),
            PrimitiveType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            PrimitiveType::UInt32 => (0, u32::MAX as i128),
            PrimitiveType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            PrimitiveType::UInt64 => (0, u64::MAX as i128),
            PrimitiveType::IntPtr => (isize::MIN as i128, isize::MAX as i128),
            PrimitiveType::UIntPtr => (0, usize::MAX as i128),
            _ => return None,
        };
        Some(range)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flavour of a class type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// Ordinary managed class or struct
    Ordinary,
    /// Opaque wrapper around a COM-style component; its useful type is found
    /// through dynamic interface resolution
    ComObject,
    /// A loaded code assembly; handles get deterministic names
    Assembly,
}

/// Closed generic instantiation, e.g. `List<Int32>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericInstance {
    /// Name of the open generic definition, e.g. ``List`1``
    pub definition: String,
    /// Type arguments
    pub args: Vec<TypeId>,
}

/// Class or struct type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassType {
    /// Type name
    pub name: String,
    /// Explicit base class, if any
    pub base: Option<TypeId>,
    /// Directly implemented interfaces
    pub interfaces: Vec<TypeId>,
    /// Value type (struct) rather than reference type
    pub value_type: bool,
    /// Generic instantiation info
    pub generic: Option<GenericInstance>,
    /// Flavour
    pub kind: ClassKind,
}

/// Interface type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceType {
    /// Interface name
    pub name: String,
    /// Extended interfaces
    pub extends: Vec<TypeId>,
    /// Generic instantiation info
    pub generic: Option<GenericInstance>,
}

/// Enumeration type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    /// Enum name
    pub name: String,
    /// Underlying integral type
    pub underlying: PrimitiveType,
    /// Values combine as bit flags
    pub flags: bool,
    /// Named members
    pub members: Vec<(String, i64)>,
}

impl EnumType {
    /// Look up a member value by name
    pub fn value_of(&self, name: &str, ignore_case: bool) -> Option<i64> {
        self.members
            .iter()
            .find(|(n, _)| {
                if ignore_case {
                    n.eq_ignore_ascii_case(name)
                } else {
                    n == name
                }
            })
            .map(|(_, v)| *v)
    }

    /// Look up a member name by value
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.as_str())
    }
}

/// Array type with a fixed rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayType {
    /// Element type
    pub element: TypeId,
    /// Number of dimensions (1 for a vector)
    pub rank: u8,
}

/// Generic type parameter appearing in an open signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericParam {
    /// Parameter name (e.g. `T`)
    pub name: String,
    /// Base-type and interface constraints
    pub constraints: Vec<TypeId>,
    /// `class` constraint
    pub reference_type: bool,
    /// `struct` constraint
    pub value_type: bool,
}

/// A host type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Method return type with no value
    Void,
    /// Root of the reference hierarchy
    Object,
    /// Common root of all value types
    ValueType,
    /// Built-in string
    String,
    /// Primitive value type
    Primitive(PrimitiveType),
    /// Class or struct
    Class(ClassType),
    /// Interface
    Interface(InterfaceType),
    /// Enumeration
    Enum(EnumType),
    /// Array of a given rank
    Array(ArrayType),
    /// By-reference wrapper used for `ref`/`out` parameters
    ByRef(TypeId),
    /// Nullable wrapper over a value type
    Nullable(TypeId),
    /// Unmanaged pointer
    Pointer(TypeId),
    /// Generic type parameter
    GenericParam(GenericParam),
}

impl Type {
    /// Whether this type is one of the wrapper kinds peeled by nesting-level counting
    pub fn is_wrapper(&self) -> bool {
        matches!(self, Type::ByRef(_) | Type::Nullable(_) | Type::Array(_) | Type::Pointer(_))
    }

    /// The wrapped element of a wrapper type
    pub fn element(&self) -> Option<TypeId> {
        match self {
            Type::ByRef(t) | Type::Nullable(t) | Type::Pointer(t) => Some(*t),
            Type::Array(a) => Some(a.element),
            _ => None,
        }
    }

    /// Generic instantiation info, if this type is a closed generic
    pub fn generic(&self) -> Option<&GenericInstance> {
        match self {
            Type::Class(c) => c.generic.as_ref(),
            Type::Interface(i) => i.generic.as_ref(),
            _ => None,
        }
    }
}
