//! Host-side values
//!
//! [`NativeValue`] is what a bound argument becomes after conversion and what
//! a call returns. Scalars are stored inline; arrays and objects are shared
//! behind `Arc` and compared by identity.

use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tether_types::{PrimitiveType, TypeId};

/// Identity of a shared host value (allocation address)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

/// A host-typed value
#[derive(Clone)]
pub enum NativeValue {
    /// The null reference
    Null,
    /// Boolean
    Boolean(bool),
    /// Character
    Char(char),
    /// Signed 8-bit integer
    SByte(i8),
    /// Unsigned 8-bit integer
    Byte(u8),
    /// Signed 16-bit integer
    Int16(i16),
    /// Unsigned 16-bit integer
    UInt16(u16),
    /// Signed 32-bit integer
    Int32(i32),
    /// Unsigned 32-bit integer
    UInt32(u32),
    /// Signed 64-bit integer
    Int64(i64),
    /// Unsigned 64-bit integer
    UInt64(u64),
    /// Pointer-sized signed integer
    IntPtr(isize),
    /// Pointer-sized unsigned integer
    UIntPtr(usize),
    /// 32-bit float
    Single(f32),
    /// 64-bit float
    Double(f64),
    /// String
    String(String),
    /// Enum member, stored as its underlying integral value
    Enum {
        /// Enum type
        ty: TypeId,
        /// Underlying value
        value: i64,
    },
    /// Shared array
    Array(Arc<NativeArray>),
    /// Shared object
    Object(Arc<HostObject>),
}

impl NativeValue {
    /// Runtime type of the value; `None` for null
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            NativeValue::Null => None,
            NativeValue::String(_) => Some(TypeId::STRING),
            NativeValue::Enum { ty, .. } => Some(*ty),
            NativeValue::Array(a) => Some(a.array_type()),
            NativeValue::Object(o) => Some(o.ty()),
            other => other.primitive_type().map(TypeId::primitive),
        }
    }

    /// Primitive kind of a scalar value
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        let p = match self {
            NativeValue::Boolean(_) => PrimitiveType::Boolean,
            NativeValue::Char(_) => PrimitiveType::Char,
            NativeValue::SByte(_) => PrimitiveType::SByte,
            NativeValue::Byte(_) => PrimitiveType::Byte,
            NativeValue::Int16(_) => PrimitiveType::Int16,
            NativeValue::UInt16(_) => PrimitiveType::UInt16,
            NativeValue::Int32(_) => PrimitiveType::Int32,
            NativeValue::UInt32(_) => PrimitiveType::UInt32,
            NativeValue::Int64(_) => PrimitiveType::Int64,
            NativeValue::UInt64(_) => PrimitiveType::UInt64,
            NativeValue::IntPtr(_) => PrimitiveType::IntPtr,
            NativeValue::UIntPtr(_) => PrimitiveType::UIntPtr,
            NativeValue::Single(_) => PrimitiveType::Single,
            NativeValue::Double(_) => PrimitiveType::Double,
            _ => return None,
        };
        Some(p)
    }

    /// Whether this is the null reference
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    /// Identity of shared values (arrays and objects)
    pub fn identity(&self) -> Option<ObjectId> {
        match self {
            NativeValue::Array(a) => Some(ObjectId(Arc::as_ptr(a) as *const () as usize)),
            NativeValue::Object(o) => Some(ObjectId(Arc::as_ptr(o) as *const () as usize)),
            _ => None,
        }
    }

    /// Integral value widened to `i128` (booleans and chars excluded)
    pub fn as_integer(&self) -> Option<i128> {
        let v = match self {
            NativeValue::SByte(v) => *v as i128,
            NativeValue::Byte(v) => *v as i128,
            NativeValue::Int16(v) => *v as i128,
            NativeValue::UInt16(v) => *v as i128,
            NativeValue::Int32(v) => *v as i128,
            NativeValue::UInt32(v) => *v as i128,
            NativeValue::Int64(v) => *v as i128,
            NativeValue::UInt64(v) => *v as i128,
            NativeValue::IntPtr(v) => *v as i128,
            NativeValue::UIntPtr(v) => *v as i128,
            NativeValue::Enum { value, .. } => *value as i128,
            _ => return None,
        };
        Some(v)
    }

    /// Numeric value as a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            NativeValue::Single(v) => Some(*v as f64),
            NativeValue::Double(v) => Some(*v),
            other => other.as_integer().map(|i| i as f64),
        }
    }

    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Shared array, if this is an array
    pub fn as_array(&self) -> Option<&Arc<NativeArray>> {
        match self {
            NativeValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Shared object, if this is an object
    pub fn as_object(&self) -> Option<&Arc<HostObject>> {
        match self {
            NativeValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Default value of a primitive type
    pub fn zero(p: PrimitiveType) -> Self {
        match p {
            PrimitiveType::Boolean => NativeValue::Boolean(false),
            PrimitiveType::Char => NativeValue::Char('\0'),
            PrimitiveType::SByte => NativeValue::SByte(0),
            PrimitiveType::Byte => NativeValue::Byte(0),
            PrimitiveType::Int16 => NativeValue::Int16(0),
            PrimitiveType::UInt16 => NativeValue::UInt16(0),
            PrimitiveType::Int32 => NativeValue::Int32(0),
            PrimitiveType::UInt32 => NativeValue::UInt32(0),
            PrimitiveType::Int64 => NativeValue::Int64(0),
            PrimitiveType::UInt64 => NativeValue::UInt64(0),
            PrimitiveType::IntPtr => NativeValue::IntPtr(0),
            PrimitiveType::UIntPtr => NativeValue::UIntPtr(0),
            PrimitiveType::Single => NativeValue::Single(0.0),
            PrimitiveType::Double => NativeValue::Double(0.0),
        }
    }
}

impl PartialEq for NativeValue {
    fn eq(&self, other: &Self) -> bool {
        use NativeValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (SByte(a), SByte(b)) => a == b,
            (Byte(a), Byte(b)) => a == b,
            (Int16(a), Int16(b)) => a == b,
            (UInt16(a), UInt16(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (UInt32(a), UInt32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (UInt64(a), UInt64(b)) => a == b,
            (IntPtr(a), IntPtr(b)) => a == b,
            (UIntPtr(a), UIntPtr(b)) => a == b,
            (Single(a), Single(b)) => a == b,
            (Double(a), Double(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Enum { ty: t1, value: v1 }, Enum { ty: t2, value: v2 }) => t1 == t2 && v1 == v2,
            (Array(a), Array(b)) => Arc::ptr_eq(a, b),
            (Object(a), Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Null => f.write_str("Null"),
            NativeValue::String(s) => write!(f, "String({:?})", s),
            NativeValue::Enum { ty, value } => write!(f, "Enum({}, {})", ty, value),
            NativeValue::Array(a) => write!(f, "Array({}, {:?})", a.array_type(), a.lengths()),
            NativeValue::Object(o) => write!(f, "Object({})", o.ty()),
            NativeValue::Boolean(v) => write!(f, "Boolean({})", v),
            NativeValue::Char(v) => write!(f, "Char({:?})", v),
            NativeValue::SByte(v) => write!(f, "SByte({})", v),
            NativeValue::Byte(v) => write!(f, "Byte({})", v),
            NativeValue::Int16(v) => write!(f, "Int16({})", v),
            NativeValue::UInt16(v) => write!(f, "UInt16({})", v),
            NativeValue::Int32(v) => write!(f, "Int32({})", v),
            NativeValue::UInt32(v) => write!(f, "UInt32({})", v),
            NativeValue::Int64(v) => write!(f, "Int64({})", v),
            NativeValue::UInt64(v) => write!(f, "UInt64({})", v),
            NativeValue::IntPtr(v) => write!(f, "IntPtr({})", v),
            NativeValue::UIntPtr(v) => write!(f, "UIntPtr({})", v),
            NativeValue::Single(v) => write!(f, "Single({})", v),
            NativeValue::Double(v) => write!(f, "Double({})", v),
        }
    }
}

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        NativeValue::Boolean(v)
    }
}

impl From<i32> for NativeValue {
    fn from(v: i32) -> Self {
        NativeValue::Int32(v)
    }
}

impl From<i64> for NativeValue {
    fn from(v: i64) -> Self {
        NativeValue::Int64(v)
    }
}

impl From<f64> for NativeValue {
    fn from(v: f64) -> Self {
        NativeValue::Double(v)
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        NativeValue::String(v.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        NativeValue::String(v)
    }
}

impl From<Arc<HostObject>> for NativeValue {
    fn from(v: Arc<HostObject>) -> Self {
        NativeValue::Object(v)
    }
}

impl From<Arc<NativeArray>> for NativeValue {
    fn from(v: Arc<NativeArray>) -> Self {
        NativeValue::Array(v)
    }
}

/// Product of dimension lengths, `None` on overflow
pub fn cell_count(lengths: &[usize]) -> Option<usize> {
    lengths.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
}

/// Host array with per-dimension lower bounds
///
/// Cells are stored row-major; the cell lock lets callees write through
/// arrays passed by reference.
pub struct NativeArray {
    array_type: TypeId,
    element_type: TypeId,
    lower_bounds: Vec<i64>,
    lengths: Vec<usize>,
    cells: RwLock<Vec<NativeValue>>,
}

impl NativeArray {
    /// Allocate an array of the given shape with every cell set to `fill`
    ///
    /// `None` when the cell count overflows `usize`.
    pub fn new(
        array_type: TypeId,
        element_type: TypeId,
        lower_bounds: Vec<i64>,
        lengths: Vec<usize>,
        fill: NativeValue,
    ) -> Option<Self> {
        let total = cell_count(&lengths)?;
        Some(Self {
            array_type,
            element_type,
            lower_bounds,
            lengths,
            cells: RwLock::new(vec![fill; total]),
        })
    }

    /// Zero-based vector holding `items`
    pub fn vector(array_type: TypeId, element_type: TypeId, items: Vec<NativeValue>) -> Self {
        Self {
            array_type,
            element_type,
            lower_bounds: vec![0],
            lengths: vec![items.len()],
            cells: RwLock::new(items),
        }
    }

    /// Array type
    pub fn array_type(&self) -> TypeId {
        self.array_type
    }

    /// Element type
    pub fn element_type(&self) -> TypeId {
        self.element_type
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        self.lengths.len()
    }

    /// Lower bound of each dimension
    pub fn lower_bounds(&self) -> &[i64] {
        &self.lower_bounds
    }

    /// Length of each dimension
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.lengths.iter().product()
    }

    /// Whether the array has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major offset of an index tuple, `None` when out of range
    pub fn offset(&self, indices: &[i64]) -> Option<usize> {
        if indices.len() != self.rank() {
            return None;
        }
        let mut offset = 0usize;
        for ((&index, &lower), &length) in indices.iter().zip(&self.lower_bounds).zip(&self.lengths) {
            let relative = index.checked_sub(lower)?;
            if relative < 0 || relative as usize >= length {
                return None;
            }
            offset = offset * length + relative as usize;
        }
        Some(offset)
    }

    /// Read a cell
    pub fn get(&self, indices: &[i64]) -> Option<NativeValue> {
        let offset = self.offset(indices)?;
        self.cells.read().get(offset).cloned()
    }

    /// Write a cell; returns false when the index is out of range
    pub fn set(&self, indices: &[i64], value: NativeValue) -> bool {
        match self.offset(indices) {
            Some(offset) => {
                self.cells.write()[offset] = value;
                true
            }
            None => false,
        }
    }

    /// Snapshot of every cell in row-major order
    pub fn to_vec(&self) -> Vec<NativeValue> {
        self.cells.read().clone()
    }

    /// Every index tuple in row-major order, honouring lower bounds
    pub fn index_tuples(&self) -> Vec<Vec<i64>> {
        let total = self.len();
        let mut tuples = Vec::with_capacity(total);
        for mut flat in 0..total {
            let mut tuple = vec![0i64; self.rank()];
            for dim in (0..self.rank()).rev() {
                let length = self.lengths[dim];
                tuple[dim] = self.lower_bounds[dim] + (flat % length) as i64;
                flat /= length;
            }
            tuples.push(tuple);
        }
        tuples
    }
}

impl fmt::Debug for NativeArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeArray")
            .field("array_type", &self.array_type)
            .field("lower_bounds", &self.lower_bounds)
            .field("lengths", &self.lengths)
            .field("cells", &*self.cells.read())
            .finish()
    }
}

/// Opaque host object
///
/// The engine only needs the runtime type, an optional natural string form,
/// and for collection-like objects their elements. Everything else is the
/// embedder's payload.
pub struct HostObject {
    ty: TypeId,
    text: Option<String>,
    elements: Option<Vec<NativeValue>>,
    payload: Option<Box<dyn Any + Send + Sync>>,
    disposed: AtomicBool,
}

impl HostObject {
    /// New object of the given runtime type
    pub fn new(ty: TypeId) -> Self {
        Self {
            ty,
            text: None,
            elements: None,
            payload: None,
            disposed: AtomicBool::new(false),
        }
    }

    /// Set the natural string form
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the elements of a collection-like object
    pub fn with_elements(mut self, elements: Vec<NativeValue>) -> Self {
        self.elements = Some(elements);
        self
    }

    /// Attach an embedder payload
    pub fn with_payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }

    /// Wrap in an `Arc` value
    pub fn into_value(self) -> NativeValue {
        NativeValue::Object(Arc::new(self))
    }

    /// Runtime type
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// Natural string form, if any
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Elements of a collection-like object
    pub fn elements(&self) -> Option<&[NativeValue]> {
        self.elements.as_deref()
    }

    /// Downcast the embedder payload
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref()?.downcast_ref::<T>()
    }

    /// Release the object; idempotent
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    /// Whether [`dispose`](Self::dispose) has been called
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("ty", &self.ty)
            .field("text", &self.text)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
