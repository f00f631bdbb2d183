//! Type context for managing host types and type interning

use crate::error::{TypeError, TypeResult};
use crate::ty::{
    ArrayType, ClassKind, ClassType, EnumType, GenericInstance, GenericParam, InterfaceType,
    PrimitiveType, Type, TypeId,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Largest array rank the model accepts
pub const MAX_ARRAY_RANK: usize = 32;

/// Type context that owns every host type the engine knows about
///
/// Identical types intern to the same [`TypeId`], so identity checks reduce to
/// integer comparison. The root types and all primitives are pre-interned at
/// fixed ids (see [`TypeId::OBJECT`], [`TypeId::primitive`]).
#[derive(Debug, Clone)]
pub struct TypeContext {
    /// Storage for all types, indexed by TypeId
    types: Vec<Arc<Type>>,

    /// Reverse mapping from Type to TypeId for interning
    type_to_id: FxHashMap<Type, TypeId>,

    /// Named type definitions (classes, interfaces, enums)
    named_types: FxHashMap<String, TypeId>,
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeContext {
    /// Create a context holding only the root and primitive types
    pub fn new() -> Self {
        let mut ctx = TypeContext {
            types: Vec::new(),
            type_to_id: FxHashMap::default(),
            named_types: FxHashMap::default(),
        };

        ctx.intern(Type::Void);
        ctx.intern(Type::Object);
        ctx.intern(Type::ValueType);
        ctx.intern(Type::String);
        for p in PrimitiveType::ALL {
            let id = ctx.intern(Type::Primitive(p));
            ctx.named_types.insert(p.name().to_string(), id);
        }
        ctx.named_types.insert("Void".to_string(), TypeId::VOID);
        ctx.named_types.insert("Object".to_string(), TypeId::OBJECT);
        ctx.named_types.insert("ValueType".to_string(), TypeId::VALUE_TYPE);
        ctx.named_types.insert("String".to_string(), TypeId::STRING);

        ctx
    }

    /// Intern a type, returning its TypeId
    ///
    /// If the type already exists, returns the existing TypeId.
    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.type_to_id.get(&ty) {
            return id;
        }

        let id = TypeId(self.types.len() as u32);
        self.types.push(Arc::new(ty.clone()));
        self.type_to_id.insert(ty, id);
        id
    }

    /// Get a type by its TypeId
    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.0 as usize).map(|t| t.as_ref())
    }

    /// Get a type by its TypeId, failing for ids from another context
    pub fn resolve(&self, id: TypeId) -> TypeResult<&Type> {
        self.get(id).ok_or(TypeError::InvalidTypeId(id))
    }

    /// Number of interned types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the context is empty (never true after `new`)
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Register a named type
    pub fn register_named_type(&mut self, name: impl Into<String>, id: TypeId) {
        self.named_types.insert(name.into(), id);
    }

    /// Look up a named type
    pub fn lookup_named_type(&self, name: &str) -> Option<TypeId> {
        self.named_types.get(name).copied()
    }

    /// Look up a named type, failing when absent
    pub fn named(&self, name: &str) -> TypeResult<TypeId> {
        self.lookup_named_type(name)
            .ok_or_else(|| TypeError::UndefinedType { name: name.to_string() })
    }

    // ===== Constructors =====

    /// Id of a primitive type
    pub fn primitive(&self, p: PrimitiveType) -> TypeId {
        TypeId::primitive(p)
    }

    /// Declare a reference class deriving from `base` (or the root object)
    pub fn class_type(
        &mut self,
        name: impl Into<String>,
        base: Option<TypeId>,
        interfaces: Vec<TypeId>,
    ) -> TypeId {
        self.declare_class(ClassType {
            name: name.into(),
            base,
            interfaces,
            value_type: false,
            generic: None,
            kind: ClassKind::Ordinary,
        })
    }

    /// Declare a struct deriving from the value-type root
    pub fn struct_type(&mut self, name: impl Into<String>, interfaces: Vec<TypeId>) -> TypeId {
        self.declare_class(ClassType {
            name: name.into(),
            base: None,
            interfaces,
            value_type: true,
            generic: None,
            kind: ClassKind::Ordinary,
        })
    }

    /// Declare a class of a specific [`ClassKind`]
    pub fn special_class(&mut self, name: impl Into<String>, kind: ClassKind) -> TypeId {
        self.declare_class(ClassType {
            name: name.into(),
            base: None,
            interfaces: Vec::new(),
            value_type: false,
            generic: None,
            kind,
        })
    }

    /// Declare a closed generic class such as ``List`1<Int32>``
    pub fn generic_class(
        &mut self,
        definition: impl Into<String>,
        args: Vec<TypeId>,
        base: Option<TypeId>,
        interfaces: Vec<TypeId>,
    ) -> TypeId {
        let definition = definition.into();
        let name = format!("{}<{}>", definition, self.join_names(&args));
        self.declare_class(ClassType {
            name,
            base,
            interfaces,
            value_type: false,
            generic: Some(GenericInstance { definition, args }),
            kind: ClassKind::Ordinary,
        })
    }

    /// Declare any class shape
    pub fn declare_class(&mut self, class: ClassType) -> TypeId {
        let name = class.name.clone();
        let id = self.intern(Type::Class(class));
        self.named_types.insert(name, id);
        id
    }

    /// Declare an interface
    pub fn interface_type(&mut self, name: impl Into<String>, extends: Vec<TypeId>) -> TypeId {
        let name = name.into();
        let id = self.intern(Type::Interface(InterfaceType {
            name: name.clone(),
            extends,
            generic: None,
        }));
        self.named_types.insert(name, id);
        id
    }

    /// Declare a closed generic interface
    pub fn generic_interface(
        &mut self,
        definition: impl Into<String>,
        args: Vec<TypeId>,
        extends: Vec<TypeId>,
    ) -> TypeId {
        let definition = definition.into();
        let name = format!("{}<{}>", definition, self.join_names(&args));
        let id = self.intern(Type::Interface(InterfaceType {
            name: name.clone(),
            extends,
            generic: Some(GenericInstance { definition, args }),
        }));
        self.named_types.insert(name, id);
        id
    }

    /// Declare an enumeration
    pub fn enum_type(
        &mut self,
        name: impl Into<String>,
        underlying: PrimitiveType,
        flags: bool,
        members: Vec<(String, i64)>,
    ) -> TypeId {
        let name = name.into();
        let id = self.intern(Type::Enum(EnumType {
            name: name.clone(),
            underlying,
            flags,
            members,
        }));
        self.named_types.insert(name, id);
        id
    }

    /// Array type of the given element and rank
    pub fn array_type(&mut self, element: TypeId, rank: usize) -> TypeResult<TypeId> {
        if rank == 0 || rank > MAX_ARRAY_RANK {
            return Err(TypeError::InvalidArrayRank { rank, max: MAX_ARRAY_RANK });
        }
        Ok(self.intern(Type::Array(ArrayType { element, rank: rank as u8 })))
    }

    /// Rank-1 array (vector) of the element
    pub fn vector_type(&mut self, element: TypeId) -> TypeId {
        self.intern(Type::Array(ArrayType { element, rank: 1 }))
    }

    /// By-reference wrapper
    pub fn by_ref(&mut self, inner: TypeId) -> TypeId {
        self.intern(Type::ByRef(inner))
    }

    /// Nullable wrapper
    pub fn nullable(&mut self, inner: TypeId) -> TypeId {
        self.intern(Type::Nullable(inner))
    }

    /// Unmanaged pointer
    pub fn pointer(&mut self, inner: TypeId) -> TypeId {
        self.intern(Type::Pointer(inner))
    }

    /// Generic parameter with constraints
    pub fn generic_param(&mut self, param: GenericParam) -> TypeId {
        self.intern(Type::GenericParam(param))
    }

    // ===== Queries =====

    /// Base type in the inheritance chain, `None` at a root
    ///
    /// Value types (primitives, enums, structs, nullables) chain to the
    /// value-type root, which in turn derives from the object root.
    pub fn base_of(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id)? {
            Type::Object | Type::Void | Type::Interface(_) => None,
            Type::ByRef(_) | Type::Pointer(_) => None,
            Type::ValueType | Type::String | Type::Array(_) => Some(TypeId::OBJECT),
            Type::Primitive(_) | Type::Enum(_) | Type::Nullable(_) => Some(TypeId::VALUE_TYPE),
            Type::Class(c) => Some(c.base.unwrap_or(if c.value_type {
                TypeId::VALUE_TYPE
            } else {
                TypeId::OBJECT
            })),
            Type::GenericParam(p) => Some(
                p.constraints
                    .iter()
                    .copied()
                    .find(|&c| matches!(self.get(c), Some(Type::Class(_))))
                    .unwrap_or(if p.value_type { TypeId::VALUE_TYPE } else { TypeId::OBJECT }),
            ),
        }
    }

    /// Whether values of this type are copied (value types and nullables)
    pub fn is_value_type(&self, id: TypeId) -> bool {
        match self.get(id) {
            Some(Type::Primitive(_)) | Some(Type::Enum(_)) | Some(Type::Nullable(_)) => true,
            Some(Type::Class(c)) => c.value_type,
            Some(Type::GenericParam(p)) => p.value_type,
            _ => false,
        }
    }

    /// Whether this is a by-reference wrapper
    pub fn is_by_ref(&self, id: TypeId) -> bool {
        matches!(self.get(id), Some(Type::ByRef(_)))
    }

    /// Strip a single by-reference wrapper
    pub fn strip_by_ref(&self, id: TypeId) -> TypeId {
        match self.get(id) {
            Some(Type::ByRef(inner)) => *inner,
            _ => id,
        }
    }

    /// Element type and rank of an array type
    pub fn array_info(&self, id: TypeId) -> Option<ArrayType> {
        match self.get(id) {
            Some(Type::Array(a)) => Some(*a),
            _ => None,
        }
    }

    /// Primitive kind, if the type is primitive
    pub fn as_primitive(&self, id: TypeId) -> Option<PrimitiveType> {
        match self.get(id) {
            Some(Type::Primitive(p)) => Some(*p),
            _ => None,
        }
    }

    /// Enum definition, if the type is an enum
    pub fn as_enum(&self, id: TypeId) -> Option<&EnumType> {
        match self.get(id) {
            Some(Type::Enum(e)) => Some(e),
            _ => None,
        }
    }

    /// Class kind, if the type is a class
    pub fn class_kind(&self, id: TypeId) -> Option<ClassKind> {
        match self.get(id) {
            Some(Type::Class(c)) => Some(c.kind),
            _ => None,
        }
    }

    /// Directly implemented or extended interfaces
    pub fn interfaces_of(&self, id: TypeId) -> &[TypeId] {
        match self.get(id) {
            Some(Type::Class(c)) => &c.interfaces,
            Some(Type::Interface(i)) => &i.extends,
            _ => &[],
        }
    }

    /// Human-readable type name
    pub fn display(&self, id: TypeId) -> String {
        match self.get(id) {
            None => format!("<invalid {}>", id.0),
            Some(ty) => match ty {
                Type::Void => "Void".to_string(),
                Type::Object => "Object".to_string(),
                Type::ValueType => "ValueType".to_string(),
                Type::String => "String".to_string(),
                Type::Primitive(p) => p.name().to_string(),
                Type::Class(c) => c.name.clone(),
                Type::Interface(i) => i.name.clone(),
                Type::Enum(e) => e.name.clone(),
                Type::Array(a) => {
                    let commas = ",".repeat(a.rank.saturating_sub(1) as usize);
                    format!("{}[{}]", self.display(a.element), commas)
                }
                Type::ByRef(inner) => format!("{}&", self.display(*inner)),
                Type::Nullable(inner) => format!("Nullable<{}>", self.display(*inner)),
                Type::Pointer(inner) => format!("{}*", self.display(*inner)),
                Type::GenericParam(p) => p.name.clone(),
            },
        }
    }

    /// Short name used when generating object handles (no generic arguments)
    pub fn short_name(&self, id: TypeId) -> String {
        let full = match self.get(id) {
            Some(Type::Class(c)) => match &c.generic {
                Some(g) => g.definition.clone(),
                None => c.name.clone(),
            },
            _ => self.display(id),
        };
        full.rsplit('.').next().unwrap_or(&full).to_string()
    }

    fn join_names(&self, ids: &[TypeId]) -> String {
        ids.iter().map(|&t| self.display(t)).collect::<Vec<_>>().join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_interned_ids() {
        let ctx = TypeContext::new();
        assert_eq!(ctx.get(TypeId::OBJECT), Some(&Type::Object));
        assert_eq!(ctx.get(TypeId::STRING), Some(&Type::String));
        for p in PrimitiveType::ALL {
            assert_eq!(ctx.get(TypeId::primitive(p)), Some(&Type::Primitive(p)));
            assert_eq!(ctx.lookup_named_type(p.name()), Some(TypeId::primitive(p)));
        }
    }

    #[test]
    fn test_interning_dedups() {
        let mut ctx = TypeContext::new();
        let int = ctx.primitive(PrimitiveType::Int32);
        let a = ctx.vector_type(int);
        let b = ctx.array_type(int, 1).unwrap();
        assert_eq!(a, b);
        let two = ctx.array_type(int, 2).unwrap();
        assert_ne!(a, two);
    }

    #[test]
    fn test_array_rank_bounds() {
        let mut ctx = TypeContext::new();
        let int = ctx.primitive(PrimitiveType::Int32);
        assert!(matches!(ctx.array_type(int, 0), Err(TypeError::InvalidArrayRank { .. })));
        assert!(ctx.array_type(int, MAX_ARRAY_RANK + 1).is_err());
    }

    #[test]
    fn test_base_chain() {
        let mut ctx = TypeContext::new();
        let animal = ctx.class_type("Animal", None, vec![]);
        let dog = ctx.class_type("Dog", Some(animal), vec![]);
        let point = ctx.struct_type("Point", vec![]);

        assert_eq!(ctx.base_of(dog), Some(animal));
        assert_eq!(ctx.base_of(animal), Some(TypeId::OBJECT));
        assert_eq!(ctx.base_of(point), Some(TypeId::VALUE_TYPE));
        assert_eq!(ctx.base_of(TypeId::VALUE_TYPE), Some(TypeId::OBJECT));
        assert_eq!(ctx.base_of(TypeId::OBJECT), None);
    }

    #[test]
    fn test_display_names() {
        let mut ctx = TypeContext::new();
        let int = ctx.primitive(PrimitiveType::Int32);
        let grid = ctx.array_type(int, 2).unwrap();
        let by_ref = ctx.by_ref(grid);
        let opt = ctx.nullable(int);
        let list = ctx.generic_class("List`1", vec![int], None, vec![]);
        assert_eq!(ctx.display(by_ref), "Int32[,]&");
        assert_eq!(ctx.display(opt), "Nullable<Int32>");
        assert_eq!(ctx.display(list), "List`1<Int32>");
        assert_eq!(ctx.short_name(list), "List`1");
    }
}
