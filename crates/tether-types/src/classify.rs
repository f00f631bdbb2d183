//! Type classification
//!
//! Pure predicates over pairs of host types: value compatibility, reference
//! compatibility, assignability, wrapper nesting and inheritance depth. The
//! binder, the marshaler and the overload ranker all consult these instead of
//! inspecting [`Type`] shapes directly.

use crate::context::TypeContext;
use crate::error::{TypeError, TypeResult};
use crate::ty::{Type, TypeId};
use rustc_hash::FxHashSet;

/// Default recursion cap for the simple-generic recognizer
pub const DEFAULT_GENERIC_LIMIT: usize = 10;

/// Comparison flags (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CompareFlags(u8);

impl CompareFlags {
    /// Plain comparison
    pub const NONE: Self = Self(0x00);
    /// Treat by-ref wrappers as equivalent to their element
    pub const OUTPUT: Self = Self(0x01);
    /// The value-type root is compatible with every concrete value type
    pub const SPECIAL_VALUE_TYPE: Self = Self(0x02);
    /// Use the structural assignability algorithm instead of the host's check
    pub const CUSTOM_ASSIGNABILITY: Self = Self(0x04);

    /// Create from raw bits
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Check if all flags in `other` are set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of flags
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Remove flags
    pub const fn difference(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

/// Options for [`TypeClassifier::compute_type_depth`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepthOptions {
    /// Added to the depth of string-typed slots; negative values are a penalty
    pub string_bonus: i64,
    /// Add wrapper nesting levels to the depth
    pub count_sub_types: bool,
    /// Count the value-type root as a level
    pub count_value_types: bool,
    /// Count by-ref wrappers as nesting levels
    pub output: bool,
}

/// Stateless classifier over a [`TypeContext`]
#[derive(Debug, Clone, Copy)]
pub struct TypeClassifier<'a> {
    ctx: &'a TypeContext,
    generic_limit: usize,
}

impl<'a> TypeClassifier<'a> {
    /// Classifier with the default simple-generic recursion limit
    pub fn new(ctx: &'a TypeContext) -> Self {
        Self { ctx, generic_limit: DEFAULT_GENERIC_LIMIT }
    }

    /// Override the simple-generic recursion limit
    pub fn with_generic_limit(mut self, limit: usize) -> Self {
        self.generic_limit = limit;
        self
    }

    /// Underlying type context
    pub fn context(&self) -> &'a TypeContext {
        self.ctx
    }

    // ===== Single-type predicates =====

    /// Array of any rank
    pub fn is_array(&self, t: TypeId) -> bool {
        matches!(self.ctx.get(t), Some(Type::Array(_)))
    }

    /// Nullable wrapper
    pub fn is_nullable(&self, t: TypeId) -> bool {
        matches!(self.ctx.get(t), Some(Type::Nullable(_)))
    }

    /// Enumeration
    pub fn is_enum(&self, t: TypeId) -> bool {
        matches!(self.ctx.get(t), Some(Type::Enum(_)))
    }

    /// Primitive
    pub fn is_primitive(&self, t: TypeId) -> bool {
        matches!(self.ctx.get(t), Some(Type::Primitive(_)))
    }

    /// Unmanaged pointer
    pub fn is_pointer(&self, t: TypeId) -> bool {
        matches!(self.ctx.get(t), Some(Type::Pointer(_)))
    }

    /// Pointer, possibly behind a by-ref wrapper
    pub fn involves_pointer(&self, t: TypeId) -> bool {
        match self.ctx.get(t) {
            Some(Type::Pointer(_)) => true,
            Some(Type::ByRef(inner)) => self.involves_pointer(*inner),
            _ => false,
        }
    }

    /// Value type (primitive, enum, struct or nullable)
    pub fn is_value_type(&self, t: TypeId) -> bool {
        self.ctx.is_value_type(t)
    }

    /// Whether `null` is an acceptable value of this type
    pub fn accepts_null(&self, t: TypeId) -> bool {
        let t = self.ctx.strip_by_ref(t);
        match self.ctx.get(t) {
            Some(Type::Nullable(_)) => true,
            Some(Type::Void) | None => false,
            Some(_) => !self.is_value_type(t),
        }
    }

    // ===== Pair predicates =====

    /// Value-type compatibility between a target `t1` and a source `t2`
    ///
    /// `None` stands for the type of a null value and is never compatible.
    pub fn is_value_compatible(&self, t1: Option<TypeId>, t2: Option<TypeId>, flags: CompareFlags) -> bool {
        let (Some(mut t1), Some(mut t2)) = (t1, t2) else {
            return false;
        };

        if flags.contains(CompareFlags::OUTPUT) {
            t1 = self.ctx.strip_by_ref(t1);
            t2 = self.ctx.strip_by_ref(t2);
        }

        let v1 = self.unwrap_nullable(t1);
        let v2 = self.unwrap_nullable(t2);

        if v1 == v2 && self.is_value_type(v1) {
            return true;
        }

        if flags.contains(CompareFlags::SPECIAL_VALUE_TYPE) {
            if v1 == TypeId::VALUE_TYPE && self.is_value_type(v2) {
                return true;
            }
            if v2 == TypeId::VALUE_TYPE && self.is_value_type(v1) {
                return true;
            }
        }

        false
    }

    /// Reference compatibility: can a value of `t2` be passed where `t1` is expected
    ///
    /// A `None` source (null) is compatible with any target that accepts null.
    pub fn is_reference_compatible(&self, t1: Option<TypeId>, t2: Option<TypeId>, flags: CompareFlags) -> bool {
        let Some(t1) = t1 else {
            return false;
        };
        let Some(t2) = t2 else {
            return self.accepts_null(t1);
        };

        if t1 == t2 || self.is_assignable_from(t1, t2, flags) {
            return true;
        }

        if flags.contains(CompareFlags::OUTPUT) {
            if let Some(Type::ByRef(inner)) = self.ctx.get(t1) {
                return *inner == t2 || self.is_assignable_from(*inner, t2, flags);
            }
        }

        false
    }

    /// Whether a value of `source` may be stored in a slot of `target`
    pub fn is_assignable_from(&self, target: TypeId, source: TypeId, flags: CompareFlags) -> bool {
        if flags.contains(CompareFlags::CUSTOM_ASSIGNABILITY) {
            let mut visited = FxHashSet::default();
            self.custom_assignable(target, source, &mut visited)
        } else {
            self.host_assignable(target, source)
        }
    }

    /// Assignability as the host runtime reports it
    ///
    /// By-ref wrappers are opaque here: `T&` is only assignable from `T&`.
    fn host_assignable(&self, target: TypeId, source: TypeId) -> bool {
        if target == source {
            return true;
        }
        let (Some(target_ty), Some(source_ty)) = (self.ctx.get(target), self.ctx.get(source)) else {
            return false;
        };

        match (target_ty, source_ty) {
            (_, Type::ByRef(_)) | (Type::ByRef(_), _) => false,
            (_, Type::Pointer(_)) | (Type::Pointer(_), _) => false,
            (Type::Void, _) | (_, Type::Void) => false,
            (Type::Object, _) => true,
            (Type::Nullable(inner), _) => *inner == source,
            (Type::ValueType, _) => self.is_value_type(source) && !self.is_nullable(source),
            (Type::Array(ta), Type::Array(sa)) => {
                ta.rank == sa.rank
                    && !self.is_value_type(sa.element)
                    && self.host_assignable(ta.element, sa.element)
            }
            (Type::Interface(_), _) => {
                let mut visited = FxHashSet::default();
                self.implements(source, target, &mut visited)
            }
            _ => self.derives_from(source, target),
        }
    }

    /// Structural assignability that looks through by-ref wrappers and checks
    /// generic constraints
    fn custom_assignable(&self, target: TypeId, source: TypeId, visited: &mut FxHashSet<(TypeId, TypeId)>) -> bool {
        if target == source {
            return true;
        }
        if !visited.insert((target, source)) {
            return false;
        }
        let (Some(target_ty), Some(source_ty)) = (self.ctx.get(target), self.ctx.get(source)) else {
            return false;
        };

        match (target_ty, source_ty) {
            (Type::ByRef(t), Type::ByRef(s)) => self.custom_assignable(*t, *s, visited),
            (Type::ByRef(t), _) => self.custom_assignable(*t, source, visited),
            (_, Type::ByRef(s)) => self.custom_assignable(target, *s, visited),
            (Type::Pointer(_), _) | (_, Type::Pointer(_)) => false,
            (Type::Void, _) | (_, Type::Void) => false,
            (Type::GenericParam(p), _) => {
                if p.reference_type && self.is_value_type(source) {
                    return false;
                }
                if p.value_type && (!self.is_value_type(source) || self.is_nullable(source)) {
                    return false;
                }
                p.constraints
                    .iter()
                    .all(|&c| self.custom_assignable(c, source, visited))
            }
            (Type::Object, _) => true,
            (Type::Nullable(inner), Type::Nullable(s)) => self.custom_assignable(*inner, *s, visited),
            (Type::Nullable(inner), _) => *inner == source,
            (Type::ValueType, _) => self.is_value_type(source) && !self.is_nullable(source),
            (Type::Array(ta), Type::Array(sa)) => {
                ta.rank == sa.rank
                    && (ta.element == sa.element
                        || (!self.is_value_type(sa.element)
                            && self.custom_assignable(ta.element, sa.element, visited)))
            }
            (Type::Interface(_), _) => {
                let mut seen = FxHashSet::default();
                self.implements(source, target, &mut seen)
            }
            _ => self.derives_from(source, target),
        }
    }

    /// Walk the base chain of `source` looking for `target`
    fn derives_from(&self, source: TypeId, target: TypeId) -> bool {
        let mut current = self.ctx.base_of(source);
        let mut steps = 0usize;
        while let Some(t) = current {
            if t == target {
                return true;
            }
            steps += 1;
            if steps > self.ctx.len() {
                return false;
            }
            current = self.ctx.base_of(t);
        }
        false
    }

    /// Transitive interface implementation through bases and base interfaces
    fn implements(&self, source: TypeId, iface: TypeId, visited: &mut FxHashSet<TypeId>) -> bool {
        if !visited.insert(source) {
            return false;
        }
        for &i in self.ctx.interfaces_of(source) {
            if i == iface || self.implements(i, iface, visited) {
                return true;
            }
        }
        if let Some(Type::GenericParam(p)) = self.ctx.get(source) {
            if p.constraints.iter().any(|&c| c == iface || self.implements(c, iface, visited)) {
                return true;
            }
        }
        match self.ctx.base_of(source) {
            Some(base) => self.implements(base, iface, visited),
            None => false,
        }
    }

    fn unwrap_nullable(&self, t: TypeId) -> TypeId {
        match self.ctx.get(t) {
            Some(Type::Nullable(inner)) => *inner,
            _ => t,
        }
    }

    // ===== Depth scoring =====

    /// Count by-ref (only with `output`), array and nullable wrappers around `t`
    pub fn count_nesting_levels(&self, t: TypeId, output: bool) -> usize {
        let mut levels = 0;
        let mut current = t;
        while let Some(ty) = self.ctx.get(current) {
            match ty {
                Type::ByRef(inner) => {
                    if output {
                        levels += 1;
                    }
                    current = *inner;
                }
                Type::Array(a) => {
                    levels += 1;
                    current = a.element;
                }
                Type::Nullable(inner) => {
                    levels += 1;
                    current = *inner;
                }
                Type::Pointer(inner) => current = *inner,
                _ => break,
            }
        }
        levels
    }

    /// Innermost element after peeling every wrapper
    pub fn innermost(&self, t: TypeId) -> TypeId {
        let mut current = t;
        while let Some(inner) = self.ctx.get(current).and_then(Type::element) {
            current = inner;
        }
        current
    }

    /// Inheritance depth of `t`: one per level from the innermost element
    /// type up to the root
    ///
    /// The value-type root is counted at most once and only when
    /// `count_value_types` is set.
    pub fn compute_type_depth(&self, t: TypeId, options: DepthOptions) -> TypeResult<i64> {
        self.ctx.resolve(t)?;
        let inner = self.innermost(t);
        self.ctx.resolve(inner)?;

        let mut depth: i64 = 0;
        let mut current = Some(inner);
        let mut steps = 0usize;
        while let Some(level) = current {
            if level == TypeId::VALUE_TYPE {
                if options.count_value_types {
                    depth += 1;
                }
            } else {
                depth += 1;
            }
            steps += 1;
            if steps > self.ctx.len() {
                return Err(TypeError::RecursionLimit(t));
            }
            current = self.ctx.base_of(level);
        }

        if options.count_sub_types {
            depth += self.count_nesting_levels(t, options.output) as i64;
        }

        if inner == TypeId::STRING {
            depth += options.string_bonus;
        }

        Ok(depth)
    }

    // ===== Simple-type recognition =====

    /// Types whose values render as plain strings: primitives, strings,
    /// enums and nullables over those
    pub fn is_simple_type(&self, t: TypeId) -> bool {
        match self.ctx.get(t) {
            Some(Type::Primitive(_)) | Some(Type::String) | Some(Type::Enum(_)) => true,
            Some(Type::Nullable(inner)) => self.is_simple_type(*inner),
            _ => false,
        }
    }

    /// Rank-1 array of a simple element type
    pub fn is_simple_array(&self, t: TypeId) -> bool {
        match self.ctx.get(t) {
            Some(Type::Array(a)) => a.rank == 1 && self.is_simple_type(a.element),
            _ => false,
        }
    }

    /// Closed generic over one of `definitions` whose arguments are all
    /// simple (possibly nested simple generics)
    ///
    /// Fails closed beyond the recursion limit or when a type repeats on the
    /// recursion path.
    pub fn is_simple_generic(&self, t: TypeId, definitions: &[String]) -> bool {
        let mut seen = FxHashSet::default();
        self.simple_generic_at(t, definitions, 0, &mut seen)
    }

    fn simple_generic_at(
        &self,
        t: TypeId,
        definitions: &[String],
        level: usize,
        seen: &mut FxHashSet<TypeId>,
    ) -> bool {
        if level >= self.generic_limit || !seen.insert(t) {
            return false;
        }
        let Some(generic) = self.ctx.get(t).and_then(Type::generic) else {
            return false;
        };
        if !definitions.iter().any(|d| *d == generic.definition) {
            return false;
        }
        let ok = generic.args.iter().all(|&arg| {
            self.is_simple_type(arg) || self.simple_generic_at(arg, definitions, level + 1, seen)
        });
        seen.remove(&t);
        ok
    }
}
