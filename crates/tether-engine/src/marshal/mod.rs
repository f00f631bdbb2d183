//! Value marshaling
//!
//! [`Marshaler`] converts script arguments into host values (`to_native`)
//! and host values back into script strings or object handles
//! (`from_native`). It is a short-lived view borrowing the engine and the
//! host for the duration of one call.

mod array;
mod from_native;
mod handles;
mod interfaces;
pub mod list;
pub mod primitive;

pub(crate) use array::index_key;
pub use from_native::FromNativeOptions;
pub use interfaces::InterfacePriority;

use crate::config::EngineConfig;
use crate::error::{BindError, BindResult};
use std::fmt;
use std::sync::atomic::AtomicU64;
use tether_sdk::{
    ArgumentValue, ConversionContext, Host, MarshalFlags, NativeValue, ObjectFlags, VariableValue,
};
use tether_types::{CompareFlags, TypeClassifier, TypeContext, TypeId};

/// Whether a parameter carries a value in, out, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Direction {
    /// The callee reads the value
    pub input: bool,
    /// The callee writes the value back
    pub output: bool,
}

impl Direction {
    /// Ordinary input parameter
    pub const IN: Self = Self { input: true, output: false };
    /// `out` parameter
    pub const OUT: Self = Self { input: false, output: true };
    /// `ref` parameter
    pub const IN_OUT: Self = Self { input: true, output: true };
}

/// Parameter position and name used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot<'a> {
    /// Zero-based parameter index
    pub index: usize,
    /// Parameter name; empty for free-standing values
    pub name: &'a str,
}

impl<'a> Slot<'a> {
    /// Slot of a formal parameter
    pub fn new(index: usize, name: &'a str) -> Self {
        Self { index, name }
    }

    /// Slot of a value that is not a parameter
    pub fn value() -> Self {
        Self { index: 0, name: "" }
    }
}

impl fmt::Display for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            f.write_str("value")
        } else {
            write!(f, "argument {} \"{}\"", self.index + 1, self.name)
        }
    }
}

/// Source of a scalar conversion after handle and variable resolution
enum Incoming {
    Text(String),
    Value(NativeValue),
}

/// Converts values between the script and the host for one call
pub struct Marshaler<'e> {
    host: &'e dyn Host,
    config: &'e EngineConfig,
    object_flags: ObjectFlags,
    counter: &'e AtomicU64,
}

impl<'e> Marshaler<'e> {
    pub(crate) fn new(
        host: &'e dyn Host,
        config: &'e EngineConfig,
        object_flags: ObjectFlags,
        counter: &'e AtomicU64,
    ) -> Self {
        Self { host, config, object_flags, counter }
    }

    /// Type model of the host
    pub fn types(&self) -> &'e TypeContext {
        self.host.types()
    }

    fn classifier(&self) -> TypeClassifier<'e> {
        TypeClassifier::new(self.host.types()).with_generic_limit(self.config.max_generic_depth)
    }

    fn compare_flags(flags: MarshalFlags, direction: Direction) -> CompareFlags {
        let mut compare = CompareFlags::NONE;
        if direction.output {
            compare = compare.union(CompareFlags::OUTPUT);
        }
        if flags.contains(MarshalFlags::SPECIAL_VALUE_TYPE) {
            compare = compare.union(CompareFlags::SPECIAL_VALUE_TYPE);
        }
        if flags.contains(MarshalFlags::CUSTOM_ASSIGNABILITY) {
            compare = compare.union(CompareFlags::CUSTOM_ASSIGNABILITY);
        }
        compare
    }

    /// Whether a value of runtime type `source` can be passed as `target`
    pub(crate) fn is_compatible(
        &self,
        target: TypeId,
        source: Option<TypeId>,
        flags: MarshalFlags,
        direction: Direction,
    ) -> bool {
        let compare = Self::compare_flags(flags, direction);
        let classifier = self.classifier();
        classifier.is_value_compatible(Some(target), source, compare)
            || classifier.is_reference_compatible(Some(target), source, compare)
    }

    /// Convert one actual argument to `target`
    ///
    /// For by-ref targets the conversion applies to the element type; with
    /// an output direction a literal argument names the script variable that
    /// supplies the input value.
    pub fn to_native(
        &self,
        arg: &ArgumentValue,
        target: TypeId,
        direction: Direction,
        flags: MarshalFlags,
        slot: Slot<'_>,
    ) -> BindResult<NativeValue> {
        let types = self.types();
        types.resolve(target)?;
        let inner = types.strip_by_ref(target);

        if arg.is_missing() {
            return Ok(primitive::default_value(types, inner));
        }

        if types.array_info(inner).is_some() {
            return self.to_native_array(arg, inner, direction, flags, slot);
        }

        let incoming = match arg {
            ArgumentValue::Literal(text) if direction.output => {
                match self.read_output_variable(text, direction, slot)? {
                    Some(incoming) => incoming,
                    None => return Ok(primitive::default_value(types, inner)),
                }
            }
            ArgumentValue::Literal(text) => self.resolve_text(text, flags),
            ArgumentValue::Handle(handle) => Incoming::Value(self.lookup_handle(handle, inner, slot)?),
            ArgumentValue::Native(value) => Incoming::Value(value.clone()),
            ArgumentValue::Missing => return Ok(primitive::default_value(types, inner)),
        };

        self.convert_scalar(incoming, inner, direction, flags, slot)
    }

    /// Input value of a by-ref parameter from the named variable
    ///
    /// `Ok(None)` means the parameter starts from its type default: the
    /// parameter is output-only or the variable does not exist yet.
    fn read_output_variable(
        &self,
        name: &str,
        direction: Direction,
        slot: Slot<'_>,
    ) -> BindResult<Option<Incoming>> {
        if !direction.input {
            return Ok(None);
        }
        let Some(variable) = self.host.variables().get(name) else {
            return Ok(None);
        };
        match variable.scalar() {
            Some(VariableValue::Text(text)) => Ok(Some(Incoming::Text(text.clone()))),
            Some(VariableValue::Native(value)) | Some(VariableValue::Link(value)) => {
                Ok(Some(Incoming::Value(value.clone())))
            }
            None => Err(BindError::OutputBindingError {
                at: slot.to_string(),
                reason: format!("variable \"{}\" is array, scalar required", name),
            }),
        }
    }

    /// Resolve a literal to an object when it names a handle
    fn resolve_text(&self, text: &str, flags: MarshalFlags) -> Incoming {
        if flags.contains(MarshalFlags::NO_HANDLE) {
            return Incoming::Text(text.to_string());
        }
        if text == self.config.null_literal {
            return Incoming::Value(NativeValue::Null);
        }
        match self.host.objects().lookup(text) {
            Some(entry) => Incoming::Value(entry.value),
            None => Incoming::Text(text.to_string()),
        }
    }

    fn lookup_handle(&self, handle: &str, target: TypeId, slot: Slot<'_>) -> BindResult<NativeValue> {
        if handle == self.config.null_literal {
            return Ok(NativeValue::Null);
        }
        self.host
            .objects()
            .lookup(handle)
            .map(|entry| entry.value)
            .ok_or_else(|| BindError::ConversionError {
                at: slot.to_string(),
                value: format!("\"{}\"", handle),
                source_type: "handle".to_string(),
                target: self.types().display(target),
                cause: format!("object \"{}\" not found", handle),
            })
    }

    fn convert_scalar(
        &self,
        incoming: Incoming,
        target: TypeId,
        direction: Direction,
        flags: MarshalFlags,
        slot: Slot<'_>,
    ) -> BindResult<NativeValue> {
        let types = self.types();
        let value = match incoming {
            Incoming::Text(text) => NativeValue::String(text),
            Incoming::Value(value) => value,
        };

        if value.is_null() {
            if self.classifier().accepts_null(target) {
                return Ok(NativeValue::Null);
            }
            return Err(BindError::UnsupportedFeature(format!(
                "{}: null is not allowed for value type {}",
                slot,
                types.display(target)
            )));
        }

        if self.is_compatible(target, value.type_id(), flags, direction) {
            return Ok(value);
        }

        let text = self.plain_text(&value);
        let mut cause = "no conversion available".to_string();

        if !flags.contains(MarshalFlags::NO_CHANGE_TYPE) {
            if let Some(binder) = self.host.binder() {
                let cx = ConversionContext {
                    types,
                    culture: self.host.culture(),
                    flags,
                };
                match binder.change_type_ex(&value, &text, target, &cx) {
                    Ok(outcome) => {
                        let flags = outcome.flags.unwrap_or(flags);
                        if flags.contains(MarshalFlags::SKIP_CHANGE_TYPE_CHECK)
                            || self.is_compatible(target, outcome.value.type_id(), flags, direction)
                        {
                            return Ok(outcome.value);
                        }
                        return Err(BindError::ConversionError {
                            at: slot.to_string(),
                            value: format!("\"{}\"", text),
                            source_type: self.type_name(&value),
                            target: types.display(target),
                            cause: format!(
                                "binder produced a value of type {}",
                                self.type_name(&outcome.value)
                            ),
                        });
                    }
                    Err(err) => cause = err.to_string(),
                }
            }
        }

        primitive::convert(types, &value, &text, target).ok_or_else(|| BindError::ConversionError {
            at: slot.to_string(),
            value: format!("\"{}\"", text),
            source_type: self.type_name(&value),
            target: types.display(target),
            cause,
        })
    }

    /// String form passed to the binder and used in messages
    pub(crate) fn plain_text(&self, value: &NativeValue) -> String {
        match value {
            NativeValue::Null => self.config.null_literal.clone(),
            NativeValue::Object(o) => o
                .text()
                .map(str::to_string)
                .unwrap_or_else(|| self.types().display(o.ty())),
            NativeValue::Array(a) => {
                let items: Vec<String> = a.to_vec().iter().map(|v| self.plain_text(v)).collect();
                list::format_list(items)
            }
            scalar => primitive::render_scalar(self.types(), scalar).unwrap_or_default(),
        }
    }

    fn type_name(&self, value: &NativeValue) -> String {
        match value.type_id() {
            Some(ty) => self.types().display(ty),
            None => "null".to_string(),
        }
    }
}
