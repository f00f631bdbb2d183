//! Host values back to script text

use super::{list, primitive, InterfacePriority, Marshaler};
use crate::error::{BindError, BindResult};
use tether_sdk::{BinderError, ConversionContext, MarshalFlags, NativeValue, ObjectFlags};
use tether_types::{ClassKind, TypeId};

/// Controls how a host value is rendered for the script
#[derive(Debug, Clone, PartialEq)]
pub struct FromNativeOptions {
    /// The handle must carry an alias
    pub want_alias: bool,
    /// Alias name; the handle name itself when `None`
    pub alias_name: Option<String>,
    /// Register a new handle when none can be reused
    pub create: bool,
    /// Dispose the value if registration fails
    pub dispose: bool,
    /// Render the natural string form, never a handle
    pub to_string_only: bool,
    /// Register a new handle even if one exists for the identity
    pub force_new: bool,
    /// Extra flags for a new registration
    pub object_flags: ObjectFlags,
    /// Embedder data stored with a new registration
    pub client_data: Option<String>,
    /// Reference count stored with a new registration
    pub ref_count: u32,
    /// Interfaces a COM object may be narrowed to
    pub interfaces: Vec<InterfacePriority>,
    /// Marshal flags handed to the binder
    pub flags: MarshalFlags,
}

impl Default for FromNativeOptions {
    fn default() -> Self {
        Self {
            want_alias: false,
            alias_name: None,
            create: true,
            dispose: true,
            to_string_only: false,
            force_new: false,
            object_flags: ObjectFlags::NONE,
            client_data: None,
            ref_count: 0,
            interfaces: Vec::new(),
            flags: MarshalFlags::NONE,
        }
    }
}

impl FromNativeOptions {
    /// Require an alias named `alias`
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.want_alias = true;
        self.alias_name = Some(alias.into());
        self
    }

    /// Render the natural string form only
    pub fn text_only(mut self) -> Self {
        self.to_string_only = true;
        self
    }

    /// Always register a new handle
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Interfaces a COM object may be narrowed to
    pub fn with_interfaces(mut self, interfaces: Vec<InterfacePriority>) -> Self {
        self.interfaces = interfaces;
        self
    }
}

impl<'e> Marshaler<'e> {
    /// Render a host value as script text: a literal for simple values, an
    /// object handle for everything else
    pub fn from_native(&self, value: &NativeValue, options: &FromNativeOptions) -> BindResult<String> {
        let Some(runtime_type) = value.type_id() else {
            return Ok(self.config.null_literal.clone());
        };
        let types = self.types();
        types.resolve(runtime_type)?;

        let ty = match value.as_object() {
            Some(object) if types.class_kind(object.ty()) == Some(ClassKind::ComObject) => self
                .resolve_interface(object, &options.interfaces)
                .unwrap_or(runtime_type),
            _ => runtime_type,
        };

        if options.to_string_only {
            return Ok(self.plain_text(value));
        }

        if let Some(text) = self.custom_text(value, ty, options.flags)? {
            return Ok(text);
        }

        let classifier = self.classifier();
        if classifier.is_simple_type(ty) {
            if let Some(text) = primitive::render_scalar(types, value) {
                return Ok(text);
            }
        }

        if classifier.is_simple_array(ty) {
            if let Some(array) = value.as_array() {
                let items: Vec<String> = array.to_vec().iter().map(|v| self.plain_text(v)).collect();
                return Ok(list::format_list(items));
            }
        }

        if classifier.is_simple_generic(ty, &self.config.simple_generic_definitions) {
            if let Some(elements) = value.as_object().and_then(|o| o.elements()) {
                let items: Vec<String> = elements.iter().map(|v| self.plain_text(v)).collect();
                return Ok(list::format_list(items));
            }
        }

        self.obtain_handle(value, ty, options)
    }

    /// Binder rendering for types that ask for it
    fn custom_text(&self, value: &NativeValue, ty: TypeId, flags: MarshalFlags) -> BindResult<Option<String>> {
        let Some(binder) = self.host.binder() else {
            return Ok(None);
        };
        if !binder.has_custom_to_string(ty) {
            return Ok(None);
        }
        let cx = ConversionContext {
            types: self.types(),
            culture: self.host.culture(),
            flags,
        };
        match binder.to_string(value, &cx) {
            Ok(text) => Ok(Some(text)),
            Err(BinderError::Unsupported) => Ok(None),
            Err(err) => Err(BindError::ConversionError {
                at: "return value".to_string(),
                value: format!("\"{}\"", self.plain_text(value)),
                source_type: self.types().display(ty),
                target: "String".to_string(),
                cause: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;
    use tether_sdk::memory::MemoryHost;
    use tether_sdk::{Binder, HostObject, NativeArray};
    use tether_types::{PrimitiveType, TypeContext};

    fn render(host: &MemoryHost, value: &NativeValue, options: &FromNativeOptions) -> BindResult<String> {
        let config = EngineConfig::default();
        let counter = AtomicU64::new(0);
        let m = Marshaler::new(host, &config, ObjectFlags::NONE, &counter);
        m.from_native(value, options)
    }

    #[test]
    fn test_simple_values_render_as_text() {
        let mut types = TypeContext::new();
        let ints = types.vector_type(TypeId::primitive(PrimitiveType::Int32));
        let host = MemoryHost::new(types);
        let opts = FromNativeOptions::default();

        assert_eq!(render(&host, &NativeValue::Null, &opts).unwrap(), "null");
        assert_eq!(render(&host, &NativeValue::Int32(-4), &opts).unwrap(), "-4");
        assert_eq!(render(&host, &NativeValue::Boolean(true), &opts).unwrap(), "True");
        assert_eq!(render(&host, &"two words".into(), &opts).unwrap(), "two words");

        let array = NativeArray::vector(ints, TypeId::primitive(PrimitiveType::Int32), vec![1.into(), 2.into()]);
        let value = NativeValue::Array(Arc::new(array));
        assert_eq!(render(&host, &value, &opts).unwrap(), "1 2");
        assert!(host.memory_objects().is_empty());
    }

    #[test]
    fn test_simple_generic_renders_elements() {
        let mut types = TypeContext::new();
        let list_ty = types.generic_class("List`1", vec![TypeId::STRING], None, vec![]);
        let host = MemoryHost::new(types);
        let value = HostObject::new(list_ty)
            .with_elements(vec!["a".into(), "b c".into()])
            .into_value();
        assert_eq!(render(&host, &value, &FromNativeOptions::default()).unwrap(), "a {b c}");
    }

    #[test]
    fn test_custom_binder_rendering() {
        struct Hex;
        impl Binder for Hex {
            fn change_type(&self, text: &str, _t: TypeId, _cx: &ConversionContext<'_>) -> Result<NativeValue, BinderError> {
                Err(BinderError::Unconvertible { value: text.into(), target: "?".into() })
            }
            fn has_custom_to_string(&self, ty: TypeId) -> bool {
                ty == TypeId::primitive(PrimitiveType::Int32)
            }
            fn to_string(&self, value: &NativeValue, _cx: &ConversionContext<'_>) -> Result<String, BinderError> {
                Ok(format!("0x{:x}", value.as_integer().unwrap_or_default()))
            }
        }
        let host = MemoryHost::new(TypeContext::new()).with_binder(Hex);
        assert_eq!(render(&host, &NativeValue::Int32(255), &FromNativeOptions::default()).unwrap(), "0xff");
    }

    #[test]
    fn test_text_only_skips_handles() {
        let mut types = TypeContext::new();
        let widget = types.class_type("Widget", None, vec![]);
        let host = MemoryHost::new(types);
        let value = HostObject::new(widget).with_text("a widget").into_value();
        let text = render(&host, &value, &FromNativeOptions::default().text_only()).unwrap();
        assert_eq!(text, "a widget");
        assert!(host.memory_objects().is_empty());
    }
}
