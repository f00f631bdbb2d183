//! Conversion callbacks supplied by the embedder

use crate::error::{BinderError, InvokeError};
use crate::flags::MarshalFlags;
use crate::member::CallCandidate;
use crate::value::{HostObject, NativeValue};
use tether_types::{TypeContext, TypeId};

/// Ambient data handed to every callback
#[derive(Debug, Clone, Copy)]
pub struct ConversionContext<'a> {
    /// Type model
    pub types: &'a TypeContext,
    /// Culture name used for parsing and formatting, if any
    pub culture: Option<&'a str>,
    /// Effective marshal flags
    pub flags: MarshalFlags,
}

/// Result of the richer change-type callback
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeTypeOutcome {
    /// Converted value
    pub value: NativeValue,
    /// Replacement marshal flags for the rest of this conversion
    pub flags: Option<MarshalFlags>,
}

/// Type-change and rendering callbacks
pub trait Binder: Send + Sync {
    /// Convert the string form of a value to `target`
    fn change_type(
        &self,
        text: &str,
        target: TypeId,
        cx: &ConversionContext<'_>,
    ) -> Result<NativeValue, BinderError>;

    /// Richer conversion that also sees the unconverted value and may update
    /// the marshal flags
    fn change_type_ex(
        &self,
        value: &NativeValue,
        text: &str,
        target: TypeId,
        cx: &ConversionContext<'_>,
    ) -> Result<ChangeTypeOutcome, BinderError> {
        let _ = value;
        self.change_type(text, target, cx)
            .map(|value| ChangeTypeOutcome { value, flags: None })
    }

    /// Whether values of `ty` need [`to_string`](Self::to_string) rendering
    fn has_custom_to_string(&self, ty: TypeId) -> bool {
        let _ = ty;
        false
    }

    /// Custom rendering of a value
    fn to_string(&self, value: &NativeValue, cx: &ConversionContext<'_>) -> Result<String, BinderError> {
        let _ = (value, cx);
        Err(BinderError::Unsupported)
    }

    /// Choose among several bound overloads; `None` keeps the first
    fn select_method_index(&self, candidates: &[&CallCandidate], args: &[Vec<NativeValue>]) -> Option<usize> {
        let _ = (candidates, args);
        None
    }
}

/// Dynamic interface discovery for COM-style objects
pub trait InterfaceResolver: Send + Sync {
    /// Whether the live object answers to the interface
    fn supports(&self, object: &HostObject, interface: TypeId) -> bool;

    /// Interface name advertised by the object's class-info or dispatch metadata
    fn advertised_name(&self, object: &HostObject) -> Option<String> {
        let _ = object;
        None
    }
}

/// Invokes a bound member
pub trait Invoker {
    /// Call the member; by-ref arguments are updated in place
    fn invoke(&self, candidate: &CallCandidate, args: &mut [NativeValue]) -> Result<NativeValue, InvokeError>;
}
