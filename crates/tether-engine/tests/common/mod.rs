//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use tether_sdk::memory::MemoryHost;
use tether_sdk::{ArgumentValue, CallCandidate, InvokeError, Invoker, NativeValue, ParameterInfo};
use tether_types::{PrimitiveType, TypeContext, TypeId};

/// A small host type model
pub struct Fixture {
    pub host: MemoryHost,
    pub int: TypeId,
    pub long: TypeId,
    pub ints: TypeId,
    pub int_ref: TypeId,
    pub ints_ref: TypeId,
    pub grid: TypeId,
    pub int_ptr: TypeId,
    pub widget: TypeId,
}

pub fn fixture() -> Fixture {
    let mut types = TypeContext::new();
    let int = TypeId::primitive(PrimitiveType::Int32);
    let long = TypeId::primitive(PrimitiveType::Int64);
    let ints = types.vector_type(int);
    let int_ref = types.by_ref(int);
    let ints_ref = types.by_ref(ints);
    let grid = types.array_type(int, 2).expect("rank 2 is valid");
    let int_ptr = types.pointer(int);
    let widget = types.class_type("Shapes.Widget", None, vec![]);
    Fixture {
        host: MemoryHost::new(types),
        int,
        long,
        ints,
        int_ref,
        ints_ref,
        grid,
        int_ptr,
        widget,
    }
}

/// `f(int)`, `f(int, int)` and `f(params int[])`
pub fn f_overloads(fx: &Fixture) -> Vec<CallCandidate> {
    vec![
        CallCandidate::method("f", vec![ParameterInfo::new("a", fx.int)]),
        CallCandidate::method("f", vec![ParameterInfo::new("a", fx.int), ParameterInfo::new("b", fx.int)]),
        CallCandidate::method("f", vec![ParameterInfo::new("rest", fx.ints).variadic()]),
    ]
}

pub fn literals(items: &[&str]) -> Vec<ArgumentValue> {
    items.iter().map(|s| ArgumentValue::from(*s)).collect()
}

/// Invoker that records calls and runs a closure over the arguments
pub struct Recorder<F> {
    pub calls: Mutex<Vec<String>>,
    body: F,
}

impl<F> Recorder<F>
where
    F: Fn(&mut [NativeValue]) -> Result<NativeValue, InvokeError>,
{
    pub fn new(body: F) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            body,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl<F> Invoker for Recorder<F>
where
    F: Fn(&mut [NativeValue]) -> Result<NativeValue, InvokeError>,
{
    fn invoke(&self, candidate: &CallCandidate, args: &mut [NativeValue]) -> Result<NativeValue, InvokeError> {
        self.calls
            .lock()
            .push(format!("{}/{}", candidate.name, candidate.parameters.len()));
        (self.body)(args)
    }
}
