mod common;

use common::{fixture, literals, Recorder};
use tether_engine::{BindRequest, CallRequest, Engine, ErrorKind};
use tether_sdk::memory::MemoryHost;
use std::sync::Arc;
use tether_sdk::{
    ArgumentValue, Binder, BinderError, CallCandidate, ConversionContext, HostObject, MarshalFlags,
    NativeArray, NativeValue, ObjectTable, ParameterInfo, ReorderFlags, Variable, VariableStore,
    VariableValue,
};
use tether_types::{TypeContext, TypeId};

#[test]
fn test_by_ref_argument_written_back() {
    let fx = fixture();
    let engine = Engine::default();
    fx.host.memory_variables().define("n", Variable::text("4"));
    let candidates = vec![CallCandidate::method("inc", vec![ParameterInfo::new("x", fx.int_ref)])];
    let args = literals(&["n"]);
    let recorder = Recorder::new(|args: &mut [NativeValue]| {
        let next = args[0].as_integer().unwrap_or(0) + 1;
        args[0] = NativeValue::Int32(next as i32);
        Ok(NativeValue::Null)
    });

    let outcome = engine
        .invoke(&fx.host, &recorder, &CallRequest::new(BindRequest::new(&candidates).with_args(&args)))
        .unwrap();
    assert_eq!(outcome.result, "");
    assert_eq!(recorder.calls(), vec!["inc/1"]);
    assert_eq!(fx.host.memory_variables().text("n").as_deref(), Some("5"));
}

#[test]
fn test_out_parameter_starts_from_default() {
    let fx = fixture();
    let engine = Engine::default();
    let candidates = vec![CallCandidate::method("peek", vec![ParameterInfo::new("x", fx.int_ref).out()])];
    let args = literals(&["m"]);
    let recorder = Recorder::new(|args: &mut [NativeValue]| {
        assert_eq!(args[0], NativeValue::Int32(0));
        args[0] = NativeValue::Int32(9);
        Ok(NativeValue::Null)
    });

    engine
        .invoke(&fx.host, &recorder, &CallRequest::new(BindRequest::new(&candidates).with_args(&args)))
        .unwrap();
    assert_eq!(fx.host.memory_variables().text("m").as_deref(), Some("9"));

    fx.host.memory_variables().define("k", Variable::text("1"));
    let args = literals(&["k"]);
    engine
        .invoke(
            &fx.host,
            &recorder,
            &CallRequest::new(BindRequest::new(&candidates).with_args(&args)).without_write_back(),
        )
        .unwrap();
    assert_eq!(fx.host.memory_variables().text("k").as_deref(), Some("1"));
}

#[test]
fn test_call_wide_array_flags_reach_write_back() {
    let fx = fixture();
    let engine = Engine::default();
    let candidates = vec![CallCandidate::method("fill", vec![ParameterInfo::new("xs", fx.ints_ref)])];
    let (ints, int) = (fx.ints, fx.int);
    let recorder = Recorder::new(move |args: &mut [NativeValue]| {
        args[0] = NativeValue::Array(Arc::new(NativeArray::vector(
            ints,
            int,
            vec![NativeValue::Int32(8), NativeValue::Int32(9)],
        )));
        Ok(NativeValue::Null)
    });

    fx.host.memory_variables().define_array("v", [("0", "1")]);
    let args = literals(&["v"]);
    let outcome = engine
        .invoke(
            &fx.host,
            &recorder,
            &CallRequest::new(
                BindRequest::new(&candidates)
                    .with_args(&args)
                    .with_flags(MarshalFlags::ARRAY_AS_VALUE),
            ),
        )
        .unwrap();
    let stored = fx.host.memory_variables().get("v").unwrap();
    assert!(!stored.is_array());
    assert_eq!(stored.scalar(), Some(&VariableValue::Native(outcome.args[0].clone())));

    fx.host.memory_variables().define_array("w", [("0", "1")]);
    let args = literals(&["w"]);
    let outcome = engine
        .invoke(
            &fx.host,
            &recorder,
            &CallRequest::new(
                BindRequest::new(&candidates)
                    .with_args(&args)
                    .with_flags(MarshalFlags::ARRAY_AS_LINK),
            ),
        )
        .unwrap();
    let stored = fx.host.memory_variables().get("w").unwrap();
    assert_eq!(stored.scalar(), Some(&VariableValue::Link(outcome.args[0].clone())));

    // without either flag the elements are written one by one
    fx.host.memory_variables().define_array("e", [("0", "1")]);
    let args = literals(&["e"]);
    engine
        .invoke(&fx.host, &recorder, &CallRequest::new(BindRequest::new(&candidates).with_args(&args)))
        .unwrap();
    let elements = fx.host.memory_variables().get("e").unwrap().elements().cloned().unwrap();
    assert_eq!(elements.get("1").map(String::as_str), Some("9"));
}

fn feed_overloads() -> (MemoryHost, Vec<CallCandidate>, NativeValue) {
    let mut types = TypeContext::new();
    let animal = types.class_type("Zoo.Animal", None, vec![]);
    let dog = types.class_type("Zoo.Dog", Some(animal), vec![]);
    let candidates = vec![
        CallCandidate::method("feed", vec![ParameterInfo::new("o", TypeId::OBJECT)]),
        CallCandidate::method("feed", vec![ParameterInfo::new("a", animal)]),
        CallCandidate::method("feed", vec![ParameterInfo::new("d", dog)]),
    ];
    (MemoryHost::new(types), candidates, HostObject::new(dog).into_value())
}

#[test]
fn test_reorder_matches_prefers_most_derived() {
    let (host, candidates, rex) = feed_overloads();
    let engine = Engine::default();
    let args = vec![ArgumentValue::Native(rex)];
    let recorder = Recorder::new(|_args: &mut [NativeValue]| Ok(NativeValue::Null));

    let bind = BindRequest::new(&candidates).named("feed").with_args(&args);
    let outcome = engine.invoke(&host, &recorder, &CallRequest::new(bind.clone())).unwrap();
    assert_eq!(outcome.candidate, 0);

    let reordered = bind.with_flags(MarshalFlags::REORDER_MATCHES);
    let outcome = engine
        .invoke(&host, &recorder, &CallRequest::new(reordered.clone()))
        .unwrap();
    assert_eq!(outcome.candidate, 2);

    let outcome = engine
        .invoke(
            &host,
            &recorder,
            &CallRequest::new(reordered).with_reorder(ReorderFlags::SHALLOWEST_TYPES),
        )
        .unwrap();
    assert_eq!(outcome.candidate, 0);
}

struct Picky(usize);

impl Binder for Picky {
    fn change_type(
        &self,
        _text: &str,
        _target: TypeId,
        _cx: &ConversionContext<'_>,
    ) -> Result<NativeValue, BinderError> {
        Err(BinderError::Unsupported)
    }

    fn select_method_index(&self, _candidates: &[&CallCandidate], _args: &[Vec<NativeValue>]) -> Option<usize> {
        Some(self.0)
    }
}

#[test]
fn test_binder_selects_overload() {
    let (host, candidates, rex) = feed_overloads();
    let host = host.with_binder(Picky(1));
    let engine = Engine::default();
    let args = vec![ArgumentValue::Native(rex.clone())];
    let recorder = Recorder::new(|_args: &mut [NativeValue]| Ok(NativeValue::Null));

    let bind = BindRequest::new(&candidates).with_args(&args);
    let outcome = engine.invoke(&host, &recorder, &CallRequest::new(bind.clone())).unwrap();
    assert_eq!(outcome.candidate, 1);

    let outcome = engine
        .invoke(&host, &recorder, &CallRequest::new(bind.clone()).with_index(2))
        .unwrap();
    assert_eq!(outcome.candidate, 2);

    let (host, candidates, _) = feed_overloads();
    let host = host.with_binder(Picky(7));
    let bind = BindRequest::new(&candidates).with_args(&args);
    let outcome = engine.invoke(&host, &recorder, &CallRequest::new(bind)).unwrap();
    assert_eq!(outcome.candidate, 0);
}

#[test]
fn test_object_result_becomes_handle() {
    let (host, candidates, rex) = feed_overloads();
    let engine = Engine::default();
    let args = vec![ArgumentValue::Native(rex.clone())];
    let candidates = vec![candidates[2].clone().returning(TypeId::OBJECT)];
    let echo = Recorder::new(|args: &mut [NativeValue]| Ok(args[0].clone()));

    let outcome = engine
        .invoke(&host, &echo, &CallRequest::new(BindRequest::new(&candidates).with_args(&args)))
        .unwrap();
    assert_eq!(outcome.result, "Dog#1");
    assert_eq!(host.memory_objects().lookup("Dog#1").unwrap().value, rex);
}

#[test]
fn test_invoke_error_propagates() {
    let fx = fixture();
    let engine = Engine::default();
    let candidates = vec![CallCandidate::method("boom", vec![])];
    let failing = Recorder::new(|_args: &mut [NativeValue]| {
        Err(tether_sdk::InvokeError::Exception("kaboom".into()))
    });

    let err = engine
        .invoke(&fx.host, &failing, &CallRequest::new(BindRequest::new(&candidates).with_args(&[])))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invocation);
}
