mod common;

use common::{fixture, literals, Recorder};
use tether_engine::{BindRequest, CallRequest, Direction, Engine, ErrorKind, FromNativeOptions};
use tether_sdk::{ArgumentValue, CallCandidate, MarshalFlags, NativeValue, ParameterInfo, Variable};

#[test]
fn test_non_string_output_argument_rejected() {
    let fx = fixture();
    let engine = Engine::default();
    fx.host.memory_variables().define("n", Variable::text("1"));
    let candidates = vec![CallCandidate::method(
        "fill",
        vec![ParameterInfo::new("x", fx.int_ref).out()],
    )];
    let args = vec![ArgumentValue::Native(NativeValue::Int32(3))];
    let recorder = Recorder::new(|_args: &mut [NativeValue]| Ok(NativeValue::Null));

    let err = engine
        .invoke(&fx.host, &recorder, &CallRequest::new(BindRequest::new(&candidates).with_args(&args)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutputBindingError);
    assert!(recorder.calls().is_empty());
    assert_eq!(fx.host.memory_variables().text("n").as_deref(), Some("1"));
}

#[test]
fn test_earlier_writes_survive_later_failure() {
    let fx = fixture();
    let engine = Engine::default();
    fx.host.memory_variables().define_array("b", [("0", "1")]);
    let candidates = vec![CallCandidate::method(
        "pair",
        vec![
            ParameterInfo::new("a", fx.int_ref).out(),
            ParameterInfo::new("b", fx.int_ref).out(),
        ],
    )];
    let args = literals(&["a", "b"]);
    let recorder = Recorder::new(|args: &mut [NativeValue]| {
        args[0] = NativeValue::Int32(10);
        args[1] = NativeValue::Int32(20);
        Ok(NativeValue::Null)
    });

    let err = engine
        .invoke(&fx.host, &recorder, &CallRequest::new(BindRequest::new(&candidates).with_args(&args)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutputBindingError);
    assert_eq!(fx.host.memory_variables().text("a").as_deref(), Some("10"));
}

#[test]
fn test_rendered_values_convert_back() {
    let fx = fixture();
    let engine = Engine::default();
    let options = FromNativeOptions::default();

    for (value, ty) in [
        (NativeValue::Int32(-42), fx.int),
        (NativeValue::Int64(1 << 40), fx.long),
        (NativeValue::String("two words".into()), tether_types::TypeId::STRING),
    ] {
        let text = engine.from_native(&fx.host, &value, &options).unwrap();
        let back = engine
            .to_native(&fx.host, &ArgumentValue::from(text), ty, Direction::IN, MarshalFlags::NO_HANDLE)
            .unwrap();
        assert_eq!(back, value);
    }
}
