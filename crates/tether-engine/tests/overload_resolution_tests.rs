mod common;

use common::{f_overloads, fixture, literals};
use tether_engine::{BindRequest, Engine, ErrorKind};
use tether_sdk::{CallCandidate, Host, MarshalFlags, NativeValue, ParameterInfo, ReorderFlags};

#[test]
fn test_three_arguments_bind_only_variadic() {
    let fx = fixture();
    let engine = Engine::default();
    let candidates = f_overloads(&fx);
    let args = literals(&["1", "2", "3"]);

    let bound = engine
        .resolve_and_bind(&fx.host, &BindRequest::new(&candidates).named("f").with_args(&args))
        .unwrap();
    assert_eq!(bound.len(), 1);
    assert_eq!(bound[0].candidate, 2);
    let rest = bound[0].args[0].as_array().unwrap();
    assert_eq!(
        rest.to_vec(),
        vec![NativeValue::Int32(1), NativeValue::Int32(2), NativeValue::Int32(3)]
    );
}

#[test]
fn test_two_arguments_rank_fewest_parameters_first() {
    let fx = fixture();
    let engine = Engine::default();
    let candidates = f_overloads(&fx);
    let args = literals(&["1", "2"]);

    let bound = engine
        .resolve_and_bind(&fx.host, &BindRequest::new(&candidates).named("f").with_args(&args))
        .unwrap();
    let found: Vec<usize> = bound.iter().map(|b| b.candidate).collect();
    assert_eq!(found, vec![1, 2]);

    let ranked = engine
        .reorder(fx.host.types(), &candidates, bound, ReorderFlags::FEWEST_PARAMETERS)
        .unwrap();
    assert_eq!(ranked[0].candidate, 1);
    assert_eq!(ranked[0].args, vec![NativeValue::Int32(1), NativeValue::Int32(2)]);
}

#[test]
fn test_identity_reorder_keeps_contents() {
    let fx = fixture();
    let engine = Engine::default();
    let candidates = f_overloads(&fx);
    let args = literals(&["1", "2"]);
    let bound = engine
        .resolve_and_bind(&fx.host, &BindRequest::new(&candidates).with_args(&args))
        .unwrap();

    let same = engine
        .reorder(fx.host.types(), &candidates, bound.clone(), ReorderFlags::NONE)
        .unwrap();
    assert_eq!(same, bound);
}

#[test]
fn test_pointer_parameter_always_rejected() {
    let fx = fixture();
    let ptr = fx.int_ptr;
    let candidates = vec![CallCandidate::method(
        "poke",
        vec![ParameterInfo::new("n", fx.int), ParameterInfo::new("p", ptr)],
    )];
    let engine = Engine::default();

    for flags in [MarshalFlags::NONE, MarshalFlags::VERBOSE, MarshalFlags::NO_CHANGE_TYPE | MarshalFlags::CUSTOM_ASSIGNABILITY] {
        let args = literals(&["1", "2"]);
        let err = engine
            .resolve_and_bind(&fx.host, &BindRequest::new(&candidates).with_args(&args).with_flags(flags))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PointerTypeRejected);
    }
}

#[test]
fn test_arity_message_names_counts() {
    let fx = fixture();
    let engine = Engine::default();
    let candidates = vec![CallCandidate::method(
        "pair",
        vec![ParameterInfo::new("a", fx.int), ParameterInfo::new("b", fx.int)],
    )];
    let args = literals(&["1", "2", "3"]);
    let err = engine
        .resolve_and_bind(&fx.host, &BindRequest::new(&candidates).named("pair").with_args(&args))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "method \"pair\" requires exactly 2 arguments and 3 were supplied"
    );
}

#[test]
fn test_ignore_case_matching() {
    let fx = fixture();
    let engine = Engine::default();
    let candidates = f_overloads(&fx);
    let args = literals(&["1"]);

    let err = engine
        .resolve_and_bind(&fx.host, &BindRequest::new(&candidates).named("F").with_args(&args))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NameNotFound);

    let bound = engine
        .resolve_and_bind(
            &fx.host,
            &BindRequest::new(&candidates)
                .named("F")
                .with_args(&args)
                .with_flags(MarshalFlags::IGNORE_CASE),
        )
        .unwrap();
    assert_eq!(bound.len(), 2);
}

#[test]
fn test_forced_parameter_type_converts_to_hint() {
    let fx = fixture();
    let engine = Engine::default();
    let candidates = vec![CallCandidate::method("show", vec![ParameterInfo::new("v", tether_types::TypeId::OBJECT)])];
    let args = literals(&["12"]);
    let hints = [Some(fx.long)];

    let bound = engine
        .resolve_and_bind(
            &fx.host,
            &BindRequest::new(&candidates)
                .with_args(&args)
                .with_type_hints(&hints)
                .with_flags(MarshalFlags::FORCE_PARAMETER_TYPE),
        )
        .unwrap();
    assert_eq!(bound[0].args, vec![NativeValue::Int64(12)]);

    let bound = engine
        .resolve_and_bind(&fx.host, &BindRequest::new(&candidates).with_args(&args).with_type_hints(&hints))
        .unwrap();
    assert_eq!(bound[0].args, vec![NativeValue::String("12".into())]);
}
