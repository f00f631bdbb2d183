mod common;

use common::fixture;
use tether_engine::{Direction, Engine, ErrorKind, FromNativeOptions};
use tether_sdk::{ArgumentValue, HostObject, MarshalFlags, ObjectFlags, ObjectTable};

#[test]
fn test_same_identity_same_handle() {
    let fx = fixture();
    let engine = Engine::default();
    let value = HostObject::new(fx.widget).into_value();
    let options = FromNativeOptions::default();

    let first = engine.from_native(&fx.host, &value, &options).unwrap();
    let second = engine.from_native(&fx.host, &value.clone(), &options).unwrap();
    assert_eq!(first, "Widget#1");
    assert_eq!(first, second);
    assert_eq!(fx.host.memory_objects().len(), 1);
}

#[test]
fn test_alias_requirement_creates_new_handle() {
    let fx = fixture();
    let engine = Engine::default();
    let value = HostObject::new(fx.widget).into_value();

    let plain = engine.from_native(&fx.host, &value, &FromNativeOptions::default()).unwrap();
    let aliased = engine
        .from_native(&fx.host, &value, &FromNativeOptions::default().with_alias("w"))
        .unwrap();
    assert_ne!(plain, aliased);

    let entry = fx.host.memory_objects().lookup(&aliased).unwrap();
    assert!(entry.flags.contains(ObjectFlags::ALIAS));
    assert_eq!(
        engine
            .from_native(&fx.host, &value, &FromNativeOptions::default().with_alias("w"))
            .unwrap(),
        aliased
    );
}

#[test]
fn test_failed_alias_unwinds_in_reverse() {
    let fx = fixture();
    let engine = Engine::default();
    fx.host.memory_objects().reject_aliases(true);
    let value = HostObject::new(fx.widget).into_value();

    let err = engine
        .from_native(&fx.host, &value, &FromNativeOptions::default().with_alias("w"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RegistrationError);
    assert_eq!(
        fx.host.memory_objects().log(),
        vec!["register Widget#1", "remove Widget#1", "dispose"]
    );
    assert!(fx.host.memory_objects().is_empty());
    assert!(value.as_object().unwrap().is_disposed());
}

#[test]
fn test_handle_resolves_back_to_object() {
    let fx = fixture();
    let engine = Engine::default();
    let value = HostObject::new(fx.widget).into_value();
    let handle = engine.from_native(&fx.host, &value, &FromNativeOptions::default()).unwrap();

    let back = engine
        .to_native(&fx.host, &ArgumentValue::from(handle.as_str()), fx.widget, Direction::IN, MarshalFlags::NONE)
        .unwrap();
    assert_eq!(back.identity(), value.identity());

    let explicit = engine
        .to_native(&fx.host, &ArgumentValue::Handle(handle), fx.widget, Direction::IN, MarshalFlags::NONE)
        .unwrap();
    assert_eq!(explicit.identity(), value.identity());

    let err = engine
        .to_native(
            &fx.host,
            &ArgumentValue::Handle("Widget#99".into()),
            fx.widget,
            Direction::IN,
            MarshalFlags::NONE,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionError);
}
