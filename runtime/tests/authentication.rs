use rstest::{fixture, rstest};
use veil_runtime::{ClassDefinition, Engine, EngineConfig, ProtectedType, Value, VeilError};

#[fixture]
fn engine() -> Engine {
    Engine::default()
}

/// `Vault` keeps a private `x` and exposes ways to hand code to it.
fn vault(engine: &mut Engine) -> ProtectedType {
    engine
        .define_class(
            ClassDefinition::new("Vault")
                .field("private x", 1)
                .method("get_x", |engine, this, _| engine.get_private(&this, "x"))
                .method("run", |engine, this, args| engine.call(&args[0], this, &[]))
                .method("run_scoped", |engine, this, args| {
                    let callback = engine.wrap_in_scope(args[0].clone(), &this)?;
                    engine.call(&callback, this, &[])
                })
                .method("leak", |engine, this, _| engine.private(&this).map(Value::from))
                .method("read_view", |engine, _, args| engine.get(&args[0], "x")),
        )
        .unwrap()
}

fn decoy(engine: &mut Engine) -> ProtectedType {
    engine
        .define_class(ClassDefinition::new("Decoy").field("private x", 2))
        .unwrap()
}

#[rstest]
fn borrowed_method_cannot_read_an_unrelated_receiver(mut engine: Engine) {
    let vault = vault(&mut engine);
    let decoy = decoy(&mut engine);
    let vault_instance = engine.construct(&vault.into(), &[]).unwrap();
    let decoy_instance = engine.construct(&decoy.into(), &[]).unwrap();

    let method = engine.get(&vault_instance, "get_x").unwrap();
    assert_eq!(
        engine.call(&method, vault_instance.clone(), &[]).unwrap(),
        Value::from(1)
    );

    let err = engine.call(&method, decoy_instance, &[]).unwrap_err();
    insta::assert_snapshot!(
        engine.pretty_error(err),
        @"UnauthorizedAccessError: current method does not have access to private members of Decoy"
    );

    let raw = engine.create_object(None).unwrap();
    let err = engine.call(&method, raw.clone(), &[]).unwrap_err();
    insta::assert_snapshot!(
        engine.pretty_error(err),
        @"UnauthorizedAccessError: cannot access private data from invalid scope"
    );
    // being used as a receiver does not wrap the object
    assert!(!engine.is_wrapped(&raw));
    assert!(!engine.can_access(&raw));
}

#[rstest]
fn authority_does_not_leak_into_nested_calls(mut engine: Engine) {
    let vault = vault(&mut engine);
    let instance = engine.construct(&vault.into(), &[]).unwrap();
    let snoop = engine.create_function("snoop", |engine, this, _| {
        assert!(!engine.can_access(&this));
        assert!(engine.current_caller_contexts().is_empty());
        engine.get_private(&this, "x")
    });

    let err = engine.invoke(&instance, "run", &[snoop]).unwrap_err();
    assert!(matches!(err, VeilError::UnauthorizedAccess { owner: Some(_) }));
    assert_eq!(engine.call_depth(), 0);
}

#[rstest]
fn scoped_callbacks_act_for_their_owner(mut engine: Engine) {
    let vault = vault(&mut engine);
    let instance = engine.construct(&vault.into(), &[]).unwrap();
    let reader = engine.create_function("reader", |engine, this, _| engine.get_private(&this, "x"));

    assert_eq!(
        engine.invoke(&instance, "run_scoped", &[reader.clone()]).unwrap(),
        Value::from(1)
    );
    assert!(engine.is_wrapped(&reader));

    // wrapping from outside grants nothing
    let outsider = engine.create_function("outsider", |engine, this, _| engine.get_private(&this, "x"));
    let outsider = engine.wrap_in_scope(outsider, &instance).unwrap();
    assert!(matches!(
        engine.call(&outsider, instance, &[]),
        Err(VeilError::UnauthorizedAccess { .. })
    ));
}

#[rstest]
fn leaked_views_are_reauthenticated(mut engine: Engine) {
    let vault = vault(&mut engine);
    let instance = engine.construct(&vault.into(), &[]).unwrap();
    let view = engine.invoke(&instance, "leak", &[]).unwrap();
    assert!(matches!(view, Value::PrivateView(_)));

    assert!(matches!(
        engine.get(&view, "x"),
        Err(VeilError::UnauthorizedAccess { .. })
    ));
    assert!(matches!(
        engine.set(&view, "x", 99),
        Err(VeilError::UnauthorizedAccess { .. })
    ));
    assert!(matches!(
        engine.delete(&view, "x"),
        Err(VeilError::UnauthorizedAccess { .. })
    ));

    // back inside the owner's code the same view works again
    assert_eq!(
        engine.invoke(&instance, "read_view", &[view]).unwrap(),
        Value::from(1)
    );
}

#[rstest]
#[case(4)]
#[case(32)]
fn runaway_recursion_is_bounded(#[case] max_call_depth: usize) {
    let mut engine = Engine::new(EngineConfig {
        max_call_depth,
        ..EngineConfig::default()
    });
    let ty = engine
        .define_class(
            ClassDefinition::new("Loop")
                .method("spin", |engine, this, _| engine.invoke(&this, "spin", &[])),
        )
        .unwrap();
    let instance = engine.construct(&ty.into(), &[]).unwrap();

    let err = engine.invoke(&instance, "spin", &[]).unwrap_err();
    assert_eq!(err, VeilError::StackOverflow(max_call_depth));
    assert_eq!(engine.call_depth(), 0);
}

#[test]
fn overflow_renders_as_range_error() {
    let engine = Engine::default();
    insta::assert_snapshot!(
        engine.pretty_error(VeilError::StackOverflow(256)),
        @"RangeError: maximum call depth of 256 exceeded"
    );
}

#[rstest]
fn non_callables_are_reported(mut engine: Engine) {
    let object = engine.create_object(None).unwrap();
    let err = engine.wrap(Value::from(3)).unwrap_err();
    assert_eq!(engine.pretty_error(err), "TypeError: number is not callable");
    assert!(matches!(
        engine.call(&object, Value::Undefined, &[]),
        Err(VeilError::NotCallable(_))
    ));
    assert!(matches!(
        engine.invoke(&object, "missing", &[]),
        Err(VeilError::NotCallable(_))
    ));
    assert!(matches!(
        engine.get(&Value::Null, "x"),
        Err(VeilError::NotAnObject(_))
    ));
}

#[rstest]
fn handles_from_another_engine_are_rejected(mut engine: Engine) {
    let mut other = Engine::default();
    let foreign = other.create_object(None).unwrap();

    let err = engine.get(&foreign, "x").unwrap_err();
    insta::assert_snapshot!(
        engine.pretty_error(err),
        @"InternalError: object #1 does not belong to this engine"
    );
    assert!(matches!(
        engine.set(&foreign, "x", 1),
        Err(VeilError::WrongHeapAddress(_))
    ));
    assert!(matches!(
        engine.create_object(Some(foreign.as_object().unwrap())),
        Err(VeilError::WrongHeapAddress(_))
    ));
    assert!(matches!(
        engine.get_private(&foreign, "x"),
        Err(VeilError::WrongHeapAddress(_))
    ));
    assert!(!engine.can_access(&foreign));
    assert!(!engine.is_wrapped(&foreign));
}
