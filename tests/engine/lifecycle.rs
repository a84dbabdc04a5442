//! Entity lifecycle: hooks, recovery, inspection and schema validation

use std::sync::Arc;

use crate::common::*;
use parking_lot::Mutex;
use refract::EntityKind;

fn must_be_array() -> ReducerFunction {
    ReducerFunction::sync(|acc| {
        if acc.value().is_array() {
            Ok(acc.value().clone())
        } else {
            Err(Error::resolution("expected an array"))
        }
    })
}

fn entry_foo(error_hook: impl Into<refract::ReducerSpec>) -> EntityStore {
    store_with(vec![(
        "entry:foo",
        EntitySpec::new()
            .value("$a")
            .after(must_be_array())
            .error(error_hook),
    )])
}

// ============================================================================
// Hook ordering
// ============================================================================

#[tokio::test]
async fn before_value_and_after_run_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let step = |name: &'static str| {
        let log = Arc::clone(&log);
        ReducerFunction::sync(move |acc| {
            log.lock().push(name);
            Ok(acc.value().clone())
        })
    };
    let store = store_with(vec![(
        "entry:ordered",
        EntitySpec::new()
            .before(step("before"))
            .value(step("value"))
            .after(step("after")),
    )]);

    run(&store, "entry:ordered", Value::Null).await.unwrap();
    assert_eq!(*log.lock(), vec!["before", "value", "after"]);
}

#[tokio::test]
async fn each_hook_feeds_the_next() {
    let store = store_with(vec![(
        "entry:piped",
        EntitySpec::new()
            .before("$a")
            .value("$b")
            .after(ReducerFunction::sync(|acc| {
                Ok(Value::Int(acc.value().as_int().unwrap_or(0) + 1))
            })),
    )]);
    let value = run(&store, "entry:piped", json!({"a": {"b": 1}})).await.unwrap();
    assert_eq!(value, Value::Int(2));
}

#[tokio::test]
async fn before_can_hand_new_locals_to_the_value() {
    let store = store_with(vec![(
        "entry:moded",
        EntitySpec::new()
            .before(ReducerFunction::accumulator(|acc: Accumulator| async move {
                let mode = acc.value().get("mode").cloned().unwrap_or_default();
                Ok::<_, Error>(acc.with_local("mode", mode))
            }))
            .value("$..locals.mode"),
    )]);
    let value = run(&store, "entry:moded", json!({"mode": "strict"})).await.unwrap();
    assert_eq!(value, Value::from("strict"));
}

#[tokio::test]
async fn after_runs_on_the_composed_value() {
    let store = store_with(vec![(
        "hash:counted",
        EntitySpec::new()
            .value("$person")
            .pick_keys(["name", "age"])
            .after(ReducerFunction::sync(|acc| {
                Ok(Value::from(acc.value().as_object().map_or(0, |m| m.len())))
            })),
    )]);
    let value = run(&store, "hash:counted", test_data()).await.unwrap();
    assert_eq!(value, Value::Int(2));
}

#[tokio::test]
async fn hook_failures_are_prefixed_with_the_hook() {
    let store = store_with(vec![
        ("entry:b", EntitySpec::new().before(failing("early"))),
        ("entry:v", EntitySpec::new().value(failing("middle"))),
        ("entry:a", EntitySpec::new().after(failing("late"))),
    ]);
    for (id, message) in [
        ("entry:b", "entry:b.before early"),
        ("entry:v", "entry:v.value middle"),
        ("entry:a", "entry:a.after late"),
    ] {
        let err = run(&store, id, Value::Null).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert_eq!(err.message(), message);
    }
}

// ============================================================================
// Recovery
// ============================================================================

#[tokio::test]
async fn error_hook_replaces_the_failure() {
    let store = entry_foo(constant(Value::array()));
    let value = run(&store, "entry:foo", json!({"a": "not a list"})).await.unwrap();
    assert_eq!(value, Value::array());
}

#[tokio::test]
async fn error_hook_is_skipped_on_success() {
    let store = entry_foo(failing("must not run"));
    let value = run(&store, "entry:foo", json!({"a": [1, 2]})).await.unwrap();
    assert_eq!(value, val(json!([1, 2])));
}

#[tokio::test]
async fn undefined_from_error_hook_keeps_the_original_failure() {
    let store = entry_foo(constant(Value::Undefined));
    let err = run(&store, "entry:foo", json!({"a": "not a list"})).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert_eq!(err.message(), "entry:foo.after expected an array");
}

#[tokio::test]
async fn undefined_from_error_hook_keeps_type_errors() {
    let store = store_with(vec![(
        "hash:h",
        EntitySpec::new().value("$a").error("$missing"),
    )]);
    let err = run(&store, "hash:h", json!({"a": "text"})).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
    assert!(err.message().starts_with("\"hash:h\" received value"));
}

#[tokio::test]
async fn failing_error_hook_exhausts_recovery() {
    let store = entry_foo(failing("hook boom"));
    let err = run(&store, "entry:foo", json!({"a": "not a list"})).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RecoveryExhausted);
    assert_eq!(err.message(), "entry:foo.error hook boom");
    let original = err.original().unwrap();
    assert_eq!(original.kind(), ErrorKind::Resolution);
    assert_eq!(original.message(), "entry:foo.after expected an array");
}

#[tokio::test]
async fn error_hook_reads_the_failure() {
    let store = entry_foo("$..error.message");
    let value = run(&store, "entry:foo", json!({"a": 5})).await.unwrap();
    assert_eq!(value, Value::from("entry:foo.after expected an array"));

    let store = entry_foo("$..error.kind");
    let value = run(&store, "entry:foo", json!({"a": 5})).await.unwrap();
    assert_eq!(value, Value::from("resolution"));
}

#[tokio::test]
async fn error_hook_sees_the_value_the_entity_was_entered_with() {
    let store = store_with(vec![(
        "entry:fallback",
        EntitySpec::new()
            .before("$payload")
            .value(failing("broken"))
            .error("$fallback"),
    )]);
    let value = run(
        &store,
        "entry:fallback",
        json!({"payload": {"fallback": "wrong"}, "fallback": "right"}),
    )
    .await
    .unwrap();
    assert_eq!(value, Value::from("right"));
}

#[tokio::test]
async fn recovered_result_carries_no_error() {
    let store = entry_foo(constant(Value::from("recovered")));
    let acc = transform(
        &store,
        "entry:foo",
        json!({"a": 1}),
        TransformOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(acc.value(), &Value::from("recovered"));
    assert!(acc.error().is_none());
    assert!(acc.entity_id().is_none());
}

#[tokio::test]
async fn inner_recovery_hides_the_failure_from_outer_entities() {
    let store = store_with(vec![
        (
            "entry:outer",
            EntitySpec::new()
                .value("entry:inner")
                .error(constant(Value::from("outer"))),
        ),
        (
            "entry:inner",
            EntitySpec::new()
                .value(failing("inner broke"))
                .error(constant(Value::from("inner"))),
        ),
    ]);
    let value = run(&store, "entry:outer", Value::Null).await.unwrap();
    assert_eq!(value, Value::from("inner"));
}

#[tokio::test]
async fn outer_error_hook_catches_inner_failures() {
    let store = store_with(vec![
        (
            "entry:outer",
            EntitySpec::new()
                .value("entry:inner")
                .error("$..error.message"),
        ),
        ("entry:inner", EntitySpec::new().value(failing("inner broke"))),
    ]);
    let value = run(&store, "entry:outer", Value::Null).await.unwrap();
    assert_eq!(
        value,
        Value::from("entry:outer.value entry:inner.value inner broke")
    );
}

#[tokio::test]
async fn error_hook_defined_in_json() {
    let store = EntityStore::builder()
        .add_json(
            "hash:safe",
            json!({
                "value": "$person",
                "error": "$..locals.fallback"
            }),
        )
        .unwrap()
        .build()
        .unwrap();
    let options = TransformOptions::new().with_local("fallback", "no person");
    let acc = transform(&store, "hash:safe", json!({"person": 3}), options)
        .await
        .unwrap();
    assert_eq!(acc.value(), &Value::from("no person"));
}

// ============================================================================
// Inspect
// ============================================================================

#[tokio::test]
async fn inspect_callback_sees_entities_that_opt_in() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let store = store_with(vec![
        (
            "entry:watched",
            EntitySpec::new().value("entry:quiet").inspect(true),
        ),
        ("entry:quiet", EntitySpec::new().value("$a")),
    ]);
    let options = TransformOptions::new().with_inspect(move |acc| {
        recorder.lock().push((
            acc.entity_id().map(str::to_string),
            acc.value().clone(),
        ));
    });

    let acc = transform(&store, "entry:watched", json!({"a": 1}), options)
        .await
        .unwrap();

    assert_eq!(acc.value(), &Value::Int(1));
    assert_eq!(
        *seen.lock(),
        vec![(Some("entry:watched".to_string()), val(json!({"a": 1})))]
    );
}

#[tokio::test]
async fn inspect_without_callback_does_not_change_results() {
    let store = store_with(vec![(
        "entry:watched",
        EntitySpec::new().value("$a").inspect(true),
    )]);
    let value = run(&store, "entry:watched", json!({"a": 1})).await.unwrap();
    assert_eq!(value, Value::Int(1));
}

// ============================================================================
// Schema entities
// ============================================================================

/// Checks that every key listed in `schema.required` is present
fn required_keys(value: &Value, schema: &Value, _options: &Value) -> ValidationOutcome {
    let missing: Vec<String> = schema
        .get("required")
        .and_then(Value::as_array)
        .unwrap_or(&[])
        .iter()
        .filter_map(Value::as_str)
        .filter(|key| value.get(key).is_none())
        .map(|key| format!("missing {}", key))
        .collect();
    if missing.is_empty() {
        ValidationOutcome::valid()
    } else {
        ValidationOutcome::invalid(missing)
    }
}

fn schema_store(required: serde_json::Value, with_validator: bool) -> EntityStore {
    init_tracing();
    let builder = EntityStore::builder().add(
        "schema:person",
        EntitySpec::new()
            .value("$person")
            .schema(json!({"required": required}))
            .options(json!({"strict": true})),
    );
    let builder = if with_validator {
        builder.validator(Arc::new(required_keys))
    } else {
        builder
    };
    builder.build().unwrap()
}

#[tokio::test]
async fn schema_passes_valid_values_through() {
    let store = schema_store(json!(["name", "email"]), true);
    let value = run(&store, "schema:person", test_data()).await.unwrap();
    assert_eq!(value, val(json!({"name": "Ada", "age": 36, "email": "ada@example.com"})));
}

#[tokio::test]
async fn schema_rejection_is_a_validation_error() {
    let store = schema_store(json!(["name", "phone", "address"]), true);
    let err = run(&store, "schema:person", test_data()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        err.message(),
        "\"schema:person\" value failed schema validation: missing phone; missing address"
    );
    match err {
        Error::Validation { diagnostics, .. } => {
            assert_eq!(diagnostics, vec!["missing phone", "missing address"]);
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn schema_without_validator_passes_through() {
    let store = schema_store(json!(["phone"]), false);
    let value = run(&store, "schema:person", test_data()).await.unwrap();
    assert_eq!(value.get("name"), Some(&Value::from("Ada")));
}

#[tokio::test]
async fn schema_failures_can_be_recovered() {
    let store = EntityStore::builder()
        .add(
            "schema:strict",
            EntitySpec::new()
                .schema(json!({"required": ["id"]}))
                .error("$..error.kind"),
        )
        .validator(Arc::new(required_keys))
        .build()
        .unwrap();
    let value = run(&store, "schema:strict", json!({"name": "no id"})).await.unwrap();
    assert_eq!(value, Value::from("validation"));
}

#[test]
fn schema_payload_is_frozen_on_the_entity() {
    let store = schema_store(json!(["name"]), false);
    let entity = store.get("schema:person").unwrap();
    match entity.kind() {
        EntityKind::Schema(schema) => {
            assert_eq!(schema.schema(), &val(json!({"required": ["name"]})));
            assert_eq!(schema.options(), &val(json!({"strict": true})));
        }
        other => panic!("expected a schema entity, got {:?}", other),
    }
}

#[test]
fn schema_payload_on_other_types_is_rejected() {
    let err = EntityStore::builder()
        .add("hash:a", EntitySpec::new().schema(json!({})))
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSpec);
}
