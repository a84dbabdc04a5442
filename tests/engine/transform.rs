//! Transform entry point
//!
//! Reducer grammar, function calling conventions, options and error surface
//! as seen by a caller of `transform`.

use std::sync::Arc;

use crate::common::*;
use refract::Next;

fn empty_store() -> EntityStore {
    store_with(Vec::new())
}

// ============================================================================
// Reducer forms
// ============================================================================

#[tokio::test]
async fn invalid_reducer_string_is_rejected() {
    let err = run(&empty_store(), "INVALID", test_data()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSpec);
    assert!(err.message().contains("'INVALID'"));
}

#[tokio::test]
async fn single_callback_reducer() {
    let reducer = ReducerFunction::callback(|acc, next: Next| {
        next.ok(format!("{} World", acc.value().as_str().unwrap_or("")));
    });
    let value = run(&empty_store(), reducer, "Hello").await.unwrap();
    assert_eq!(value, Value::from("Hello World"));
}

#[tokio::test]
async fn callback_reducer_chain() {
    let world = ReducerFunction::callback(|acc, next: Next| {
        next.ok(format!("{} World", acc.value().as_str().unwrap_or("")));
    });
    let bang = ReducerFunction::callback(|acc, next: Next| {
        next.ok(format!("{}!!", acc.value().as_str().unwrap_or("")));
    });
    let value = run(&empty_store(), vec![world, bang], "Hello").await.unwrap();
    assert_eq!(value, Value::from("Hello World!!"));
}

#[tokio::test]
async fn path_reducer() {
    let value = run(&empty_store(), "$a.b.c", test_data()).await.unwrap();
    assert_eq!(value, val(json!([1, 2, 3])));
}

#[tokio::test]
async fn mixed_path_and_function() {
    let get_max = ReducerFunction::callback(|acc, next: Next| {
        let max = acc
            .value()
            .as_array()
            .unwrap_or(&[])
            .iter()
            .filter_map(Value::as_int)
            .max();
        next.ok(max);
    });
    let value = run(
        &empty_store(),
        vec![refract::ReducerSpec::from("$a.b.c"), get_max.into()],
        test_data(),
    )
    .await
    .unwrap();
    assert_eq!(value, Value::Int(3));
}

#[tokio::test]
async fn chain_written_in_one_string() {
    let store = store_with(vec![("hash:names", EntitySpec::new().pick_keys(["name"]))]);
    let value = run(&store, "$person | hash:names", test_data()).await.unwrap();
    assert_eq!(value, val(json!({"name": "Ada"})));
}

#[tokio::test]
async fn sync_future_and_callback_functions_agree() {
    let double_sync = ReducerFunction::sync(|acc| Ok(Value::Int(acc.value().as_int().unwrap_or(0) * 2)));
    let double_future = ReducerFunction::future(|acc: Accumulator| async move {
        tokio::task::yield_now().await;
        Ok::<_, Error>(Value::Int(acc.value().as_int().unwrap_or(0) * 2))
    });
    let double_callback = ReducerFunction::callback(|acc, next: Next| {
        next.ok(Value::Int(acc.value().as_int().unwrap_or(0) * 2));
    });

    let store = empty_store();
    for reducer in [double_sync, double_future, double_callback] {
        assert_eq!(run(&store, reducer, 21).await.unwrap(), Value::Int(42));
    }
}

#[tokio::test]
async fn function_failures_surface_as_resolution_errors() {
    let store = empty_store();
    let sync_err = run(&store, failing("sync boom"), 1).await.unwrap_err();
    let callback_err = run(
        &store,
        ReducerFunction::callback(|_, next: Next| next.fail(Error::resolution("callback boom"))),
        1,
    )
    .await
    .unwrap_err();
    assert_eq!(sync_err.kind(), ErrorKind::Resolution);
    assert_eq!(callback_err.kind(), ErrorKind::Resolution);
    assert_eq!(callback_err.message(), "callback boom");
}

// ============================================================================
// Options
// ============================================================================

#[tokio::test]
async fn passing_locals() {
    let reducer = ReducerFunction::sync(|acc| {
        let greeting = acc.locals().get("greeting").and_then(Value::as_str).unwrap_or("");
        Ok(Value::from(format!("{} World", greeting)))
    });
    let options = TransformOptions::new().with_local("greeting", "Hello");
    let acc = transform(&empty_store(), reducer, Value::object(), options).await.unwrap();
    assert_eq!(acc.value(), &Value::from("Hello World"));
}

#[tokio::test]
async fn locals_are_visible_through_paths() {
    let options = TransformOptions::new().with_local("greeting", "Hello");
    let acc = transform(&empty_store(), "$..locals.greeting", test_data(), options)
        .await
        .unwrap();
    assert_eq!(acc.value(), &Value::from("Hello"));
}

#[tokio::test]
async fn params_are_visible_through_paths() {
    let options = TransformOptions::new().with_param("user", "u1").with_trace(true);
    let acc = transform(&empty_store(), "$..params", Value::Null, options).await.unwrap();
    assert_eq!(acc.value(), &val(json!({"user": "u1", "trace": true})));
}

#[tokio::test]
async fn options_from_json_ignore_unknown_fields() {
    let options: TransformOptions = serde_json::from_value(json!({
        "locals": {"greeting": "Hi"},
        "query": {"page": 2},
        "url": "/people"
    }))
    .unwrap();
    let acc = transform(&empty_store(), "$..locals.greeting", Value::Null, options)
        .await
        .unwrap();
    assert_eq!(acc.value(), &Value::from("Hi"));
}

#[tokio::test]
async fn trace_does_not_change_results() {
    let store = store_with(vec![("hash:person", EntitySpec::new().value("$person"))]);
    let traced = transform(
        &store,
        "hash:person",
        test_data(),
        TransformOptions::new().with_trace(true),
    )
    .await
    .unwrap();
    let plain = run(&store, "hash:person", test_data()).await.unwrap();
    assert_eq!(traced.value(), &plain);
}

// ============================================================================
// Undefined input and lookups
// ============================================================================

#[tokio::test]
async fn undefined_input_passes_through_paths() {
    let value = run(&empty_store(), "$a.b.c", Value::Undefined).await.unwrap();
    assert_eq!(value, Value::Undefined);
}

#[tokio::test]
async fn hash_without_value_rejects_undefined_input() {
    let store = store_with(vec![("hash:noValue", EntitySpec::new())]);
    let err = run(&store, "hash:noValue", Value::Undefined).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
    assert!(err.message().contains("hash:noValue"));
    assert!(err.message().contains("undefined"));
}

#[tokio::test]
async fn unknown_entity_fails_at_resolution() {
    let store = store_with(vec![("entry:a", EntitySpec::new().value("hash:later"))]);
    let err = run(&store, "entry:a", test_data()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lookup);
    assert_eq!(err.message(), "entry:a.value entity 'hash:later' is not defined");
}

#[tokio::test]
async fn result_accumulator_has_no_entity_attached() {
    let store = store_with(vec![("entry:a", EntitySpec::new().value("$a"))]);
    let acc = transform(&store, "entry:a", test_data(), TransformOptions::default())
        .await
        .unwrap();
    assert!(acc.entity_id().is_none());
    assert!(acc.error().is_none());
}

// ============================================================================
// Store usage
// ============================================================================

#[tokio::test]
async fn store_transform_forwards() {
    let store = store_with(vec![("entry:c", EntitySpec::new().value("$a.b.c"))]);
    let acc = store
        .transform("entry:c", test_data(), TransformOptions::default())
        .await
        .unwrap();
    assert_eq!(acc.value(), &val(json!([1, 2, 3])));
}

#[tokio::test]
async fn one_store_serves_concurrent_transforms() {
    let store = Arc::new(store_with(vec![(
        "hash:person",
        EntitySpec::new().value("$person").pick_keys(["name"]),
    )]));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let input = val(json!({"person": {"name": format!("p{}", i), "age": i}}));
                store
                    .transform("hash:person", input, TransformOptions::default())
                    .await
                    .map(Accumulator::into_value)
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let value = handle.await.unwrap().unwrap();
        assert_eq!(value, val(json!({"name": format!("p{}", i)})));
    }
}

#[tokio::test]
async fn entities_defined_in_json() {
    let store = EntityStore::builder()
        .add_entities_json(json!({
            "hash:person": {
                "value": "$person",
                "compose": [
                    {"mapKeys": {"name": "$name", "contact": "$email"}},
                    {"addValues": {"kind": "person"}}
                ]
            },
            "collection:activeNames": {
                "value": "$items",
                "filter": "$active",
                "map": "$name"
            }
        }))
        .unwrap()
        .build()
        .unwrap();

    let person = run(&store, "hash:person", test_data()).await.unwrap();
    assert_eq!(
        person,
        val(json!({"name": "Ada", "contact": "ada@example.com", "kind": "person"}))
    );

    // shorthand order runs map before filter, so filter sees bare names
    let names = run(&store, "collection:activeNames", test_data()).await.unwrap();
    assert_eq!(names, Value::Array(Vec::new()));
}
