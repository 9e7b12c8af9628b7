//! Integration tests for Schemav Core

use schemav_core::{
    Engine, EngineConfig, KeywordOutcome, SchemaError, ValidationError, ValidationErrors,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn keywords(result: Result<(), ValidationErrors>) -> Vec<String> {
    result
        .unwrap_err()
        .errors
        .iter()
        .map(|e| e.keyword.clone())
        .collect()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn fail_after_yield(reason: &'static str) -> KeywordOutcome {
    tokio::task::yield_now().await;
    panic!("{}", reason)
}

#[test]
fn test_property_count_keywords_are_independent() {
    let validator = Engine::new()
        .compile(&json!({"type": "object", "minProperties": 2, "maxProperties": 3}))
        .unwrap();

    assert_eq!(keywords(validator.validate(&json!({}))), vec!["minProperties"]);
    assert_eq!(keywords(validator.validate(&json!({"a": 1}))), vec!["minProperties"]);
    assert!(validator.validate(&json!({"a": 1, "b": 2})).is_ok());
    assert!(validator.validate(&json!({"a": 1, "b": 2, "c": 3})).is_ok());

    let errors = validator.validate(&json!({"a": 1, "b": 2, "c": 3, "d": 4})).unwrap_err();
    assert_eq!(errors.errors[0].keyword, "maxProperties");
    assert_eq!(
        errors.errors[0].message,
        "too many properties. must be less than, or equal to, 3"
    );
    assert_eq!(errors.errors[0].detail("size"), Some(&json!(4)));
}

#[test]
fn test_tuple_arrays() {
    let validator = Engine::new()
        .compile(&json!({
            "type": "array",
            "items": [{"type": "number"}, {"type": "string"}],
            "additionalItems": false
        }))
        .unwrap();

    assert!(validator.validate(&json!([1, "a"])).is_ok());
    assert_eq!(keywords(validator.validate(&json!([1, "a", "x"]))), vec!["additionalItems"]);

    let errors = validator.validate(&json!(["a", 1])).unwrap_err();
    let items = errors.find("items").unwrap();
    assert_eq!(items.errors.len(), 2);
    assert_eq!(items.errors[0].index, Some(0));
    assert_eq!(items.errors[0].errors[0].keyword, "type");
    assert_eq!(items.errors[1].index, Some(1));
    assert_eq!(items.errors[1].errors[0].keyword, "type");
}

#[test]
fn test_dependencies_are_one_directional() {
    let validator = Engine::new()
        .compile(&json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "credit_card": {"type": "number"},
                "billing_address": {"type": "string"}
            },
            "required": ["name"],
            "dependencies": {"credit_card": ["billing_address"]}
        }))
        .unwrap();

    let errors = validator
        .validate(&json!({"name": "John Doe", "credit_card": 5555}))
        .unwrap_err();
    let dependencies = errors.find("dependencies").unwrap();
    assert_eq!(dependencies.message, "there are some missing dependencies");
    assert_eq!(dependencies.errors[0].prop.as_deref(), Some("credit_card"));
    assert_eq!(dependencies.errors[0].detail("required"), Some(&json!("billing_address")));

    assert!(validator
        .validate(&json!({"name": "John Doe", "billing_address": "555 Debtor's Lane"}))
        .is_ok());
    assert!(validator
        .validate(&json!({
            "name": "John Doe",
            "credit_card": 5555,
            "billing_address": "555 Debtor's Lane"
        }))
        .is_ok());
}

#[test]
fn test_alias_over_builtin_keeps_numeric_rules() {
    let mut engine = Engine::new();
    engine.add_alias("numeric", "integer").unwrap();

    let err = engine
        .compile(&json!({"type": "integer", "default": "not-a-number"}))
        .unwrap_err();

    match err {
        SchemaError::InvalidDefault { value, errors } => {
            assert_eq!(value, "\"not-a-number\"");
            assert_eq!(errors[0].keyword, "type");
        }
        other => panic!("unexpected error: {}", other),
    }

    // The alias replaced the whole-number refinement
    let validator = engine.compile(&json!({"type": "integer"})).unwrap();
    assert!(validator.validate(&json!(1.5)).is_ok());
}

#[test]
fn test_unique_items_scales_linearly() {
    let validator = Engine::new()
        .compile(&json!({"type": "array", "uniqueItems": true}))
        .unwrap();

    let distinct: Vec<Value> = (0..50_000).map(|i| json!(i)).collect();
    let started = Instant::now();
    assert!(validator.validate(&Value::Array(distinct.clone())).is_ok());
    assert!(started.elapsed() < Duration::from_secs(2));

    let mut repeated = distinct;
    repeated.push(json!(49_999.0));
    let errors = validator.validate(&Value::Array(repeated)).unwrap_err();
    assert_eq!(errors.errors[0].detail("duplicates"), Some(&json!([50_000])));
}

#[test]
fn test_removed_type_is_unknown() {
    let mut engine = Engine::new();
    engine.remove_type("string");

    let err = engine.compile(&json!({"type": "string"})).unwrap_err();
    assert_eq!(err.to_string(), "Unknown type 'string'");
    assert!(err.is_user_error());
}

#[test]
fn test_pattern_properties_with_closed_object() {
    let validator = Engine::new()
        .compile(&json!({
            "type": "object",
            "patternProperties": {"^S_": {"type": "string"}},
            "additionalProperties": false
        }))
        .unwrap();

    assert!(validator.validate(&json!({"S_1": "ok"})).is_ok());

    let errors = validator.validate(&json!({"other": "x"})).unwrap_err();
    let additional = errors.find("additionalProperties").unwrap();
    assert_eq!(additional.message, "no additional properties");
    assert_eq!(additional.detail("properties"), Some(&json!(["other"])));

    let errors = validator.validate(&json!({"S_1": 1})).unwrap_err();
    let patterns = errors.find("patternProperties").unwrap();
    assert_eq!(patterns.errors[0].prop.as_deref(), Some("S_1"));
    assert_eq!(patterns.errors[0].errors[0].keyword, "type");
}

#[test]
fn test_declared_properties_skip_patterns() {
    let validator = Engine::new()
        .compile(&json!({
            "type": "object",
            "properties": {"S_id": {"type": "numeric"}},
            "patternProperties": {
                "^S_": {"type": "string"},
                "_x$": {"type": "string", "maxLength": 1}
            }
        }))
        .unwrap();

    assert!(validator.validate(&json!({"S_id": 3})).is_ok());

    // Every matching pattern applies
    let errors = validator.validate(&json!({"S_x": "ab"})).unwrap_err();
    let patterns = errors.find("patternProperties").unwrap();
    assert_eq!(patterns.errors.len(), 1);
    assert_eq!(patterns.errors[0].errors[0].keyword, "maxLength");
}

#[test]
fn test_malformed_schema_never_compiles() {
    let engine = Engine::new();
    let malformed = [
        json!({"type": "array", "maxItems": -1}),
        json!({"type": "string", "pattern": "(unclosed"}),
        json!({"type": "object", "properties": {"a": {"type": "string"}}, "required": ["b"]}),
        json!({"type": ["string", "numeric"]}),
        json!("string"),
    ];

    for schema in malformed {
        let err = engine.compile(&schema).unwrap_err();
        assert!(err.is_user_error(), "schema {}", schema);
    }
}

#[test]
fn test_nested_default_checked_at_compile_time() {
    let err = Engine::new()
        .compile(&json!({
            "type": "object",
            "properties": {
                "retries": {"type": "integer", "minimum": 0, "default": -1}
            }
        }))
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid default value -1");
}

#[test]
fn test_default_fills_absent_property() {
    let validator = Engine::new()
        .compile(&json!({
            "type": "object",
            "properties": {
                "lang": {"type": "string", "required": true, "default": "en", "enum": ["en", "fr"]}
            }
        }))
        .unwrap();

    assert!(validator.validate(&json!({})).is_ok());
    assert_eq!(keywords(validator.validate(&json!({"lang": "de"}))), vec!["properties"]);
}

#[test]
fn test_error_records_serialize() {
    let validator = Engine::new()
        .compile(&json!({
            "type": "object",
            "properties": {"name": {"type": "string", "minLength": 3}}
        }))
        .unwrap();

    let errors = validator.validate(&json!({"name": "al"})).unwrap_err();
    let value = serde_json::to_value(&errors).unwrap();

    assert_eq!(value["message"], "invalid data");
    assert_eq!(value["errors"][0]["keyword"], "properties");
    assert_eq!(value["errors"][0]["errors"][0]["prop"], "name");
    assert_eq!(value["errors"][0]["errors"][0]["errors"][0]["keyword"], "minLength");
    assert_eq!(value["errors"][0]["errors"][0]["errors"][0]["minLength"], 3);
}

#[test]
fn test_user_keyword_sees_schema_and_path() {
    let mut engine = Engine::new();
    engine
        .add_keyword("numeric", "lessThanSibling", |value, data, ctx| {
            let Some(limit) = value.as_str().and_then(|key| ctx.schema().get(key)) else {
                return KeywordOutcome::reject("unknown sibling");
            };
            match (data.as_f64(), limit.as_f64()) {
                (Some(n), Some(limit)) if n < limit => KeywordOutcome::Valid,
                _ => ValidationError::message(format!("too large at {}", ctx.path()))
                    .with_detail("limit", limit.clone())
                    .into(),
            }
        })
        .unwrap();

    let validator = engine
        .compile(&json!({
            "type": "array",
            "items": {"type": "numeric", "ceiling": 10, "lessThanSibling": "ceiling"}
        }))
        .unwrap();

    assert!(validator.validate(&json!([1, 9])).is_ok());

    let errors = validator.validate(&json!([1, 10])).unwrap_err();
    let leaf = &errors.errors[0].errors[0].errors[0];
    assert_eq!(leaf.keyword, "lessThanSibling");
    assert_eq!(leaf.message, "too large at /1");
}

#[test]
fn test_blocking_validate_on_asynchronous_engine() {
    init_tracing();
    let mut engine = Engine::asynchronous();
    engine
        .add_keyword("string", "reserved", |value, data, _ctx| {
            let taken = value.as_array().cloned().unwrap_or_default();
            let data = data.clone();
            KeywordOutcome::deferred(async move { KeywordOutcome::from(!taken.contains(&data)) })
        })
        .unwrap();

    let validator = engine
        .compile(&json!({"type": "string", "reserved": ["root", "admin"]}))
        .unwrap();

    assert!(validator.validate(&json!("ada")).is_ok());
    assert_eq!(keywords(validator.validate(&json!("root"))), vec!["reserved"]);
}

#[tokio::test]
async fn test_async_keywords_run_concurrently_in_order() {
    init_tracing();
    let started = Arc::new(AtomicUsize::new(0));
    let mut engine = Engine::with_config(EngineConfig::builder().asynchronous(true).build());

    let counter = Arc::clone(&started);
    engine
        .add_keyword("numeric", "slowReject", move |value, _data, _ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            let delay = value.as_u64().unwrap_or(0);
            KeywordOutcome::deferred(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                KeywordOutcome::reject(format!("rejected after {}ms", delay))
            })
        })
        .unwrap();

    let validator = engine
        .compile_async(&json!({
            "type": "array",
            "items": {"type": "numeric", "maximum": 5, "slowReject": 30}
        }))
        .await
        .unwrap();

    let errors = validator.validate_async(&json!([1, 9, 3])).await.unwrap_err();
    assert_eq!(started.load(Ordering::SeqCst), 3);

    let items = &errors.errors[0].errors;
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].index, Some(0));
    assert_eq!(items[1].index, Some(1));
    assert_eq!(items[2].index, Some(2));

    let second: Vec<&str> = items[1].errors.iter().map(|e| e.keyword.as_str()).collect();
    assert_eq!(second, vec!["maximum", "slowReject"]);
}

#[tokio::test]
async fn test_async_results_keep_keyword_order() {
    let mut engine = Engine::asynchronous();
    engine
        .add_keyword("string", "after", |value, _data, _ctx| {
            let delay = value.as_u64().unwrap_or(0);
            KeywordOutcome::deferred(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                KeywordOutcome::from(ValidationError::message(format!("{}", delay)))
            })
        })
        .unwrap();
    engine
        .add_keyword("string", "before", |value, _data, _ctx| {
            let delay = value.as_u64().unwrap_or(0);
            KeywordOutcome::deferred(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                KeywordOutcome::from(ValidationError::message(format!("{}", delay)))
            })
        })
        .unwrap();

    let validator = engine
        .compile_async(&json!({"type": "string", "after": 40, "before": 1}))
        .await
        .unwrap();

    let errors = validator.validate_async(&json!("x")).await.unwrap_err();
    assert_eq!(errors.keywords(), vec!["after", "before"]);
}

#[tokio::test]
async fn test_async_type_check() {
    let mut engine = Engine::asynchronous();
    engine
        .add_type("even", |data, _ctx| {
            let even = data.as_i64().map_or(false, |n| n % 2 == 0);
            KeywordOutcome::deferred(async move {
                tokio::task::yield_now().await;
                KeywordOutcome::from(even)
            })
        })
        .unwrap();

    let validator = engine
        .compile_async(&json!({"type": "even", "enum": [2, 4]}))
        .await
        .unwrap();

    assert!(validator.validate_async(&json!(2)).await.is_ok());

    let errors = validator.validate_async(&json!(3)).await.unwrap_err();
    assert_eq!(errors.keywords(), vec!["type"]);

    let errors = validator.validate_async(&json!(6)).await.unwrap_err();
    assert_eq!(errors.keywords(), vec!["enum"]);
}

#[tokio::test]
async fn test_async_default_is_checked_at_compile_time() {
    let mut engine = Engine::asynchronous();
    engine
        .add_type("even", |data, _ctx| {
            let even = data.as_i64().map_or(false, |n| n % 2 == 0);
            KeywordOutcome::deferred(async move { KeywordOutcome::from(even) })
        })
        .unwrap();

    let err = engine
        .compile_async(&json!({"type": "even", "default": 3}))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid default value 3");

    let validator = engine
        .compile_async(&json!({"type": "even", "default": 4}))
        .await
        .unwrap();
    assert!(validator.validate_absent_async().await.is_ok());
}

#[tokio::test]
async fn test_async_panic_is_reported() {
    init_tracing();
    let mut engine = Engine::asynchronous();
    engine
        .add_keyword("boolean", "remote", |_value, _data, _ctx| {
            KeywordOutcome::deferred(fail_after_yield("connection reset"))
        })
        .unwrap();

    let validator = engine
        .compile_async(&json!({"type": "boolean", "remote": true}))
        .await
        .unwrap();

    let errors = validator.validate_async(&json!(true)).await.unwrap_err();
    assert_eq!(errors.errors[0].keyword, "remote");
    assert_eq!(errors.errors[0].message, "validator panicked: connection reset");
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn schema_for(min: usize, max: usize) -> Value {
        json!({"type": "object", "minProperties": min, "maxProperties": max})
    }

    fn object_of(size: usize) -> Value {
        Value::Object((0..size).map(|i| (format!("k{}", i), json!(i))).collect())
    }

    proptest! {
        /// Compiling twice yields validators that agree.
        #[test]
        fn compile_is_deterministic(max_len in 0usize..8, text in "[a-z]{0,12}") {
            let engine = Engine::new();
            let schema = json!({"type": "string", "maxLength": max_len, "pattern": "^[a-m]*$"});
            let first = engine.compile(&schema).unwrap();
            let second = engine.compile(&schema).unwrap();

            let data = json!(text);
            prop_assert_eq!(first.validate(&data), second.validate(&data));
        }

        /// A default accepted by its schema is substituted for absent data.
        #[test]
        fn valid_default_is_substituted(default in -1000i64..1000, slack in 0i64..100) {
            let validator = Engine::new()
                .compile(&json!({
                    "type": "integer",
                    "minimum": default - slack,
                    "maximum": default + slack,
                    "default": default
                }))
                .unwrap();

            prop_assert!(validator.validate_absent().is_ok());
        }

        /// Property counts outside the bounds fail with exactly one keyword.
        #[test]
        fn property_bounds(min in 0usize..5, span in 0usize..5, size in 0usize..12) {
            let max = min + span;
            let validator = Engine::new().compile(&schema_for(min, max)).unwrap();
            let result = validator.validate(&object_of(size));

            if size < min {
                prop_assert_eq!(keywords(result), vec!["minProperties".to_string()]);
            } else if size > max {
                prop_assert_eq!(keywords(result), vec!["maxProperties".to_string()]);
            } else {
                prop_assert!(result.is_ok());
            }
        }
    }
}
