use std::path::Path;

use serde_json::json;

use skygen_core::PropertyValue;
use skygen_generate::{
    GenerateOptions, GenerationEngine, GenerationError, RandomSource, generate_object_id,
};
use skygen_script::{Script, load_script, parse_script};

fn script(value: serde_json::Value) -> Script {
    serde_json::from_value(value).expect("script json")
}

fn storefront() -> Script {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scripts/examples/storefront.script.json");
    load_script(&path).expect("load storefront").script
}

fn run(script: &Script, seed: u64) -> Result<Vec<skygen_core::Event>, GenerationError> {
    let engine = GenerationEngine::new(script, GenerateOptions::default());
    let mut rng = RandomSource::new(seed);
    engine.generate("object01", &mut rng)
}

#[test]
fn same_seed_reproduces_objects() {
    let script = storefront();
    let engine = GenerationEngine::new(&script, GenerateOptions::default());

    let mut first = RandomSource::new(7);
    let mut second = RandomSource::new(7);
    for _ in 0..25 {
        let id_a = generate_object_id(&mut first);
        let id_b = generate_object_id(&mut second);
        assert_eq!(id_a, id_b);
        assert_eq!(
            engine.generate(&id_a, &mut first).unwrap(),
            engine.generate(&id_b, &mut second).unwrap()
        );
    }
    assert_eq!(first.draws(), second.draws());
}

#[test]
fn timestamps_never_go_backwards() {
    let script = storefront();
    let engine = GenerationEngine::new(&script, GenerateOptions::default());
    let mut rng = RandomSource::new(99);

    for _ in 0..50 {
        let events = engine.generate("shopper1", &mut rng).unwrap();
        assert!(!events.is_empty(), "signup is always emitted");
        assert!(
            events
                .windows(2)
                .all(|pair| pair[0].timestamp <= pair[1].timestamp)
        );
        assert_eq!(events[0].timestamp, script.start());
    }
}

#[test]
fn set_values_persist_and_transient_values_clear() {
    let script = script(json!({
        "script_version": "0.1",
        "schema": { "properties": [
            { "name": "plan", "type": "factor" },
            { "name": "coupon", "type": "string", "transient": true }
        ]},
        "generate": { "type": "sequence", "rules": [
            { "type": "set", "property": "plan", "distribution": { "kind": "constant", "value": "pro" } },
            { "type": "set", "property": "coupon", "distribution": { "kind": "constant", "value": "WELCOME" } },
            { "type": "emit" },
            { "type": "emit" }
        ]}
    }));

    let events = run(&script, 1).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0].value("plan"),
        Some(&PropertyValue::Factor("pro".to_string()))
    );
    assert_eq!(
        events[0].value("coupon"),
        Some(&PropertyValue::String("WELCOME".to_string()))
    );
    assert_eq!(
        events[1].value("plan"),
        Some(&PropertyValue::Factor("pro".to_string()))
    );
    assert_eq!(events[1].value("coupon"), None);
}

#[test]
fn fixed_repeat_takes_no_draw() {
    let script = script(json!({
        "script_version": "0.1",
        "generate": { "type": "repeat", "count": 3, "rule": {
            "type": "emit",
            "values": { "action": { "kind": "constant", "value": "tick" } }
        }}
    }));

    let engine = GenerationEngine::new(&script, GenerateOptions::default());
    let mut rng = RandomSource::new(5);
    let events = engine.generate("abcdefgh", &mut rng).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(rng.draws(), 0);
}

#[test]
fn exit_ends_the_object() {
    let script = script(json!({
        "script_version": "0.1",
        "generate": { "type": "repeat", "count": 10, "rule": { "type": "sequence", "rules": [
            { "type": "emit" },
            { "type": "exit", "probability": 1.0 }
        ]}}
    }));

    assert_eq!(run(&script, 3).unwrap().len(), 1);
}

#[test]
fn branch_remainder_takes_no_arm() {
    let script = script(json!({
        "script_version": "0.1",
        "generate": { "type": "branch", "arms": [
            { "probability": 0.0, "rule": { "type": "emit" } }
        ]}
    }));

    let engine = GenerationEngine::new(&script, GenerateOptions::default());
    let mut rng = RandomSource::new(8);
    assert!(engine.generate("abcdefgh", &mut rng).unwrap().is_empty());
    assert_eq!(rng.draws(), 1);
}

#[test]
fn advance_moves_the_clock() {
    let script = script(json!({
        "script_version": "0.1",
        "timeline": { "start": "2024-03-01T12:00:00Z" },
        "generate": { "type": "sequence", "rules": [
            { "type": "emit" },
            { "type": "advance", "min_secs": 90, "max_secs": 90 },
            { "type": "emit" }
        ]}
    }));

    let events = run(&script, 2).unwrap();
    let gap = events[1].timestamp - events[0].timestamp;
    assert_eq!(gap.num_seconds(), 90);
}

#[test]
fn integers_widen_into_float_properties() {
    let script = script(json!({
        "script_version": "0.1",
        "schema": { "properties": [{ "name": "amount", "type": "float" }] },
        "generate": { "type": "emit", "values": {
            "amount": { "kind": "uniform_int", "min": 4, "max": 4 }
        }}
    }));

    let events = run(&script, 2).unwrap();
    assert_eq!(events[0].value("amount"), Some(&PropertyValue::Float(4.0)));
}

#[test]
fn undeclared_property_fails() {
    let script = script(json!({
        "script_version": "0.1",
        "schema": { "properties": [{ "name": "action", "type": "string" }] },
        "generate": { "type": "emit", "values": {
            "color": { "kind": "constant", "value": "red" }
        }}
    }));

    match run(&script, 2) {
        Err(GenerationError::UndeclaredProperty { property, path }) => {
            assert_eq!(property, "color");
            assert_eq!(path, "/generate/values/color");
        }
        other => panic!("expected undeclared property, got {other:?}"),
    }
}

#[test]
fn mismatched_value_type_fails() {
    let script = script(json!({
        "script_version": "0.1",
        "schema": { "properties": [{ "name": "age", "type": "integer" }] },
        "generate": { "type": "sequence", "rules": [
            { "type": "set", "property": "age", "distribution": { "kind": "bernoulli", "probability": 0.5 } },
            { "type": "emit" }
        ]}
    }));

    assert!(matches!(
        run(&script, 2),
        Err(GenerationError::TypeMismatch { ref property, .. }) if property == "age"
    ));
}

#[test]
fn negative_repeat_is_invalid() {
    let script = script(json!({
        "script_version": "0.1",
        "generate": { "type": "repeat", "count": { "min": -2, "max": 3 }, "rule": { "type": "emit" } }
    }));

    assert!(matches!(
        run(&script, 2),
        Err(GenerationError::InvalidParameter { ref path, .. }) if path == "/generate/count"
    ));
}

#[test]
fn runaway_trees_hit_the_event_limit() {
    let script = script(json!({
        "script_version": "0.1",
        "generate": { "type": "repeat", "count": 50, "rule": { "type": "emit" } }
    }));
    let engine = GenerationEngine::new(
        &script,
        GenerateOptions {
            max_events_per_object: 10,
            ..GenerateOptions::default()
        },
    );
    let mut rng = RandomSource::new(1);

    assert!(matches!(
        engine.generate("abcdefgh", &mut rng),
        Err(GenerationError::EventLimitExceeded { limit: 10 })
    ));
}

#[test]
fn loops_without_emits_hit_the_step_limit() {
    let validated = parse_script(
        r#"{
            "script_version": "0.1",
            "generate": { "type": "sequence", "rules": [
                { "type": "repeat", "count": 1000000000000, "rule": {
                    "type": "advance", "min_secs": 0, "max_secs": 0
                }},
                { "type": "emit" }
            ]}
        }"#,
    )
    .expect("script validates");
    let engine = GenerationEngine::new(
        &validated.script,
        GenerateOptions {
            max_steps_per_object: 1_000,
            ..GenerateOptions::default()
        },
    );
    let mut rng = RandomSource::new(1);

    match engine.generate("abcdefgh", &mut rng) {
        Err(GenerationError::StepLimitExceeded { limit, path }) => {
            assert_eq!(limit, 1_000);
            assert_eq!(path, "/generate/rules/0/rule");
        }
        other => panic!("expected step limit, got {other:?}"),
    }
}

#[test]
fn wide_float_bounds_produce_finite_values() {
    let script = script(json!({
        "script_version": "0.1",
        "schema": { "properties": [{ "name": "x", "type": "float" }] },
        "generate": { "type": "repeat", "count": 200, "rule": {
            "type": "emit",
            "values": { "x": { "kind": "uniform_float", "min": -1e308, "max": 1e308 } }
        }}
    }));

    let events = run(&script, 4).unwrap();
    assert_eq!(events.len(), 200);
    for event in &events {
        let value = event.value("x").and_then(|value| value.as_f64());
        assert!(value.is_some_and(f64::is_finite), "got {value:?}");
    }
}
