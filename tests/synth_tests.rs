#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Synthesized values must satisfy the schema they were generated from

mod common;

use common::fixtures::books;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use specmock::spec::{Resolver, SchemaNode};
use specmock::synth::{vary, SynthConfig, SynthMode, Synthesizer};
use specmock::validator::Validator;
use specmock::MockError;

fn schema(value: Value) -> SchemaNode {
    SchemaNode::from_value(&value, "#").unwrap()
}

#[test]
fn test_book_samples_validate() {
    let document = books();
    let root = document.root().clone();
    let book = Resolver::new(&root).resolve("#/components/schemas/Book").unwrap();
    let synth = Synthesizer::default();
    let validator = Validator::new(true);

    for seed in 0..200 {
        let mut rng = StdRng::seed_from_u64(seed);
        let value = synth.synthesize(&book, &root, &mut rng).unwrap();
        let result = validator.validate(Some(&value), &book, true);
        assert!(result.valid, "seed {seed}: {:?} for {value}", result.messages());
    }
}

#[test]
fn test_same_seed_same_value() {
    let document = books();
    let root = document.root();
    let node = schema(json!({ "$ref": "#/components/schemas/Book" }));
    let synth = Synthesizer::default();
    let a = synth.synthesize(&node, root, &mut StdRng::seed_from_u64(11)).unwrap();
    let b = synth.synthesize(&node, root, &mut StdRng::seed_from_u64(11)).unwrap();
    assert_eq!(a, b);
    assert!(a["id"].is_i64());
}

#[test]
fn test_mode_controls_unbounded_integers() {
    let node = schema(json!({ "type": "integer" }));
    let simple = Synthesizer::new(SynthConfig {
        mode: SynthMode::Simple,
        ..SynthConfig::default()
    });
    let comprehensive = Synthesizer::default();
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..500 {
        let s = simple.synthesize(&node, &Value::Null, &mut rng).unwrap().as_i64().unwrap();
        assert!((0..=100).contains(&s));
        let c = comprehensive
            .synthesize(&node, &Value::Null, &mut rng)
            .unwrap()
            .as_i64()
            .unwrap();
        assert!((1..=1000).contains(&c));
    }
}

#[test]
fn test_configured_array_bounds() {
    let node = schema(json!({ "type": "array", "items": { "type": "boolean" } }));
    let synth = Synthesizer::new(SynthConfig {
        array_min: 3,
        array_max: 3,
        ..SynthConfig::default()
    });
    let value = synth
        .synthesize(&node, &Value::Null, &mut StdRng::seed_from_u64(1))
        .unwrap();
    assert_eq!(value.as_array().unwrap().len(), 3);
}

#[test]
fn test_unresolved_cycle_fails_at_synthesis() {
    let root = json!({
        "components": { "schemas": {
            "Loop": { "$ref": "#/components/schemas/Loop" }
        }}
    });
    let node = schema(json!({ "$ref": "#/components/schemas/Loop" }));
    let err = Synthesizer::default()
        .synthesize(&node, &root, &mut StdRng::seed_from_u64(0))
        .unwrap_err();
    assert!(matches!(err, MockError::CyclicReference { .. }));
}

#[test]
fn test_vary_keeps_shape() {
    let example = json!({
        "id": 7,
        "price": 9.99,
        "contact": "jane@example.com",
        "bio": "Writes about deserts",
        "flags": [true, false],
        "nested": { "code": "AB12" }
    });
    let mut rng = StdRng::seed_from_u64(21);
    let varied = vary(&example, &mut rng);

    let keys: Vec<&String> = varied.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["id", "price", "contact", "bio", "flags", "nested"]);
    assert!(varied["id"].is_i64());
    let price = varied["price"].as_f64().unwrap();
    assert_eq!((price * 100.0).round() / 100.0, price);
    assert!(varied["contact"].as_str().unwrap().contains('@'));
    assert!(varied["bio"].as_str().unwrap().contains(' '));
    assert!(varied["flags"].as_array().unwrap().iter().all(Value::is_boolean));
    assert_eq!(varied["nested"]["code"].as_str().unwrap().len(), 4);
}
