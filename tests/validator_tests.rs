#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Request payload validation

use serde_json::{json, Value};
use specmock::spec::SchemaNode;
use specmock::validator::Validator;

fn schema(value: Value) -> SchemaNode {
    SchemaNode::from_value(&value, "#").unwrap()
}

fn order_schema() -> SchemaNode {
    schema(json!({
        "type": "object",
        "required": ["customer", "items"],
        "properties": {
            "customer": {
                "type": "object",
                "required": ["email"],
                "properties": {
                    "email": { "type": "string", "format": "email" },
                    "since": { "type": "string", "format": "date" }
                }
            },
            "items": {
                "type": "array",
                "minItems": 1,
                "maxItems": 3,
                "items": {
                    "type": "object",
                    "required": ["sku", "qty"],
                    "properties": {
                        "sku": { "type": "string", "format": "uuid" },
                        "qty": { "type": "integer", "minimum": 1, "maximum": 10 }
                    }
                }
            },
            "priority": { "type": "string", "enum": ["low", "high"] },
            "placedAt": { "type": "string", "format": "date-time" },
            "total": { "type": "number", "minimum": 0 }
        }
    }))
}

/// Messages sorted, since keyword evaluation order is not part of the contract.
fn messages(payload: Value) -> Vec<String> {
    let mut got = Validator::default()
        .validate(Some(&payload), &order_schema(), true)
        .messages();
    got.sort();
    got
}

#[test]
fn test_valid_order() {
    let payload = json!({
        "customer": { "email": "ann@example.com", "since": "2024-02-29" },
        "items": [{ "sku": "8c0a3c55-0a4e-4c53-9a43-6f1b3f1d2a10", "qty": 2 }],
        "priority": "high",
        "placedAt": "2024-03-01T12:00:00Z",
        "total": 19.5
    });
    let result = Validator::default().validate(Some(&payload), &order_schema(), true);
    assert!(result.valid, "{:?}", result.messages());
    assert!(result.violations.is_empty());
}

#[test]
fn test_nested_paths_are_reported() {
    let got = messages(json!({
        "customer": {},
        "items": [
            { "sku": "8c0a3c55-0a4e-4c53-9a43-6f1b3f1d2a10", "qty": 1 },
            { "sku": "nope", "qty": 11 }
        ]
    }));
    assert_eq!(
        got,
        [
            "field $.customer.email: required",
            "field $.items[1].qty: value 11 is above maximum 10",
            "field $.items[1].sku: invalid uuid format",
        ]
    );
}

#[test]
fn test_formats_and_enums() {
    let got = messages(json!({
        "customer": { "email": "not-an-email", "since": "2024-13-01" },
        "items": [{ "sku": "8c0a3c55-0a4e-4c53-9a43-6f1b3f1d2a10", "qty": 1 }],
        "priority": "urgent",
        "placedAt": "yesterday"
    }));
    assert_eq!(got.len(), 4, "{got:?}");
    assert_eq!(
        got,
        [
            "field $.customer.email: invalid email format",
            "field $.customer.since: invalid date format",
            "field $.placedAt: invalid date-time format",
            "field $.priority: value 'urgent' is not one of [low, high]",
        ]
    );
}

#[test]
fn test_type_mismatches() {
    let got = messages(json!({ "customer": "ann", "items": {}, "total": "free" }));
    assert_eq!(
        got,
        [
            "field $.customer: expected object, got string",
            "field $.items: expected array, got object",
            "field $.total: expected number, got string",
        ]
    );
}

#[test]
fn test_array_bounds() {
    let item = json!({ "sku": "8c0a3c55-0a4e-4c53-9a43-6f1b3f1d2a10", "qty": 1 });
    let got = messages(json!({ "customer": { "email": "a@b.co" }, "items": [] }));
    assert_eq!(got, ["field $.items: expected at least 1 items, got 0"]);
    let got = messages(json!({
        "customer": { "email": "a@b.co" },
        "items": [item.clone(), item.clone(), item.clone(), item]
    }));
    assert_eq!(got, ["field $.items: expected at most 3 items, got 4"]);
}

#[test]
fn test_integral_float_counts_as_integer() {
    let node = schema(json!({ "type": "integer" }));
    let v = Validator::default();
    assert!(v.validate(Some(&json!(3.0)), &node, true).valid);
    assert!(!v.validate(Some(&json!(3.5)), &node, true).valid);
}

#[test]
fn test_absent_payload() {
    let node = order_schema();
    let v = Validator::default();
    assert!(v.validate(None, &node, false).valid);
    assert_eq!(v.validate(None, &node, true).messages(), ["field $: required"]);
}

#[test]
fn test_closed_objects() {
    let closed = schema(json!({
        "type": "object",
        "additionalProperties": false,
        "properties": { "a": { "type": "boolean" } }
    }));
    let got = Validator::default()
        .validate(Some(&json!({ "a": true, "b": 1 })), &closed, true)
        .messages();
    assert_eq!(got, ["field $.b: unknown property"]);
}

#[test]
fn test_compiled_schema_is_reusable() {
    let compiled = Validator::new(true).compile(&order_schema()).unwrap();
    let ok = json!({
        "customer": { "email": "a@b.co" },
        "items": [{ "sku": "8c0a3c55-0a4e-4c53-9a43-6f1b3f1d2a10", "qty": 1 }]
    });
    assert!(compiled.validate(Some(&ok), true).valid);
    let mut extra = ok.clone();
    extra["customer"]["nickname"] = json!("ann");
    assert_eq!(
        compiled.validate(Some(&extra), true).messages(),
        ["field $.customer.nickname: unknown property"]
    );
    assert!(compiled.validate(None, false).valid);
}
