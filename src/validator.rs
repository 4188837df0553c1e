//! Request payload validation against a resolved [`SchemaNode`].
//!
//! Schemas are rendered back to JSON Schema and compiled with `jsonschema`, once per
//! endpoint when the dispatcher context is built. Validation never fails as an operation:
//! every problem found is recorded as a [`Violation`] rooted at `$` and the caller decides
//! what to do with the [`ValidationResult`].

use crate::error::MockError;
use crate::spec::{json_kind, lookup_pointer, SchemaNode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex should be valid")
});

// The built-in checks accept more than the synthesizer produces, so these formats are
// registered explicitly.
fn is_email(s: &str) -> bool {
    EMAIL_REGEX.is_match(s)
}

fn is_date(s: &str) -> bool {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn is_date_time(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

fn is_uuid(s: &str) -> bool {
    uuid::Uuid::parse_str(s).is_ok()
}

/// One problem found in a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Location rooted at `$`, e.g. `$.author.name` or `$.tags[2]`
    pub path: String,
    pub reason: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field {}: {}", self.path, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }

    /// Rendered violation messages, in discovery order.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

/// A request schema compiled for repeated validation.
pub struct CompiledSchema {
    /// The JSON Schema the validator was built from, read back when describing errors
    schema: Value,
    inner: jsonschema::Validator,
}

impl CompiledSchema {
    /// Validate `payload`. An absent payload is valid unless `required` is set.
    pub fn validate(&self, payload: Option<&Value>, required: bool) -> ValidationResult {
        let Some(value) = payload else {
            let violations = if required {
                vec![Violation::new("$", "required")]
            } else {
                Vec::new()
            };
            return ValidationResult::from_violations(violations);
        };

        let mut violations = Vec::new();
        // `required` and `additionalProperties` are described in one pass per object
        let mut seen = HashSet::new();
        for error in self.inner.iter_errors(value) {
            let instance_path = error.instance_path.to_string();
            let schema_path = error.schema_path.to_string();
            if !seen.insert((instance_path.clone(), schema_path.clone())) {
                continue;
            }
            describe(
                &self.schema,
                value,
                &instance_path,
                &schema_path,
                error.to_string(),
                &mut violations,
            );
        }
        ValidationResult::from_violations(violations)
    }
}

/// Builds [`CompiledSchema`]s and checks payloads against request schemas.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    /// Treat every object as closed, even without `additionalProperties: false`
    reject_unknown: bool,
}

impl Validator {
    pub fn new(reject_unknown: bool) -> Self {
        Self { reject_unknown }
    }

    pub fn rejects_unknown(&self) -> bool {
        self.reject_unknown
    }

    /// Compile `schema` for repeated use.
    ///
    /// # Errors
    ///
    /// [`MockError::InvalidDocument`] if `jsonschema` refuses the rendered schema.
    pub fn compile(&self, schema: &SchemaNode) -> Result<CompiledSchema, MockError> {
        let mut json = schema.to_json_schema();
        if self.reject_unknown {
            close_objects(&mut json);
        }
        let mut opts = jsonschema::options();
        opts.should_validate_formats(true);
        opts.with_format("email", is_email);
        opts.with_format("date", is_date);
        opts.with_format("date-time", is_date_time);
        opts.with_format("uuid", is_uuid);
        let inner = opts
            .build(&json)
            .map_err(|e| MockError::invalid("#", format!("request schema does not compile: {e}")))?;
        Ok(CompiledSchema { schema: json, inner })
    }

    /// Compile and validate in one step.
    ///
    /// The dispatcher precompiles request schemas; this is the fallback for schemas that
    /// were not.
    pub fn validate(
        &self,
        payload: Option<&Value>,
        schema: &SchemaNode,
        required: bool,
    ) -> ValidationResult {
        match self.compile(schema) {
            Ok(compiled) => compiled.validate(payload, required),
            Err(e) => ValidationResult::from_violations(vec![Violation::new("$", e.to_string())]),
        }
    }
}

/// Close every object schema. `allOf` branches are left open since each one only declares
/// part of the properties.
fn close_objects(schema: &mut Value) {
    let Value::Object(map) = schema else {
        return;
    };
    if map.get("type").and_then(Value::as_str) == Some("object") {
        map.insert("additionalProperties".to_string(), Value::Bool(false));
    }
    if let Some(Value::Object(props)) = map.get_mut("properties") {
        props.values_mut().for_each(close_objects);
    }
    if let Some(items) = map.get_mut("items") {
        close_objects(items);
    }
}

/// Walk a JSON pointer into the payload, building the `$`-rooted display path.
fn locate<'a>(payload: &'a Value, pointer: &str) -> (String, Option<&'a Value>) {
    let mut path = String::from("$");
    let mut current = Some(payload);
    for raw in pointer.split('/').skip(1) {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        current = match current {
            Some(Value::Array(items)) => {
                path.push('[');
                path.push_str(&segment);
                path.push(']');
                segment.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            Some(Value::Object(map)) => {
                path.push('.');
                path.push_str(&segment);
                map.get(&segment)
            }
            _ => {
                path.push('.');
                path.push_str(&segment);
                None
            }
        };
    }
    (path, current)
}

fn display_scalar(v: &Value) -> String {
    v.as_str().map_or_else(|| v.to_string(), str::to_string)
}

fn length_of(v: &Value) -> usize {
    match v {
        Value::String(s) => s.chars().count(),
        Value::Array(a) => a.len(),
        Value::Object(o) => o.len(),
        _ => 0,
    }
}

/// Turn one `jsonschema` error into violations, reading the failing keyword back from the
/// compiled schema.
fn describe(
    schema: &Value,
    payload: &Value,
    instance_path: &str,
    schema_path: &str,
    fallback: String,
    out: &mut Vec<Violation>,
) {
    let (path, instance) = locate(payload, instance_path);
    let (owner_pointer, keyword) = schema_path.rsplit_once('/').unwrap_or(("", schema_path));
    let owner = lookup_pointer(schema, &format!("#{owner_pointer}")).ok();
    let limit = owner.and_then(|o| o.get(keyword));
    let (Some(instance), Some(limit)) = (instance, limit) else {
        out.push(Violation::new(path, fallback));
        return;
    };

    match keyword {
        "type" => out.push(Violation::new(
            &path,
            format!("expected {}, got {}", display_scalar(limit), json_kind(instance)),
        )),
        "required" => {
            for name in limit.as_array().into_iter().flatten().filter_map(Value::as_str) {
                if instance.get(name).is_none() {
                    out.push(Violation::new(format!("{path}.{name}"), "required"));
                }
            }
        }
        "additionalProperties" => {
            let declared = owner
                .and_then(|o| o.get("properties"))
                .and_then(Value::as_object);
            for name in instance.as_object().into_iter().flat_map(|m| m.keys()) {
                if !declared.is_some_and(|d| d.contains_key(name)) {
                    out.push(Violation::new(format!("{path}.{name}"), "unknown property"));
                }
            }
        }
        "minimum" => out.push(Violation::new(
            &path,
            format!("value {instance} is below minimum {limit}"),
        )),
        "maximum" => out.push(Violation::new(
            &path,
            format!("value {instance} is above maximum {limit}"),
        )),
        "minLength" => out.push(Violation::new(
            &path,
            format!("length {} is below minLength {limit}", length_of(instance)),
        )),
        "maxLength" => out.push(Violation::new(
            &path,
            format!("length {} is above maxLength {limit}", length_of(instance)),
        )),
        "minItems" => out.push(Violation::new(
            &path,
            format!("expected at least {limit} items, got {}", length_of(instance)),
        )),
        "maxItems" => out.push(Violation::new(
            &path,
            format!("expected at most {limit} items, got {}", length_of(instance)),
        )),
        "enum" => {
            let options: Vec<String> = limit
                .as_array()
                .into_iter()
                .flatten()
                .map(display_scalar)
                .collect();
            let shown = match instance {
                Value::String(s) => format!("'{s}'"),
                other => other.to_string(),
            };
            out.push(Violation::new(
                &path,
                format!("value {shown} is not one of [{}]", options.join(", ")),
            ));
        }
        "format" => out.push(Violation::new(
            &path,
            format!("invalid {} format", display_scalar(limit)),
        )),
        _ => out.push(Violation::new(path, fallback)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(v: Value) -> SchemaNode {
        SchemaNode::from_value(&v, "#").unwrap()
    }

    fn person() -> SchemaNode {
        schema(json!({
            "type": "object",
            "required": ["name", "email"],
            "properties": {
                "name": { "type": "string" },
                "email": { "type": "string", "format": "email" },
                "age": { "type": "integer", "minimum": 0, "maximum": 150 }
            }
        }))
    }

    fn sorted(mut messages: Vec<String>) -> Vec<String> {
        messages.sort();
        messages
    }

    #[test]
    fn test_missing_required_property() {
        let result = Validator::default().validate(Some(&json!({ "name": "x" })), &person(), true);
        assert!(!result.valid);
        assert_eq!(result.messages(), ["field $.email: required"]);
    }

    #[test]
    fn test_every_missing_property_reported_once() {
        let result = Validator::default().validate(Some(&json!({})), &person(), true);
        assert_eq!(
            sorted(result.messages()),
            ["field $.email: required", "field $.name: required"]
        );
    }

    #[test]
    fn test_type_mismatch_message() {
        let result = Validator::default().validate(Some(&json!([1, 2])), &person(), true);
        assert_eq!(result.messages(), ["field $: expected object, got array"]);
    }

    #[test]
    fn test_format_and_range() {
        let result = Validator::default().validate(
            Some(&json!({ "name": "x", "email": "nope", "age": 200 })),
            &person(),
            true,
        );
        assert_eq!(
            sorted(result.messages()),
            [
                "field $.age: value 200 is above maximum 150",
                "field $.email: invalid email format",
            ]
        );
    }

    #[test]
    fn test_integral_float_accepted_as_integer() {
        let s = schema(json!({ "type": "integer" }));
        assert!(Validator::default().validate(Some(&json!(3.0)), &s, true).valid);
        assert!(!Validator::default().validate(Some(&json!(3.5)), &s, true).valid);
    }

    #[test]
    fn test_unknown_properties() {
        let payload = json!({ "name": "x", "email": "a@b.co", "extra": 1 });
        assert!(Validator::default().validate(Some(&payload), &person(), true).valid);
        let result = Validator::new(true).validate(Some(&payload), &person(), true);
        assert_eq!(result.messages(), ["field $.extra: unknown property"]);
    }

    #[test]
    fn test_absent_payload() {
        assert!(Validator::default().validate(None, &person(), false).valid);
        let result = Validator::default().validate(None, &person(), true);
        assert_eq!(result.messages(), ["field $: required"]);
    }

    #[test]
    fn test_nested_array_paths() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "tags": { "type": "array", "maxItems": 2, "items": { "type": "string" } }
            }
        }));
        let result = Validator::default().validate(Some(&json!({ "tags": ["a", 1, "c"] })), &s, true);
        assert_eq!(
            sorted(result.messages()),
            [
                "field $.tags: expected at most 2 items, got 3",
                "field $.tags[1]: expected string, got integer"
            ]
        );
    }

    #[test]
    fn test_string_formats() {
        let v = Validator::default();
        let date = schema(json!({ "type": "string", "format": "date" }));
        assert!(v.validate(Some(&json!("2024-02-29")), &date, true).valid);
        assert!(!v.validate(Some(&json!("2024-13-01")), &date, true).valid);
        let id = schema(json!({ "type": "string", "format": "uuid" }));
        assert!(v.validate(Some(&json!("67e55044-10b1-426f-9247-bb680e5fe0c8")), &id, true).valid);
        let enumerated = schema(json!({ "enum": ["a", "b"] }));
        assert!(!v.validate(Some(&json!("c")), &enumerated, true).valid);
    }

    #[test]
    fn test_numeric_enum() {
        let s = schema(json!({ "type": "integer", "enum": [1, 2, 4] }));
        let compiled = Validator::default().compile(&s).unwrap();
        assert!(compiled.validate(Some(&json!(4)), true).valid);
        assert_eq!(
            compiled.validate(Some(&json!(3)), true).messages(),
            ["field $: value 3 is not one of [1, 2, 4]"]
        );
    }

    #[test]
    fn test_locate_builds_display_path() {
        let payload = json!({ "a/b": [{ "c": 1 }] });
        let (path, value) = locate(&payload, "/a~1b/0/c");
        assert_eq!(path, "$.a/b[0].c");
        assert_eq!(value, Some(&json!(1)));
        assert_eq!(locate(&payload, "").0, "$");
    }
}
