use crate::error::MockError;
use serde_json::{json, Map, Value};

/// String formats the synthesizer and validator understand.
///
/// Anything else declared in `format` is treated as [`StringFormat::Plain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Email,
    Date,
    DateTime,
    Uuid,
    Plain,
}

impl StringFormat {
    pub fn parse(s: &str) -> Self {
        match s {
            "email" => StringFormat::Email,
            "date" => StringFormat::Date,
            "date-time" => StringFormat::DateTime,
            "uuid" => StringFormat::Uuid,
            _ => StringFormat::Plain,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StringFormat::Email => "email",
            StringFormat::Date => "date",
            StringFormat::DateTime => "date-time",
            StringFormat::Uuid => "uuid",
            StringFormat::Plain => "plain",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringSchema {
    pub format: StringFormat,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Allowed values when the schema declares an `enum`
    pub enum_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    /// Declared properties in document order
    pub properties: Vec<(String, SchemaNode)>,
    pub required: Vec<String>,
    /// `false` when the schema says `additionalProperties: false`
    pub additional_properties: bool,
}

impl ObjectSchema {
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

/// Typed description of an expected value's shape.
///
/// Built from the generic document tree by [`SchemaNode::from_value`]. A tree may still
/// contain [`SchemaNode::Reference`] nodes until it has been passed through
/// [`crate::spec::Resolver::inline`].
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    String(StringSchema),
    Integer {
        minimum: Option<i64>,
        maximum: Option<i64>,
        /// Allowed values when the schema declares an `enum`
        enum_values: Vec<i64>,
    },
    Number {
        minimum: Option<f64>,
        maximum: Option<f64>,
        enum_values: Vec<f64>,
    },
    Boolean,
    Array {
        items: Option<Box<SchemaNode>>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object(ObjectSchema),
    /// A `$ref` pointer into the document
    Reference(String),
    /// `allOf` branches; [`crate::spec::Resolver::inline`] merges them into one node
    AllOf(Vec<SchemaNode>),
    /// No type declared; accepts anything and synthesizes `null`
    Any,
}

fn as_usize(v: Option<&Value>) -> Option<usize> {
    v.and_then(Value::as_u64).map(|n| n as usize)
}

fn enum_of<T>(obj: &Map<String, Value>, convert: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    obj.get("enum")
        .and_then(Value::as_array)
        .map(|vals| vals.iter().filter_map(&convert).collect())
        .unwrap_or_default()
}

/// Kind implied by the first `enum` entry of an untyped schema.
fn enum_kind(obj: &Map<String, Value>) -> Option<&'static str> {
    match obj.get("enum")?.as_array()?.first()? {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some("integer"),
        Value::Number(_) => Some("number"),
        Value::Bool(_) => Some("boolean"),
        _ => Some("string"),
    }
}

/// Pick the declared type. OpenAPI 3.1 allows `type: [string, "null"]`; the first
/// non-null entry wins.
fn declared_type(obj: &Map<String, Value>) -> Option<&str> {
    match obj.get("type")? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

impl SchemaNode {
    /// Parse a schema node from a document subtree.
    ///
    /// `location` names the subtree in error messages (e.g. `#/components/schemas/Book`).
    ///
    /// # Errors
    ///
    /// Returns [`MockError::InvalidDocument`] when the subtree is not a schema or declares
    /// an unknown type.
    pub fn from_value(value: &Value, location: &str) -> Result<SchemaNode, MockError> {
        let obj = match value {
            Value::Object(obj) => obj,
            Value::Bool(true) => return Ok(SchemaNode::Any),
            other => {
                return Err(MockError::invalid(
                    location,
                    format!("expected a schema object, found {}", json_kind(other)),
                ))
            }
        };

        if let Some(reference) = obj.get("$ref") {
            return match reference.as_str() {
                Some(pointer) => Ok(SchemaNode::Reference(pointer.to_string())),
                None => Err(MockError::invalid(location, "$ref must be a string")),
            };
        }

        if let Some(all) = obj.get("allOf") {
            let all = all
                .as_array()
                .ok_or_else(|| MockError::invalid(location, "allOf must be a sequence"))?;
            let mut branches = Vec::with_capacity(all.len() + 1);
            for (i, branch) in all.iter().enumerate() {
                branches.push(SchemaNode::from_value(branch, &format!("{location}/allOf/{i}"))?);
            }
            // Keywords next to `allOf` act as one more branch.
            let mut rest = obj.clone();
            rest.remove("allOf");
            if ["type", "properties", "required"].iter().any(|k| rest.contains_key(*k)) {
                branches.push(SchemaNode::from_value(&Value::Object(rest), location)?);
            }
            return Ok(SchemaNode::AllOf(branches));
        }

        // Composition keywords: the first alternative stands in for the union.
        for keyword in ["oneOf", "anyOf"] {
            if let Some(first) = obj.get(keyword).and_then(Value::as_array).and_then(|a| a.first())
            {
                return SchemaNode::from_value(first, &format!("{location}/{keyword}/0"));
            }
        }

        let ty = declared_type(obj).or_else(|| {
            if obj.contains_key("properties") {
                Some("object")
            } else if obj.contains_key("items") {
                Some("array")
            } else {
                enum_kind(obj)
            }
        });

        match ty {
            Some("string") => Ok(SchemaNode::String(StringSchema {
                format: obj
                    .get("format")
                    .and_then(Value::as_str)
                    .map(StringFormat::parse)
                    .unwrap_or(StringFormat::Plain),
                min_length: as_usize(obj.get("minLength")),
                max_length: as_usize(obj.get("maxLength")),
                enum_values: enum_of(obj, |v| v.as_str().map(str::to_string)),
            })),
            Some("integer") => Ok(SchemaNode::Integer {
                minimum: obj.get("minimum").and_then(|v| {
                    v.as_i64().or_else(|| v.as_f64().map(|f| f.ceil() as i64))
                }),
                maximum: obj.get("maximum").and_then(|v| {
                    v.as_i64().or_else(|| v.as_f64().map(|f| f.floor() as i64))
                }),
                enum_values: enum_of(obj, Value::as_i64),
            }),
            Some("number") => Ok(SchemaNode::Number {
                minimum: obj.get("minimum").and_then(Value::as_f64),
                maximum: obj.get("maximum").and_then(Value::as_f64),
                enum_values: enum_of(obj, Value::as_f64),
            }),
            Some("boolean") => Ok(SchemaNode::Boolean),
            Some("array") => {
                let items = match obj.get("items") {
                    Some(items) => Some(Box::new(SchemaNode::from_value(
                        items,
                        &format!("{location}/items"),
                    )?)),
                    None => None,
                };
                Ok(SchemaNode::Array {
                    items,
                    min_items: as_usize(obj.get("minItems")),
                    max_items: as_usize(obj.get("maxItems")),
                })
            }
            Some("object") => {
                let mut properties = Vec::new();
                if let Some(props) = obj.get("properties") {
                    let props = props.as_object().ok_or_else(|| {
                        MockError::invalid(location, "properties must be a mapping")
                    })?;
                    for (name, prop) in props {
                        let child = SchemaNode::from_value(
                            prop,
                            &format!("{location}/properties/{name}"),
                        )?;
                        properties.push((name.clone(), child));
                    }
                }
                let required = obj
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|names| {
                        names
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                let additional_properties = !matches!(
                    obj.get("additionalProperties"),
                    Some(Value::Bool(false))
                );
                Ok(SchemaNode::Object(ObjectSchema {
                    properties,
                    required,
                    additional_properties,
                }))
            }
            Some("null") | None => Ok(SchemaNode::Any),
            Some(other) => Err(MockError::invalid(
                location,
                format!("unsupported schema type '{other}'"),
            )),
        }
    }

    /// Name of the kind, as used in validation messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SchemaNode::String(_) => "string",
            SchemaNode::Integer { .. } => "integer",
            SchemaNode::Number { .. } => "number",
            SchemaNode::Boolean => "boolean",
            SchemaNode::Array { .. } => "array",
            SchemaNode::Object(_) => "object",
            SchemaNode::Reference(_) => "reference",
            SchemaNode::AllOf(_) => "object",
            SchemaNode::Any => "any",
        }
    }

    /// Combine `allOf` branches into a single node.
    ///
    /// Object branches contribute their properties (a later declaration of the same name
    /// replaces the earlier one in place) and `required` names; the result is closed if any
    /// branch is. Without object branches the first concrete branch is used.
    pub fn merge_all_of(branches: Vec<SchemaNode>) -> SchemaNode {
        let mut merged: Option<ObjectSchema> = None;
        let mut first_other = None;
        for branch in branches {
            match branch {
                SchemaNode::Object(obj) => {
                    let target = merged.get_or_insert_with(|| ObjectSchema {
                        properties: Vec::new(),
                        required: Vec::new(),
                        additional_properties: true,
                    });
                    for (name, prop) in obj.properties {
                        match target.properties.iter_mut().find(|(k, _)| *k == name) {
                            Some((_, existing)) => *existing = prop,
                            None => target.properties.push((name, prop)),
                        }
                    }
                    for name in obj.required {
                        if !target.required.contains(&name) {
                            target.required.push(name);
                        }
                    }
                    target.additional_properties &= obj.additional_properties;
                }
                SchemaNode::Any => {}
                other => {
                    if first_other.is_none() {
                        first_other = Some(other);
                    }
                }
            }
        }
        match (merged, first_other) {
            (Some(obj), _) => SchemaNode::Object(obj),
            (None, Some(other)) => other,
            (None, None) => SchemaNode::Any,
        }
    }

    /// Reject contradictory bounds anywhere in the tree.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::Constraint`] naming the first offending node.
    pub fn check_constraints(&self, location: &str) -> Result<(), MockError> {
        match self {
            SchemaNode::String(s) => check_bounds(location, "minLength", "maxLength", s.min_length, s.max_length),
            SchemaNode::Integer { minimum, maximum, .. } => {
                check_bounds(location, "minimum", "maximum", *minimum, *maximum)
            }
            SchemaNode::Number { minimum, maximum, .. } => {
                check_bounds(location, "minimum", "maximum", *minimum, *maximum)
            }
            SchemaNode::Array {
                items,
                min_items,
                max_items,
            } => {
                check_bounds(location, "minItems", "maxItems", *min_items, *max_items)?;
                match items {
                    Some(items) => items.check_constraints(&format!("{location}/items")),
                    None => Ok(()),
                }
            }
            SchemaNode::Object(obj) => obj.properties.iter().try_for_each(|(name, prop)| {
                prop.check_constraints(&format!("{location}/properties/{name}"))
            }),
            SchemaNode::AllOf(branches) => branches
                .iter()
                .enumerate()
                .try_for_each(|(i, b)| b.check_constraints(&format!("{location}/allOf/{i}"))),
            SchemaNode::Boolean | SchemaNode::Reference(_) | SchemaNode::Any => Ok(()),
        }
    }

    /// Render the node back to a JSON Schema document, for the delegate generator and the
    /// request validator.
    pub fn to_json_schema(&self) -> Value {
        match self {
            SchemaNode::String(s) => {
                let mut out = json!({ "type": "string" });
                if s.format != StringFormat::Plain {
                    out["format"] = json!(s.format.as_str());
                }
                if let Some(n) = s.min_length {
                    out["minLength"] = json!(n);
                }
                if let Some(n) = s.max_length {
                    out["maxLength"] = json!(n);
                }
                if !s.enum_values.is_empty() {
                    out["enum"] = json!(s.enum_values);
                }
                out
            }
            SchemaNode::Integer {
                minimum,
                maximum,
                enum_values,
            } => {
                let mut out = json!({ "type": "integer" });
                if let Some(n) = minimum {
                    out["minimum"] = json!(n);
                }
                if let Some(n) = maximum {
                    out["maximum"] = json!(n);
                }
                if !enum_values.is_empty() {
                    out["enum"] = json!(enum_values);
                }
                out
            }
            SchemaNode::Number {
                minimum,
                maximum,
                enum_values,
            } => {
                let mut out = json!({ "type": "number" });
                if let Some(n) = minimum {
                    out["minimum"] = json!(n);
                }
                if let Some(n) = maximum {
                    out["maximum"] = json!(n);
                }
                if !enum_values.is_empty() {
                    out["enum"] = json!(enum_values);
                }
                out
            }
            SchemaNode::Boolean => json!({ "type": "boolean" }),
            SchemaNode::Array {
                items,
                min_items,
                max_items,
            } => {
                let mut out = json!({ "type": "array" });
                if let Some(items) = items {
                    out["items"] = items.to_json_schema();
                }
                if let Some(n) = min_items {
                    out["minItems"] = json!(n);
                }
                if let Some(n) = max_items {
                    out["maxItems"] = json!(n);
                }
                out
            }
            SchemaNode::Object(obj) => {
                let props: Map<String, Value> = obj
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_schema()))
                    .collect();
                let mut out = json!({ "type": "object", "properties": props });
                if !obj.required.is_empty() {
                    out["required"] = json!(obj.required);
                }
                if !obj.additional_properties {
                    out["additionalProperties"] = json!(false);
                }
                out
            }
            SchemaNode::Reference(pointer) => json!({ "$ref": pointer }),
            SchemaNode::AllOf(branches) => {
                json!({ "allOf": branches.iter().map(SchemaNode::to_json_schema).collect::<Vec<_>>() })
            }
            SchemaNode::Any => json!({}),
        }
    }
}

fn check_bounds<T: PartialOrd + std::fmt::Display>(
    location: &str,
    low_name: &str,
    high_name: &str,
    low: Option<T>,
    high: Option<T>,
) -> Result<(), MockError> {
    match (low, high) {
        (Some(lo), Some(hi)) if lo > hi => Err(MockError::constraint(
            location,
            format!("{low_name} ({lo}) exceeds {high_name} ({hi})"),
        )),
        _ => Ok(()),
    }
}

/// JSON kind of a runtime value, as used in validation messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
