use super::load::Document;
use super::resolve::{check_references, lookup_pointer, Resolver};
use super::schema::SchemaNode;
use super::types::{
    derive_operation_id, normalize_path, DocumentForm, EndpointDefinition, ResponseBody,
    ResponseSpec, Responses,
};
use crate::error::MockError;
use crate::selector::{default_status, preferred_statuses};
use http::Method;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

/// Escape a key for use inside a JSON pointer.
fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn parse_method(raw: &str, location: &str) -> Result<Method, MockError> {
    let upper = raw.to_ascii_uppercase();
    if !METHODS.contains(&raw.to_ascii_lowercase().as_str()) {
        return Err(MockError::invalid(
            location,
            format!("unsupported HTTP method '{raw}'"),
        ));
    }
    upper
        .parse::<Method>()
        .map_err(|e| MockError::invalid(location, e.to_string()))
}

/// Follow a `$ref` on a non-schema object (request bodies, responses) if present.
fn deref_object<'a>(root: &'a Value, value: &'a Value) -> Result<&'a Value, MockError> {
    match value.get("$ref").and_then(Value::as_str) {
        Some(pointer) => lookup_pointer(root, pointer),
        None => Ok(value),
    }
}

/// Pick the JSON media type from a `content` map: `application/json` first, then any
/// `+json` / `json` media type.
fn json_media(content: &Map<String, Value>) -> Option<&Value> {
    content
        .get("application/json")
        .or_else(|| {
            content
                .iter()
                .find(|(mt, _)| mt.contains("json"))
                .map(|(_, media)| media)
        })
}

/// Parse, inline and constraint-check a schema subtree.
fn resolve_schema(
    resolver: &mut Resolver<'_>,
    value: &Value,
    location: &str,
) -> Result<SchemaNode, MockError> {
    check_references(resolver.root(), value)?;
    let parsed = SchemaNode::from_value(value, location)?;
    let inlined = resolver.inline(&parsed)?;
    inlined.check_constraints(location)?;
    Ok(inlined)
}

/// Extract the request body schema and whether the body is required.
fn extract_request_schema(
    root: &Value,
    resolver: &mut Resolver<'_>,
    operation: &Value,
    location: &str,
) -> Result<(Option<SchemaNode>, bool), MockError> {
    let Some(body) = operation.get("requestBody") else {
        return Ok((None, false));
    };
    let body = deref_object(root, body)?;
    let required = body.get("required").and_then(Value::as_bool).unwrap_or(false);
    let schema = match body
        .get("content")
        .and_then(Value::as_object)
        .and_then(json_media)
        .and_then(|media| media.get("schema"))
    {
        Some(schema) => Some(resolve_schema(
            resolver,
            schema,
            &format!("{location}/requestBody"),
        )?),
        None => None,
    };
    Ok((schema, required))
}

/// First example declared on a media type (`example`, then `examples.*.value`).
fn media_example(media: &Value) -> Option<Value> {
    media.get("example").cloned().or_else(|| {
        media
            .get("examples")
            .and_then(Value::as_object)
            .and_then(|examples| examples.values().find_map(|ex| ex.get("value").cloned()))
    })
}

/// Extract every numeric status with its body source. Non-numeric keys (`default`, `2XX`)
/// are skipped.
fn extract_responses(
    root: &Value,
    resolver: &mut Resolver<'_>,
    operation: &Value,
    location: &str,
) -> Result<Responses, MockError> {
    let mut out = Responses::new();
    let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
        return Ok(out);
    };
    for (status_str, resp) in responses {
        let status: u16 = match status_str.parse() {
            Ok(v) if (100..=599).contains(&v) => v,
            _ => {
                debug!(location, status = %status_str, "Skipping non-numeric response key");
                continue;
            }
        };
        let resp = deref_object(root, resp)?;
        let media = resp
            .get("content")
            .and_then(Value::as_object)
            .and_then(json_media);
        let body = match media {
            Some(media) => match media.get("schema") {
                Some(schema) => ResponseBody::Schema(resolve_schema(
                    resolver,
                    schema,
                    &format!("{location}/responses/{status}"),
                )?),
                None => media_example(media)
                    .map(ResponseBody::Literal)
                    .unwrap_or(ResponseBody::Empty),
            },
            None => ResponseBody::Empty,
        };
        out.insert(status, ResponseSpec { body });
    }
    Ok(out)
}

/// Resolve every `components.schemas` entry, used or not, so a broken or cyclic component
/// fails the build even when no operation reaches it.
fn resolve_components(root: &Value, resolver: &mut Resolver<'_>) -> Result<(), MockError> {
    let Some(schemas) = root
        .pointer("/components/schemas")
        .and_then(Value::as_object)
    else {
        return Ok(());
    };
    for (name, schema) in schemas {
        let pointer = format!("#/components/schemas/{}", escape_segment(name));
        check_references(root, schema)?;
        resolver.resolve(&pointer)?.check_constraints(&pointer)?;
    }
    debug!(components = schemas.len(), "Component schemas resolved");
    Ok(())
}

fn build_schema_driven(document: &Document) -> Result<Vec<EndpointDefinition>, MockError> {
    let root = document.root();
    let base_path = document.base_path();
    let mut resolver = Resolver::new(root);
    let mut endpoints = Vec::new();

    resolve_components(root, &mut resolver)?;

    let Some(paths) = root.get("paths").and_then(Value::as_object) else {
        return Ok(endpoints);
    };
    for (path, item) in paths {
        let item = deref_object(root, item)?;
        let Some(item) = item.as_object() else {
            return Err(MockError::invalid(
                &format!("#/paths/{}", escape_segment(path)),
                "path item must be a mapping",
            ));
        };
        let template = normalize_path(&format!("{base_path}{path}"));
        for (method_str, operation) in item {
            if !METHODS.contains(&method_str.to_ascii_lowercase().as_str()) {
                continue;
            }
            let location = format!("#/paths/{}/{}", escape_segment(path), method_str);
            let method = parse_method(method_str, &location)?;

            let operation_id = operation
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| derive_operation_id(&method, path));
            let (request_schema, request_body_required) =
                extract_request_schema(root, &mut resolver, operation, &location)?;
            let responses = extract_responses(root, &mut resolver, operation, &location)?;
            if responses.is_empty() {
                warn!(method = %method, path = %template, "Operation declares no numeric responses");
            }

            endpoints.push(EndpointDefinition {
                method,
                path_pattern: Arc::from(template.as_str()),
                operation_id,
                request_schema,
                request_body_required,
                responses,
                fixed_response: false,
            });
        }
    }
    debug!(schemas_resolved = resolver.cached(), "Schema references inlined");
    Ok(endpoints)
}

fn build_simplified(document: &Document) -> Result<Vec<EndpointDefinition>, MockError> {
    let root = document.root();
    let mut resolver = Resolver::new(root);
    let mut endpoints = Vec::new();

    let entries = root
        .get("endpoints")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for (i, entry) in entries.iter().enumerate() {
        let location = format!("#/endpoints/{i}");
        let path = entry
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| MockError::invalid(&location, "missing string `path`"))?;
        let template = normalize_path(path);

        // `method: GET` or `methods: [GET, POST]`; GET when neither is given.
        let methods: Vec<&str> = match (entry.get("method"), entry.get("methods")) {
            (Some(m), _) => vec![m
                .as_str()
                .ok_or_else(|| MockError::invalid(&location, "`method` must be a string"))?],
            (None, Some(Value::Array(ms))) => ms.iter().filter_map(Value::as_str).collect(),
            (None, Some(Value::String(m))) => vec![m.as_str()],
            _ => vec!["GET"],
        };

        let request_schema = match entry.get("request_schema") {
            Some(schema) => Some(resolve_schema(
                &mut resolver,
                schema,
                &format!("{location}/request_schema"),
            )?),
            None => None,
        };

        let declared_status = match entry.get("status") {
            Some(v) => Some(
                v.as_u64()
                    .filter(|s| (100..=599).contains(s))
                    .map(|s| s as u16)
                    .ok_or_else(|| {
                        MockError::invalid(&location, "`status` must be an HTTP status code")
                    })?,
            ),
            None => None,
        };
        let vary = entry.get("vary").and_then(Value::as_bool).unwrap_or(false);
        let body = match entry.get("response") {
            Some(payload) if vary => ResponseBody::Varied(payload.clone()),
            Some(payload) => ResponseBody::Literal(payload.clone()),
            None => ResponseBody::Empty,
        };

        for raw in methods {
            let method = parse_method(raw, &location)?;
            // Without an explicit status, answer with the method's most typical outcome,
            // or its most typical one that can carry the declared payload.
            let status = declared_status.unwrap_or_else(|| match body {
                ResponseBody::Empty => preferred_statuses(&method).first().copied().unwrap_or(200),
                _ => default_status(&method),
            });
            let mut responses = Responses::new();
            responses.insert(status, ResponseSpec { body: body.clone() });
            endpoints.push(EndpointDefinition {
                operation_id: derive_operation_id(&method, &template),
                method,
                path_pattern: Arc::from(template.as_str()),
                request_body_required: request_schema.is_some(),
                request_schema: request_schema.clone(),
                responses,
                fixed_response: true,
            });
        }
    }
    Ok(endpoints)
}

/// Materialize one [`EndpointDefinition`] per (path, method) declared in the document.
///
/// References are resolved eagerly so that broken, cyclic or contradictory schemas stop
/// the service before it serves anything. Route collisions are checked separately when
/// the definitions are handed to [`crate::registry::EndpointRegistry`].
///
/// # Errors
///
/// Any startup defect found while walking the document.
pub fn build_endpoints(document: &Document) -> Result<Vec<EndpointDefinition>, MockError> {
    match document.form() {
        DocumentForm::SchemaDriven => build_schema_driven(document),
        DocumentForm::Simplified => build_simplified(document),
    }
}
