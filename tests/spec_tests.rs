#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Document loading, reference resolution and endpoint extraction

mod common;

use common::fixtures::{books, BOOKS_YAML};
use common::temp_files::{create_temp_json, create_temp_yaml};
use http::Method;
use serde_json::json;
use specmock::spec::{
    build_endpoints, load_document, load_spec, lookup_pointer, Document, DocumentForm,
    ResponseBody, Resolver, SchemaNode, StringFormat, MAX_REF_DEPTH,
};
use specmock::MockError;

#[test]
fn test_load_yaml_file() {
    let file = create_temp_yaml(BOOKS_YAML);
    let (document, endpoints) = load_spec(file.path()).unwrap();
    assert_eq!(document.form(), DocumentForm::SchemaDriven);
    assert_eq!(document.title(), Some("Books"));

    let ids: Vec<&str> = endpoints.iter().map(|e| e.operation_id.as_str()).collect();
    assert_eq!(
        ids,
        ["listBooks", "createBook", "featuredBook", "getBook", "deleteBook", "broken"]
    );
}

#[test]
fn test_load_json_file() {
    let text = json!({
        "endpoints": [
            { "path": "/status", "response": { "ok": true } }
        ]
    })
    .to_string();
    let file = create_temp_json(&text);
    let document = load_document(file.path()).unwrap();
    assert_eq!(document.form(), DocumentForm::Simplified);
    let endpoints = build_endpoints(&document).unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].operation_id, "get_status");
}

#[test]
fn test_missing_file_reports_path() {
    let err = load_document(std::path::Path::new("/definitely/not/here.yaml")).unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.yaml"));
}

#[test]
fn test_document_must_choose_one_form() {
    let err = Document::from_value(json!({ "info": {} })).unwrap_err();
    assert!(matches!(err, MockError::InvalidDocument { .. }));
    let err = Document::from_value(json!({ "paths": {}, "endpoints": [] })).unwrap_err();
    assert!(matches!(err, MockError::InvalidDocument { .. }));
}

#[test]
fn test_request_schema_is_inlined() {
    let endpoints = build_endpoints(&books()).unwrap();
    let create = endpoints.iter().find(|e| e.operation_id == "createBook").unwrap();
    assert_eq!(create.method, Method::POST);
    assert!(create.request_body_required);
    let Some(SchemaNode::Object(obj)) = &create.request_schema else {
        panic!("expected an object request schema");
    };
    assert_eq!(obj.required, ["title"]);
    assert!(obj.property("pages").is_some());
}

#[test]
fn test_response_bodies_by_kind() {
    let endpoints = build_endpoints(&books()).unwrap();
    let find = |id: &str| endpoints.iter().find(|e| e.operation_id == id).unwrap();

    assert!(matches!(find("getBook").responses[&200].body, ResponseBody::Schema(_)));
    assert_eq!(
        find("featuredBook").responses[&200].body,
        ResponseBody::Literal(json!({ "id": 1, "title": "Dune" }))
    );
    assert_eq!(find("deleteBook").responses[&204].body, ResponseBody::Empty);
    assert_eq!(find("getBook").statuses().collect::<Vec<_>>(), [200, 404]);
}

#[test]
fn test_resolver_inlines_nested_references() {
    let root = books().root().clone();
    let mut resolver = Resolver::new(&root);
    let SchemaNode::Object(book) = resolver.resolve("#/components/schemas/Book").unwrap() else {
        panic!("Book is an object");
    };
    let Some(SchemaNode::String(isbn)) = book.property("isbn") else {
        panic!("isbn is a string");
    };
    assert_eq!(isbn.format, StringFormat::Uuid);
    assert_eq!(resolver.cached(), 1);
}

#[test]
fn test_lookup_pointer_escapes() {
    let root = json!({ "paths": { "/books/{id}": { "get": { "x": 1 } } }, "a~b": [10, 20] });
    assert_eq!(lookup_pointer(&root, "#/paths/~1books~1{id}/get/x").unwrap(), &json!(1));
    assert_eq!(lookup_pointer(&root, "#/a~0b/1").unwrap(), &json!(20));
    assert!(matches!(
        lookup_pointer(&root, "#/missing"),
        Err(MockError::Reference { .. })
    ));
    assert!(matches!(
        lookup_pointer(&root, "other.yaml#/x"),
        Err(MockError::Reference { .. })
    ));
}

#[test]
fn test_self_reference_is_cyclic() {
    let root = json!({
        "components": { "schemas": {
            "Node": {
                "type": "object",
                "properties": {
                    "children": { "type": "array", "items": { "$ref": "#/components/schemas/Node" } }
                }
            }
        }}
    });
    let err = Resolver::new(&root)
        .resolve("#/components/schemas/Node")
        .unwrap_err();
    let MockError::CyclicReference { pointer, chain } = err else {
        panic!("expected a cycle");
    };
    assert_eq!(pointer, "#/components/schemas/Node");
    assert_eq!(chain.len(), 2);
}

#[test]
fn test_long_reference_chains_are_bounded() {
    let mut schemas = serde_json::Map::new();
    for i in 0..=MAX_REF_DEPTH {
        schemas.insert(format!("S{i}"), json!({ "$ref": format!("#/components/schemas/S{}", i + 1) }));
    }
    schemas.insert(format!("S{}", MAX_REF_DEPTH + 1), json!({ "type": "string" }));
    let root = json!({ "components": { "schemas": schemas } });
    let err = Resolver::new(&root).resolve("#/components/schemas/S0").unwrap_err();
    assert!(matches!(err, MockError::CyclicReference { .. }));
}

#[test]
fn test_dangling_reference_aborts_build() {
    let doc = Document::from_yaml_str(
        r##"
openapi: 3.1.0
paths:
  /x:
    get:
      responses:
        "200":
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Nope" }
"##,
    )
    .unwrap();
    let err = build_endpoints(&doc).unwrap_err();
    assert!(matches!(err, MockError::Reference { .. }), "{err}");
}

#[test]
fn test_dangling_reference_inside_all_of_aborts_build() {
    let doc = Document::from_yaml_str(
        r##"
openapi: 3.1.0
paths:
  /x:
    get:
      responses:
        "200":
          content:
            application/json:
              schema:
                allOf:
                  - { type: object, properties: { id: { type: integer } } }
                  - { $ref: "#/components/schemas/Missing" }
"##,
    )
    .unwrap();
    let err = build_endpoints(&doc).unwrap_err();
    assert!(matches!(err, MockError::Reference { .. }), "{err}");
}

#[test]
fn test_dangling_reference_in_later_branches_aborts_build() {
    for keyword in ["oneOf", "anyOf"] {
        let doc = Document::from_value(json!({
            "openapi": "3.1.0",
            "paths": { "/x": { "post": {
                "requestBody": { "content": { "application/json": { "schema": {
                    "type": "object",
                    "properties": {
                        "pet": { keyword: [{ "type": "string" }, { "$ref": "#/components/schemas/Cat" }] }
                    },
                    "additionalProperties": { "$ref": "#/components/schemas/Dog" }
                }}}},
                "responses": { "200": { "description": "ok" } }
            }}},
            "components": { "schemas": { "Dog": { "type": "string" } } }
        }))
        .unwrap();
        let err = build_endpoints(&doc).unwrap_err();
        let MockError::Reference { pointer, .. } = err else {
            panic!("{keyword}: expected a reference error, got {err}");
        };
        assert_eq!(pointer, "#/components/schemas/Cat");
    }
}

#[test]
fn test_unused_cyclic_components_abort_build() {
    let doc = Document::from_yaml_str(
        r##"
openapi: 3.1.0
paths:
  /x:
    get:
      responses:
        "200":
          content:
            application/json:
              schema: { type: string }
components:
  schemas:
    A: { $ref: "#/components/schemas/B" }
    B: { $ref: "#/components/schemas/A" }
"##,
    )
    .unwrap();
    let err = build_endpoints(&doc).unwrap_err();
    assert!(matches!(err, MockError::CyclicReference { .. }), "{err}");
}

#[test]
fn test_all_of_request_schema_is_merged() {
    let doc = Document::from_yaml_str(
        r##"
openapi: 3.1.0
paths:
  /pets:
    post:
      requestBody:
        required: true
        content:
          application/json:
            schema:
              allOf:
                - { $ref: "#/components/schemas/Named" }
                - { type: object, required: [age], properties: { age: { type: integer } } }
      responses:
        "201": { description: created }
components:
  schemas:
    Named:
      type: object
      required: [name]
      properties:
        name: { type: string }
"##,
    )
    .unwrap();
    let endpoints = build_endpoints(&doc).unwrap();
    let SchemaNode::Object(object) = endpoints[0].request_schema.as_ref().unwrap() else {
        panic!("allOf of objects should merge into one object");
    };
    let names: Vec<&str> = object.properties.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(names, ["name", "age"]);
    assert_eq!(object.required, ["name", "age"]);
}
