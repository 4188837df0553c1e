use super::schema::SchemaNode;
use http::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which of the two accepted document layouts a document uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentForm {
    /// Top-level `endpoints` list with literal responses
    Simplified,
    /// OpenAPI-style `paths` plus `components.schemas`
    SchemaDriven,
}

impl std::fmt::Display for DocumentForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentForm::Simplified => write!(f, "simplified"),
            DocumentForm::SchemaDriven => write!(f, "schema-driven"),
        }
    }
}

/// What to emit for one declared status.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Generate a value from a fully resolved schema
    Schema(SchemaNode),
    /// Return a canned payload verbatim
    Literal(Value),
    /// Use the payload as a shape example and randomize its leaves
    Varied(Value),
    /// Bodyless status (e.g. 204)
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    pub body: ResponseBody,
}

impl ResponseSpec {
    pub fn empty() -> Self {
        Self {
            body: ResponseBody::Empty,
        }
    }

    pub fn has_body(&self) -> bool {
        !matches!(self.body, ResponseBody::Empty)
    }
}

/// Declared responses keyed by status code, ordered by status.
pub type Responses = BTreeMap<u16, ResponseSpec>;

/// One (path, method) pair served by the mock.
///
/// Created once while the registry is built and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct EndpointDefinition {
    pub method: Method,
    /// Normalized template including any base path (e.g. `/api/books/{bookId}`)
    pub path_pattern: Arc<str>,
    /// `operationId` when present, otherwise derived from method and literal segments
    pub operation_id: String,
    /// Fully resolved request body schema
    pub request_schema: Option<SchemaNode>,
    /// Whether an absent body is a validation failure
    pub request_body_required: bool,
    pub responses: Responses,
    /// Answer with the single declared response whatever the selection policy
    /// (simplified entries)
    pub fixed_response: bool,
}

impl EndpointDefinition {
    /// Declared statuses in ascending order.
    pub fn statuses(&self) -> impl Iterator<Item = u16> + '_ {
        self.responses.keys().copied()
    }
}

/// Normalize a path: leading `/`, no trailing `/`, no empty segments.
pub fn normalize_path(path: &str) -> String {
    let trimmed: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", trimmed.join("/"))
}

/// Derive an operation id from method and literal path segments
/// (`GET /books/{id}/reviews` → `get_books_reviews`).
pub fn derive_operation_id(method: &Method, path: &str) -> String {
    let literal: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && !s.starts_with('{'))
        .collect();
    if literal.is_empty() {
        method.as_str().to_ascii_lowercase()
    } else {
        format!("{}_{}", method.as_str().to_ascii_lowercase(), literal.join("_"))
    }
}
