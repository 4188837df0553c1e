use super::build::build_endpoints;
use super::types::{DocumentForm, EndpointDefinition};
use crate::error::MockError;
use anyhow::Context;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

/// Drop path-item keys that are neither HTTP verbs nor shared path-item fields.
fn strip_unknown_verbs(val: &mut Value) {
    if let Some(Value::Object(paths_map)) = val.get_mut("paths") {
        for item in paths_map.values_mut() {
            if let Value::Object(obj) = item {
                obj.retain(|k, _| {
                    let lk = k.to_ascii_lowercase();
                    match lk.as_str() {
                        "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                        m if METHODS.contains(&m) => true,
                        _ => k.starts_with("x-"),
                    }
                });
            }
        }
    }
}

/// The parsed declarative document. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
    form: DocumentForm,
}

impl Document {
    /// Wrap an already parsed tree, detecting which layout it uses.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::InvalidDocument`] when the root declares neither (or both) of
    /// `endpoints` and `paths`.
    pub fn from_value(mut root: Value) -> Result<Self, MockError> {
        let has_endpoints = root.get("endpoints").is_some();
        let has_paths = root.get("paths").is_some();
        let form = match (has_endpoints, has_paths) {
            (true, false) => {
                if !root["endpoints"].is_array() {
                    return Err(MockError::invalid("#/endpoints", "must be a sequence"));
                }
                DocumentForm::Simplified
            }
            (false, true) => {
                if !root["paths"].is_object() {
                    return Err(MockError::invalid("#/paths", "must be a mapping"));
                }
                strip_unknown_verbs(&mut root);
                DocumentForm::SchemaDriven
            }
            (true, true) => {
                return Err(MockError::invalid(
                    "#",
                    "declare either `endpoints` or `paths`, not both",
                ))
            }
            (false, false) => {
                return Err(MockError::invalid(
                    "#",
                    "document must declare `endpoints` or `paths`",
                ))
            }
        };
        Ok(Self { root, form })
    }

    /// Parse YAML text (JSON is valid YAML, so this accepts both).
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or the layout is not recognised.
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let value: Value = serde_yaml::from_str(text).context("failed to parse document")?;
        Ok(Self::from_value(value)?)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn form(&self) -> DocumentForm {
        self.form
    }

    /// Path component of `servers[0].url`, without trailing slash (`""` when absent).
    pub fn base_path(&self) -> String {
        let Some(url_str) = self
            .root
            .get("servers")
            .and_then(|s| s.get(0))
            .and_then(|s| s.get("url"))
            .and_then(Value::as_str)
        else {
            return String::new();
        };
        url::Url::parse(url_str)
            .or_else(|_| url::Url::parse(&format!("http://dummy{url_str}")))
            .map(|u| {
                let p = u.path().trim_end_matches('/');
                if p == "/" || p.is_empty() {
                    String::new()
                } else {
                    p.to_string()
                }
            })
            .unwrap_or_default()
    }

    /// `info.title`, when declared.
    pub fn title(&self) -> Option<&str> {
        self.root
            .get("info")
            .and_then(|i| i.get("title"))
            .and_then(Value::as_str)
    }
}

/// Read a document from disk. `.json` files are parsed as JSON, everything else as YAML.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_document(file_path: &Path) -> anyhow::Result<Document> {
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read {}", file_path.display()))?;
    let value: Value = if file_path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {} as JSON", file_path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {} as YAML", file_path.display()))?
    };
    debug!(path = %file_path.display(), bytes = content.len(), "Document read");
    Ok(Document::from_value(value)?)
}

/// Load a document and build its endpoint table in one step.
///
/// # Errors
///
/// Returns an error if loading fails or a schema is broken, cyclic or contradictory.
/// Route collisions are reported by [`crate::registry::EndpointRegistry::new`].
pub fn load_spec(file_path: &Path) -> anyhow::Result<(Document, Vec<EndpointDefinition>)> {
    let document = load_document(file_path)?;
    let endpoints = build_endpoints(&document)
        .with_context(|| format!("failed to build endpoints from {}", file_path.display()))?;
    info!(
        path = %file_path.display(),
        form = %document.form(),
        endpoints = endpoints.len(),
        "Document loaded"
    );
    Ok((document, endpoints))
}
