use super::schema::{ObjectSchema, SchemaNode};
use crate::error::MockError;
use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

/// Maximum length of an active `$ref` chain before resolution gives up.
pub const MAX_REF_DEPTH: usize = 32;

/// Walk a document-local pointer (`#/components/schemas/Book`) from the document root.
///
/// `#` marks the root, segments are separated by `/`, and the JSON-pointer escapes
/// `~1` (`/`) and `~0` (`~`) are honored. Sequence segments are indices.
///
/// # Errors
///
/// Returns [`MockError::Reference`] when the pointer is not document-local or a
/// segment does not exist.
pub fn lookup_pointer<'a>(root: &'a Value, pointer: &str) -> Result<&'a Value, MockError> {
    let Some(fragment) = pointer.strip_prefix('#') else {
        return Err(MockError::reference(
            pointer,
            "only document-local references (starting with '#') are supported",
        ));
    };
    if fragment.is_empty() {
        return Ok(root);
    }
    let Some(path) = fragment.strip_prefix('/') else {
        return Err(MockError::reference(pointer, "expected '/' after '#'"));
    };

    let mut current = root;
    for raw in path.split('/') {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        let next = match current {
            Value::Object(map) => map.get(&segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| {
            MockError::reference(pointer, format!("segment '{segment}' not found"))
        })?;
    }
    Ok(current)
}

/// Keys whose values are payload data rather than schema, so `$ref` inside them is literal.
const DATA_KEYS: [&str; 5] = ["example", "examples", "enum", "const", "default"];

/// Check that every `$ref` under `value` points at an existing node.
///
/// Structural resolution only follows the keywords the schema model understands; this walk
/// also covers later `oneOf`/`anyOf` branches, `additionalProperties`, `not` and the rest.
///
/// # Errors
///
/// [`MockError::Reference`] for the first dangling pointer.
pub fn check_references(root: &Value, value: &Value) -> Result<(), MockError> {
    match value {
        Value::Object(map) => {
            if let Some(pointer) = map.get("$ref").and_then(Value::as_str) {
                lookup_pointer(root, pointer)?;
            }
            for (key, child) in map {
                if DATA_KEYS.contains(&key.as_str()) || key.starts_with("x-") {
                    continue;
                }
                check_references(root, child)?;
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(|item| check_references(root, item)),
        _ => Ok(()),
    }
}

/// Tracks the `$ref` pointers currently being expanded.
///
/// A pointer that reappears while it is still on the active path, or a chain longer than
/// [`MAX_REF_DEPTH`], is reported as [`MockError::CyclicReference`].
#[derive(Debug, Default)]
pub struct RefGuard {
    active: Vec<String>,
}

impl RefGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `pointer` onto the active path.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::CyclicReference`] if the pointer is already active or the
    /// depth bound is exceeded.
    pub fn enter(&mut self, pointer: &str) -> Result<(), MockError> {
        if self.active.iter().any(|p| p == pointer) || self.active.len() >= MAX_REF_DEPTH {
            let mut chain = self.active.clone();
            chain.push(pointer.to_string());
            return Err(MockError::CyclicReference {
                pointer: pointer.to_string(),
                chain,
            });
        }
        self.active.push(pointer.to_string());
        Ok(())
    }

    pub fn leave(&mut self) {
        self.active.pop();
    }

    pub fn depth(&self) -> usize {
        self.active.len()
    }
}

/// Resolves `$ref` pointers against a loaded document and inlines them into concrete
/// [`SchemaNode`] trees.
///
/// Resolution is read-only: the same pointer always yields the same node, so fully
/// inlined results are cached by pointer for the lifetime of the resolver.
pub struct Resolver<'a> {
    root: &'a Value,
    cache: HashMap<String, SchemaNode>,
}

impl<'a> Resolver<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            cache: HashMap::new(),
        }
    }

    /// Resolve a pointer into a schema node with every nested reference inlined.
    ///
    /// # Errors
    ///
    /// [`MockError::Reference`] for missing targets, [`MockError::CyclicReference`] for
    /// self- or mutually-referential schemas, [`MockError::InvalidDocument`] when the target
    /// is not a schema.
    pub fn resolve(&mut self, pointer: &str) -> Result<SchemaNode, MockError> {
        let mut guard = RefGuard::new();
        self.resolve_guarded(pointer, &mut guard)
    }

    /// Replace every [`SchemaNode::Reference`] in `node` with its target.
    ///
    /// # Errors
    ///
    /// Same as [`Resolver::resolve`].
    pub fn inline(&mut self, node: &SchemaNode) -> Result<SchemaNode, MockError> {
        let mut guard = RefGuard::new();
        self.inline_guarded(node, &mut guard)
    }

    pub fn root(&self) -> &'a Value {
        self.root
    }

    /// Number of cached pointers (exposed for diagnostics).
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn resolve_guarded(
        &mut self,
        pointer: &str,
        guard: &mut RefGuard,
    ) -> Result<SchemaNode, MockError> {
        if let Some(hit) = self.cache.get(pointer) {
            return Ok(hit.clone());
        }
        guard.enter(pointer)?;
        trace!(pointer, depth = guard.depth(), "Resolving schema reference");

        let target = lookup_pointer(self.root, pointer)?;
        let parsed = SchemaNode::from_value(target, pointer)?;
        let inlined = self.inline_guarded(&parsed, guard)?;

        guard.leave();
        self.cache.insert(pointer.to_string(), inlined.clone());
        Ok(inlined)
    }

    fn inline_guarded(
        &mut self,
        node: &SchemaNode,
        guard: &mut RefGuard,
    ) -> Result<SchemaNode, MockError> {
        match node {
            SchemaNode::Reference(pointer) => self.resolve_guarded(pointer, guard),
            SchemaNode::Array {
                items,
                min_items,
                max_items,
            } => {
                let items = match items {
                    Some(items) => Some(Box::new(self.inline_guarded(items, guard)?)),
                    None => None,
                };
                Ok(SchemaNode::Array {
                    items,
                    min_items: *min_items,
                    max_items: *max_items,
                })
            }
            SchemaNode::Object(obj) => {
                let mut properties = Vec::with_capacity(obj.properties.len());
                for (name, prop) in &obj.properties {
                    properties.push((name.clone(), self.inline_guarded(prop, guard)?));
                }
                Ok(SchemaNode::Object(ObjectSchema {
                    properties,
                    required: obj.required.clone(),
                    additional_properties: obj.additional_properties,
                }))
            }
            SchemaNode::AllOf(branches) => {
                let mut inlined = Vec::with_capacity(branches.len());
                for branch in branches {
                    inlined.push(self.inline_guarded(branch, guard)?);
                }
                Ok(SchemaNode::merge_all_of(inlined))
            }
            leaf => Ok(leaf.clone()),
        }
    }
}
