//! Endpoint registry: the immutable (template, method) → endpoint table.

use crate::error::MockError;
use crate::router::{RouteMatch, Router};
use crate::spec::{build_endpoints, normalize_path, Document, EndpointDefinition};
use http::Method;
use std::sync::Arc;

/// All endpoints declared by a document, ready for lookup.
///
/// Built once at startup and shared read-only between request handlers.
#[derive(Clone)]
pub struct EndpointRegistry {
    router: Router,
}

impl EndpointRegistry {
    /// Index already materialized definitions.
    ///
    /// # Errors
    ///
    /// [`MockError::DuplicateRoute`] or [`MockError::AmbiguousRoute`] when templates collide.
    pub fn new(endpoints: Vec<EndpointDefinition>) -> Result<Self, MockError> {
        Ok(Self {
            router: Router::new(endpoints)?,
        })
    }

    /// Materialize and index every endpoint of `document`.
    ///
    /// # Errors
    ///
    /// Any startup defect: broken or cyclic references, contradictory constraints, malformed
    /// entries, duplicate or ambiguous routes.
    pub fn build(document: &Document) -> Result<Self, MockError> {
        Self::new(build_endpoints(document)?)
    }

    /// Find the endpoint serving `method` on `path`.
    ///
    /// The query string is ignored and the path is normalized the same way templates are.
    pub fn lookup(&self, path: &str, method: &Method) -> Option<RouteMatch> {
        let path = path.split_once('?').map_or(path, |(p, _)| p);
        let normalized = normalize_path(path);
        self.router.route(method, &normalized)
    }

    /// Endpoints in declaration order.
    pub fn endpoints(&self) -> impl Iterator<Item = &Arc<EndpointDefinition>> {
        self.router.endpoints()
    }

    pub fn len(&self) -> usize {
        self.router.len()
    }

    pub fn is_empty(&self) -> bool {
        self.router.is_empty()
    }
}
