//! Router core: route table construction and the per-request hot path.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use crate::error::MockError;
use crate::spec::EndpointDefinition;
use http::Method;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::radix::RadixRouter;
use super::template::PathTemplate;

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Path parameters in path order. Names are shared with the route table.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of matching a request path to an endpoint.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub endpoint: Arc<EndpointDefinition>,
    /// Values bound to `{name}` segments
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name.
    ///
    /// Last write wins when a template repeats a parameter name.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Matches (method, path) pairs against the registered templates.
///
/// Construction rejects duplicate and ambiguous templates, so every request path maps to
/// at most one endpoint per method.
#[derive(Clone)]
pub struct Router {
    radix_router: RadixRouter,
    /// Registration order, kept for listing
    routes: Vec<(PathTemplate, Arc<EndpointDefinition>)>,
}

impl Router {
    /// Build the route table.
    ///
    /// # Errors
    ///
    /// [`MockError::DuplicateRoute`] when two endpoints share method and template shape,
    /// [`MockError::AmbiguousRoute`] when two templates for a method can match the same
    /// concrete path and neither is strictly more specific.
    pub fn new(endpoints: Vec<EndpointDefinition>) -> Result<Self, MockError> {
        let mut routes: Vec<(PathTemplate, Arc<EndpointDefinition>)> =
            Vec::with_capacity(endpoints.len());

        for endpoint in endpoints {
            let template = PathTemplate::parse(&endpoint.path_pattern);
            for (existing, other) in &routes {
                if other.method != endpoint.method || !existing.collides_with(&template) {
                    continue;
                }
                if existing.same_shape(&template) {
                    return Err(MockError::DuplicateRoute {
                        method: endpoint.method.clone(),
                        path: template.as_str().to_string(),
                    });
                }
                match existing.specificity(&template) {
                    Some(Ordering::Greater | Ordering::Less) => {
                        debug!(
                            method = %endpoint.method,
                            first = %existing.as_str(),
                            second = %template.as_str(),
                            "Overlapping templates resolved by specificity"
                        );
                    }
                    _ => {
                        return Err(MockError::AmbiguousRoute {
                            method: endpoint.method.clone(),
                            first: existing.as_str().to_string(),
                            second: template.as_str().to_string(),
                        });
                    }
                }
            }
            routes.push((template, Arc::new(endpoint)));
        }

        let radix_router = RadixRouter::new(routes.iter().map(|(t, e)| (t, e)));

        let routes_summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|(t, e)| format!("{} {}", e.method, t.as_str()))
            .collect();
        info!(
            routes_count = routes.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Ok(Self {
            radix_router,
            routes,
        })
    }

    /// Registered endpoints in registration order.
    pub fn endpoints(&self) -> impl Iterator<Item = &Arc<EndpointDefinition>> {
        self.routes.iter().map(|(_, e)| e)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Match a normalized request path.
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let start = std::time::Instant::now();
        let found = self.radix_router.route(method, path);
        let match_duration = start.elapsed();

        match found {
            Some((endpoint, path_params)) => {
                if match_duration > std::time::Duration::from_millis(1) {
                    warn!(
                        method = %method,
                        path = %path,
                        route_pattern = %endpoint.path_pattern,
                        duration_us = match_duration.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    debug!(
                        method = %method,
                        path = %path,
                        route_pattern = %endpoint.path_pattern,
                        path_params = ?path_params,
                        duration_us = match_duration.as_micros(),
                        "Route matched"
                    );
                }
                Some(RouteMatch {
                    endpoint,
                    path_params,
                })
            }
            None => {
                debug!(method = %method, path = %path, "No route matched");
                None
            }
        }
    }
}
