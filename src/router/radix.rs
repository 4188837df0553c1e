//! Radix tree for segment-wise route matching.
//!
//! Each node represents one path segment. Literal children are tried before parameter
//! children and the search backtracks on failure, so when two registered templates both
//! match a request the one with a literal at the first differing position wins. The
//! registry only admits colliding templates when one is strictly more specific, which
//! makes this order the same as "most specific template wins".

use http::Method;
use std::collections::HashMap;
use std::sync::Arc;

use super::core::ParamVec;
use super::template::{PathTemplate, Segment};
use crate::spec::EndpointDefinition;

#[derive(Clone, Default)]
struct RadixNode {
    /// Literal segment (empty for the root and parameter nodes)
    segment: Arc<str>,
    /// `Some(name)` for `{name}` nodes
    param_name: Option<Arc<str>>,
    /// Endpoints terminating at this node, by method
    routes: HashMap<Method, Arc<EndpointDefinition>>,
    children: Vec<RadixNode>,
    /// One child per distinct parameter name at this position
    param_children: Vec<RadixNode>,
}

impl RadixNode {
    fn literal(segment: Arc<str>) -> Self {
        Self {
            segment,
            ..Self::default()
        }
    }

    fn param(name: Arc<str>) -> Self {
        Self {
            param_name: Some(name),
            ..Self::default()
        }
    }

    fn insert(&mut self, segments: &[Segment], endpoint: Arc<EndpointDefinition>) {
        let Some((first, remaining)) = segments.split_first() else {
            self.routes.insert(endpoint.method.clone(), endpoint);
            return;
        };

        match first {
            Segment::Param(name) => {
                if let Some(child) = self
                    .param_children
                    .iter_mut()
                    .find(|c| c.param_name.as_deref() == Some(name.as_ref()))
                {
                    child.insert(remaining, endpoint);
                    return;
                }
                let mut child = RadixNode::param(name.clone());
                child.insert(remaining, endpoint);
                self.param_children.push(child);
            }
            Segment::Literal(lit) => {
                if let Some(child) = self.children.iter_mut().find(|c| c.segment == *lit) {
                    child.insert(remaining, endpoint);
                    return;
                }
                let mut child = RadixNode::literal(lit.clone());
                child.insert(remaining, endpoint);
                self.children.push(child);
            }
        }
    }

    fn search(
        &self,
        segments: &[&str],
        method: &Method,
        params: &mut ParamVec,
    ) -> Option<Arc<EndpointDefinition>> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.routes.get(method).cloned();
        };

        for child in &self.children {
            if child.segment.as_ref() == *segment {
                if let Some(found) = child.search(remaining, method, params) {
                    return Some(found);
                }
            }
        }

        for param_child in &self.param_children {
            if let Some(name) = &param_child.param_name {
                params.push((name.clone(), (*segment).to_string()));
                if let Some(found) = param_child.search(remaining, method, params) {
                    return Some(found);
                }
                params.pop();
            }
        }

        None
    }
}

#[derive(Clone, Default)]
pub struct RadixRouter {
    root: RadixNode,
}

impl RadixRouter {
    pub fn new<'a>(
        entries: impl IntoIterator<Item = (&'a PathTemplate, &'a Arc<EndpointDefinition>)>,
    ) -> Self {
        let mut root = RadixNode::default();
        for (template, endpoint) in entries {
            root.insert(template.segments(), endpoint.clone());
        }
        Self { root }
    }

    /// Match a normalized request path. Parameters are returned in path order.
    pub fn route(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(Arc<EndpointDefinition>, ParamVec)> {
        let segments: smallvec::SmallVec<[&str; 16]> =
            path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = ParamVec::new();
        let endpoint = self.root.search(&segments, method, &mut params)?;
        Some((endpoint, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Responses;

    fn endpoint(method: Method, path: &str, id: &str) -> (PathTemplate, Arc<EndpointDefinition>) {
        (
            PathTemplate::parse(path),
            Arc::new(EndpointDefinition {
                method,
                path_pattern: Arc::from(path),
                operation_id: id.to_string(),
                request_schema: None,
                request_body_required: false,
                responses: Responses::new(),
                fixed_response: false,
            }),
        )
    }

    fn router(defs: &[(PathTemplate, Arc<EndpointDefinition>)]) -> RadixRouter {
        RadixRouter::new(defs.iter().map(|(t, e)| (t, e)))
    }

    #[test]
    fn test_radix_router_with_parameter() {
        let defs = vec![endpoint(Method::GET, "/users/{id}", "get_user")];
        let (route, params) = router(&defs).route(&Method::GET, "/users/123").unwrap();
        assert_eq!(route.operation_id, "get_user");
        assert_eq!(params[0].0.as_ref(), "id");
        assert_eq!(params[0].1, "123");
    }

    #[test]
    fn test_radix_router_method_filtering() {
        let defs = vec![
            endpoint(Method::GET, "/items", "get_items"),
            endpoint(Method::POST, "/items", "create_item"),
        ];
        let r = router(&defs);
        assert_eq!(r.route(&Method::GET, "/items").unwrap().0.operation_id, "get_items");
        assert_eq!(r.route(&Method::POST, "/items").unwrap().0.operation_id, "create_item");
        assert!(r.route(&Method::PUT, "/items").is_none());
    }

    #[test]
    fn test_radix_router_backtracks_out_of_literal_branch() {
        let defs = vec![
            endpoint(Method::GET, "/users/me", "get_me"),
            endpoint(Method::GET, "/users/{id}/posts", "list_posts"),
        ];
        let (route, params) = router(&defs).route(&Method::GET, "/users/me/posts").unwrap();
        assert_eq!(route.operation_id, "list_posts");
        assert_eq!(params[0].1, "me");
    }

    #[test]
    fn test_radix_router_different_param_names_same_position() {
        let defs = vec![
            endpoint(Method::GET, "/users/{user_id}/posts", "get_user_posts"),
            endpoint(Method::GET, "/users/{id}/comments", "get_user_comments"),
        ];
        let r = router(&defs);
        let (_, params) = r.route(&Method::GET, "/users/123/posts").unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].0.as_ref(), "user_id");
        let (_, params) = r.route(&Method::GET, "/users/456/comments").unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].0.as_ref(), "id");
    }
}
