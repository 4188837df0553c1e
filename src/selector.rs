//! Picks which declared response an endpoint answers with.

use crate::error::MockError;
use crate::spec::{EndpointDefinition, ResponseSpec};
use http::Method;
use std::str::FromStr;

/// How a status is chosen among the declared responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// First declared status from the per-method preference list
    #[default]
    Preference,
    /// Lowest declared 2xx status
    SuccessOnly,
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "preference" => Ok(SelectionPolicy::Preference),
            "success" | "success-only" => Ok(SelectionPolicy::SuccessOnly),
            other => Err(format!("unknown selection policy '{other}' (expected preference|success)")),
        }
    }
}

impl std::fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionPolicy::Preference => write!(f, "preference"),
            SelectionPolicy::SuccessOnly => write!(f, "success"),
        }
    }
}

/// Typical REST outcomes per method, most preferred first.
pub fn preferred_statuses(method: &Method) -> &'static [u16] {
    if method == Method::GET {
        &[200, 404]
    } else if method == Method::POST {
        &[201, 400, 404]
    } else if method == Method::PUT {
        &[200, 204, 400, 404]
    } else if method == Method::DELETE {
        &[204, 404]
    } else if method == Method::PATCH {
        &[200, 400]
    } else {
        &[200, 204]
    }
}

/// Most preferred success status for `method` that can carry a body; 200 when the
/// preference list has none (DELETE prefers a bodyless 204).
pub fn default_status(method: &Method) -> u16 {
    preferred_statuses(method)
        .iter()
        .copied()
        .find(|s| (200..300).contains(s) && *s != 204)
        .unwrap_or(200)
}

/// Choose the status (and its declared response) for a request.
///
/// Endpoints marked `fixed_response` answer with their only declared response.
///
/// # Errors
///
/// [`MockError::NoResponseDefined`] when no declared status satisfies the policy.
pub fn select<'a>(
    policy: SelectionPolicy,
    endpoint: &'a EndpointDefinition,
    method: &Method,
) -> Result<(u16, &'a ResponseSpec), MockError> {
    let found = match policy {
        _ if endpoint.fixed_response => endpoint.responses.iter().next().map(|(s, r)| (*s, r)),
        SelectionPolicy::Preference => preferred_statuses(method)
            .iter()
            .find_map(|s| endpoint.responses.get(s).map(|r| (*s, r))),
        SelectionPolicy::SuccessOnly => endpoint
            .responses
            .range(200..300)
            .next()
            .map(|(s, r)| (*s, r)),
    };
    found.ok_or_else(|| MockError::NoResponseDefined {
        method: method.clone(),
        path: endpoint.path_pattern.to_string(),
    })
}
