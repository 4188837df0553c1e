use crate::ids::RequestId;
use may_minihttp::Request;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

/// What the mock service needs from a raw HTTP request.
#[derive(Debug, PartialEq)]
pub struct ParsedRequest {
    pub method: String,
    /// Request path including query string
    pub path: String,
    /// `x-request-id` when it is a valid ULID, otherwise freshly generated
    pub request_id: RequestId,
    /// The JSON payload, `Ok(None)` for an empty body, `Err` with the parser message when
    /// the body is not JSON
    pub body: Result<Option<Value>, String>,
}

/// Parse query string parameters from a URL path.
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    match path.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        None => HashMap::new(),
    }
}

/// Interpret a request body. Whitespace-only bodies count as absent.
pub fn parse_body(text: &str) -> Result<Option<Value>, String> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text).map(Some).map_err(|e| e.to_string())
}

/// Extract useful information from a `may_minihttp::Request`.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let path = req.path().to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();
    let request_id = RequestId::from_header_or_new(headers.get("x-request-id").map(String::as_str));

    let query_params = parse_query_params(&path);
    debug!(
        request_id = %request_id,
        header_count = headers.len(),
        query = ?query_params,
        "Request parsed"
    );

    let mut text = String::new();
    let body = match req.body().read_to_string(&mut text) {
        Ok(_) => parse_body(&text),
        Err(e) => Err(format!("unreadable body: {e}")),
    };

    ParsedRequest {
        method,
        path,
        request_id,
        body,
    }
}
