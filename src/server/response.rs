use crate::dispatcher::MockResponse;
use may_minihttp::Response;

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// 1xx, 204 and 304 responses never carry a body.
fn forbids_body(status: u16) -> bool {
    status < 200 || status == 204 || status == 304
}

/// Write a mock response: JSON body with `Content-Type`, or nothing at all for bodyless
/// responses.
pub fn write_mock_response(res: &mut Response, response: &MockResponse) {
    res.status_code(response.status as usize, status_reason(response.status));
    if forbids_body(response.status) {
        return;
    }
    if let Some(body) = &response.body {
        res.header("Content-Type: application/json");
        res.body_vec(body.to_string().into_bytes());
    }
}
