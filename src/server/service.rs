use super::request::{parse_request, ParsedRequest};
use super::response::write_mock_response;
use crate::dispatcher::{MockDispatcher, MockResponse};
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// `HttpService` that answers every request from a shared [`MockDispatcher`].
///
/// may_minihttp clones the service per connection; clones share the dispatcher.
#[derive(Clone)]
pub struct MockService {
    dispatcher: Arc<MockDispatcher>,
}

impl MockService {
    pub fn new(dispatcher: Arc<MockDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &MockDispatcher {
        &self.dispatcher
    }

    /// Turn a parsed request into a response without touching the socket.
    pub fn respond(&self, request: &ParsedRequest) -> MockResponse {
        let payload = match &request.body {
            Ok(payload) => payload.as_ref(),
            Err(reason) => {
                info!(request_id = %request.request_id, %reason, "Malformed JSON body");
                return MockResponse::bad_request(vec![format!("field $: malformed JSON ({reason})")]);
            }
        };
        match Method::from_bytes(request.method.as_bytes()) {
            Ok(method) => self.dispatcher.handle(&request.path, &method, payload),
            Err(_) => MockResponse::not_found(),
        }
    }
}

impl HttpService for MockService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let start = Instant::now();
        let request = parse_request(req);
        let response = self.respond(&request);
        write_mock_response(res, &response);
        info!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            status = response.status,
            latency_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
        Ok(())
    }
}
