#![allow(clippy::unwrap_used, clippy::expect_used)]
//! HTTP round trips through may_minihttp
//!
//! Each test starts the mock service on a free port, speaks raw HTTP/1.1 to it and stops
//! the server when the fixture drops.

mod common;

use common::fixtures::books;
use common::test_server::setup_may_runtime;
use serde_json::{json, Value};
use specmock::server::{HttpServer, MockService, ServerHandle};
use specmock::spec::Document;
use specmock::{MockContext, MockDispatcher};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

struct MockServer {
    handle: Option<ServerHandle>,
    addr: SocketAddr,
}

impl MockServer {
    fn new() -> Self {
        Self::serving(books())
    }

    fn serving(document: Document) -> Self {
        setup_may_runtime();
        let context = MockContext::from_document(document).unwrap();
        let service = MockService::new(Arc::new(MockDispatcher::new(Arc::new(context))));

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let handle = HttpServer(service).start(addr).unwrap();
        handle.wait_ready().unwrap();
        Self {
            handle: Some(handle),
            addr,
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }
}

fn send_request(addr: &SocketAddr, req: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(req.as_bytes()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    let mut buf = Vec::new();
    loop {
        let mut tmp = [0u8; 1024];
        match stream.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break
            }
            Err(e) => panic!("read error: {e:?}"),
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn parse_response(resp: &str) -> (u16, String, String) {
    let (headers, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
    let mut status = 0;
    let mut content_type = String::new();
    for line in headers.lines() {
        if line.starts_with("HTTP/1.1") {
            status = line.split_whitespace().nth(1).unwrap_or("0").parse().unwrap();
        } else if let Some((name, val)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-type") {
                content_type = val.trim().to_string();
            }
        }
    }
    (status, content_type, body.to_string())
}

fn post(path: &str, body: &str) -> String {
    format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
}

#[test]
fn test_get_returns_json() {
    let server = MockServer::new();
    let resp = send_request(
        &server.addr,
        "GET /books/42 HTTP/1.1\r\nHost: localhost\r\nX-Request-Id: 01ARZ3NDEKTSV4RRFFQ69G5FAV\r\n\r\n",
    );
    let (status, content_type, body) = parse_response(&resp);
    assert_eq!(status, 200);
    assert_eq!(content_type, "application/json");
    let book: Value = serde_json::from_str(&body).unwrap();
    assert!(book["id"].is_i64());
}

#[test]
fn test_unknown_route_is_404() {
    let server = MockServer::new();
    let resp = send_request(&server.addr, "GET /authors HTTP/1.1\r\nHost: localhost\r\n\r\n");
    let (status, _, body) = parse_response(&resp);
    assert_eq!(status, 404);
    assert_eq!(body, r#"{"error":"Not Found"}"#);
}

#[test]
fn test_validation_failure_is_400() {
    let server = MockServer::new();
    let resp = send_request(&server.addr, &post("/books", r#"{"pages":3}"#));
    let (status, _, body) = parse_response(&resp);
    assert_eq!(status, 400);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["violations"][0], "field $.title: required");
}

#[test]
fn test_malformed_json_is_400() {
    let server = MockServer::new();
    let resp = send_request(&server.addr, &post("/books", r#"{"title":"#));
    let (status, _, body) = parse_response(&resp);
    assert_eq!(status, 400);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert!(body["violations"][0]
        .as_str()
        .unwrap()
        .starts_with("field $: malformed JSON"));
}

#[test]
fn test_delete_has_empty_body() {
    let server = MockServer::new();
    let resp = send_request(&server.addr, "DELETE /books/1 HTTP/1.1\r\nHost: localhost\r\n\r\n");
    let (status, content_type, body) = parse_response(&resp);
    assert_eq!(status, 204);
    assert!(content_type.is_empty());
    assert!(body.is_empty());
}

#[test]
fn test_simplified_delete_returns_declared_body() {
    let document = Document::from_value(json!({
        "endpoints": [
            { "path": "/loans/{id}", "method": "DELETE", "response": { "deleted": true } }
        ]
    }))
    .unwrap();
    let server = MockServer::serving(document);
    let resp = send_request(&server.addr, "DELETE /loans/9 HTTP/1.1\r\nHost: localhost\r\n\r\n");
    let (status, content_type, body) = parse_response(&resp);
    assert_eq!(status, 200);
    assert_eq!(content_type, "application/json");
    assert_eq!(body, r#"{"deleted":true}"#);
}
