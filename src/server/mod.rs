//! # Server Module
//!
//! The HTTP binding: may_minihttp parses the wire format, [`MockService`] turns each
//! request into a [`crate::dispatcher::MockResponse`] and writes it back.
//!
//! Request bodies that are not JSON are answered with 400 before the dispatcher runs.
//! Responses carry `Content-Type: application/json` when they have a body.

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_body, parse_query_params, parse_request, ParsedRequest};
pub use response::write_mock_response;
pub use service::MockService;
