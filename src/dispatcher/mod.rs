//! # Dispatcher Module
//!
//! The composition root of a mock request.
//!
//! [`MockDispatcher::handle`] runs the whole pipeline for one request:
//!
//! 1. Registry lookup by (path, method); a miss is `404 {"error":"Not Found"}`
//! 2. Payload validation when the endpoint declares a request schema; violations become
//!    `400 {"error":"Bad Request","violations":[...]}` and nothing is synthesized
//! 3. Response selection under the configured [`crate::selector::SelectionPolicy`]
//! 4. Body production: literal payload, varied example, synthesized value, or no body
//!
//! Selection failures, synthesis errors and panics become
//! `500 {"error":"Internal Server Error","message":...}` for that request only.
//!
//! All shared state lives in an immutable [`MockContext`]. Each request gets its own
//! random generator, so handlers running in parallel never contend on it.

mod core;

pub use core::{MockContext, MockDispatcher, MockResponse};
