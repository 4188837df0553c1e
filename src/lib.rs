//! # specmock
//!
//! **specmock** serves plausible HTTP responses for an API that does not exist yet. Point it at
//! an OpenAPI-style document (or a short list of endpoints with canned payloads) and it
//! exposes every declared route, validates request bodies, and synthesizes response values
//! that respect the declared types, formats and constraints.
//!
//! ## Architecture
//!
//! - **[`spec`]** - Document loading, `$ref` resolution and endpoint extraction
//! - **[`router`]** - Radix-tree path matching with literal-over-parameter precedence
//! - **[`registry`]** - The immutable (template, method) → endpoint table
//! - **[`validator`]** - Request payload checks with per-field violations
//! - **[`selector`]** - Picks the response status for a request method
//! - **[`synth`]** - Random sample values for schema nodes, and variation of literal examples
//! - **[`delegate`]** - Optional external generator with timeout and local fallback
//! - **[`dispatcher`]** - Runs the whole pipeline for one request
//! - **[`server`]** - HTTP binding on `may_minihttp`
//! - **[`cli`]** - `serve`, `routes` and `mock` commands
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as MockService<br/>(may_minihttp)
//!     participant Dispatcher as MockDispatcher
//!     participant Registry as EndpointRegistry
//!     participant Validator
//!     participant Selector
//!     participant Synth as Synthesizer
//!
//!     Client->>Server: POST /api/books {"title": "Dune"}
//!     Server->>Server: Parse body as JSON
//!     alt Malformed JSON
//!         Server-->>Client: 400 Bad Request
//!     end
//!     Server->>Dispatcher: handle(path, method, payload)
//!     Dispatcher->>Registry: lookup(path, method)
//!     alt No endpoint
//!         Dispatcher-->>Client: 404 {"error":"Not Found"}
//!     end
//!     Dispatcher->>Validator: validate(payload, request schema)
//!     alt Violations
//!         Dispatcher-->>Client: 400 {"error":"Bad Request","violations":[...]}
//!     end
//!     Dispatcher->>Selector: select(policy, endpoint, method)
//!     Selector-->>Dispatcher: 201 + response spec
//!     Dispatcher->>Synth: synthesize(schema)
//!     Synth-->>Dispatcher: {"id": 412, "title": "..."}
//!     Dispatcher-->>Server: MockResponse
//!     Server-->>Client: 201 Created (application/json)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! specmock serve --spec books.yaml --addr 127.0.0.1:8080
//! curl http://127.0.0.1:8080/books/42
//! ```
//!
//! ### Embedding
//!
//! ```rust,no_run
//! use specmock::dispatcher::{MockContext, MockDispatcher};
//! use specmock::spec::load_document;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let document = load_document(std::path::Path::new("books.yaml"))?;
//! let context = MockContext::from_document(document)?;
//! let dispatcher = MockDispatcher::new(Arc::new(context)).with_seed(7);
//! let response = dispatcher.handle("/books/42", &http::Method::GET, None);
//! println!("{} {:?}", response.status, response.body);
//! # Ok(())
//! # }
//! ```
//!
//! ## Document Forms
//!
//! Schema-driven documents use `paths`, `components.schemas` and `servers[0].url` (whose path
//! becomes a prefix of every route). Simplified documents list `endpoints` with a literal
//! `response`, optionally marked `vary: true` to randomize every leaf of the example.
//!
//! All references are resolved while the registry is built. Broken or cyclic references,
//! contradictory constraints and ambiguous routes stop startup instead of failing requests.
//!
//! ## Configuration
//!
//! See [`runtime_config`] for the `SPECMOCK_*` environment variables and [`logging`] for log
//! output. CLI flags override the environment.

pub mod cli;
pub mod delegate;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod selector;
pub mod server;
pub mod spec;
pub mod synth;
pub mod validator;

pub use dispatcher::{MockContext, MockDispatcher, MockResponse};
pub use error::MockError;
pub use registry::EndpointRegistry;
pub use spec::{load_document, load_spec, Document};
