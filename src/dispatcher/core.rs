use crate::delegate::{generate_with_timeout, ResponseDelegate};
use crate::error::MockError;
use crate::registry::EndpointRegistry;
use crate::selector::{select, SelectionPolicy};
use crate::spec::{Document, ResponseBody, SchemaNode};
use crate::synth::{vary, SynthConfig, Synthesizer};
use crate::validator::{CompiledSchema, Validator};
use http::Method;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Status and optional JSON body produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    /// `None` for bodyless responses such as 204
    pub body: Option<Value>,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    pub fn not_found() -> Self {
        Self::json(404, json!({ "error": "Not Found" }))
    }

    pub fn bad_request(violations: Vec<String>) -> Self {
        Self::json(400, json!({ "error": "Bad Request", "violations": violations }))
    }

    pub fn internal_error(message: &str) -> Self {
        Self::json(
            500,
            json!({ "error": "Internal Server Error", "message": message }),
        )
    }
}

/// Everything a request needs, built once at startup and read-only afterwards.
pub struct MockContext {
    document: Arc<Document>,
    registry: EndpointRegistry,
    synthesizer: Synthesizer,
    validator: Validator,
    /// Request schemas compiled at startup, keyed by `"{METHOD} {path pattern}"`
    request_validators: HashMap<String, CompiledSchema>,
    policy: SelectionPolicy,
    delegate: Option<(Arc<dyn ResponseDelegate>, Duration)>,
}

fn validator_key(method: &Method, path_pattern: &str) -> String {
    format!("{method} {path_pattern}")
}

/// Compile every request schema in `registry` with `validator`.
///
/// A schema that fails to compile is logged and left out; requests to that endpoint fall
/// back to compiling on demand, which reports the failure as a violation.
fn precompile(registry: &EndpointRegistry, validator: Validator) -> HashMap<String, CompiledSchema> {
    let mut compiled = HashMap::new();
    for endpoint in registry.endpoints() {
        let Some(schema) = &endpoint.request_schema else {
            continue;
        };
        match validator.compile(schema) {
            Ok(c) => {
                compiled.insert(validator_key(&endpoint.method, &endpoint.path_pattern), c);
            }
            Err(e) => error!(
                operation_id = %endpoint.operation_id,
                error = %e,
                "Failed to compile request schema"
            ),
        }
    }
    info!(
        compiled = compiled.len(),
        reject_unknown = validator.rejects_unknown(),
        "Precompiled request schemas"
    );
    compiled
}

impl MockContext {
    pub fn new(document: Arc<Document>, registry: EndpointRegistry) -> Self {
        let request_validators = precompile(&registry, Validator::default());
        Self {
            document,
            registry,
            synthesizer: Synthesizer::default(),
            validator: Validator::default(),
            request_validators,
            policy: SelectionPolicy::default(),
            delegate: None,
        }
    }

    /// Build the registry for `document` and wrap both with default settings.
    ///
    /// # Errors
    ///
    /// Any startup defect reported by [`EndpointRegistry::build`].
    pub fn from_document(document: Document) -> Result<Self, MockError> {
        let registry = EndpointRegistry::build(&document)?;
        Ok(Self::new(Arc::new(document), registry))
    }

    pub fn with_synth_config(mut self, config: SynthConfig) -> Self {
        self.synthesizer = Synthesizer::new(config);
        self
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self.request_validators = precompile(&self.registry, validator);
        self
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn ResponseDelegate>, timeout: Duration) -> Self {
        self.delegate = Some((delegate, timeout));
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn synth_config(&self) -> &SynthConfig {
        self.synthesizer.config()
    }
}

/// Turns (path, method, payload) into a [`MockResponse`].
///
/// Shared between request handlers; the only mutable state is the counter used to derive
/// per-request generators when a seed is configured.
pub struct MockDispatcher {
    context: Arc<MockContext>,
    seed: Option<u64>,
    counter: AtomicU64,
}

impl MockDispatcher {
    pub fn new(context: Arc<MockContext>) -> Self {
        Self {
            context,
            seed: None,
            counter: AtomicU64::new(0),
        }
    }

    /// Derive request `n`'s generator from `seed + n` so output is reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn context(&self) -> &MockContext {
        &self.context
    }

    /// Handle one request with a fresh random generator.
    pub fn handle(&self, path: &str, method: &Method, payload: Option<&Value>) -> MockResponse {
        match self.seed {
            Some(seed) => {
                let n = self.counter.fetch_add(1, Ordering::Relaxed);
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(n));
                self.handle_with_rng(path, method, payload, &mut rng)
            }
            None => self.handle_with_rng(path, method, payload, &mut rand::thread_rng()),
        }
    }

    /// Handle one request drawing entropy from `rng`.
    ///
    /// Never panics: a panic during synthesis is caught here and reported as a 500.
    pub fn handle_with_rng<R: Rng>(
        &self,
        path: &str,
        method: &Method,
        payload: Option<&Value>,
        rng: &mut R,
    ) -> MockResponse {
        let start = Instant::now();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.respond(path, method, payload, rng)
        }));
        let response = match outcome {
            Ok(response) => response,
            Err(panic) => {
                let panic_message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    method = %method,
                    path = %path,
                    panic_message = %panic_message,
                    "Response generation panicked"
                );
                MockResponse::internal_error(&panic_message)
            }
        };
        debug!(
            method = %method,
            path = %path,
            status = response.status,
            latency_us = start.elapsed().as_micros() as u64,
            "Mock response produced"
        );
        response
    }

    fn respond<R: Rng>(
        &self,
        path: &str,
        method: &Method,
        payload: Option<&Value>,
        rng: &mut R,
    ) -> MockResponse {
        let Some(route) = self.context.registry.lookup(path, method) else {
            return MockResponse::not_found();
        };
        let endpoint = &route.endpoint;
        debug!(
            operation_id = %endpoint.operation_id,
            path_params = ?route.path_params,
            "Endpoint matched"
        );

        if let Some(schema) = &endpoint.request_schema {
            let key = validator_key(&endpoint.method, &endpoint.path_pattern);
            let result = match self.context.request_validators.get(&key) {
                Some(compiled) => compiled.validate(payload, endpoint.request_body_required),
                None => self
                    .context
                    .validator
                    .validate(payload, schema, endpoint.request_body_required),
            };
            if !result.valid {
                info!(
                    method = %method,
                    path = %path,
                    operation_id = %endpoint.operation_id,
                    path_params = ?route.path_params,
                    violations = result.violations.len(),
                    "Request payload rejected"
                );
                return MockResponse::bad_request(result.messages());
            }
        }

        let (status, response) = match select(self.context.policy, endpoint, method) {
            Ok(selected) => selected,
            Err(e) => {
                error!(operation_id = %endpoint.operation_id, error = %e, "Response selection failed");
                return MockResponse::internal_error(&e.to_string());
            }
        };

        match &response.body {
            ResponseBody::Empty => MockResponse::empty(status),
            ResponseBody::Literal(value) => MockResponse::json(status, value.clone()),
            ResponseBody::Varied(example) => MockResponse::json(status, vary(example, rng)),
            ResponseBody::Schema(node) => match self.render(node, rng) {
                Ok(value) => MockResponse::json(status, value),
                Err(e) => {
                    error!(
                        operation_id = %endpoint.operation_id,
                        status,
                        error = %e,
                        "Response synthesis failed"
                    );
                    MockResponse::internal_error(&e.to_string())
                }
            },
        }
    }

    /// Ask the delegate first (when configured), then synthesize locally.
    fn render<R: Rng>(&self, node: &SchemaNode, rng: &mut R) -> Result<Value, MockError> {
        if let Some((delegate, timeout)) = &self.context.delegate {
            match generate_with_timeout(delegate, node.to_json_schema(), *timeout) {
                Ok(value) => return Ok(value),
                Err(e) => warn!(error = %e, "Delegate unavailable, falling back to local synthesis"),
            }
        }
        self.context
            .synthesizer
            .synthesize(node, self.context.document.root(), rng)
    }
}
