//! Optional external response generator.
//!
//! A [`ResponseDelegate`] receives the resolved response schema as JSON Schema and returns
//! text that should parse as a JSON value matching it. Calls are bounded by a timeout; the
//! dispatcher falls back to local synthesis on any error.

use crate::error::MockError;
use serde_json::{json, Value};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::debug;

/// Schema in, text out. Implementations may block.
pub trait ResponseDelegate: Send + Sync {
    /// Generate a sample value for `schema`.
    ///
    /// # Errors
    ///
    /// [`MockError::DelegateFailure`] when the generator cannot produce output.
    fn generate(&self, schema: &Value) -> Result<String, MockError>;
}

impl<F> ResponseDelegate for F
where
    F: Fn(&Value) -> Result<String, MockError> + Send + Sync,
{
    fn generate(&self, schema: &Value) -> Result<String, MockError> {
        self(schema)
    }
}

/// Delegate that POSTs `{"schema": ...}` to a generator service and returns the
/// response body.
pub struct HttpDelegate {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpDelegate {
    /// # Errors
    ///
    /// [`MockError::DelegateFailure`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, MockError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MockError::DelegateFailure(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ResponseDelegate for HttpDelegate {
    fn generate(&self, schema: &Value) -> Result<String, MockError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "schema": schema }))
            .send()
            .map_err(|e| MockError::DelegateFailure(format!("request to {} failed: {e}", self.url)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(MockError::DelegateFailure(format!(
                "generator at {} answered {status}",
                self.url
            )));
        }
        response
            .text()
            .map_err(|e| MockError::DelegateFailure(format!("unreadable generator response: {e}")))
    }
}

/// Run the delegate on its own thread and wait at most `timeout` for a parseable answer.
///
/// Output is untrusted: it must parse as JSON but is not checked against the schema.
///
/// # Errors
///
/// [`MockError::DelegateTimeout`] when the deadline passes, [`MockError::DelegateFailure`]
/// when the delegate fails, panics, or returns text that is not JSON.
pub fn generate_with_timeout(
    delegate: &Arc<dyn ResponseDelegate>,
    schema: Value,
    timeout: Duration,
) -> Result<Value, MockError> {
    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(delegate);
    std::thread::Builder::new()
        .name("specmock-delegate".into())
        .spawn(move || {
            let _ = tx.send(worker.generate(&schema));
        })
        .map_err(|e| MockError::DelegateFailure(format!("failed to spawn delegate thread: {e}")))?;

    let text = match rx.recv_timeout(timeout) {
        Ok(result) => result?,
        Err(mpsc::RecvTimeoutError::Timeout) => return Err(MockError::DelegateTimeout(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            return Err(MockError::DelegateFailure("delegate thread exited without answering".into()))
        }
    };
    debug!(bytes = text.len(), "Delegate answered");
    serde_json::from_str(text.trim())
        .map_err(|e| MockError::DelegateFailure(format!("delegate output is not JSON: {e}")))
}
