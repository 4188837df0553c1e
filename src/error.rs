use http::Method;
use std::fmt;
use std::time::Duration;

/// Errors raised while building the endpoint registry or serving a mock response.
///
/// Build-time variants (`Reference`, `CyclicReference`, `Constraint`, `DuplicateRoute`,
/// `AmbiguousRoute`, `InvalidDocument`) abort startup. `NoResponseDefined` and synthesis
/// failures surface as a 500 for the affected request only. The delegate variants are
/// recovered by falling back to local synthesis.
#[derive(Debug, Clone, PartialEq)]
pub enum MockError {
    /// A `$ref` pointer does not lead to an existing node
    Reference {
        /// The pointer as written in the document
        pointer: String,
        /// What went wrong while walking it
        reason: String,
    },
    /// A `$ref` chain revisits a pointer on the active path or exceeds the depth bound
    CyclicReference {
        /// The pointer that closed the loop
        pointer: String,
        /// The active reference path, outermost first
        chain: Vec<String>,
    },
    /// Contradictory or malformed constraint metadata
    Constraint {
        /// Where the constraint was declared (schema path or field name)
        location: String,
        /// Human-readable description
        message: String,
    },
    /// Two endpoints share the same normalized template and method
    DuplicateRoute {
        /// HTTP method
        method: Method,
        /// Normalized path template
        path: String,
    },
    /// Two templates for the same method match a common concrete path and
    /// neither is strictly more specific
    AmbiguousRoute {
        /// HTTP method
        method: Method,
        /// Template registered first
        first: String,
        /// Template that collides with it
        second: String,
    },
    /// None of the statuses preferred for the method are declared
    NoResponseDefined {
        /// HTTP method
        method: Method,
        /// Path template of the endpoint
        path: String,
    },
    /// The document (or one of its schema nodes) has an unusable shape
    InvalidDocument {
        /// Where in the document
        location: String,
        /// Human-readable description
        message: String,
    },
    /// The external generator did not answer within its time budget
    DelegateTimeout(Duration),
    /// The external generator failed or returned unusable output
    DelegateFailure(String),
}

impl MockError {
    pub(crate) fn reference(pointer: &str, reason: impl Into<String>) -> Self {
        MockError::Reference {
            pointer: pointer.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn constraint(location: &str, message: impl Into<String>) -> Self {
        MockError::Constraint {
            location: location.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid(location: &str, message: impl Into<String>) -> Self {
        MockError::InvalidDocument {
            location: location.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error must stop the service from starting.
    #[must_use]
    pub fn is_startup_defect(&self) -> bool {
        matches!(
            self,
            MockError::Reference { .. }
                | MockError::CyclicReference { .. }
                | MockError::Constraint { .. }
                | MockError::DuplicateRoute { .. }
                | MockError::AmbiguousRoute { .. }
                | MockError::InvalidDocument { .. }
        )
    }
}

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockError::Reference { pointer, reason } => {
                write!(f, "unresolvable reference '{pointer}': {reason}")
            }
            MockError::CyclicReference { pointer, chain } => {
                write!(
                    f,
                    "cyclic reference '{pointer}' (active path: {})",
                    chain.join(" -> ")
                )
            }
            MockError::Constraint { location, message } => {
                write!(f, "constraint error at {location}: {message}")
            }
            MockError::DuplicateRoute { method, path } => {
                write!(f, "duplicate route {method} {path}")
            }
            MockError::AmbiguousRoute {
                method,
                first,
                second,
            } => {
                write!(
                    f,
                    "ambiguous routes for {method}: '{first}' and '{second}' match the same paths"
                )
            }
            MockError::NoResponseDefined { method, path } => {
                write!(f, "no response declared for {method} {path} under the active policy")
            }
            MockError::InvalidDocument { location, message } => {
                write!(f, "invalid document at {location}: {message}")
            }
            MockError::DelegateTimeout(after) => {
                write!(f, "delegate generator timed out after {}ms", after.as_millis())
            }
            MockError::DelegateFailure(reason) => {
                write!(f, "delegate generator failed: {reason}")
            }
        }
    }
}

impl std::error::Error for MockError {}
