//! Structured serialization errors.
//!
//! Every failure aborts the whole serialization; no partial output is ever
//! returned. The message is the fully rendered multi-line trace built from
//! the context's breadcrumb frames (see [`crate::context`]).

/// Kind of failure; one message format per kind, not one type per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A callable's source text failed to parse.
    Parse,
    /// A required free variable was not found in any enclosing scope.
    MissingCapture,
    /// Native code, an opaque tag, or an unrecognized source shape.
    UnparseableFunction,
    /// A secret deferred value was captured without opt-in.
    SecretLeak,
    /// An internal IR invariant was violated.
    BrokenInvariant,
}

/// Error surfaced to callers of the serializer.
#[derive(Debug, Clone, thiserror::Error, serde::Serialize)]
#[error("{message}")]
pub struct SerializeError {
    pub kind: ErrorKind,
    /// Fully rendered, human-readable message.
    pub message: String,
    /// Opaque context resource reference, passed through untouched for the
    /// host's error formatter.
    pub resource: Option<String>,
    /// The host's error formatter should suppress the underlying stack
    /// trace; the message already carries the useful context.
    pub hide_stack: bool,
}

impl SerializeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource: None,
            hide_stack: true,
        }
    }

    pub fn with_resource(mut self, resource: Option<String>) -> Self {
        self.resource = resource;
        self
    }
}
