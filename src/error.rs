use std::fmt;
use std::sync::Arc;

/// The broad category of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Supplied by the producer through `reject`.
    Rejected,
    /// A continuation returned an error.
    Handler,
    /// A continuation panicked while running.
    Panicked,
    /// A completion handle, or a queued continuation, went away without
    /// producing an outcome.
    ProducerDropped,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Rejected => "rejected",
            ErrorKind::Handler => "handler",
            ErrorKind::Panicked => "panicked",
            ErrorKind::ProducerDropped => "producer dropped",
        };
        f.write_str(name)
    }
}

/// Rejection value carried through a promise chain.
///
/// Cloning is cheap: the cause is shared, so the same error (and the same
/// cause chain) reaches every continuation that observes a rejection.
///
/// ```
/// use promise_then::{Error, ErrorKind};
/// let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
/// let err = Error::new("could not load").with_code(7).with_cause(io);
/// assert_eq!(err.kind(), ErrorKind::Rejected);
/// assert_eq!(err.code(), 7);
/// assert_eq!(err.to_string(), "rejected (7): could not load");
/// assert!(std::error::Error::source(&err).is_some());
/// ```
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} ({code}): {message}")]
pub struct Error {
    kind: ErrorKind,
    code: i64,
    message: String,
    #[source]
    cause: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    /// A producer rejection with code 0.
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Rejected, message)
    }

    pub fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: 0,
            message: message.into(),
            cause: None,
        }
    }

    /// Error for a continuation that gave up on its input.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Handler, message)
    }

    pub(crate) fn panicked(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "continuation panicked".to_owned()
        };
        Self::with_kind(ErrorKind::Panicked, message)
    }

    pub(crate) fn producer_dropped() -> Self {
        Self::with_kind(
            ErrorKind::ProducerDropped,
            "completion dropped without an outcome",
        )
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    /// Attach the error that caused this one.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True when both errors are clones of one another, including a shared cause.
    pub fn same_as(&self, other: &Error) -> bool {
        let causes = match (&self.cause, &other.cause) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        causes && self.kind == other.kind && self.code == other.code && self.message == other.message
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.code == other.code && self.message == other.message
    }
}
