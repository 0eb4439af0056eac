use thiserror::Error;

/// Errors raised by the SOAP layer itself, before response classification
/// (§4.7).
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("request cancelled")]
    Cancelled,

    #[error("submission queue is full (depth {0})")]
    QueueOverflow(usize),

    #[error("batch limit exceeded: {0}")]
    BatchLimit(String),

    #[error("SOAP fault: {0}")]
    SoapFault(String),

    #[error("malformed SET response: {0}")]
    MalformedResponse(String),
}

/// Configuration errors raised while building a [`crate::transport::SenderConfig`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("missing required configuration field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

/// The §7 error taxonomy surfaced to the caller of [`crate::transport::DocumentSender`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    Validation,
    Signing,
    Transient,
    Throttle,
    Rejected,
    Observations,
    Cancelled,
    System,
}

impl ErrorKind {
    pub fn is_retriable(self) -> bool {
        matches!(self, ErrorKind::Transient | ErrorKind::Throttle)
    }
}

/// A classified outcome, carrying enough context for the retry manager and
/// the caller's diagnostics (§7).
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub set_code: Option<u32>,
    pub message: String,
    pub remediation: String,
    pub attempt: u32,
    pub elapsed_ms: u64,
    pub fingerprint: String,
}

impl std::fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:?}] {} (attempt {}, {}ms): {}",
            self.kind, self.fingerprint, self.attempt, self.elapsed_ms, self.message
        )
    }
}

impl std::error::Error for ClassifiedError {}
