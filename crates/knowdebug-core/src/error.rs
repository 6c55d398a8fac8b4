//! Error types.
//!
//! `AssessmentError` is raised by the engine, tracker, and session when a
//! caller breaks a precondition. `GeneratorError` represents failures of the
//! external content generator; it lives here so the driver can downcast and
//! classify errors for retry decisions without string matching.

use thiserror::Error;

/// Precondition violations reported by the assessment core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssessmentError {
    /// An input value is outside its declared domain.
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// No domain with this name exists in the session.
    #[error("unknown domain: {0}")]
    UnknownDomain(String),

    /// A domain index past the end of the domain list.
    #[error("domain index {index} out of range (session has {len} domains)")]
    DomainIndexOutOfRange { index: usize, len: usize },

    /// The domain has not been started yet.
    #[error("domain '{0}' has not been started")]
    DomainNotStarted(String),

    /// The domain was already started once.
    #[error("domain '{0}' was already started")]
    DomainAlreadyStarted(String),

    /// The domain reached a terminal status and accepts no more answers.
    #[error("domain '{0}' is already finished")]
    DomainFinished(String),

    /// An answer was submitted while no domain is active.
    #[error("no active domain")]
    NoActiveDomain,

    /// The assessment policy is inconsistent.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}

impl AssessmentError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        AssessmentError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur when talking to a question/report generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The generator answered, but not with a record we can use.
    #[error("malformed {what} from generator: {reason}")]
    MalformedResponse { what: &'static str, reason: String },
}

impl GeneratorError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            GeneratorError::AuthenticationFailed(_) | GeneratorError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            GeneratorError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
