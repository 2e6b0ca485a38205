use thiserror::Error;

/// Errors from the LLM collaborator
///
/// Adapters map their transport-level failures onto these variants so the
/// retry boundary can distinguish transient from permanent errors. The
/// control loop itself never retries; it propagates whatever the adapter
/// returns.
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("Request was throttled")]
    Throttled,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model invocation failed: {0}")]
    InvocationFailed(String),
}

impl LlmError {
    /// Whether this error is worth retrying at the adapter boundary.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Throttled | Self::ServiceUnavailable(_) | Self::Timeout
        )
    }
}

/// Errors from the guardrail validation collaborator
#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("Request was throttled")]
    Throttled,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Malformed guardrail response: {0}")]
    MalformedResponse(String),

    #[error("Validation request failed: {0}")]
    RequestFailed(String),
}

impl ValidationError {
    /// Whether this error is worth retrying at the adapter boundary.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Throttled | Self::ServiceUnavailable(_) | Self::Timeout
        )
    }
}
