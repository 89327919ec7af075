use thiserror::Error;

/// A convenience `Result` alias using [`StewardError`].
pub type StewardResult<T> = Result<T, StewardError>;

/// Top-level error type for the Steward engine.
///
/// Each variant corresponds to a stage or collaborator that can fail. Agent
/// execution errors carry an explicit retryable flag so the dispatcher can
/// distinguish transient failures (network, timeout) from permanent
/// business-rule failures.
#[derive(Error, Debug)]
pub enum StewardError {
    /// Malformed or oversized input, rejected before any stage runs.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing organization context or insufficient role.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// A rate-limit bucket is exhausted for this key.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Intent classification failed internally (the run degrades, it does
    /// not fail).
    #[error("Classification error: {0}")]
    Classification(String),

    /// Cost estimation failed; fatal to the run.
    #[error("Cost estimation error: {0}")]
    CostEstimation(String),

    /// An approval request could not be created or resolved.
    #[error("Approval error: {0}")]
    Approval(String),

    /// An agent handler failed during dispatch.
    #[error("Agent error: {message}")]
    Agent {
        /// Failure description from the handler.
        message: String,
        /// Whether the failure is transient and worth one automatic retry.
        retryable: bool,
    },

    /// A workflow snapshot could not be persisted or loaded.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// An illegal workflow status transition was attempted.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Status the run was in.
        from: String,
        /// Status the caller tried to move to.
        to: String,
    },

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StewardError {
    /// Construct a transient agent error worth retrying.
    pub fn agent_retryable(message: impl Into<String>) -> Self {
        Self::Agent {
            message: message.into(),
            retryable: true,
        }
    }

    /// Construct a permanent agent error. Never retried.
    pub fn agent_permanent(message: impl Into<String>) -> Self {
        Self::Agent {
            message: message.into(),
            retryable: false,
        }
    }

    /// Whether this error is transient and eligible for automatic retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Agent { retryable: true, .. })
    }

    /// A short, user-safe message for the run's `error` field. Raw detail
    /// (upstream payloads, I/O paths) stays in the logs.
    pub fn sanitized(&self) -> String {
        match self {
            Self::Validation(_) => "Invalid request input".to_string(),
            Self::Authorization(_) => "Not authorized for this operation".to_string(),
            Self::RateLimited(_) => "Rate limit exceeded, slow down".to_string(),
            Self::Classification(_) => "Could not classify the request".to_string(),
            Self::CostEstimation(_) => "Could not estimate execution cost".to_string(),
            Self::Approval(_) => "Approval request could not be processed".to_string(),
            Self::Agent { .. } => "Agent execution failed".to_string(),
            Self::Persistence(_) => "Could not record workflow state".to_string(),
            Self::InvalidTransition { .. } => "Workflow is not in a valid state".to_string(),
            Self::Json(_) => "Internal serialization failure".to_string(),
            Self::Io(_) => "Internal storage failure".to_string(),
        }
    }
}
