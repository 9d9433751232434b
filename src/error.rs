use thiserror::Error;

/// Main error type for the coordination control plane
#[derive(Error, Debug)]
pub enum ConcordError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Governance errors
    #[error("Compliance token mismatch")]
    ComplianceMismatch,

    // Validation errors (programmer/config errors, raised synchronously)
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("Unknown auction: {0}")]
    UnknownAuction(String),

    #[error("Unknown voting strategy: {0}")]
    UnknownStrategy(String),

    // Timeout errors (overall budget exceeded; distinct from failure results)
    #[error("Operation timed out: {operation} exceeded {budget_secs}s budget")]
    Timeout { operation: String, budget_secs: f64 },

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for ConcordError
pub type Result<T> = std::result::Result<T, ConcordError>;

impl ConcordError {
    /// Whether this error is an overall-budget timeout rather than an
    /// ordinary failure. Callers use this to decide on retry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConcordError::Timeout { .. })
    }
}
