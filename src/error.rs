//! Optimization error kinds

use thiserror::Error;

/// Failure of a single optimization request
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// Malformed or out-of-range request input
    #[error("invalid request: {0}")]
    Validation(String),

    /// Invariant violation in the numeric pipeline
    #[error("computation failed: {0}")]
    Computation(String),

    /// Explanation service unreachable, erroring or timing out
    #[error("explanation service failed: {0}")]
    ExternalService(String),
}

impl OptimizeError {
    /// Stable code used in error replies
    pub const fn code(&self) -> &'static str {
        match self {
            OptimizeError::Validation(_) => "INVALID_REQUEST",
            OptimizeError::Computation(_) => "COMPUTATION_ERROR",
            OptimizeError::ExternalService(_) => "UPSTREAM_ERROR",
        }
    }

    pub const fn is_client_error(&self) -> bool {
        matches!(self, OptimizeError::Validation(_))
    }
}

pub type OptimizeResult<T> = std::result::Result<T, OptimizeError>;
