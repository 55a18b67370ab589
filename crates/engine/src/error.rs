use plan::PlanError;
use registry::{ConfigurationError, NotFoundError};
use selection::ParseError;
use storage_types::{DeadlineExceeded, Name, StoreError};

/// Request-time failures. Everything except `Timeout` is folded into
/// the structured error list of a partial response; `Timeout` unwinds
/// to the boundary and becomes the fixed TIMEOUT envelope.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("permission denied on field '{field}'")]
    PermissionDenied { field: Name },

    #[error("{message}")]
    Validation { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("resolver for '{field}' failed: {message}")]
    Resolver { field: Name, message: String },
}

impl ExecuteError {
    pub fn validation(message: impl Into<String>) -> ExecuteError {
        ExecuteError::Validation {
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecuteError::Timeout(_))
    }
}

impl From<PlanError> for ExecuteError {
    fn from(err: PlanError) -> ExecuteError {
        match err {
            PlanError::Timeout(timeout) => ExecuteError::Timeout(timeout),
            PlanError::NotFound(not_found) => ExecuteError::NotFound(not_found),
            PlanError::Configuration(config) => ExecuteError::Configuration(config),
            other => ExecuteError::Validation {
                message: other.to_string(),
            },
        }
    }
}
