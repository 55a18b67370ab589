use registry::{ConfigurationError, NotFoundError};
use storage_types::{DeadlineExceeded, Name};

/// Failures while turning a selection tree into a fetch plan.
///
/// `Timeout` is deliberately its own variant rather than a
/// `Validation` case: callers fold validation and not-found errors
/// into field-level errors of a partial response, while a timeout
/// must reach the request boundary untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("malformed filter expression '{input}': {reason}")]
    InvalidExpression { input: String, reason: String },

    #[error("order_by key '{key}' must be lowercase letters, digits and underscores")]
    InvalidOrderKey { key: String },

    #[error("'{value}' is not a valid choice for filter '{filter}'")]
    InvalidChoice { filter: Name, value: String },

    #[error("filter '{filter}' expects {expected}")]
    InvalidFilterInput { filter: Name, expected: &'static str },
}

impl PlanError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PlanError::Timeout(_))
    }
}
