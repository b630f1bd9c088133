use std::fmt;

use crate::state_machine::TransitionError;

/// Domain failures of an order operation. None of them is fatal; every one
/// maps to a user-visible response and leaves the document untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// No order with this id exists in the document.
    NotFound(String),
    /// The requested transition is not allowed from the current status.
    Conflict(TransitionError),
    /// Form input was rejected before any field was written.
    Validation(String),
}

impl OrderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        OrderError::Validation(msg.into())
    }

    /// Stable machine-readable kind, used in error responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::NotFound(_) => "not_found",
            OrderError::Conflict(_) => "conflict",
            OrderError::Validation(_) => "validation",
        }
    }
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderError::NotFound(id) => write!(f, "order not found: {id}"),
            OrderError::Conflict(e) => write!(f, "{e}"),
            OrderError::Validation(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for OrderError {}

impl From<TransitionError> for OrderError {
    fn from(e: TransitionError) -> Self {
        OrderError::Conflict(e)
    }
}
