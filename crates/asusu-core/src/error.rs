use thiserror::Error;

/// Asusu core errors.
///
/// Every store operation either applies fully or returns one of these with no mutation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AsusuError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Group '{group_id}' is full ({max_members} members)")]
    CapacityExceeded { group_id: String, max_members: u32 },

    #[error("'{user_id}' is already a member of group '{group_id}'")]
    AlreadyMember { group_id: String, user_id: String },

    #[error("'{user_id}' is not a member of group '{group_id}'")]
    NotAMember { group_id: String, user_id: String },

    #[error("'{user_id}' already contributed to the current cycle of group '{group_id}'")]
    AlreadyContributed { group_id: String, user_id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient funds: '{user_id}' needs {required}, has {available}")]
    InsufficientFunds {
        user_id: String,
        required: u64,
        available: u64,
    },

    #[error("Operation '{0}' was cancelled")]
    Cancelled(String),

    #[error("Operation '{operation}' timed out after {timeout_ms}ms")]
    TimedOut { operation: String, timeout_ms: u64 },

    #[error("Journal error: {0}")]
    Journal(String),
}

impl AsusuError {
    pub fn group_not_found(group_id: &str) -> Self {
        Self::NotFound(format!("group '{}'", group_id))
    }

    pub fn status_violation(operation: &str, expected: &str, actual: &str) -> Self {
        Self::InvalidState(format!(
            "{} requires status '{}', group is '{}'",
            operation, expected, actual
        ))
    }
}
