//! Service error type

/// Errors produced by service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Registration with a username that is already in use
    #[error("Username already exists")]
    DuplicateUsername(String),

    /// No user matches the submitted username and secret
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Correct credentials for an account the admin hasn't approved yet
    #[error("Your account is pending approval. Please wait for admin approval.")]
    PendingApproval,

    /// The actor isn't allowed to perform the operation
    #[error("{0}")]
    Forbidden(String),

    /// Unknown id
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Persistence layer failure
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Trim a required text field, rejecting blank values
pub(crate) fn required(field: &str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}
