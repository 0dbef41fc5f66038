//! Error type shared by every service

/// Error types for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Entity does not exist (or is soft-deleted)
    #[error("{0}")]
    NotFound(String),

    /// Invalid input
    #[error("{0}")]
    Validation(String),

    /// Unique key already taken, or the entity is in the wrong state
    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} {} not found", entity, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<crate::practice::PracticeError> for ServiceError {
    fn from(err: crate::practice::PracticeError) -> Self {
        use crate::practice::PracticeError;
        match err {
            PracticeError::SessionClosed => Self::Conflict(err.to_string()),
            PracticeError::QuestionOutOfRange { .. } | PracticeError::OptionOutOfRange { .. } => {
                Self::Validation(err.to_string())
            }
        }
    }
}
