use thiserror::Error;
use uuid::Uuid;

use crate::contract::model::{MaterialStatus, RequestStatus};

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoansError {
    #[error("User '{name}' already exists")]
    DuplicateUser { name: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Only technicians may {action}")]
    Forbidden { action: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("A target teacher is required")]
    MissingTarget,

    #[error("A material must be selected")]
    MissingMaterialSelection,

    #[error("Material {id} is not available (status: {status})")]
    MaterialUnavailable { id: Uuid, status: MaterialStatus },

    #[error("Cannot {action} a request in status '{status}'")]
    InvalidTransition {
        id: Uuid,
        status: RequestStatus,
        action: String,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error")]
    Internal,
}

impl LoansError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::Internal
    }
}

impl From<crate::domain::error::DomainError> for LoansError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            DuplicateUser { name } => Self::DuplicateUser { name },
            InvalidCredentials => Self::InvalidCredentials,
            Forbidden { action } => Self::Forbidden {
                action: action.to_string(),
            },
            RequestNotFound { id } => Self::not_found("Request", id),
            MaterialNotFound { id } => Self::not_found("Material", id),
            TeacherNotFound { id } => Self::not_found("Teacher", id),
            MissingTarget => Self::MissingTarget,
            MissingMaterialSelection => Self::MissingMaterialSelection,
            MaterialUnavailable { id, status } => Self::MaterialUnavailable { id, status },
            InvalidTransition { id, status, action } => Self::InvalidTransition {
                id,
                status,
                action: action.to_string(),
            },
            Validation { field, message } => Self::validation(format!("{}: {}", field, message)),
            Internal { .. } => Self::internal(),
        }
    }
}
