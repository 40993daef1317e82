use thiserror::Error;
use uuid::Uuid;

use crate::contract::model::{MaterialStatus, RequestStatus};

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User '{name}' already exists")]
    DuplicateUser { name: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Only technicians may {action}")]
    Forbidden { action: &'static str },

    #[error("Request not found: {id}")]
    RequestNotFound { id: Uuid },

    #[error("Material not found: {id}")]
    MaterialNotFound { id: Uuid },

    #[error("Teacher not found: {id}")]
    TeacherNotFound { id: Uuid },

    #[error("A target teacher is required when a technician files a request")]
    MissingTarget,

    #[error("Notebook requests must select a material")]
    MissingMaterialSelection,

    #[error("Material {id} is not available (status: {status})")]
    MaterialUnavailable { id: Uuid, status: MaterialStatus },

    #[error("Cannot {action} request {id} in status '{status}'")]
    InvalidTransition {
        id: Uuid,
        status: RequestStatus,
        action: &'static str,
    },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn duplicate_user(name: impl Into<String>) -> Self {
        Self::DuplicateUser { name: name.into() }
    }

    pub fn forbidden(action: &'static str) -> Self {
        Self::Forbidden { action }
    }

    pub fn request_not_found(id: Uuid) -> Self {
        Self::RequestNotFound { id }
    }

    pub fn material_not_found(id: Uuid) -> Self {
        Self::MaterialNotFound { id }
    }

    pub fn teacher_not_found(id: Uuid) -> Self {
        Self::TeacherNotFound { id }
    }

    pub fn material_unavailable(id: Uuid, status: MaterialStatus) -> Self {
        Self::MaterialUnavailable { id, status }
    }

    pub fn invalid_transition(id: Uuid, status: RequestStatus, action: &'static str) -> Self {
        Self::InvalidTransition { id, status, action }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
