use crate::api::rest::problem::{Problem, ProblemCode, ProblemResponse};
use crate::domain::error::DomainError;

/// 400 for a request the handler could not even decode.
pub fn bad_request(detail: impl Into<String>, instance: &str) -> ProblemResponse {
    ProblemResponse::new(ProblemCode::BadRequest, detail, instance)
}

fn code_for(e: &DomainError) -> ProblemCode {
    match e {
        DomainError::DuplicateUser { .. } => ProblemCode::DuplicateUser,
        DomainError::InvalidCredentials => ProblemCode::InvalidCredentials,
        DomainError::Forbidden { .. } => ProblemCode::Forbidden,
        DomainError::RequestNotFound { .. }
        | DomainError::MaterialNotFound { .. }
        | DomainError::TeacherNotFound { .. } => ProblemCode::NotFound,
        DomainError::MissingTarget => ProblemCode::MissingTarget,
        DomainError::MissingMaterialSelection => ProblemCode::MissingMaterial,
        DomainError::MaterialUnavailable { .. } => ProblemCode::MaterialUnavailable,
        DomainError::InvalidTransition { .. } => ProblemCode::InvalidTransition,
        DomainError::Validation { .. } => ProblemCode::Validation,
        DomainError::Internal { .. } => ProblemCode::Internal,
    }
}

/// Map a domain error onto its problem; `instance` is the request path.
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    let code = code_for(e);
    match e {
        DomainError::InvalidCredentials => {
            ProblemResponse::new(code, "Name or password is incorrect", instance)
        }
        DomainError::Validation { field, message } => Problem::new(code, e.to_string(), instance)
            .with_field(field, message.clone())
            .into(),
        DomainError::Internal { .. } => {
            // details stay in the logs
            tracing::error!(error = ?e, "Internal error occurred");
            ProblemResponse::new(code, "An internal error occurred", instance)
        }
        _ => ProblemResponse::new(code, e.to_string(), instance),
    }
}
